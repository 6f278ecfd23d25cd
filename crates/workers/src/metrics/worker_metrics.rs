use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct WorkerMetrics {
    probes_up: AtomicU64,
    probes_down: AtomicU64,
    probes_crashed: AtomicU64,
    ticks_retried: AtomicU64,
    ticks_exhausted: AtomicU64,
    outcomes_published: AtomicU64,
    messages_acked: AtomicU64,
    messages_nacked: AtomicU64,
    messages_discarded: AtomicU64,
    results_stored: AtomicU64,
    incidents_opened: AtomicU64,
    incidents_resolved: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    probe_latency_sum_ms: AtomicU64,
    probe_latency_count: AtomicU64,
    processing_latency_sum_us: AtomicU64,
    processing_latency_count: AtomicU64,
    ready: AtomicBool,
}

macro_rules! counter {
    ($inc:ident, $val:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $val(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl WorkerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    counter!(inc_probes_up, probes_up_val, probes_up);
    counter!(inc_probes_down, probes_down_val, probes_down);
    counter!(inc_probes_crashed, probes_crashed_val, probes_crashed);
    counter!(inc_ticks_retried, ticks_retried_val, ticks_retried);
    counter!(inc_ticks_exhausted, ticks_exhausted_val, ticks_exhausted);
    counter!(inc_outcomes_published, outcomes_published_val, outcomes_published);
    counter!(inc_messages_acked, messages_acked_val, messages_acked);
    counter!(inc_messages_nacked, messages_nacked_val, messages_nacked);
    counter!(inc_messages_discarded, messages_discarded_val, messages_discarded);
    counter!(inc_results_stored, results_stored_val, results_stored);
    counter!(inc_incidents_opened, incidents_opened_val, incidents_opened);
    counter!(inc_incidents_resolved, incidents_resolved_val, incidents_resolved);
    counter!(inc_notifications_sent, notifications_sent_val, notifications_sent);
    counter!(inc_notifications_failed, notifications_failed_val, notifications_failed);

    pub fn record_probe_latency(&self, response_time_ms: u64) {
        self.probe_latency_sum_ms
            .fetch_add(response_time_ms, Ordering::Relaxed);
        self.probe_latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processing_latency(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.processing_latency_sum_us
            .fetch_add(us, Ordering::Relaxed);
        self.processing_latency_count
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn probe_latency_vals(&self) -> (u64, u64) {
        (
            self.probe_latency_sum_ms.load(Ordering::Relaxed),
            self.probe_latency_count.load(Ordering::Relaxed),
        )
    }

    pub fn processing_latency_vals(&self) -> (u64, u64) {
        (
            self.processing_latency_sum_us.load(Ordering::Relaxed),
            self.processing_latency_count.load(Ordering::Relaxed),
        )
    }

    /// Set once the database, stream and consumer are set up.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}
