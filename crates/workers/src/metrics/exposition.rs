use std::fmt::Write;

use super::worker_metrics::WorkerMetrics;

pub fn render_prometheus(m: &WorkerMetrics) -> String {
    let mut out = String::with_capacity(2048);

    let counters = [
        ("pulse_worker_probes_up_total", m.probes_up_val()),
        ("pulse_worker_probes_down_total", m.probes_down_val()),
        ("pulse_worker_probes_crashed_total", m.probes_crashed_val()),
        ("pulse_worker_ticks_retried_total", m.ticks_retried_val()),
        ("pulse_worker_ticks_exhausted_total", m.ticks_exhausted_val()),
        ("pulse_worker_outcomes_published_total", m.outcomes_published_val()),
        ("pulse_worker_messages_acked_total", m.messages_acked_val()),
        ("pulse_worker_messages_nacked_total", m.messages_nacked_val()),
        ("pulse_worker_messages_discarded_total", m.messages_discarded_val()),
        ("pulse_worker_results_stored_total", m.results_stored_val()),
        ("pulse_worker_incidents_opened_total", m.incidents_opened_val()),
        ("pulse_worker_incidents_resolved_total", m.incidents_resolved_val()),
        ("pulse_worker_notifications_sent_total", m.notifications_sent_val()),
        ("pulse_worker_notifications_failed_total", m.notifications_failed_val()),
    ];
    for (name, val) in counters {
        write_counter(&mut out, name, val);
    }

    let (sum, count) = m.probe_latency_vals();
    write_summary(&mut out, "pulse_worker_probe_latency_ms", sum, count);

    let (sum, count) = m.processing_latency_vals();
    write_summary(&mut out, "pulse_worker_processing_latency_us", sum, count);

    out
}

fn write_counter(out: &mut String, name: &str, val: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {val}");
}

fn write_summary(out: &mut String, name: &str, sum: u64, count: u64) {
    let _ = writeln!(out, "# TYPE {name} summary");
    let _ = writeln!(out, "{name}_sum {sum}");
    let _ = writeln!(out, "{name}_count {count}");
}
