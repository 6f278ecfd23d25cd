use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::queue::{JobQueue, QueueError};
use super::{ScheduleEntry, Tick};

struct Slot {
    entry: ScheduleEntry,
    revision: i64,
    attempt: u32,
    next_run_at: Instant,
    leased: bool,
}

/// Process-local queue with the same revision and attempt rules as
/// `PgJobQueue`. Timing follows `tokio::time`, so paused-clock tests can
/// advance it.
#[derive(Default)]
pub struct InMemoryJobQueue {
    slots: Mutex<HashMap<Uuid, Slot>>,
    revisions: AtomicI64,
    upserts: AtomicUsize,
    removes: AtomicUsize,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry(&self, monitor_id: Uuid) -> Option<ScheduleEntry> {
        self.slots
            .lock()
            .await
            .get(&monitor_id)
            .map(|s| s.entry.clone())
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn attempt(&self, monitor_id: Uuid) -> Option<u32> {
        self.slots.lock().await.get(&monitor_id).map(|s| s.attempt)
    }

    /// Makes the entry due now, releasing any lease.
    pub async fn force_due(&self, monitor_id: Uuid) {
        if let Some(slot) = self.slots.lock().await.get_mut(&monitor_id) {
            slot.next_run_at = Instant::now();
            slot.leased = false;
        }
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Removals that actually deleted an entry.
    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), QueueError> {
        let mut slots = self.slots.lock().await;
        let revision = self.revisions.fetch_add(1, Ordering::Relaxed) + 1;
        slots.insert(
            entry.monitor_id,
            Slot {
                entry: entry.clone(),
                revision,
                attempt: 1,
                next_run_at: Instant::now(),
                leased: false,
            },
        );
        self.upserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove(&self, monitor_id: Uuid) -> Result<bool, QueueError> {
        let removed = self.slots.lock().await.remove(&monitor_id).is_some();
        if removed {
            self.removes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    async fn remove_claimed(&self, tick: &Tick) -> Result<bool, QueueError> {
        let mut slots = self.slots.lock().await;
        if slots.get(&tick.monitor_id).map(|s| s.revision) != Some(tick.revision) {
            return Ok(false);
        }
        slots.remove(&tick.monitor_id);
        self.removes.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    async fn claim_due(&self, limit: usize) -> Result<Vec<Tick>, QueueError> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let mut due: Vec<&mut Slot> = slots
            .values_mut()
            .filter(|s| !s.leased && s.next_run_at <= now)
            .collect();
        due.sort_by_key(|s| s.next_run_at);

        Ok(due
            .into_iter()
            .take(limit)
            .map(|slot| {
                slot.leased = true;
                Tick {
                    monitor_id: slot.entry.monitor_id,
                    revision: slot.revision,
                    attempt: slot.attempt,
                    payload: slot.entry.payload.clone(),
                    retry: slot.entry.retry,
                }
            })
            .collect())
    }

    async fn complete(&self, tick: &Tick) -> Result<bool, QueueError> {
        let mut slots = self.slots.lock().await;
        match slots.get_mut(&tick.monitor_id) {
            Some(slot) if slot.revision == tick.revision => {
                slot.attempt = 1;
                slot.leased = false;
                slot.next_run_at = (slot.next_run_at + slot.entry.period).max(Instant::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn retry(&self, tick: &Tick) -> Result<bool, QueueError> {
        let mut slots = self.slots.lock().await;
        match slots.get_mut(&tick.monitor_id) {
            Some(slot) if slot.revision == tick.revision && slot.attempt == tick.attempt => {
                slot.attempt += 1;
                slot.leased = false;
                slot.next_run_at = Instant::now() + slot.entry.retry.delay;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
