use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_common::outcome::ProbeOutcome;
use tokio::sync::Mutex;

use super::publisher::OutcomePublisher;
use super::source::{EntrySource, Settle, StreamEntry};
use super::StreamError;

#[derive(Default)]
struct Log {
    next_seq: u64,
    entries: BTreeMap<u64, Vec<u8>>,
    ready: VecDeque<u64>,
    in_flight: HashSet<u64>,
    acked: HashSet<u64>,
    naks: usize,
}

/// Single-process result stream with one consumer group. Nak'd entries go
/// back to the front of the queue.
#[derive(Clone, Default)]
pub struct InMemoryStream {
    log: Arc<Mutex<Log>>,
}

impl InMemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes, as a foreign producer would.
    pub async fn append_raw(&self, payload: Vec<u8>) -> u64 {
        let mut log = self.log.lock().await;
        log.next_seq += 1;
        let seq = log.next_seq;
        log.entries.insert(seq, payload);
        log.ready.push_back(seq);
        seq
    }

    /// Delivers an already acked entry again.
    pub async fn redeliver(&self, seq: u64) -> bool {
        let mut log = self.log.lock().await;
        if log.acked.remove(&seq) {
            log.ready.push_back(seq);
            true
        } else {
            false
        }
    }

    pub async fn len(&self) -> usize {
        self.log.lock().await.entries.len()
    }

    pub async fn pending(&self) -> usize {
        let log = self.log.lock().await;
        log.ready.len() + log.in_flight.len()
    }

    pub async fn acked(&self) -> usize {
        self.log.lock().await.acked.len()
    }

    pub async fn naks(&self) -> usize {
        self.log.lock().await.naks
    }

    pub async fn outcomes(&self) -> Vec<ProbeOutcome> {
        self.log
            .lock()
            .await
            .entries
            .values()
            .filter_map(|bytes| ProbeOutcome::from_json(bytes).ok())
            .collect()
    }
}

#[async_trait]
impl OutcomePublisher for InMemoryStream {
    async fn append(&self, outcome: &ProbeOutcome) -> Result<u64, StreamError> {
        Ok(self.append_raw(outcome.to_json()?).await)
    }
}

struct MemoryDelivery {
    seq: u64,
    log: Arc<Mutex<Log>>,
}

#[async_trait]
impl Settle for MemoryDelivery {
    async fn ack(self: Box<Self>) -> Result<(), StreamError> {
        let mut log = self.log.lock().await;
        log.in_flight.remove(&self.seq);
        log.acked.insert(self.seq);
        Ok(())
    }

    async fn nak(self: Box<Self>, _delay: Duration) -> Result<(), StreamError> {
        let mut log = self.log.lock().await;
        if log.in_flight.remove(&self.seq) {
            log.ready.push_front(self.seq);
            log.naks += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl EntrySource for InMemoryStream {
    async fn fetch(&self, max_entries: usize) -> Result<Vec<StreamEntry>, StreamError> {
        let mut log = self.log.lock().await;
        let mut entries = Vec::new();
        while entries.len() < max_entries {
            let Some(seq) = log.ready.pop_front() else {
                break;
            };
            let payload = log.entries.get(&seq).cloned().unwrap_or_default();
            log.in_flight.insert(seq);
            entries.push(StreamEntry {
                entry_id: seq,
                payload,
                settle: Box::new(MemoryDelivery {
                    seq,
                    log: self.log.clone(),
                }),
            });
        }
        Ok(entries)
    }
}
