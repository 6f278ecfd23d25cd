use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::Instrument;

use super::adapter::QueueAdapter;
use super::job_runner::JobRunner;
use crate::schedule::{JobQueue, QueueError};

const CLAIM_ERROR_PAUSE: Duration = Duration::from_secs(2);

/// Claims due ticks and runs them on a bounded pool. Only as many ticks are
/// claimed as there are free permits, so leases are never held while waiting.
pub struct TickLoop {
    queue: Arc<dyn JobQueue>,
    runner: Arc<JobRunner>,
    adapter: Arc<QueueAdapter>,
    permits: Arc<Semaphore>,
    concurrency: usize,
    claim_batch: usize,
    poll_interval: Duration,
}

impl TickLoop {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        runner: Arc<JobRunner>,
        adapter: Arc<QueueAdapter>,
        concurrency: usize,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            queue,
            runner,
            adapter,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            claim_batch: 20,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_claim_batch(mut self, claim_batch: usize) -> Self {
        self.claim_batch = claim_batch.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn run(&self) {
        loop {
            match self.poll_once().await {
                Ok(claimed) if claimed == self.claim_batch => {}
                Ok(_) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    tracing::error!(error = %e, "claiming due ticks failed");
                    tokio::time::sleep(CLAIM_ERROR_PAUSE).await;
                }
            }
        }
    }

    /// Claims what the free permits allow and spawns one task per tick.
    pub async fn poll_once(&self) -> Result<usize, QueueError> {
        let free = self.permits.available_permits().min(self.claim_batch);
        if free == 0 {
            return Ok(0);
        }
        let ticks = self.queue.claim_due(free).await?;
        let claimed = ticks.len();

        for tick in ticks {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };
            let runner = self.runner.clone();
            let adapter = self.adapter.clone();
            let span = tracing::info_span!(
                "tick",
                monitor_id = %tick.monitor_id,
                attempt = tick.attempt
            );
            tokio::spawn(
                async move {
                    let outcome = runner.run(&tick).await;
                    let label = outcome.label();
                    let settled = adapter.settle(&tick, outcome).await;
                    tracing::debug!(outcome = label, ?settled, "tick settled");
                    drop(permit);
                }
                .instrument(span),
            );
        }
        Ok(claimed)
    }

    /// Waits until every spawned tick has settled.
    pub async fn wait_idle(&self) {
        if let Ok(all) = self.permits.acquire_many(self.concurrency as u32).await {
            drop(all);
        }
    }
}
