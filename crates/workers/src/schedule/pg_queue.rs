use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::queue::{JobQueue, QueueError};
use super::{JobPayload, RetryPolicy, ScheduleEntry, Tick};

/// `monitor_schedules`-backed queue. Ticks are claimed with
/// `FOR UPDATE SKIP LOCKED` and leased for `lease`; a worker that dies
/// mid-tick releases it when the lease runs out.
pub struct PgJobQueue {
    pool: PgPool,
    lease: Duration,
}

#[derive(sqlx::FromRow)]
struct TickRow {
    monitor_id: Uuid,
    revision: i64,
    attempt: i32,
    payload: Json<JobPayload>,
    max_attempts: i32,
    retry_delay_ms: i64,
}

impl From<TickRow> for Tick {
    fn from(row: TickRow) -> Self {
        Self {
            monitor_id: row.monitor_id,
            revision: row.revision,
            attempt: row.attempt.max(1) as u32,
            payload: row.payload.0,
            retry: RetryPolicy {
                attempts: row.max_attempts.max(1) as u32,
                delay: Duration::from_millis(row.retry_delay_ms.max(0) as u64),
            },
        }
    }
}

impl PgJobQueue {
    pub fn new(pool: PgPool, lease: Duration) -> Self {
        Self { pool, lease }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), QueueError> {
        sqlx::query(
            r#"INSERT INTO monitor_schedules
               (monitor_id, period_ms, payload, max_attempts, retry_delay_ms, next_run_at)
               VALUES ($1, $2, $3, $4, $5, NOW())
               ON CONFLICT (monitor_id) DO UPDATE SET
                 period_ms = EXCLUDED.period_ms,
                 payload = EXCLUDED.payload,
                 max_attempts = EXCLUDED.max_attempts,
                 retry_delay_ms = EXCLUDED.retry_delay_ms,
                 revision = nextval('monitor_schedule_revisions'),
                 attempt = 1,
                 next_run_at = NOW(),
                 locked_until = NULL"#,
        )
        .bind(entry.monitor_id)
        .bind(entry.period.as_millis() as i64)
        .bind(Json(&entry.payload))
        .bind(entry.retry.attempts as i32)
        .bind(entry.retry.delay.as_millis() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, monitor_id: Uuid) -> Result<bool, QueueError> {
        let result = sqlx::query("DELETE FROM monitor_schedules WHERE monitor_id = $1")
            .bind(monitor_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_claimed(&self, tick: &Tick) -> Result<bool, QueueError> {
        let result =
            sqlx::query("DELETE FROM monitor_schedules WHERE monitor_id = $1 AND revision = $2")
                .bind(tick.monitor_id)
                .bind(tick.revision)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn claim_due(&self, limit: usize) -> Result<Vec<Tick>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rows: Vec<TickRow> = sqlx::query_as(
            r#"UPDATE monitor_schedules s
               SET locked_until = NOW() + $2 * INTERVAL '1 millisecond'
               FROM (
                   SELECT monitor_id FROM monitor_schedules
                   WHERE next_run_at <= NOW()
                     AND (locked_until IS NULL OR locked_until < NOW())
                   ORDER BY next_run_at
                   LIMIT $1
                   FOR UPDATE SKIP LOCKED
               ) due
               WHERE s.monitor_id = due.monitor_id
               RETURNING s.monitor_id, s.revision, s.attempt, s.payload,
                         s.max_attempts, s.retry_delay_ms"#,
        )
        .bind(limit as i64)
        .bind(self.lease.as_millis() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Tick::from).collect())
    }

    async fn complete(&self, tick: &Tick) -> Result<bool, QueueError> {
        let result = sqlx::query(
            r#"UPDATE monitor_schedules
               SET attempt = 1,
                   locked_until = NULL,
                   next_run_at = GREATEST(next_run_at + period_ms * INTERVAL '1 millisecond', NOW())
               WHERE monitor_id = $1 AND revision = $2"#,
        )
        .bind(tick.monitor_id)
        .bind(tick.revision)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn retry(&self, tick: &Tick) -> Result<bool, QueueError> {
        let result = sqlx::query(
            r#"UPDATE monitor_schedules
               SET attempt = attempt + 1,
                   locked_until = NULL,
                   next_run_at = NOW() + retry_delay_ms * INTERVAL '1 millisecond'
               WHERE monitor_id = $1 AND revision = $2 AND attempt = $3"#,
        )
        .bind(tick.monitor_id)
        .bind(tick.revision)
        .bind(tick.attempt as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
