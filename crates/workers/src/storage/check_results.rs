use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_common::outcome::{ErrorType, ProbeOutcome};
use uuid::Uuid;

use super::PgStore;
use crate::store::{CheckResultStore, StoreError};

#[derive(sqlx::FromRow)]
struct CheckResultRow {
    monitor_id: Uuid,
    url: String,
    method: String,
    status: bool,
    status_code: Option<i32>,
    response_time_ms: i64,
    error_type: Option<String>,
    error_message: Option<String>,
    checked_at: DateTime<Utc>,
}

impl TryFrom<CheckResultRow> for ProbeOutcome {
    type Error = StoreError;

    fn try_from(row: CheckResultRow) -> Result<Self, Self::Error> {
        let error_type = row
            .error_type
            .map(|t| t.parse::<ErrorType>())
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Self {
            monitor_id: row.monitor_id,
            url: row.url,
            method: row.method,
            status: row.status,
            status_code: row.status_code.and_then(|c| u16::try_from(c).ok()),
            response_time_ms: row.response_time_ms.max(0) as u64,
            error_type,
            error_message: row.error_message,
            timestamp: row.checked_at,
        })
    }
}

#[async_trait]
impl CheckResultStore for PgStore {
    async fn append_result(&self, outcome: &ProbeOutcome) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"INSERT INTO check_results
               (monitor_id, url, method, status, status_code, response_time_ms,
                error_type, error_message, checked_at)
               SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
               WHERE EXISTS (SELECT 1 FROM monitors WHERE id = $1)
               ON CONFLICT (monitor_id, checked_at) DO NOTHING"#,
        )
        .bind(outcome.monitor_id)
        .bind(&outcome.url)
        .bind(&outcome.method)
        .bind(outcome.status)
        .bind(outcome.status_code.map(i32::from))
        .bind(outcome.response_time_ms as i64)
        .bind(outcome.error_type.map(|t| t.as_str()))
        .bind(outcome.error_message.as_deref())
        .bind(outcome.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_results(
        &self,
        monitor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ProbeOutcome>, i64), StoreError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM check_results WHERE monitor_id = $1")
                .bind(monitor_id)
                .fetch_one(&self.pool)
                .await?;
        let rows: Vec<CheckResultRow> = sqlx::query_as(
            r#"SELECT monitor_id, url, method, status, status_code, response_time_ms,
                      error_type, error_message, checked_at
               FROM check_results
               WHERE monitor_id = $1
               ORDER BY checked_at DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(monitor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let results = rows
            .into_iter()
            .map(ProbeOutcome::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((results, total))
    }
}
