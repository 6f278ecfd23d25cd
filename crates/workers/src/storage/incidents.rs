use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::model::{Incident, IncidentFilter, NewIncident};
use crate::store::{IncidentStore, StoreError};

const INCIDENT_COLUMNS: &str = "id, monitor_id, status, severity, failure_count, error_message, \
     started_at, acknowledged_at, resolved_at, last_failure_at";

#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: i64,
    monitor_id: Uuid,
    status: String,
    severity: String,
    failure_count: i32,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    acknowledged_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
}

impl TryFrom<IncidentRow> for Incident {
    type Error = StoreError;

    fn try_from(row: IncidentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            monitor_id: row.monitor_id,
            status: row.status.parse()?,
            severity: row.severity.parse()?,
            failure_count: row.failure_count,
            error_message: row.error_message,
            started_at: row.started_at,
            acknowledged_at: row.acknowledged_at,
            resolved_at: row.resolved_at,
            last_failure_at: row.last_failure_at,
        })
    }
}

impl PgStore {
    async fn update_incident(
        &self,
        sql: &str,
        monitor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError> {
        let row: Option<IncidentRow> = sqlx::query_as(sql)
            .bind(monitor_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Incident::try_from).transpose()
    }
}

#[async_trait]
impl IncidentStore for PgStore {
    async fn latest_active(&self, monitor_id: Uuid) -> Result<Option<Incident>, StoreError> {
        let sql = format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents
             WHERE monitor_id = $1 AND status <> 'RESOLVED'
             ORDER BY started_at DESC
             LIMIT 1"
        );
        let row: Option<IncidentRow> = sqlx::query_as(&sql)
            .bind(monitor_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Incident::try_from).transpose()
    }

    async fn increment_open(
        &self,
        monitor_id: Uuid,
        failed_at: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError> {
        let sql = format!(
            "UPDATE incidents
             SET failure_count = failure_count + 1, last_failure_at = $2
             WHERE monitor_id = $1 AND status = 'OPEN'
               AND (last_failure_at IS NULL OR last_failure_at < $2)
             RETURNING {INCIDENT_COLUMNS}"
        );
        self.update_incident(&sql, monitor_id, failed_at).await
    }

    async fn insert_open(&self, new: &NewIncident) -> Result<Option<Incident>, StoreError> {
        let sql = format!(
            "INSERT INTO incidents
               (monitor_id, status, severity, failure_count, error_message, started_at, last_failure_at)
             SELECT $1, 'OPEN', $2, 1, $3, $4, $4
             WHERE EXISTS (SELECT 1 FROM monitors WHERE id = $1)
               AND NOT EXISTS (
                   SELECT 1 FROM incidents
                   WHERE monitor_id = $1
                     AND (last_failure_at >= $4 OR resolved_at >= $4)
               )
             ON CONFLICT (monitor_id) WHERE status <> 'RESOLVED' DO NOTHING
             RETURNING {INCIDENT_COLUMNS}"
        );
        let row: Option<IncidentRow> = sqlx::query_as(&sql)
            .bind(new.monitor_id)
            .bind(new.severity.as_str())
            .bind(new.error_message.as_deref())
            .bind(new.failed_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Incident::try_from).transpose()
    }

    async fn acknowledge_open(
        &self,
        monitor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError> {
        let sql = format!(
            "UPDATE incidents
             SET status = 'ACKNOWLEDGED', acknowledged_at = $2
             WHERE monitor_id = $1 AND status = 'OPEN'
             RETURNING {INCIDENT_COLUMNS}"
        );
        self.update_incident(&sql, monitor_id, at).await
    }

    async fn resolve_active(
        &self,
        monitor_id: Uuid,
        at: DateTime<Utc>,
        observed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Incident>, StoreError> {
        let sql = format!(
            "UPDATE incidents
             SET status = 'RESOLVED', resolved_at = $2
             WHERE monitor_id = $1 AND status <> 'RESOLVED'
               AND ($3::timestamptz IS NULL
                    OR last_failure_at IS NULL
                    OR last_failure_at < $3)
             RETURNING {INCIDENT_COLUMNS}"
        );
        let row: Option<IncidentRow> = sqlx::query_as(&sql)
            .bind(monitor_id)
            .bind(at)
            .bind(observed_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Incident::try_from).transpose()
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError> {
        let sql = "SELECT i.id, i.monitor_id, i.status, i.severity, i.failure_count, \
                   i.error_message, i.started_at, i.acknowledged_at, i.resolved_at, i.last_failure_at
             FROM incidents i
             JOIN monitors m ON m.id = i.monitor_id
             WHERE ($1::uuid IS NULL OR i.monitor_id = $1)
               AND ($2::uuid IS NULL OR m.owner_id = $2)
               AND ($3::text IS NULL OR i.status = $3)
               AND ($4::text IS NULL OR i.severity = $4)
             ORDER BY i.started_at DESC, i.id DESC
             LIMIT $5 OFFSET $6";
        let rows: Vec<IncidentRow> = sqlx::query_as(sql)
            .bind(filter.monitor_id)
            .bind(filter.owner_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.severity.map(|s| s.as_str()))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Incident::try_from).collect()
    }
}
