use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::PgStore;
use crate::model::{Monitor, MonitorStatus, MonitorUpdate, NewMonitor};
use crate::store::{MonitorStore, StoreError};

const MONITOR_COLUMNS: &str = "id, owner_id, name, url, method, headers, body, \
     check_interval_secs, timeout_secs, is_active, status, last_checked_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct MonitorRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    url: String,
    method: String,
    headers: Json<HashMap<String, String>>,
    body: Json<HashMap<String, String>>,
    check_interval_secs: i32,
    timeout_secs: i32,
    is_active: bool,
    status: String,
    last_checked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MonitorRow> for Monitor {
    type Error = StoreError;

    fn try_from(row: MonitorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            url: row.url,
            method: row.method.parse()?,
            headers: row.headers.0,
            body: row.body.0,
            check_interval_secs: u32::try_from(row.check_interval_secs)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            timeout_secs: u32::try_from(row.timeout_secs)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            is_active: row.is_active,
            status: row.status.parse()?,
            last_checked_at: row.last_checked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl MonitorStore for PgStore {
    async fn insert_monitor(&self, new: &NewMonitor) -> Result<Monitor, StoreError> {
        let sql = format!(
            "INSERT INTO monitors
               (id, owner_id, name, url, method, headers, body, check_interval_secs, timeout_secs)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {MONITOR_COLUMNS}"
        );
        let row: MonitorRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(new.owner_id)
            .bind(&new.name)
            .bind(&new.url)
            .bind(new.method.as_str())
            .bind(Json(&new.headers))
            .bind(Json(&new.body))
            .bind(new.check_interval_secs as i32)
            .bind(new.timeout_secs as i32)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>, StoreError> {
        let sql = format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = $1");
        let row: Option<MonitorRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Monitor::try_from).transpose()
    }

    async fn list_monitors(&self, owner_id: Uuid) -> Result<Vec<Monitor>, StoreError> {
        let sql = format!(
            "SELECT {MONITOR_COLUMNS} FROM monitors WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<MonitorRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Monitor::try_from).collect()
    }

    async fn update_monitor(
        &self,
        id: Uuid,
        owner_id: Uuid,
        update: &MonitorUpdate,
    ) -> Result<Option<Monitor>, StoreError> {
        let sql = format!(
            "UPDATE monitors SET
               name = COALESCE($3, name),
               url = COALESCE($4, url),
               method = COALESCE($5, method),
               headers = COALESCE($6, headers),
               body = COALESCE($7, body),
               check_interval_secs = COALESCE($8, check_interval_secs),
               timeout_secs = COALESCE($9, timeout_secs),
               updated_at = NOW()
             WHERE id = $1 AND owner_id = $2
             RETURNING {MONITOR_COLUMNS}"
        );
        let row: Option<MonitorRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(update.name.as_deref())
            .bind(update.url.as_deref())
            .bind(update.method.map(|m| m.as_str()))
            .bind(update.headers.as_ref().map(Json))
            .bind(update.body.as_ref().map(Json))
            .bind(update.check_interval_secs.map(|v| v as i32))
            .bind(update.timeout_secs.map(|v| v as i32))
            .fetch_optional(&self.pool)
            .await?;
        row.map(Monitor::try_from).transpose()
    }

    async fn delete_monitor(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM monitors WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"UPDATE monitors
               SET is_active = $2,
                   status = CASE WHEN $2 AND status = 'PAUSED' THEN 'PENDING' ELSE status END,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status(&self, id: Uuid, status: MonitorStatus) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE monitors SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_check(
        &self,
        id: Uuid,
        status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE monitors
               SET status = CASE WHEN is_active THEN $2 ELSE status END,
                   last_checked_at = $3
               WHERE id = $1
                 AND (last_checked_at IS NULL OR last_checked_at <= $3)"#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
