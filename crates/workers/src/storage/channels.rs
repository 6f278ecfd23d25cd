use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::PgStore;
use crate::model::{AlertChannel, NewAlertChannel};
use crate::store::{AlertChannelStore, StoreError};

#[derive(sqlx::FromRow)]
struct ChannelRow {
    id: Uuid,
    owner_id: Uuid,
    channel_type: String,
    name: String,
    config: Json<HashMap<String, String>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChannelRow> for AlertChannel {
    type Error = StoreError;

    fn try_from(row: ChannelRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            channel_type: row.channel_type.parse()?,
            name: row.name,
            config: row.config.0,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AlertChannelStore for PgStore {
    async fn insert_channel(&self, new: &NewAlertChannel) -> Result<AlertChannel, StoreError> {
        let row: ChannelRow = sqlx::query_as(
            r#"INSERT INTO alert_channels (id, owner_id, channel_type, name, config)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, owner_id, channel_type, name, config, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(new.owner_id)
        .bind(new.channel_type.as_str())
        .bind(&new.name)
        .bind(Json(&new.config))
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_channel(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AlertChannel>, StoreError> {
        let row: Option<ChannelRow> = sqlx::query_as(
            r#"SELECT id, owner_id, channel_type, name, config, created_at
               FROM alert_channels WHERE id = $1 AND owner_id = $2"#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AlertChannel::try_from).transpose()
    }

    async fn list_channels(&self, owner_id: Uuid) -> Result<Vec<AlertChannel>, StoreError> {
        let rows: Vec<ChannelRow> = sqlx::query_as(
            r#"SELECT id, owner_id, channel_type, name, config, created_at
               FROM alert_channels WHERE owner_id = $1 ORDER BY created_at"#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AlertChannel::try_from).collect()
    }

    async fn delete_channel(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM alert_channels WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
