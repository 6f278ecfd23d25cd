use std::sync::Arc;

use uuid::Uuid;

use super::ServiceError;
use crate::model::{AlertChannel, NewAlertChannel};
use crate::notifier::NotificationDispatcher;
use crate::store::AlertChannelStore;

#[derive(Clone)]
pub struct AlertChannelService {
    channels: Arc<dyn AlertChannelStore>,
    dispatcher: NotificationDispatcher,
}

impl AlertChannelService {
    pub fn new(channels: Arc<dyn AlertChannelStore>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            channels,
            dispatcher,
        }
    }

    pub async fn create(&self, new: NewAlertChannel) -> Result<AlertChannel, ServiceError> {
        new.validate()?;
        let channel = self.channels.insert_channel(&new).await?;
        tracing::info!(
            channel_id = %channel.id,
            channel_type = channel.channel_type.as_str(),
            "alert channel created"
        );
        Ok(channel)
    }

    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<AlertChannel>, ServiceError> {
        Ok(self.channels.list_channels(owner_id).await?)
    }

    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), ServiceError> {
        if !self.channels.delete_channel(id, owner_id).await? {
            return Err(ServiceError::NotFound {
                kind: "alert channel",
                id,
            });
        }
        Ok(())
    }

    /// Sends the test payload once and reports the delivery result.
    pub async fn test(&self, id: Uuid, owner_id: Uuid) -> Result<(), ServiceError> {
        let channel = self
            .channels
            .get_channel(id, owner_id)
            .await?
            .ok_or(ServiceError::NotFound {
                kind: "alert channel",
                id,
            })?;
        self.dispatcher.test_channel(&channel).await?;
        tracing::info!(channel_id = %id, "test notification delivered");
        Ok(())
    }
}
