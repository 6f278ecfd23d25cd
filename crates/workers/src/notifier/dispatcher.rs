use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;

use super::channel::{Notifier, NotifyError};
use super::discord::DiscordNotifier;
use super::http;
use super::payload::{AlertEvent, AlertPayload, test_event};
use super::retry::{DeliveryPolicy, RetryNotifier};
use super::slack::SlackNotifier;
use super::smtp::{EmailNotifier, Mailer};
use super::webhook::WebhookNotifier;
use crate::incident::EventSink;
use crate::metrics::WorkerMetrics;
use crate::model::{AlertChannel, ChannelType};
use crate::store::AlertChannelStore;

pub trait NotifierFactory: Send + Sync {
    fn build(
        &self,
        channel: &AlertChannel,
        policy: DeliveryPolicy,
    ) -> Result<Box<dyn Notifier>, NotifyError>;
}

pub struct DefaultNotifierFactory {
    client: Client,
    mailer: Option<Mailer>,
}

impl DefaultNotifierFactory {
    pub fn new(timeout: Duration, mailer: Option<Mailer>) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http::client(timeout)?,
            mailer,
        })
    }
}

impl NotifierFactory for DefaultNotifierFactory {
    fn build(
        &self,
        channel: &AlertChannel,
        policy: DeliveryPolicy,
    ) -> Result<Box<dyn Notifier>, NotifyError> {
        let target = channel
            .target()
            .ok_or_else(|| {
                NotifyError::Config(format!(
                    "{} channel {} has no {}",
                    channel.channel_type.as_str(),
                    channel.id,
                    channel.channel_type.target_key()
                ))
            })?
            .to_string();

        let notifier: Box<dyn Notifier> = match channel.channel_type {
            ChannelType::Webhook => {
                let secret = channel
                    .config
                    .get("secret")
                    .filter(|s| !s.is_empty())
                    .map(|s| s.as_bytes().to_vec());
                Box::new(RetryNotifier::new(
                    WebhookNotifier::new(target, secret, self.client.clone()),
                    policy,
                ))
            }
            ChannelType::Slack => Box::new(RetryNotifier::new(
                SlackNotifier::new(target, self.client.clone()),
                policy,
            )),
            ChannelType::Discord => Box::new(RetryNotifier::new(
                DiscordNotifier::new(target, self.client.clone()),
                policy,
            )),
            ChannelType::Email => Box::new(RetryNotifier::new(
                EmailNotifier::new(target, self.mailer.clone()),
                policy,
            )),
        };
        Ok(notifier)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans events out to every channel of the monitor's owner. Delivery
/// failures are logged and counted, never returned.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channels: Arc<dyn AlertChannelStore>,
    factory: Arc<dyn NotifierFactory>,
    policy: DeliveryPolicy,
    metrics: Arc<WorkerMetrics>,
}

impl NotificationDispatcher {
    pub fn new(
        channels: Arc<dyn AlertChannelStore>,
        factory: Arc<dyn NotifierFactory>,
        policy: DeliveryPolicy,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            channels,
            factory,
            policy,
            metrics,
        }
    }

    pub async fn dispatch(&self, event: AlertEvent) -> DispatchReport {
        let owner_id = event.monitor().owner_id;
        let channels = match self.channels.list_channels(owner_id).await {
            Ok(channels) => channels,
            Err(e) => {
                tracing::error!(%owner_id, event = event.name(), error = %e, "loading alert channels failed");
                return DispatchReport::default();
            }
        };
        if channels.is_empty() {
            tracing::debug!(%owner_id, event = event.name(), "no alert channels configured");
            return DispatchReport::default();
        }

        let payload = AlertPayload::new(event);
        let deliveries = channels
            .iter()
            .map(|channel| self.deliver(channel, &payload, self.policy));
        let results = join_all(deliveries).await;

        let mut report = DispatchReport::default();
        for ok in results {
            if ok {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        tracing::info!(
            event = payload.event.name(),
            monitor_id = %payload.event.monitor().id,
            delivered = report.delivered,
            failed = report.failed,
            "notifications dispatched"
        );
        report
    }

    /// Sends the fixed test event to one channel, once.
    pub async fn test_channel(&self, channel: &AlertChannel) -> Result<(), NotifyError> {
        let target = channel.target().unwrap_or_default();
        let payload = AlertPayload::new(test_event(target));
        let notifier = self
            .factory
            .build(channel, self.policy.single_attempt())?;
        notifier.send(&payload).await
    }

    async fn deliver(
        &self,
        channel: &AlertChannel,
        payload: &AlertPayload,
        policy: DeliveryPolicy,
    ) -> bool {
        let result = match self.factory.build(channel, policy) {
            Ok(notifier) => notifier.send(payload).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.metrics.inc_notifications_sent();
                true
            }
            Err(e) => {
                self.metrics.inc_notifications_failed();
                tracing::warn!(
                    channel_id = %channel.id,
                    channel_type = channel.channel_type.as_str(),
                    event = payload.event.name(),
                    error = %e,
                    "notification delivery failed"
                );
                false
            }
        }
    }
}

impl EventSink for NotificationDispatcher {
    fn publish(&self, event: AlertEvent) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(event).await;
        });
    }
}
