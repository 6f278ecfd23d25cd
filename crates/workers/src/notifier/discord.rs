use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;

use super::channel::{Notifier, NotifyError};
use super::http::post_json;
use super::payload::AlertPayload;

/// Discord ignores unknown fields but needs `content` to render a message.
pub struct DiscordNotifier {
    webhook_url: String,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String, client: Client) -> Self {
        Self {
            webhook_url,
            client,
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let mut body = payload.to_value()?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("content".into(), payload.event.summary().into());
        }
        post_json(
            &self.client,
            &self.webhook_url,
            serde_json::to_vec(&body)?,
            HeaderMap::new(),
        )
        .await
    }
}
