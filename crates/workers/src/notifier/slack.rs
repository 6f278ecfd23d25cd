use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;

use super::channel::{Notifier, NotifyError};
use super::http::post_json;
use super::payload::AlertPayload;

/// Posts the structured payload plus a `text` line for the Slack renderer.
pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: String, client: Client) -> Self {
        Self {
            webhook_url,
            client,
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let mut body = payload.to_value()?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("text".into(), payload.event.summary().into());
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
