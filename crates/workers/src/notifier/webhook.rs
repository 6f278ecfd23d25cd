use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

use async_trait::async_trait;
use pulse_common::crypto::sign_data;

use super::channel::{Notifier, NotifyError};
use super::http::post_json;
use super::payload::AlertPayload;

pub const SIGNATURE_HEADER: &str = "X-Pulse-Signature";

pub struct WebhookNotifier {
    url: String,
    secret: Option<Vec<u8>>,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: String, secret: Option<Vec<u8>>, client: Client) -> Self {
        Self {
            url,
            secret,
            client,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(payload)?;

        let mut headers = HeaderMap::new();
        if let Some(secret) = &self.secret {
            let signature =
                sign_data(secret, &body).map_err(|e| NotifyError::Config(e.to_string()))?;
            let value = HeaderValue::from_str(&signature)
                .map_err(|e| NotifyError::Config(e.to_string()))?;
            headers.insert(SIGNATURE_HEADER, value);
        }

        post_json(&self.client, &self.url, body, headers).await
    }
}
