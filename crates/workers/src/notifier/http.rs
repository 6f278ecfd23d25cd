use std::time::Duration;

use reqwest::Client;
use reqwest::header::HeaderMap;

use super::channel::NotifyError;

pub const USER_AGENT: &str = "pulse-webhook/1.0";

pub fn client(timeout: Duration) -> Result<Client, NotifyError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| NotifyError::Config(e.to_string()))
}

/// POSTs a JSON body. 2xx is delivered, 4xx is permanent, anything else
/// (5xx, transport errors) is worth retrying.
pub async fn post_json(
    client: &Client,
    url: &str,
    body: Vec<u8>,
    headers: HeaderMap,
) -> Result<(), NotifyError> {
    let resp = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_builder() {
                NotifyError::Config(e.to_string())
            } else {
                NotifyError::Transient(e.to_string())
            }
        })?;

    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else if status.is_client_error() {
        Err(NotifyError::Permanent(format!("{url} answered {status}")))
    } else {
        Err(NotifyError::Transient(format!("{url} answered {status}")))
    }
}
