use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Email,
    Webhook,
    Slack,
    Discord,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Webhook => "WEBHOOK",
            Self::Slack => "SLACK",
            Self::Discord => "DISCORD",
        }
    }

    /// Config key holding the delivery target for this channel type.
    pub fn target_key(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Webhook => "url",
            Self::Slack | Self::Discord => "webhook_url",
        }
    }
}

impl FromStr for ChannelType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMAIL" => Ok(Self::Email),
            "WEBHOOK" => Ok(Self::Webhook),
            "SLACK" => Ok(Self::Slack),
            "DISCORD" => Ok(Self::Discord),
            _ => Err(ModelError::UnknownVariant {
                kind: "channel type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertChannel {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub channel_type: ChannelType,
    pub name: String,
    pub config: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl AlertChannel {
    pub fn target(&self) -> Option<&str> {
        self.config
            .get(self.channel_type.target_key())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlertChannel {
    pub owner_id: Uuid,
    pub channel_type: ChannelType,
    pub name: String,
    pub config: HashMap<String, String>,
}

impl NewAlertChannel {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(ModelError::invalid("name", "must not be empty"));
        }
        let key = self.channel_type.target_key();
        let target = self
            .config
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ModelError::invalid("config", format!("missing {key}")))?;
        match self.channel_type {
            ChannelType::Email => {
                if !target.contains('@') {
                    return Err(ModelError::invalid("config", "email must contain @"));
                }
            }
            _ => {
                reqwest::Url::parse(target)
                    .map_err(|e| ModelError::invalid("config", format!("{key}: {e}")))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(channel_type: ChannelType, key: &str, value: &str) -> NewAlertChannel {
        NewAlertChannel {
            owner_id: Uuid::new_v4(),
            channel_type,
            name: "ops".into(),
            config: HashMap::from([(key.to_string(), value.to_string())]),
        }
    }

    #[test]
    fn webhook_requires_url_key() {
        assert!(channel(ChannelType::Webhook, "url", "https://hooks.example.com/x")
            .validate()
            .is_ok());
        assert!(channel(ChannelType::Webhook, "webhook_url", "https://hooks.example.com/x")
            .validate()
            .is_err());
    }

    #[test]
    fn slack_and_discord_use_webhook_url() {
        assert!(channel(ChannelType::Slack, "webhook_url", "https://hooks.slack.com/s")
            .validate()
            .is_ok());
        assert!(channel(ChannelType::Discord, "webhook_url", "not-a-url")
            .validate()
            .is_err());
    }

    #[test]
    fn email_requires_address() {
        assert!(channel(ChannelType::Email, "email", "ops@example.com")
            .validate()
            .is_ok());
        assert!(channel(ChannelType::Email, "email", "ops").validate().is_err());
    }

    #[test]
    fn target_reads_type_specific_key() {
        let ch = AlertChannel {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            channel_type: ChannelType::Slack,
            name: "s".into(),
            config: HashMap::from([("webhook_url".to_string(), "https://x".to_string())]),
            created_at: Utc::now(),
        };
        assert_eq!(ch.target(), Some("https://x"));
    }
}
