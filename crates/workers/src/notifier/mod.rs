mod channel;
mod discord;
mod dispatcher;
mod http;
pub mod payload;
mod retry;
mod slack;
mod smtp;
mod webhook;

pub use channel::{Notifier, NotifyError};
pub use discord::DiscordNotifier;
pub use dispatcher::{DefaultNotifierFactory, DispatchReport, NotificationDispatcher, NotifierFactory};
pub use payload::{AlertEvent, AlertPayload, HealthCheckSnapshot, IncidentSnapshot, MonitorSnapshot};
pub use retry::{DeliveryPolicy, RetryNotifier};
pub use slack::SlackNotifier;
pub use smtp::{EmailNotifier, Mailer};
pub use webhook::{SIGNATURE_HEADER, WebhookNotifier};
