use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::channel::{Notifier, NotifyError};
use super::payload::AlertPayload;
use crate::config::SmtpSettings;

/// Shared SMTP transport; cloning keeps the same connection pool.
#[derive(Clone)]
pub struct Mailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let from = settings
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Config(e.to_string()))?
            .port(settings.port);
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

/// Sends alerts to one address. Without SMTP settings deliveries are logged
/// and skipped.
pub struct EmailNotifier {
    to: String,
    mailer: Option<Mailer>,
}

impl EmailNotifier {
    pub fn new(to: String, mailer: Option<Mailer>) -> Self {
        Self { to, mailer }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let Some(mailer) = &self.mailer else {
            tracing::info!(
                to = %self.to,
                event = payload.event.name(),
                "smtp not configured, email delivery skipped"
            );
            return Ok(());
        };

        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;
        let body = serde_json::to_string_pretty(payload)?;

        let email = Message::builder()
            .from(mailer.from.clone())
            .to(to)
            .subject(format!("[Pulse] {}", payload.event.summary()))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        mailer
            .transport
            .send(email)
            .await
            .map_err(|e| {
                if e.is_permanent() {
                    NotifyError::Permanent(e.to_string())
                } else {
                    NotifyError::Transient(e.to_string())
                }
            })?;
        Ok(())
    }
}
