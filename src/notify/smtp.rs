// mysqltool/src/notify/smtp.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Mailer, Notification};
use crate::config::MailSettings;

/// Plaintext SMTP submission without TLS or authentication.
pub struct SmtpMailer {
    server: String,
    port: u16,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Self {
        SmtpMailer {
            server: settings.smtp_server.clone(),
            port: settings.smtp_port,
        }
    }
}

pub fn build_message(notification: &Notification) -> Result<Message> {
    let from: Mailbox = notification
        .from
        .parse()
        .with_context(|| format!("Invalid sender address: {}", notification.from))?;
    let to: Mailbox = notification
        .to
        .parse()
        .with_context(|| format!("Invalid recipient address: {}", notification.to))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(notification.body.clone())
        .context("Failed to build mail message")
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let message = build_message(notification)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.server.as_str())
            .port(self.port)
            .build();

        transport
            .send(message)
            .await
            .with_context(|| format!("Failed to send mail via {}:{}", self.server, self.port))?;
        tracing::debug!(server = %self.server, to = %notification.to, "notification sent");
        Ok(())
    }
}
