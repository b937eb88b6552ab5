pub mod smtp;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

pub use smtp::SmtpMailer;

/// A plain-text message ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Builds the message sent when an action ends in `result` on `hostname`.
pub fn compose(
    from: &str,
    to: &str,
    action: &str,
    result: &str,
    hostname: &str,
    location: &str,
    at: NaiveDateTime,
    cause: Option<&str>,
) -> Notification {
    let headline = format!("{} {} on {}", action, result, hostname);
    let mut body = format!(
        "{} at {}:\n\nLocation on S3: {}\n",
        headline,
        at.format("%Y-%m-%d %H:%M:%S"),
        location
    );
    if let Some(cause) = cause {
        body.push_str(&format!("\nCause: {}\n", cause));
    }
    Notification {
        from: from.to_string(),
        to: to.to_string(),
        subject: headline,
        body,
    }
}
