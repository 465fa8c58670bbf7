use std::fmt;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn emoji(self) -> &'static str {
        match self {
            Severity::Info => ":white_check_mark:",
            Severity::Warning => ":warning:",
            Severity::Critical => ":rotating_light:",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Slack rejected the message: {0}")]
    Rejected(String),
    #[error("Invalid API url: {0}")]
    Url(#[from] url::ParseError),
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: &str, text: &str, severity: Severity) -> Result<(), NotifyError>;
}

/// Sends a reply and logs instead of failing when the chat platform refuses it.
pub async fn reply(notifier: &dyn Notifier, channel: &str, text: &str, severity: Severity) {
    if let Err(e) = notifier.send(channel, text, severity).await {
        log::error!("Failed to send {severity} message to {channel}: {e}");
    }
}
