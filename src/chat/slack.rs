//! Slack Web API client.
//!
//! Only two methods are used: `chat.postMessage` to talk and `auth.test` to
//! learn the bot's own user id.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::notifier::{Notifier, NotifyError, Severity};
use crate::config::SlackConfig;

#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    token: String,
    api_url: Url,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            client: Client::new(),
            token: config.bot_token.clone(),
            api_url: config.api_url.clone(),
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url, NotifyError> {
        let base = self.api_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{method}"))?)
    }

    async fn call<T: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<ApiResponse, NotifyError> {
        let response: ApiResponse = self
            .client
            .post(self.endpoint(method)?)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.ok {
            Ok(response)
        } else {
            Err(NotifyError::Rejected(
                response.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }

    /// The user id Slack uses when someone @mentions the bot.
    pub async fn bot_user_id(&self) -> Result<String, NotifyError> {
        let response = self.call("auth.test", &serde_json::json!({})).await?;
        response
            .user_id
            .ok_or_else(|| NotifyError::Rejected("auth.test returned no user_id".to_string()))
    }
}

pub fn format_message(text: &str, severity: Severity) -> String {
    format!("{} {text}", severity.emoji())
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, channel: &str, text: &str, severity: Severity) -> Result<(), NotifyError> {
        let text = format_message(text, severity);
        self.call("chat.postMessage", &PostMessage { channel, text: &text })
            .await?;
        log::debug!("Posted {severity} message to {channel}");
        Ok(())
    }
}
