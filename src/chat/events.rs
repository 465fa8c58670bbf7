use serde::Deserialize;

/// A message addressed to the bot, stripped of platform details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub text: String,
    pub sender_id: String,
    pub channel: String,
    /// The bot was @mentioned rather than overhearing a channel message.
    pub is_mention: bool,
}

/// Outer payload of a Slack Events API request.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl SlackEvent {
    /// Returns `None` for events the bot must not react to: edits, joins,
    /// messages from bots (its own replies included), and channel messages
    /// that mention the bot, which Slack also delivers as `app_mention`.
    pub fn into_chat_event(self, bot_user_id: Option<&str>) -> Option<ChatEvent> {
        if self.bot_id.is_some() || self.subtype.is_some() {
            return None;
        }
        let is_mention = match self.kind.as_str() {
            "app_mention" => true,
            "message" => false,
            _ => return None,
        };
        let text = self.text?;
        if !is_mention {
            if let Some(bot) = bot_user_id {
                if text.contains(&format!("<@{bot}>")) {
                    return None;
                }
            }
        }
        Some(ChatEvent {
            text,
            sender_id: self.user?,
            channel: self.channel?,
            is_mention,
        })
    }
}
