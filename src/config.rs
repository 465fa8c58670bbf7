use std::{
    fmt,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use url::Url;

pub const DEFAULT_CONTAINER_NAME: &str = "911-app";
pub const DEFAULT_ALERT_CHANNEL: &str = "general";
pub const DEFAULT_MONITORING_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_ALERT_COOLDOWN_MS: u64 = 60_000;
pub const DEFAULT_MAX_CONSECUTIVE_ALERTS: u32 = 3;
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_REMEDIATION_COMMAND: &str = "./scripts/fix-ci.sh";
pub const DEFAULT_EVENTS_PORT: u16 = 3001;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required variable {0}")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Unable to load env file: {0}")]
    EnvFile(#[from] dotenv::Error),
}

/// Defines how much the bot is allowed to do on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Alerts plus chat-triggered restart and remediation.
    #[default]
    Full,
    /// Alerts and status replies only. Mutating commands are never executed.
    AlertOnly,
}

impl Mode {
    pub fn allows_actions(self) -> bool {
        matches!(self, Mode::Full)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Mode::Full),
            "alert-only" | "alert_only" | "alertonly" | "alert only" => Ok(Mode::AlertOnly),
            other => Err(format!("unknown mode {other:?}, expected `full` or `alert-only`")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Full => f.write_str("full"),
            Mode::AlertOnly => f.write_str("alert-only"),
        }
    }
}

/// Immutable settings of the watchdog, read once at start up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub container_name: String,
    pub alert_channel: String,
    pub mode: Mode,
    pub auto_restart_enabled: bool,
    pub fix_command_enabled: bool,
    pub monitoring_interval: Duration,
    pub alert_cooldown: Duration,
    pub max_consecutive_alerts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            alert_channel: DEFAULT_ALERT_CHANNEL.to_string(),
            mode: Mode::default(),
            auto_restart_enabled: true,
            fix_command_enabled: true,
            monitoring_interval: Duration::from_millis(DEFAULT_MONITORING_INTERVAL_MS),
            alert_cooldown: Duration::from_millis(DEFAULT_ALERT_COOLDOWN_MS),
            max_consecutive_alerts: DEFAULT_MAX_CONSECUTIVE_ALERTS,
        }
    }
}

impl MonitorConfig {
    /// Whether chat commands may restart the container or run remediation.
    pub fn commands_actionable(&self) -> bool {
        self.mode.allows_actions() && self.fix_command_enabled
    }

    /// Whether a crash should trigger a restart without waiting for an operator.
    pub fn auto_restart_active(&self) -> bool {
        self.mode.allows_actions() && self.auto_restart_enabled
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let monitoring_interval_ms = parse_var(lookup, "MONITORING_INTERVAL_MS")?
            .unwrap_or(DEFAULT_MONITORING_INTERVAL_MS);
        if monitoring_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "MONITORING_INTERVAL_MS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_consecutive_alerts = parse_var(lookup, "MAX_CONSECUTIVE_ALERTS")?
            .unwrap_or(DEFAULT_MAX_CONSECUTIVE_ALERTS);
        if max_consecutive_alerts == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_CONSECUTIVE_ALERTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let alert_cooldown_ms =
            parse_var(lookup, "ALERT_COOLDOWN_MS")?.unwrap_or(DEFAULT_ALERT_COOLDOWN_MS);

        Ok(Self {
            container_name: non_empty(lookup, "CONTAINER_NAME").unwrap_or(defaults.container_name),
            alert_channel: non_empty(lookup, "SLACK_ALERT_CHANNEL")
                .unwrap_or(defaults.alert_channel),
            mode: parse_var(lookup, "BOT_MODE")?.unwrap_or(defaults.mode),
            auto_restart_enabled: parse_flag(lookup, "AUTO_RESTART_ENABLED")?
                .unwrap_or(defaults.auto_restart_enabled),
            fix_command_enabled: parse_flag(lookup, "FIX_COMMAND_ENABLED")?
                .unwrap_or(defaults.fix_command_enabled),
            monitoring_interval: Duration::from_millis(monitoring_interval_ms),
            alert_cooldown: Duration::from_millis(alert_cooldown_ms),
            max_consecutive_alerts,
        })
    }
}

/// Credentials and endpoints for the Slack workspace.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub signing_secret: Option<String>,
    pub api_url: Url,
}

impl SlackConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token =
            non_empty(lookup, "SLACK_BOT_TOKEN").ok_or(ConfigError::Missing("SLACK_BOT_TOKEN"))?;
        let raw_url =
            non_empty(lookup, "SLACK_API_URL").unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string());
        let api_url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
            key: "SLACK_API_URL",
            value: raw_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            bot_token,
            signing_secret: non_empty(lookup, "SLACK_SIGNING_SECRET"),
            api_url,
        })
    }
}

/// Everything the bot needs to start.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub monitor: MonitorConfig,
    pub slack: SlackConfig,
    pub remediation_command: String,
    pub events_listen_addr: SocketAddr,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            monitor: MonitorConfig::from_lookup(lookup)?,
            slack: SlackConfig::from_lookup(lookup)?,
            remediation_command: non_empty(lookup, "REMEDIATION_COMMAND")
                .unwrap_or_else(|| DEFAULT_REMEDIATION_COMMAND.to_string()),
            events_listen_addr: parse_var(lookup, "EVENTS_LISTEN_ADDR")?
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_EVENTS_PORT))),
        })
    }
}

/// Loads the given env file, or `.env` in the working directory when none is
/// given. A missing default `.env` is not an error. Returns the loaded path.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match path {
        Some(path) => {
            dotenv::from_path(path)?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenv::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(e.into()),
        },
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    non_empty(lookup, key)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    non_empty(lookup, key)
        .map(|value| match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        })
        .transpose()
}
