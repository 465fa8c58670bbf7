//! Chat message texts.

use crate::alert::state::AlertState;
use crate::config::MonitorConfig;

const BOT_NAME: &str = "911-DevOps";

pub fn crash_alert(config: &MonitorConfig) -> String {
    let mut text = format!(
        "*ALERT: System Down!*\n\nContainer `{}` has crashed. Services are offline.\n\n",
        config.container_name
    );
    if config.auto_restart_active() {
        text.push_str("Attempting an automatic restart...\n");
    }
    if config.commands_actionable() {
        text.push_str("Type `!fix` to restart the container or `!autofix` to run the remediation script.");
    } else {
        text.push_str(&format!(
            "Bot is in `{}` mode with chat commands disabled. Manual intervention required.",
            config.mode
        ));
    }
    text
}

pub fn recovery_notice(config: &MonitorConfig, state: &AlertState) -> String {
    format!(
        "*RECOVERED*: Container `{}` is running again after {} failed health check(s).",
        config.container_name, state.health_check_failures
    )
}

pub fn restart_initiated(requested_by: Option<&str>) -> String {
    match requested_by {
        Some(user) => format!("*{BOT_NAME}*: Emergency restart initiated by <@{user}>..."),
        None => format!("*{BOT_NAME}*: Automatic restart initiated..."),
    }
}

pub fn restart_succeeded() -> String {
    "*SUCCESS*: System restored. Services are back online.".to_string()
}

pub fn restart_failed(error: &str) -> String {
    format!("*ERROR*: Could not restart. Manual intervention required.\n```{error}```")
}

pub fn remediation_initiated(requested_by: Option<&str>) -> String {
    match requested_by {
        Some(user) => format!("*{BOT_NAME}*: Auto-fix requested by <@{user}>. Running remediation script..."),
        None => format!("*{BOT_NAME}*: Running remediation script..."),
    }
}

pub fn remediation_succeeded(output: &str) -> String {
    let mut text = "*AUTO-FIX COMPLETE*: The remediation script finished successfully.".to_string();
    if !output.is_empty() {
        text.push_str(&format!("\n```{output}```"));
    }
    text.push_str("\nThe next health check will confirm the container state. Use `!status` to check.");
    text
}

pub fn remediation_failed(error: &str) -> String {
    format!(
        "*AUTO-FIX PARTIALLY FAILED*: The remediation script did not complete.\n```{error}```\nTry `!fix` for a plain restart or investigate manually."
    )
}

pub fn status_report(config: &MonitorConfig, state: &AlertState) -> String {
    let health = if state.was_running { "UP" } else { "DOWN" };
    let last_alert = state
        .last_alert_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    let cooldown = if state.is_in_cooldown { "active" } else { "inactive" };

    format!(
        "*{BOT_NAME} Status*\n\
         Container: `{}` is *{health}*\n\
         Failed health checks: {}\n\
         Alerts sent: {}/{} (cooldown {cooldown}, {}s window)\n\
         Last alert: {last_alert}\n\
         Mode: `{}` | Auto-restart: {} | Fix commands: {}\n\
         Checking every {}ms",
        config.container_name,
        state.health_check_failures,
        state.consecutive_alerts,
        config.max_consecutive_alerts,
        config.alert_cooldown.as_secs(),
        config.mode,
        on_off(config.auto_restart_enabled),
        on_off(config.fix_command_enabled),
        config.monitoring_interval.as_millis(),
    )
}

pub fn help(config: &MonitorConfig) -> String {
    let mut text = format!(
        "Hi! I'm *{BOT_NAME}*, watching container `{}`.\n\nAvailable commands:\n\
         • `!status` or `!health` - show the container and alert state\n",
        config.container_name
    );
    if config.commands_actionable() {
        text.push_str("• `!fix` - restart the container\n");
        text.push_str("• `!autofix` or `!fix-ci` - run the remediation script\n");
    } else {
        text.push_str(&format!(
            "\nRestart and auto-fix are disabled (mode `{}`, fix commands {}).",
            config.mode,
            on_off(config.fix_command_enabled)
        ));
    }
    text
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn test_crash_alert_lists_commands_in_full_mode() {
        let text = crash_alert(&MonitorConfig::default());
        assert!(text.contains("`911-app`"));
        assert!(text.contains("!fix"));
        assert!(text.contains("!autofix"));
        assert!(text.contains("automatic restart"));
    }

    #[test]
    fn test_crash_alert_in_alert_only_mode() {
        let config = MonitorConfig {
            mode: Mode::AlertOnly,
            ..MonitorConfig::default()
        };
        let text = crash_alert(&config);
        assert!(!text.contains("!fix"));
        assert!(!text.contains("automatic restart"));
        assert!(text.contains("alert-only"));
    }

    #[test]
    fn test_help_depends_on_mode() {
        let full = help(&MonitorConfig::default());
        assert!(full.contains("!status"));
        assert!(full.contains("!fix"));

        let alert_only = help(&MonitorConfig {
            mode: Mode::AlertOnly,
            ..MonitorConfig::default()
        });
        assert!(alert_only.contains("!status"));
        assert!(!alert_only.contains("`!fix`"));
        assert!(alert_only.contains("disabled"));
    }

    #[test]
    fn test_status_report_shows_state() {
        let state = AlertState {
            was_running: false,
            health_check_failures: 4,
            consecutive_alerts: 1,
            ..AlertState::default()
        };
        let text = status_report(&MonitorConfig::default(), &state);
        assert!(text.contains("*DOWN*"));
        assert!(text.contains("Failed health checks: 4"));
        assert!(text.contains("Alerts sent: 1/3"));
        assert!(text.contains("Last alert: never"));
        assert!(text.contains("Checking every 2000ms"));
    }

    #[test]
    fn test_restart_initiated_mentions_user() {
        assert!(restart_initiated(Some("U123")).contains("<@U123>"));
        assert!(restart_initiated(None).contains("Automatic"));
    }
}
