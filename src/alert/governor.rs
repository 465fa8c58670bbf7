use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::alert::state::{AlertState, SharedAlertState};
use crate::chat::notifier::{Notifier, Severity};
use crate::commands::replies;
use crate::config::MonitorConfig;

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
}

/// What a probe cycle did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StillHealthy,
    Recovered,
    WentDown,
    StillDown,
}

/// Whether the governor let a message through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Sent,
    /// Inside the cooldown window opened by hitting the cap.
    SuppressedByCooldown,
    /// The cap was just reached, cooldown starts now.
    SuppressedByCap,
    /// The notifier returned an error, counters were left alone.
    SendFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub transition: Transition,
    pub emission: Option<Emission>,
    /// Failed probes in a row, this one included.
    pub health_check_failures: u32,
}

/// Owns the alerting state machine.
pub struct AlertGovernor {
    config: Arc<MonitorConfig>,
    state: SharedAlertState,
    notifier: Arc<dyn Notifier>,
}

impl AlertGovernor {
    pub fn new(
        config: Arc<MonitorConfig>,
        state: SharedAlertState,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            state,
            notifier,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SharedAlertState {
        &self.state
    }

    /// Feed one probe result into the state machine.
    ///
    /// The state lock is held for the whole cycle, including the chat send,
    /// so concurrent commands observe either the state before or after it.
    pub async fn observe(&self, health: Health, now: DateTime<Utc>) -> CycleOutcome {
        let mut state = self.state.lock().await;

        match (state.was_running, health) {
            (true, Health::Healthy) => {
                state.reset_after_healthy_probe();
                CycleOutcome {
                    transition: Transition::StillHealthy,
                    emission: None,
                    health_check_failures: 0,
                }
            }
            (false, Health::Healthy) => {
                log::info!("Container {} is running again", self.config.container_name);
                let text = replies::recovery_notice(&self.config, &state);
                let emission = self.emit(&mut state, &text, Severity::Info, now).await;
                state.reset_after_healthy_probe();
                CycleOutcome {
                    transition: Transition::Recovered,
                    emission: Some(emission),
                    health_check_failures: 0,
                }
            }
            (true, Health::Unhealthy) => {
                state.health_check_failures += 1;
                state.was_running = false;
                log::warn!("Container {} is down", self.config.container_name);
                let text = replies::crash_alert(&self.config);
                let emission = self.emit(&mut state, &text, Severity::Critical, now).await;
                if emission == Emission::SendFailed {
                    // Not announced yet, so the next unhealthy probe is another `WentDown`.
                    state.was_running = true;
                }
                CycleOutcome {
                    transition: Transition::WentDown,
                    emission: Some(emission),
                    health_check_failures: state.health_check_failures,
                }
            }
            (false, Health::Unhealthy) => {
                state.health_check_failures += 1;
                log::debug!(
                    "Container {} still down ({} failed checks)",
                    self.config.container_name,
                    state.health_check_failures
                );
                CycleOutcome {
                    transition: Transition::StillDown,
                    emission: None,
                    health_check_failures: state.health_check_failures,
                }
            }
        }
    }

    async fn emit(
        &self,
        state: &mut AlertState,
        text: &str,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> Emission {
        if let Some(emission) = self.gate(state, now) {
            log::info!("Suppressed {severity} alert: {emission:?}");
            return emission;
        }

        match self
            .notifier
            .send(&self.config.alert_channel, text, severity)
            .await
        {
            Ok(()) => {
                state.last_alert_time = Some(now);
                state.consecutive_alerts += 1;
                log::info!(
                    "Sent {severity} alert to {} ({}/{})",
                    self.config.alert_channel,
                    state.consecutive_alerts,
                    self.config.max_consecutive_alerts
                );
                Emission::Sent
            }
            Err(e) => {
                log::error!(
                    "Failed to send {severity} alert to {}: {e}",
                    self.config.alert_channel
                );
                Emission::SendFailed
            }
        }
    }

    /// Returns `Some` when the message must not be sent.
    fn gate(&self, state: &mut AlertState, now: DateTime<Utc>) -> Option<Emission> {
        if state.is_in_cooldown {
            if !self.cooldown_elapsed(state, now) {
                return Some(Emission::SuppressedByCooldown);
            }
            log::info!("Alert cooldown for {} is over", self.config.container_name);
            state.is_in_cooldown = false;
            state.consecutive_alerts = 0;
        }
        if state.consecutive_alerts >= self.config.max_consecutive_alerts {
            state.is_in_cooldown = true;
            return Some(Emission::SuppressedByCap);
        }
        None
    }

    fn cooldown_elapsed(&self, state: &AlertState, now: DateTime<Utc>) -> bool {
        match state.last_alert_time {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map(|elapsed| elapsed >= self.config.alert_cooldown)
                // Clock went backwards
                .unwrap_or(false),
        }
    }
}
