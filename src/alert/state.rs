use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

/// In-memory record of what the watchdog has observed and announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertState {
    /// Outcome of the most recent probe cycle.
    pub was_running: bool,
    pub last_alert_time: Option<DateTime<Utc>>,
    /// Alerts emitted since the last recovery or successful restart.
    pub consecutive_alerts: u32,
    pub is_in_cooldown: bool,
    /// Failed probes in a row. Any healthy probe resets it.
    pub health_check_failures: u32,
}

impl Default for AlertState {
    // Start optimistic so the first probe does not announce a recovery.
    fn default() -> Self {
        Self {
            was_running: true,
            last_alert_time: None,
            consecutive_alerts: 0,
            is_in_cooldown: false,
            health_check_failures: 0,
        }
    }
}

impl AlertState {
    pub(crate) fn reset_after_healthy_probe(&mut self) {
        self.was_running = true;
        self.health_check_failures = 0;
        self.consecutive_alerts = 0;
        self.is_in_cooldown = false;
    }

    pub(crate) fn reset_after_restart(&mut self) {
        self.was_running = true;
        self.consecutive_alerts = 0;
        self.is_in_cooldown = false;
    }
}

/// Handle to the single [`AlertState`] of the process.
///
/// Cloning the handle shares the state, it never copies it. Every writer goes
/// through the same mutex so a probe cycle and a chat command can not
/// interleave their updates.
#[derive(Debug, Clone, Default)]
pub struct SharedAlertState {
    inner: Arc<Mutex<AlertState>>,
}

impl SharedAlertState {
    pub fn new(state: AlertState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, AlertState> {
        self.inner.lock().await
    }

    pub async fn snapshot(&self) -> AlertState {
        self.inner.lock().await.clone()
    }
}
