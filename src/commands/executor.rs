use std::sync::Arc;

use crate::alert::state::SharedAlertState;
use crate::chat::notifier::{Notifier, Severity, reply};
use crate::commands::replies;
use crate::config::MonitorConfig;
use crate::service::remediation::{Remediation, RemediationError, RemediationOutcome};
use crate::service::runtime::{ContainerRuntime, RuntimeError};

/// Performs the mutating actions: container restart and remediation.
pub struct ActionExecutor {
    config: Arc<MonitorConfig>,
    state: SharedAlertState,
    runtime: Arc<dyn ContainerRuntime>,
    remediation: Arc<dyn Remediation>,
    notifier: Arc<dyn Notifier>,
}

impl ActionExecutor {
    pub fn new(
        config: Arc<MonitorConfig>,
        state: SharedAlertState,
        runtime: Arc<dyn ContainerRuntime>,
        remediation: Arc<dyn Remediation>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            state,
            runtime,
            remediation,
            notifier,
        }
    }

    /// Restart the watched container on an operator's request and report
    /// progress to `channel`.
    ///
    /// On success the alert state is reset so the next crash is announced
    /// again, even if the alert cap had been reached.
    pub async fn restart_container(
        &self,
        channel: &str,
        requested_by: Option<&str>,
    ) -> Result<(), RuntimeError> {
        self.restart(channel, requested_by).await?;
        self.state.lock().await.reset_after_restart();
        Ok(())
    }

    /// Restart after a crash without an operator asking for it.
    ///
    /// The alert state is left to the next probe, which reports the recovery.
    pub async fn auto_restart(&self, channel: &str) -> Result<(), RuntimeError> {
        self.restart(channel, None).await
    }

    async fn restart(&self, channel: &str, requested_by: Option<&str>) -> Result<(), RuntimeError> {
        let name = &self.config.container_name;
        log::info!(
            "Restart of {name} requested by {}",
            requested_by.unwrap_or("auto-restart")
        );
        reply(
            self.notifier.as_ref(),
            channel,
            &replies::restart_initiated(requested_by),
            Severity::Warning,
        )
        .await;

        match self.runtime.restart(name).await {
            Ok(()) => {
                reply(
                    self.notifier.as_ref(),
                    channel,
                    &replies::restart_succeeded(),
                    Severity::Info,
                )
                .await;
                Ok(())
            }
            Err(e) => {
                log::error!("Restart of {name} failed: {e}");
                reply(
                    self.notifier.as_ref(),
                    channel,
                    &replies::restart_failed(&e.to_string()),
                    Severity::Critical,
                )
                .await;
                Err(e)
            }
        }
    }

    /// Run the remediation script. Container health is left to the next probe.
    pub async fn run_remediation(
        &self,
        channel: &str,
        requested_by: Option<&str>,
    ) -> Result<RemediationOutcome, RemediationError> {
        reply(
            self.notifier.as_ref(),
            channel,
            &replies::remediation_initiated(requested_by),
            Severity::Warning,
        )
        .await;

        match self.remediation.run().await {
            Ok(outcome) => {
                reply(
                    self.notifier.as_ref(),
                    channel,
                    &replies::remediation_succeeded(&outcome.output),
                    Severity::Info,
                )
                .await;
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Remediation failed: {e}");
                reply(
                    self.notifier.as_ref(),
                    channel,
                    &replies::remediation_failed(&e.to_string()),
                    Severity::Critical,
                )
                .await;
                Err(e)
            }
        }
    }
}
