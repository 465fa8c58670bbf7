use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::alert::governor::{AlertGovernor, CycleOutcome, Health, Transition};
use crate::commands::executor::ActionExecutor;
use crate::config::MonitorConfig;
use crate::service::runtime::{ContainerRuntime, ContainerStatus};

/// Periodically inspects the watched container and feeds the governor.
pub struct HealthProbe {
    config: Arc<MonitorConfig>,
    runtime: Arc<dyn ContainerRuntime>,
    governor: Arc<AlertGovernor>,
    executor: Arc<ActionExecutor>,
}

impl HealthProbe {
    pub fn new(
        config: Arc<MonitorConfig>,
        runtime: Arc<dyn ContainerRuntime>,
        governor: Arc<AlertGovernor>,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        Self {
            config,
            runtime,
            governor,
            executor,
        }
    }

    /// Query the runtime once. Every error counts as unhealthy.
    pub async fn check(&self) -> Health {
        let name = &self.config.container_name;
        match self.runtime.inspect(name).await {
            Ok(ContainerStatus::Running) => Health::Healthy,
            Ok(ContainerStatus::Exited(code)) => {
                log::debug!("Container {name} exited with code {code}");
                Health::Unhealthy
            }
            Ok(ContainerStatus::NotFound) => {
                log::debug!("Container {name} not found");
                Health::Unhealthy
            }
            Err(e) => {
                log::warn!("Failed to inspect container {name}: {e}");
                Health::Unhealthy
            }
        }
    }

    /// One probe cycle, including the automatic restart when enabled.
    pub async fn cycle(&self) -> CycleOutcome {
        let health = self.check().await;
        let outcome = self.governor.observe(health, chrono::Utc::now()).await;

        // One attempt per outage. A retried alert is another `WentDown` of the same outage.
        if outcome.transition == Transition::WentDown
            && outcome.health_check_failures == 1
            && self.config.auto_restart_active()
        {
            // The result was already reported to the alert channel.
            let _ = self.executor.auto_restart(&self.config.alert_channel).await;
        }
        outcome
    }

    /// Run cycles on the configured interval until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Watching container {} every {:?}",
            self.config.container_name,
            self.config.monitoring_interval
        );
        let mut interval = tokio::time::interval(self.config.monitoring_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cycle_start = std::time::Instant::now();
                    self.cycle().await;
                    log::debug!("Probe cycle took {:?}", cycle_start.elapsed());
                }
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                    log::warn!("Health probe stopped");
                    break;
                }
            }
        }
    }
}
