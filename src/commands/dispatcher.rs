use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::task::JoinSet;

use crate::alert::state::SharedAlertState;
use crate::chat::events::ChatEvent;
use crate::chat::notifier::{Notifier, Severity, reply};
use crate::commands::executor::ActionExecutor;
use crate::commands::intent::{Intent, classify};
use crate::commands::replies;
use crate::config::MonitorConfig;

/// Turns inbound chat messages into replies and actions.
pub struct CommandDispatcher {
    config: Arc<MonitorConfig>,
    state: SharedAlertState,
    executor: Arc<ActionExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl CommandDispatcher {
    pub fn new(
        config: Arc<MonitorConfig>,
        state: SharedAlertState,
        executor: Arc<ActionExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            state,
            executor,
            notifier,
        }
    }

    /// Handle one chat event. Returns the recognised intent, if any.
    pub async fn handle(&self, event: &ChatEvent) -> Option<Intent> {
        let intent = classify(&event.text, event.is_mention)?;
        log::info!(
            "Message from {} in {} classified as {intent:?}",
            event.sender_id,
            event.channel
        );

        match intent {
            Intent::Status => {
                let state = self.state.snapshot().await;
                let text = replies::status_report(&self.config, &state);
                reply(self.notifier.as_ref(), &event.channel, &text, Severity::Info).await;
            }
            Intent::Help => self.reply_help(event).await,
            Intent::Restart | Intent::Remediate if !self.config.commands_actionable() => {
                log::warn!(
                    "Ignoring {intent:?} from {}: commands are disabled in {} mode",
                    event.sender_id,
                    self.config.mode
                );
                self.reply_help(event).await;
            }
            Intent::Restart => {
                // The outcome has already been reported to the channel.
                let _ = self
                    .executor
                    .restart_container(&event.channel, Some(&event.sender_id))
                    .await;
            }
            Intent::Remediate => {
                let _ = self
                    .executor
                    .run_remediation(&event.channel, Some(&event.sender_id))
                    .await;
            }
        }
        Some(intent)
    }

    /// Handle queued events until the channel closes.
    ///
    /// Every event runs in its own task so a slow restart does not hold up a
    /// `!status` reply. Pending handlers are awaited before returning.
    pub async fn run(self: Arc<Self>, mut rx: Receiver<ChatEvent>) {
        log::info!("Command dispatcher started");
        let mut handlers = JoinSet::new();

        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            let dispatcher = Arc::clone(&self);
                            handlers.spawn(async move { dispatcher.handle(&event).await });
                        }
                        None => {
                            log::info!("Chat event channel closed");
                            break;
                        }
                    }
                }
                Some(result) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = result {
                        log::error!("Command handler failed: {e}");
                    }
                }
            }
        }

        while let Some(result) = handlers.join_next().await {
            if let Err(e) = result {
                log::error!("Command handler failed: {e}");
            }
        }
        log::info!("Command dispatcher stopped");
    }

    async fn reply_help(&self, event: &ChatEvent) {
        reply(
            self.notifier.as_ref(),
            &event.channel,
            &replies::help(&self.config),
            Severity::Info,
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::governor::{Emission, Transition};
    use crate::alert::state::AlertState;
    use crate::alert::{AlertGovernor, HealthProbe};
    use crate::config::Mode;
    use crate::service::runtime::ContainerStatus;
    use crate::testing::{FakeRemediation, FakeRuntime, RecordingNotifier};

    struct Harness {
        dispatcher: CommandDispatcher,
        state: SharedAlertState,
        runtime: Arc<FakeRuntime>,
        remediation: Arc<FakeRemediation>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(config: MonitorConfig, state: AlertState) -> Harness {
        let config = Arc::new(config);
        let state = SharedAlertState::new(state);
        let runtime = Arc::new(FakeRuntime::with_statuses([]));
        let remediation = Arc::new(FakeRemediation::succeeding("done"));
        let notifier = Arc::new(RecordingNotifier::default());
        let executor = Arc::new(ActionExecutor::new(
            config.clone(),
            state.clone(),
            runtime.clone(),
            remediation.clone(),
            notifier.clone(),
        ));
        let dispatcher =
            CommandDispatcher::new(config, state.clone(), executor, notifier.clone());
        Harness {
            dispatcher,
            state,
            runtime,
            remediation,
            notifier,
        }
    }

    fn message(text: &str) -> ChatEvent {
        ChatEvent {
            text: text.to_string(),
            sender_id: "U1".to_string(),
            channel: "C1".to_string(),
            is_mention: false,
        }
    }

    fn mention(text: &str) -> ChatEvent {
        ChatEvent {
            is_mention: true,
            ..message(text)
        }
    }

    fn down() -> AlertState {
        AlertState {
            was_running: false,
            consecutive_alerts: 1,
            health_check_failures: 2,
            ..AlertState::default()
        }
    }

    #[tokio::test]
    async fn test_status_replies_with_snapshot() {
        let h = harness(MonitorConfig::default(), down());

        let intent = h.dispatcher.handle(&message("!status")).await;

        assert_eq!(intent, Some(Intent::Status));
        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel, "C1");
        assert!(sent[0].text.contains("*DOWN*"));
        assert!(h.runtime.restarts().is_empty());
        assert_eq!(h.state.snapshot().await, down());
    }

    #[tokio::test]
    async fn test_fix_restarts_and_resets_state() {
        let h = harness(MonitorConfig::default(), down());

        let intent = h.dispatcher.handle(&message("please fix this")).await;

        assert_eq!(intent, Some(Intent::Restart));
        assert_eq!(h.runtime.restarts().len(), 1);
        let state = h.state.snapshot().await;
        assert!(state.was_running);
        assert_eq!(state.consecutive_alerts, 0);
    }

    #[tokio::test]
    async fn test_autofix_runs_remediation_not_restart() {
        let h = harness(MonitorConfig::default(), down());

        let intent = h.dispatcher.handle(&message("!autofix")).await;

        assert_eq!(intent, Some(Intent::Remediate));
        assert_eq!(h.remediation.runs(), 1);
        assert!(h.runtime.restarts().is_empty());
        assert!(!h.state.snapshot().await.was_running);
    }

    #[tokio::test]
    async fn test_alert_only_mode_never_acts() {
        let config = MonitorConfig {
            mode: Mode::AlertOnly,
            ..MonitorConfig::default()
        };
        let h = harness(config, down());

        for text in ["!fix", "please fix", "!autofix", "!fix-ci now"] {
            h.dispatcher.handle(&message(text)).await;
        }

        assert!(h.runtime.restarts().is_empty());
        assert_eq!(h.remediation.runs(), 0);
        let texts = h.notifier.texts();
        assert_eq!(texts.len(), 4);
        assert!(texts.iter().all(|t| t.contains("disabled")));
        assert_eq!(h.state.snapshot().await, down());
    }

    #[tokio::test]
    async fn test_fix_command_disabled_never_acts() {
        let config = MonitorConfig {
            fix_command_enabled: false,
            ..MonitorConfig::default()
        };
        let h = harness(config, down());

        h.dispatcher.handle(&message("!fix")).await;
        h.dispatcher.handle(&message("!autofix")).await;

        assert!(h.runtime.restarts().is_empty());
        assert_eq!(h.remediation.runs(), 0);
    }

    #[tokio::test]
    async fn test_mention_without_keyword_gets_help() {
        let h = harness(MonitorConfig::default(), AlertState::default());

        let intent = h.dispatcher.handle(&mention("hi")).await;

        assert_eq!(intent, Some(Intent::Help));
        let texts = h.notifier.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("!status"));
        assert!(texts[0].contains("!autofix"));
        assert_eq!(h.state.snapshot().await, AlertState::default());
    }

    #[tokio::test]
    async fn test_run_handles_queued_events() {
        let h = harness(MonitorConfig::default(), down());
        let (tx, rx) = tokio::sync::mpsc::channel(8);

        tx.send(message("!status")).await.unwrap();
        tx.send(message("!fix")).await.unwrap();
        tx.send(message("good morning")).await.unwrap();
        drop(tx);

        Arc::new(h.dispatcher).run(rx).await;

        assert_eq!(h.runtime.restarts().len(), 1);
        // Status report, restart notice and restart result.
        assert_eq!(h.notifier.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_plain_chatter_is_ignored() {
        let h = harness(MonitorConfig::default(), AlertState::default());

        assert_eq!(h.dispatcher.handle(&message("hello world")).await, None);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_probe_cycle_and_fix_command_do_not_interleave() {
        for _ in 0..50 {
            let config = Arc::new(MonitorConfig {
                auto_restart_enabled: false,
                ..MonitorConfig::default()
            });
            let state = SharedAlertState::default();
            let runtime = Arc::new(FakeRuntime::with_statuses([Some(
                ContainerStatus::Exited(1),
            )]));
            let notifier = Arc::new(RecordingNotifier::default());
            let executor = Arc::new(ActionExecutor::new(
                config.clone(),
                state.clone(),
                runtime.clone(),
                Arc::new(FakeRemediation::succeeding("")),
                notifier.clone(),
            ));
            let governor = Arc::new(AlertGovernor::new(
                config.clone(),
                state.clone(),
                notifier.clone(),
            ));
            let probe = HealthProbe::new(config.clone(), runtime.clone(), governor, executor.clone());
            let dispatcher = CommandDispatcher::new(config, state.clone(), executor, notifier.clone());

            let cycle = tokio::spawn(async move { probe.cycle().await });
            let command = tokio::spawn(async move { dispatcher.handle(&message("!fix")).await });
            let outcome = cycle.await.unwrap();
            assert_eq!(command.await.unwrap(), Some(Intent::Restart));

            assert_eq!(outcome.transition, Transition::WentDown);
            assert_eq!(outcome.emission, Some(Emission::Sent));
            assert_eq!(runtime.restarts().len(), 1);

            // Either the restart reset landed after the cycle, or the cycle
            // ran on the reset state. Never a mix of the two.
            let state = state.snapshot().await;
            assert_eq!(state.health_check_failures, 1);
            assert!(!state.is_in_cooldown);
            if state.was_running {
                assert_eq!(state.consecutive_alerts, 0);
            } else {
                assert_eq!(state.consecutive_alerts, 1);
            }
            let critical = notifier
                .sent()
                .iter()
                .filter(|m| m.severity == Severity::Critical)
                .count();
            assert_eq!(critical, 1);
        }
    }
}
