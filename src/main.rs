use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use alert::{AlertGovernor, HealthProbe, SharedAlertState};
use chat::{Notifier, SlackNotifier, ingestion};
use commands::{ActionExecutor, CommandDispatcher};
use config::BotConfig;
use service::{DockerRuntime, ScriptRemediation};

mod alert;
mod chat;
mod cli;
mod commands;
mod config;
mod service;
mod signals;
#[cfg(test)]
mod testing;

/// Chat events waiting for the dispatcher. Slack gets a 429 beyond this.
const EVENT_BUFFER_SIZE: usize = 100;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::get_cli_args();

    // The env file may set RUST_LOG, so load it before the logger.
    let env_file = config::load_env_file(args.env_file.as_deref());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match env_file {
        Ok(Some(path)) => log::info!("Loaded environment from {}", path.display()),
        Ok(None) => log::debug!("No .env file found, using the process environment"),
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    let mut config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(listen) = args.listen {
        config.events_listen_addr = listen;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: BotConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let runtime = Arc::new(DockerRuntime::connect()?);
    let slack = Arc::new(SlackNotifier::new(&config.slack));
    let remediation = Arc::new(ScriptRemediation::from_command_line(
        &config.remediation_command,
    )?);
    log::info!("Remediation command: {}", remediation.program());

    let bot_user_id = match slack.bot_user_id().await {
        Ok(id) => {
            log::info!("Authenticated with Slack as {id}");
            Some(id)
        }
        Err(e) => {
            log::warn!("Unable to resolve the bot user id, duplicate mentions may be handled twice: {e}");
            None
        }
    };

    let monitor = Arc::new(config.monitor);
    let notifier: Arc<dyn Notifier> = slack;
    let state = SharedAlertState::default();

    let governor = Arc::new(AlertGovernor::new(
        monitor.clone(),
        state.clone(),
        notifier.clone(),
    ));
    let executor = Arc::new(ActionExecutor::new(
        monitor.clone(),
        state.clone(),
        runtime.clone(),
        remediation,
        notifier.clone(),
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(
        monitor.clone(),
        state,
        executor.clone(),
        notifier,
    ));
    let probe = Arc::new(HealthProbe::new(
        monitor.clone(),
        runtime,
        governor,
        executor,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    signals::handle_shutdown(shutdown_tx.clone())?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
    let app = ingestion::router(tx, config.slack.signing_secret, bot_user_id);

    let dispatcher_task = tokio::spawn(dispatcher.run(rx));
    let probe_task = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { probe.run(shutdown).await })
    };

    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);
    log::info!(
        "911-DevOps is online, watching {} in {} mode (alerts to #{})",
        monitor.container_name,
        monitor.mode,
        monitor.alert_channel
    );

    // Returning drops the router and with it the last event sender, which
    // lets the dispatcher drain and stop.
    let served = ingestion::start_events_service(config.events_listen_addr, app, shutdown_rx).await;
    if served.is_err() {
        let _ = shutdown_tx.send(true);
    }

    if let Err(e) = probe_task.await {
        log::error!("Health probe task failed: {e}");
    }
    if let Err(e) = dispatcher_task.await {
        log::error!("Command dispatcher task failed: {e}");
    }
    log::info!("911-DevOps stopped");
    served
}
