use std::{net::SocketAddr, path::PathBuf, sync::OnceLock};

use clap::Parser;

/// Chat-ops watchdog: announces container crashes in Slack and restarts on request.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Env file to load before reading the configuration. Defaults to `.env`.
    #[arg(short, long)]
    pub env_file: Option<PathBuf>,
    /// Address of the Slack events endpoint. Overrides EVENTS_LISTEN_ADDR.
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}
