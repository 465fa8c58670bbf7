//! Small crashable service to watch with the bot.
//!
//! `GET /health` answers `OK`. `GET /kill` answers and then exits the process
//! with status 1, which the bot reports as a crash.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, routing::get};

const DEFAULT_PORT: u16 = 3000;
const KILL_DELAY: Duration = Duration::from_millis(100);

type KillSwitch = Arc<dyn Fn() + Send + Sync>;

fn app(kill: KillSwitch) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/kill", get(kill_server))
        .with_state(kill)
}

async fn health() -> &'static str {
    "OK"
}

async fn kill_server(State(kill): State<KillSwitch>) -> &'static str {
    log::warn!("Kill requested, exiting in {KILL_DELAY:?}");
    tokio::spawn(async move {
        // Give the response a chance to reach the client.
        tokio::time::sleep(KILL_DELAY).await;
        kill();
    });
    "Server killing..."
}

fn port() -> u16 {
    match std::env::var("PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid PORT {raw:?}, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = SocketAddr::from(([0, 0, 0, 0], port()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Demo server listening on {addr}");

    axum::serve(listener, app(Arc::new(exit_process))).await
}

fn exit_process() {
    std::process::exit(1)
}
