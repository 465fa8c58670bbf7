use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::sync::Arc;
use tokio::sync::watch;

/// What should we do when the user stops this program?
///
/// The first SIGINT or SIGTERM flips `shutdown`, which stops the probe loop
/// and the events endpoint. In-flight commands are allowed to finish.
pub fn handle_shutdown(shutdown: Arc<watch::Sender<bool>>) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log::warn!("Received signal {signal}, shutting down");
            let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
            let _ = shutdown.send(true);
        }
    });
    Ok(())
}
