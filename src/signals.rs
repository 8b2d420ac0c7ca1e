//! SIGINT/SIGTERM handling for headless runs

use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

use crate::dashboard::DashboardEvent;

/// Post [`DashboardEvent::Shutdown`] into the loop on the first SIGINT or SIGTERM
#[cfg(unix)]
pub fn forward_shutdown(tx: UnboundedSender<DashboardEvent>) -> Result<()> {
    use anyhow::Context;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::info;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "Shutdown signal received");
                let _ = tx.send(DashboardEvent::Shutdown);
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

#[cfg(not(unix))]
pub fn forward_shutdown(_tx: UnboundedSender<DashboardEvent>) -> Result<()> {
    tracing::warn!("Signal handling is not supported on this platform");
    Ok(())
}
