//! Interrupt handling for deployment runs.

use std::future::Future;

use tokio::sync::watch;

/// Exit code used when the operator interrupts twice.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Wait for interrupts produced by `interrupt`.
///
/// The first one sets `cancel`, so no further task is started. Returns on the
/// second one, at which point the caller should stop without waiting for any
/// pending transaction.
pub async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: watch::Sender<bool>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return std::future::pending().await;
    }
    tracing::warn!("Interrupted, finishing the current task before stopping. Press Ctrl-C again to exit now");
    let _ = cancel.send(true);

    if interrupt().await.is_err() {
        return std::future::pending().await;
    }
    tracing::error!("Interrupted again, exiting without waiting for pending transactions");
}
