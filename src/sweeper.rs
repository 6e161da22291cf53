use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::info;

use crate::proxy::ModemProxy;

/// Periodic background task that prunes expired clients and hangs up when
/// the last one leaves. Cancellable via `shutdown`: it finishes at most one
/// more tick after the signal fires, and is never joined with an unbounded
/// wait, so it cannot block process shutdown.
pub async fn run(proxy: Arc<ModemProxy>, interval: Duration, shutdown: Arc<Notify>) {
    info!(interval_secs = interval.as_secs(), "auto-disconnect sweeper started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.notified() => {
                info!("auto-disconnect sweeper shutting down");
                return;
            }
        }

        // If the registry is already empty there is nothing to prune, so
        // eviction itself cannot hang up (see `ModemProxy::remove_client`).
        // Check before pruning so we don't re-run the check right after an
        // eviction that just hung up for the same reason.
        let already_empty = proxy.count_clients().await == 0;
        proxy.remove_old_clients().await;

        if already_empty && proxy.is_connected().await {
            info!("no clients and modem still connected, retrying hang-up");
            proxy.hang_up().await;
        }
    }
}
