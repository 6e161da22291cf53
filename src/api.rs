use std::sync::Arc;

use crate::proxy::{ClientId, ModemProxy};

/// The three RPC-visible operations. Each takes the caller's [`ClientId`],
/// injected by the RPC dispatcher — never supplied on the wire itself.
pub struct Api {
    proxy: Arc<ModemProxy>,
}

impl Api {
    pub fn new(proxy: Arc<ModemProxy>) -> Self {
        Self { proxy }
    }

    /// Register this client and open the connection if necessary.
    pub async fn connect(&self, client_id: ClientId) -> bool {
        self.proxy.add_client(client_id).await
    }

    /// Disconnect this client and, if `all` is set, tear the whole link down
    /// — but only if it is actually up, so an offline "disconnect all"
    /// doesn't re-issue the disconnect command needlessly.
    pub async fn disconnect(&self, client_id: ClientId, all: bool) -> bool {
        self.proxy.remove_client(&client_id).await;
        if all && self.proxy.is_connected().await {
            return self.proxy.hang_up().await;
        }
        true
    }

    /// Snapshot of `(current_clients, is_connected, seconds_connected)`.
    pub async fn get_status(&self, client_id: ClientId) -> (usize, bool, u64) {
        self.proxy.refresh_client(client_id).await;
        (
            self.proxy.count_clients().await,
            self.proxy.is_connected().await,
            self.proxy.time_connected().await,
        )
    }
}
