use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

use crate::modem::Modem;

/// Opaque token identifying a client across requests — for RPC traffic this
/// is the caller's network address with any port stripped.
pub type ClientId = String;

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

struct ProxyInner {
    modem: Modem,
    clients: HashMap<ClientId, Instant>,
    is_dialling: bool,
}

/// Multiplexes many concurrent clients onto one [`Modem`], enforcing
/// "dial once, hang up on last". A single mutex serialises every operation
/// that reads or writes client state or touches the modem — coarse-grained
/// on purpose: there is exactly one modem, so there is no throughput to be
/// won by locking more finely, and the coarse lock makes the dial-once and
/// hang-up-on-last invariants trivial to uphold. The lock is async because
/// its critical sections span the `.await` of the underlying modem command.
pub struct ModemProxy {
    inner: Mutex<ProxyInner>,
    client_timeout: Duration,
}

impl ModemProxy {
    pub fn new(modem: Modem, client_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(ProxyInner {
                modem,
                clients: HashMap::new(),
                is_dialling: false,
            }),
            client_timeout,
        }
    }

    /// Register (or refresh) a client and ensure the link is coming up.
    ///
    /// Returns true iff the link is already up, a dial is already in
    /// flight, or this call's own dial succeeded.
    pub async fn add_client(&self, id: ClientId) -> bool {
        let mut inner = self.inner.lock().await;
        inner.clients.insert(id, Instant::now());

        if inner.modem.is_connected().await {
            inner.is_dialling = false;
            return true;
        }
        if inner.is_dialling {
            return true;
        }
        inner.is_dialling = true;
        let dialled = inner.modem.dial().await;
        info!(success = dialled, "dial issued for new client");
        dialled
    }

    /// Unconditionally refresh a client's last-seen time. Used by
    /// `get_status` so a live poller never looks expired.
    pub async fn refresh_client(&self, id: ClientId) {
        let mut inner = self.inner.lock().await;
        inner.clients.insert(id, Instant::now());
    }

    /// Deregister a client. A hang-up is issued iff the modem is currently
    /// connected and this was the last client — removing an unknown id is
    /// a silent no-op, never an error.
    pub async fn remove_client(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        inner.clients.remove(id);
        if inner.clients.is_empty() && inner.modem.is_connected().await {
            info!("last client left, hanging up");
            inner.modem.hang_up().await;
        }
    }

    /// Unconditional tear-down, used for administrative "disconnect all".
    /// Returns the underlying disconnect command's success.
    pub async fn hang_up(&self) -> bool {
        let mut inner = self.inner.lock().await;
        inner.modem.hang_up().await
    }

    /// Evict every client that has not been seen within the configured
    /// timeout. Eviction goes through `remove_client`'s logic so the
    /// last-to-leave hang-up still fires.
    pub async fn remove_old_clients(&self) {
        let expired: Vec<ClientId> = {
            let inner = self.inner.lock().await;
            let now = Instant::now();
            inner
                .clients
                .iter()
                .filter(|(_, &last_seen)| now.saturating_duration_since(last_seen) > self.client_timeout)
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in expired {
            info!(client = %id, "client timed out");
            self.remove_client(&id).await;
        }
    }

    pub async fn count_clients(&self) -> usize {
        self.inner.lock().await.clients.len()
    }

    /// Delegates to the modem's probe; clears the transitional dialling
    /// flag on success (the first of `get_status` or the sweeper to call
    /// this after a successful dial clears it — both converge to the same
    /// steady state).
    pub async fn is_connected(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let connected = inner.modem.is_connected().await;
        if connected {
            inner.is_dialling = false;
        }
        connected
    }

    pub async fn time_connected(&self) -> u64 {
        self.inner.lock().await.modem.timer.elapsed_seconds()
    }
}
