use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::Api;
use crate::proxy::ClientId;

/// Body of an incoming RPC request: `{"method": "connect", "params": []}`.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Dispatches one already-decoded RPC call against the [`Api`], with the
/// caller identity already extracted. Kept free of any HTTP types so it can
/// be exercised directly in tests without standing up a listener.
///
/// Returns the RPC result value, or the fault message text for an unknown
/// method name — matching the spec's literal "Unknown procedure name: <name>".
pub async fn dispatch(api: &Api, method: &str, params: &[Value], client_id: ClientId) -> Result<Value, String> {
    match method {
        "connect" => {
            let ok = api.connect(client_id).await;
            Ok(json!(ok))
        }
        "disconnect" => {
            let all = params.first().and_then(Value::as_bool).unwrap_or(false);
            let ok = api.disconnect(client_id, all).await;
            Ok(json!(ok))
        }
        "get_status" => {
            let (clients, connected, seconds) = api.get_status(client_id).await;
            Ok(json!([clients, connected, seconds]))
        }
        other => {
            warn!(method = other, "rejected unknown RPC method");
            Err(format!("Unknown procedure name: {other}"))
        }
    }
}

/// Strip the port from a socket address, leaving just the host part, used
/// as the [`ClientId`].
fn client_id_from_addr(addr: SocketAddr) -> ClientId {
    addr.ip().to_string()
}

async fn handle_rpc(
    State(api): State<Arc<Api>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RpcRequest>,
) -> (StatusCode, Json<Value>) {
    let client_id = client_id_from_addr(addr);
    debug!(method = %req.method, client = %client_id, "handling RPC request");

    match dispatch(&api, &req.method, &req.params, client_id).await {
        Ok(result) => (StatusCode::OK, Json(json!({ "result": result }))),
        Err(fault) => (StatusCode::BAD_REQUEST, Json(json!({ "fault": fault }))),
    }
}

/// Build the axum router carrying the RPC surface. Served via
/// `into_make_service_with_connect_info::<SocketAddr>()` so `handle_rpc`
/// can recover the caller's address.
pub fn router(api: Arc<Api>) -> Router {
    Router::new().route("/rpc", post(handle_rpc)).with_state(api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::Modem;
    use crate::proxy::{ModemProxy, DEFAULT_CLIENT_TIMEOUT};
    use crate::testutil::ScriptedRunner;

    fn api_with(runner: ScriptedRunner) -> Api {
        let modem = Modem::new(
            Arc::new(runner),
            "connect".into(),
            "disconnect".into(),
            "is_connected".into(),
        );
        Api::new(Arc::new(ModemProxy::new(modem, DEFAULT_CLIENT_TIMEOUT)))
    }

    #[tokio::test]
    async fn connect_dispatches_to_api() {
        let runner = ScriptedRunner::always(true).with_sequence("is_connected", vec![false]);
        let api = api_with(runner);

        let result = dispatch(&api, "connect", &[], "10.0.0.1".into()).await.unwrap();
        assert_eq!(result, json!(true));
    }

    #[tokio::test]
    async fn disconnect_reads_all_flag_from_params() {
        let runner = ScriptedRunner::always(true).with_sequence("is_connected", vec![false]);
        let api = api_with(runner);

        dispatch(&api, "connect", &[], "A".into()).await.unwrap();
        let result = dispatch(&api, "disconnect", &[json!(true)], "A".into()).await.unwrap();
        assert_eq!(result, json!(true));
    }

    #[tokio::test]
    async fn get_status_returns_three_tuple() {
        let runner = ScriptedRunner::always(true).with_sequence("is_connected", vec![false, true]);
        let api = api_with(runner);

        dispatch(&api, "connect", &[], "A".into()).await.unwrap();
        let result = dispatch(&api, "get_status", &[], "A".into()).await.unwrap();
        let arr = result.as_array().unwrap();
        assert_eq!(arr[0], json!(1));
        assert_eq!(arr[1], json!(true));
        assert!(arr[2].as_u64().is_some());
    }

    #[tokio::test]
    async fn unknown_method_is_a_fault_and_does_not_touch_state() {
        let runner = ScriptedRunner::always(true);
        let api = api_with(runner);

        let err = dispatch(&api, "get_connected", &[], "A".into()).await.unwrap_err();
        assert_eq!(err, "Unknown procedure name: get_connected");

        let (clients, _, _) = api.get_status("probe".into()).await;
        // "probe" itself registers, but "A" from the rejected call must not.
        assert_eq!(clients, 1);
    }

    #[test]
    fn client_id_strips_port() {
        let addr: SocketAddr = "192.168.1.5:54321".parse().unwrap();
        assert_eq!(client_id_from_addr(addr), "192.168.1.5");
    }
}
