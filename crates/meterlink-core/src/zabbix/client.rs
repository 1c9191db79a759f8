//! Stateful JSON-RPC client for the monitoring backend.

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::{normalize_base_url, ZabbixConfig};
use crate::error::DatasourceError;
use crate::transport::HttpTransport;

/// JSON-RPC client that authenticates lazily and transparently recovers
/// from session expiry.
///
/// The auth token is per-client state (not a process-wide global), so
/// multiple datasource instances coexist safely. When a call fails with
/// the backend's session-expired signature, the client performs exactly
/// one `user.login` exchange and retries the original call once with the
/// new token; any error after that retry is surfaced. Concurrent calls
/// that each detect an expired session may each re-login — logins are
/// idempotent, so the cost is only an extra request.
pub struct ZabbixClient {
    url: String,
    username: String,
    password: String,
    auth: RwLock<Option<String>>,
    transport: Arc<HttpTransport>,
}

impl ZabbixClient {
    #[must_use]
    pub fn new(config: &ZabbixConfig, transport: Arc<HttpTransport>) -> Self {
        Self {
            url: normalize_base_url(&config.url),
            username: config.username.clone(),
            password: config.password.clone(),
            auth: RwLock::new(None),
            transport,
        }
    }

    /// Issues an RPC call with the current auth token, re-authenticating
    /// once on session expiry.
    ///
    /// An absent response body yields an empty (`Null`) result, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Surfaces transport errors and any RPC error other than the single
    /// recoverable session-expired case.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, DatasourceError> {
        // Bounded retry: exactly one re-login even if the backend keeps
        // reporting session errors after a successful-looking login.
        let mut reauthenticated = false;
        loop {
            let auth = self.auth.read().await.clone();
            match self.dispatch(method, &params, auth).await {
                Err(error) if error.is_session_expired() && !reauthenticated => {
                    tracing::info!(method = %method, "session expired, re-authenticating");
                    reauthenticated = true;
                    self.login().await?;
                }
                other => return other,
            }
        }
    }

    /// Performs the `user.login` exchange and stores the returned token.
    ///
    /// Returns the new token, or `None` when the transport yielded no
    /// body (in which case the stored token is cleared).
    ///
    /// # Errors
    ///
    /// Surfaces transport errors and RPC-level login failures.
    pub async fn login(&self) -> Result<Option<String>, DatasourceError> {
        let envelope = json!({
            "jsonrpc": "2.0",
            "method": "user.login",
            "params": {
                "user": self.username,
                "password": self.password,
            },
            "auth": null,
            "id": 1,
        });

        let body = self.transport.post_json(&self.url, &envelope).await?;
        let token = match body {
            None => None,
            Some(body) => {
                if let Some(error) = body.get("error") {
                    return Err(rpc_error(error));
                }
                body.get("result").and_then(Value::as_str).map(str::to_string)
            }
        };

        tracing::debug!(authenticated = token.is_some(), "login exchange completed");
        *self.auth.write().await = token.clone();
        Ok(token)
    }

    /// Current auth token, if any. Primarily useful for diagnostics.
    pub async fn auth_token(&self) -> Option<String> {
        self.auth.read().await.clone()
    }

    async fn dispatch(
        &self,
        method: &str,
        params: &Value,
        auth: Option<String>,
    ) -> Result<Value, DatasourceError> {
        let envelope = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "auth": auth,
            "id": 1,
        });

        tracing::debug!(method = %method, "rpc call");
        let Some(body) = self.transport.post_json(&self.url, &envelope).await? else {
            return Ok(Value::Null);
        };

        if let Some(error) = body.get("error") {
            return Err(rpc_error(error));
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

fn rpc_error(error: &Value) -> DatasourceError {
    DatasourceError::Rpc {
        code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown RPC error")
            .to_string(),
        data: error.get("data").map(|data| match data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
    }
}
