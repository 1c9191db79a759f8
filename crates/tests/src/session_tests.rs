//! Session lifecycle tests for the JSON-RPC backend client.
//!
//! Responses are scripted against the auth token carried in each request
//! envelope, so the unauthenticated first attempt, the login exchange, and
//! the authenticated retry are each matched by exactly one mock.

use serde_json::json;
use std::sync::Arc;

use meterlink_core::config::ZabbixConfig;
use meterlink_core::transport::HttpTransport;
use meterlink_core::zabbix::ZabbixClient;
use meterlink_core::DatasourceError;

use crate::mock_infrastructure::RpcMockBuilder;

fn client(url: &str) -> ZabbixClient {
    let config = ZabbixConfig {
        url: url.to_string(),
        username: "grafana".to_string(),
        password: "secret".to_string(),
    };
    ZabbixClient::new(&config, Arc::new(HttpTransport::new().unwrap()))
}

#[tokio::test]
async fn test_session_expiry_triggers_one_relogin_and_retry() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_session_expired("item.get", None, 1).await;
    mock.mock_login_expect("fresh-token", 1).await;
    mock.mock_method_with_auth("item.get", "fresh-token", &json!([{ "itemid": "10101" }]))
        .await;

    let client = client(&mock.url());
    let result = client.call("item.get", json!({ "output": "extend" })).await.unwrap();

    assert_eq!(result[0]["itemid"], "10101");
    assert_eq!(client.auth_token().await.as_deref(), Some("fresh-token"));
    mock.assert_all().await;
}

#[tokio::test]
async fn test_persistent_session_error_fails_after_single_retry() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_session_expired("item.get", None, 1).await;
    // Exactly one login even though the retried call expires again.
    mock.mock_login_expect("fresh-token", 1).await;
    mock.mock_session_expired("item.get", Some("fresh-token"), 1).await;

    let client = client(&mock.url());
    let error = client.call("item.get", json!({})).await.unwrap_err();

    assert!(error.is_session_expired());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_not_authorised_signature_also_triggers_relogin() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_rpc_error("host.get", -32500, "Application error.", "Not authorised.").await;
    mock.mock_login_expect("tok", 1).await;
    mock.mock_method_with_auth("host.get", "tok", &json!([{ "hostid": "1", "name": "web" }]))
        .await;

    let client = client(&mock.url());
    let result = client.call("host.get", json!({})).await.unwrap();
    assert_eq!(result[0]["name"], "web");
}

#[tokio::test]
async fn test_login_failure_during_retry_is_surfaced() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_session_expired("item.get", None, 1).await;
    mock.mock_rpc_error(
        "user.login",
        -32602,
        "Invalid params.",
        "Login name or password is incorrect.",
    )
    .await;

    let client = client(&mock.url());
    let error = client.call("item.get", json!({})).await.unwrap_err();
    assert!(matches!(error, DatasourceError::Rpc { code: -32602, .. }));
    assert_eq!(client.auth_token().await, None);
}
