//! History and trend retrieval tests: value-type partitioning, per-type
//! request shape, and concatenation order.

use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;

use meterlink_core::config::ZabbixConfig;
use meterlink_core::transport::HttpTransport;
use meterlink_core::zabbix::{HistoryAggregator, Item, ValueType, ZabbixClient};

use crate::mock_infrastructure::RpcMockBuilder;

fn aggregator(url: &str) -> HistoryAggregator {
    let config = ZabbixConfig {
        url: url.to_string(),
        username: "grafana".to_string(),
        password: "secret".to_string(),
    };
    HistoryAggregator::new(Arc::new(ZabbixClient::new(
        &config,
        Arc::new(HttpTransport::new().unwrap()),
    )))
}

fn item(itemid: &str, value_type: ValueType) -> Item {
    Item {
        itemid: itemid.to_string(),
        name: String::new(),
        key: String::new(),
        value_type,
        delay: None,
        hosts: Vec::new(),
    }
}

#[tokio::test]
async fn test_history_issues_one_call_per_value_type() {
    let mut mock = RpcMockBuilder::new().await;
    mock.get_server()
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "history.get",
            "params": { "history": 0, "itemids": ["1"], "time_from": 1_400_000_000 }
        })))
        .with_status(200)
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "result": [
                    { "itemid": "1", "clock": "1400000010", "value": "0.5" }
                ],
                "id": 1
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    mock.get_server()
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "history.get",
            "params": { "history": 3, "itemids": ["2", "3"] }
        })))
        .with_status(200)
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "result": [
                    { "itemid": "2", "clock": "1400000005", "value": "120" },
                    { "itemid": "3", "clock": "1400000020", "value": "7" }
                ],
                "id": 1
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let aggregator = aggregator(&mock.url());
    let items = [
        item("1", ValueType::NumericFloat),
        item("2", ValueType::NumericUnsigned),
        item("3", ValueType::NumericUnsigned),
    ];
    let points = aggregator.fetch_history(&items, 1_400_000_000, None).await.unwrap();

    // Float partition (type 0) comes first, then unsigned (type 3), each
    // partition in backend clock order.
    let ids: Vec<&str> = points.iter().map(|p| p.itemid.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_bounded_history_query_sends_time_till() {
    let mut mock = RpcMockBuilder::new().await;
    mock.get_server()
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "history.get",
            "params": { "time_from": 1_400_000_000, "time_till": 1_400_003_600 }
        })))
        .with_status(200)
        .with_body(json!({ "jsonrpc": "2.0", "result": [], "id": 1 }).to_string())
        .create_async()
        .await;

    let aggregator = aggregator(&mock.url());
    let items = [item("1", ValueType::NumericFloat)];
    let points =
        aggregator.fetch_history(&items, 1_400_000_000, Some(1_400_003_600)).await.unwrap();
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_trends_use_trend_type_parameter() {
    let mut mock = RpcMockBuilder::new().await;
    mock.get_server()
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "trend.get",
            "params": { "trend": 0, "itemids": ["1"] }
        })))
        .with_status(200)
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "result": [{
                    "itemid": "1",
                    "clock": "1400000000",
                    "num": "60",
                    "value_min": "0.1",
                    "value_avg": "0.5",
                    "value_max": "0.9"
                }],
                "id": 1
            })
            .to_string(),
        )
        .create_async()
        .await;

    let aggregator = aggregator(&mock.url());
    let trends =
        aggregator.fetch_trends(&[item("1", ValueType::NumericFloat)], 1_400_000_000, None)
            .await
            .unwrap();

    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].value_avg, "0.5");
}

#[tokio::test]
async fn test_empty_item_set_issues_no_requests() {
    // No mocks: any request would 501 and fail the fetch.
    let mock = RpcMockBuilder::new().await;
    let aggregator = aggregator(&mock.url());
    let points = aggregator.fetch_history(&[], 1_400_000_000, None).await.unwrap();
    assert!(points.is_empty());
}
