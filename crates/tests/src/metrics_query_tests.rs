//! Range-query translation and normalization tests for the metrics
//! backend, covering both protocol dialects.

use std::sync::Arc;
use std::time::Duration;

use meterlink_core::config::PrometheusConfig;
use meterlink_core::prometheus::{ApiVersion, MetricsQueryClient};
use meterlink_core::transport::HttpTransport;
use meterlink_core::types::{QueryTarget, TimeRange};
use meterlink_core::DatasourceError;

use crate::mock_infrastructure::metrics_mock::{matrix_sample, MetricsMockBuilder};

fn client(url: &str, version: ApiVersion) -> MetricsQueryClient {
    let config = PrometheusConfig { url: url.to_string(), api_version: version };
    MetricsQueryClient::new(&config, Arc::new(HttpTransport::new().unwrap()))
}

#[tokio::test]
async fn test_v1_range_query_normalizes_series() {
    let mut mock = MetricsMockBuilder::new().await;
    mock.mock_v1_range_query(
        "node_load1",
        15,
        &[matrix_sample(
            &[("__name__", "node_load1"), ("host", "web01")],
            &[(1_400_000_000.0, "0.5"), (1_400_000_015.0, "0.75")],
        )],
    )
    .await;

    let client = client(&mock.url(), ApiVersion::V1);
    let series = client
        .query(
            &[QueryTarget::new("node_load1")],
            TimeRange::new(1_400_000_000, 1_400_003_600),
            Duration::from_secs(15),
        )
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].target, "node_load1{host=\"web01\"}");
    assert_eq!(series[0].datapoints, vec![(0.5, 1_400_000_000_000), (0.75, 1_400_000_015_000)]);
    mock.assert_all().await;
}

#[tokio::test]
async fn test_v2_range_query_normalizes_to_same_shape() {
    let mut mock = MetricsMockBuilder::new().await;
    mock.mock_v2_range_query(
        "node_load1",
        15,
        &[matrix_sample(
            &[("__name__", "node_load1"), ("host", "web01")],
            &[(1_400_000_000.0, "0.5")],
        )],
    )
    .await;

    let client = client(&mock.url(), ApiVersion::V2);
    let series = client
        .query(
            &[QueryTarget::new("node_load1")],
            TimeRange::new(1_400_000_000, 1_400_003_600),
            Duration::from_secs(15),
        )
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].target, "node_load1{host=\"web01\"}");
    assert_eq!(series[0].datapoints, vec![(0.5, 1_400_000_000_000)]);
    mock.assert_all().await;
}

#[tokio::test]
async fn test_legend_format_renders_series_name() {
    let mut mock = MetricsMockBuilder::new().await;
    mock.mock_v1_range_query(
        "node_load1",
        15,
        &[matrix_sample(&[("__name__", "node_load1"), ("host", "web01")], &[(1.0, "1")])],
    )
    .await;

    let client = client(&mock.url(), ApiVersion::V1);
    let target = QueryTarget {
        legend_format: Some("{{host}} load".to_string()),
        ..QueryTarget::new("node_load1")
    };
    let series = client
        .query(&[target], TimeRange::new(1_400_000_000, 1_400_003_600), Duration::from_secs(15))
        .await
        .unwrap();

    assert_eq!(series[0].target, "web01 load");
}

#[tokio::test]
async fn test_oversized_range_recalibrates_step() {
    // A 22000s window at step 1 would need 22000 points; the step is
    // floored up to 2 before the request is issued.
    let mut mock = MetricsMockBuilder::new().await;
    mock.mock_v1_range_query("up", 2, &[]).await;

    let client = client(&mock.url(), ApiVersion::V1);
    let target =
        QueryTarget { interval: Some(Duration::from_secs(1)), ..QueryTarget::new("up") };
    let series = client
        .query(&[target], TimeRange::new(0, 22_000), Duration::from_secs(15))
        .await
        .unwrap();

    assert!(series.is_empty());
    mock.assert_all().await;
}

#[tokio::test]
async fn test_hidden_and_empty_targets_issue_no_requests() {
    // The mock server has no expectations; any request would 501 and fail
    // the query, so success proves nothing was sent.
    let mock = MetricsMockBuilder::new().await;
    let client = client(&mock.url(), ApiVersion::V1);

    let targets = [
        QueryTarget { hide: true, ..QueryTarget::new("up") },
        QueryTarget::new(""),
    ];
    let series = client
        .query(&targets, TimeRange::new(1_400_000_000, 1_400_003_600), Duration::from_secs(15))
        .await
        .unwrap();

    assert!(series.is_empty());
}

#[tokio::test]
async fn test_backend_query_error_is_recorded_then_cleared() {
    let mut mock = MetricsMockBuilder::new().await;
    mock.mock_v1_query_error("parse error at char 4").await;

    let client = client(&mock.url(), ApiVersion::V1);
    let range = TimeRange::new(1_400_000_000, 1_400_003_600);

    let error = client
        .query(&[QueryTarget::new("up{")], range, Duration::from_secs(15))
        .await
        .unwrap_err();
    assert!(matches!(error, DatasourceError::Query(_)));
    assert_eq!(client.last_error().as_deref(), Some("parse error at char 4"));

    // A later successful query clears the recorded error.
    mock.mock_v1_range_query("up", 15, &[]).await;
    client.query(&[QueryTarget::new("up")], range, Duration::from_secs(15)).await.unwrap();
    assert_eq!(client.last_error(), None);
}

#[tokio::test]
async fn test_resolve_query_label_values_and_wildcards() {
    let mut mock = MetricsMockBuilder::new().await;
    mock.mock_v1_label_values("job", &["node", "prometheus"]).await;
    mock.mock_v1_metric_names(&["node_load1", "node_cpu", "up"]).await;

    let client = client(&mock.url(), ApiVersion::V1);

    let labels = client.resolve_query("label_values(job)").await.unwrap();
    let label_names: Vec<&str> = labels.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(label_names, vec!["node", "prometheus"]);
    assert!(labels.iter().all(|m| !m.expandable));

    let wild = client.resolve_query("node_*").await.unwrap();
    let wild_names: Vec<&str> = wild.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(wild_names, vec!["node_load1", "node_cpu"]);
    assert!(wild.iter().all(|m| m.expandable));
}

#[tokio::test]
async fn test_connection_check_uses_suggest_endpoint() {
    let mut mock = MetricsMockBuilder::new().await;
    mock.mock_v2_metric_names(&["up"]).await;

    let client = client(&mock.url(), ApiVersion::V2);
    client.test_connection().await.unwrap();
    mock.assert_all().await;
}
