//! Range-query client for the metrics backend.

use futures::future::try_join_all;
use regex::Regex;
use std::sync::{Arc, LazyLock, RwLock};
use std::time::Duration;

use crate::config::{normalize_base_url, PrometheusConfig};
use crate::error::DatasourceError;
use crate::prometheus::labels::render_legend;
use crate::prometheus::protocol::{ApiVersion, MetricSample};
use crate::prometheus::range::{calculate_step, RangeParams};
use crate::transport::HttpTransport;
use crate::types::{QueryTarget, TimeRange, TimeSeries};

/// `label_values(some_label)` pseudo-function accepted by
/// [`MetricsQueryClient::resolve_query`].
static LABEL_VALUES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^label_values\(\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\)$").unwrap());

/// Leading metric-name token, possibly containing wildcards.
static METRIC_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_:*][a-zA-Z0-9_:*]*").unwrap());

/// A metric-name resolution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricMatch {
    pub name: String,
    /// Whether the name can be expanded further in a query editor.
    pub expandable: bool,
}

/// Client issuing range, instant, and suggestion queries against the
/// metrics backend, normalizing both protocol dialects into one series
/// shape.
///
/// One GET request is issued per surviving query target, all in parallel;
/// the combined operation fails on the first error (no partial results).
/// Result order is positional with respect to target order.
pub struct MetricsQueryClient {
    base_url: String,
    version: ApiVersion,
    transport: Arc<HttpTransport>,
    /// Most recent backend-reported query error, kept for diagnostic
    /// display and cleared on the next successful query.
    last_error: RwLock<Option<String>>,
}

impl MetricsQueryClient {
    #[must_use]
    pub fn new(config: &PrometheusConfig, transport: Arc<HttpTransport>) -> Self {
        Self {
            base_url: normalize_base_url(&config.url),
            version: config.api_version,
            transport,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the last backend-reported query error, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().expect("last_error lock poisoned").clone()
    }

    /// Runs one range query per visible, non-empty target and normalizes
    /// the responses into series.
    ///
    /// Zero surviving targets short-circuit to an empty result without any
    /// network I/O.
    ///
    /// # Errors
    ///
    /// Fails with the first transport or backend error; partial success is
    /// never returned.
    pub async fn query(
        &self,
        targets: &[QueryTarget],
        range: TimeRange,
        scoped_interval: Duration,
    ) -> Result<Vec<TimeSeries>, DatasourceError> {
        let prepared: Vec<(&QueryTarget, RangeParams)> = targets
            .iter()
            .filter(|target| !target.expr.is_empty() && !target.hide)
            .map(|target| {
                let interval = target.interval.unwrap_or(scoped_interval);
                let step = calculate_step(interval, target.interval_factor.unwrap_or(1));
                (target, RangeParams::new(range, step))
            })
            .collect();

        // No valid targets: return the empty result to save a round trip.
        if prepared.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            targets = prepared.len(),
            from = range.from,
            to = range.to,
            "dispatching range queries"
        );

        let responses = try_join_all(
            prepared.iter().map(|(target, params)| self.run_range_query(&target.expr, *params)),
        )
        .await;

        let responses = match responses {
            Ok(responses) => {
                *self.last_error.write().expect("last_error lock poisoned") = None;
                responses
            }
            Err(error) => {
                if let DatasourceError::Query(ref message) = error {
                    *self.last_error.write().expect("last_error lock poisoned") =
                        Some(message.clone());
                }
                return Err(error);
            }
        };

        let mut series = Vec::new();
        for ((target, _), samples) in prepared.iter().zip(responses) {
            for sample in samples {
                series.push(to_series(sample, target.legend_format.as_deref()));
            }
        }
        Ok(series)
    }

    async fn run_range_query(
        &self,
        expr: &str,
        params: RangeParams,
    ) -> Result<Vec<MetricSample>, DatasourceError> {
        let url = self.version.range_query_url(&self.base_url, expr, params)?;
        let body = self.transport.get_json(&url).await?.unwrap_or_default();
        self.version.parse_query_response(&body)
    }

    /// Fetches the full metric-name list and keeps names containing
    /// `prefix`.
    ///
    /// # Errors
    ///
    /// Propagates transport and response-shape errors.
    pub async fn suggest_names(&self, prefix: &str) -> Result<Vec<String>, DatasourceError> {
        let names = self.fetch_metric_names().await?;
        Ok(names.into_iter().filter(|name| name.contains(prefix)).collect())
    }

    /// Resolves a query-editor expression into metric matches.
    ///
    /// Three mutually exclusive branches:
    /// 1. `label_values(label)` returns that label's distinct values;
    /// 2. a name containing `*` returns all metric names matching the
    ///    wildcard-expanded pattern;
    /// 3. anything else runs as a literal instant query and returns each
    ///    result's canonical name.
    ///
    /// # Errors
    ///
    /// Propagates transport, protocol-support, and response-shape errors.
    pub async fn resolve_query(&self, text: &str) -> Result<Vec<MetricMatch>, DatasourceError> {
        if let Some(caps) = LABEL_VALUES_RE.captures(text) {
            return self.resolve_label_values(&caps[1]).await;
        }

        let name_token = METRIC_NAME_RE.find(text).map(|m| m.as_str());
        if let Some(token) = name_token.filter(|token| token.contains('*')) {
            return self.resolve_wildcard(token).await;
        }

        self.resolve_literal(text).await
    }

    /// Checks connectivity by resolving the match-all pattern.
    ///
    /// # Errors
    ///
    /// Propagates the underlying resolution error.
    pub async fn test_connection(&self) -> Result<(), DatasourceError> {
        self.resolve_query("*").await.map(|_| ())
    }

    async fn resolve_label_values(
        &self,
        label: &str,
    ) -> Result<Vec<MetricMatch>, DatasourceError> {
        let url = self.version.label_values_url(&self.base_url, label)?;
        let Some(body) = self.transport.get_json(&url).await? else {
            return Ok(Vec::new());
        };
        let values = self.version.parse_suggest_response(&body)?;
        Ok(values.into_iter().map(|name| MetricMatch { name, expandable: false }).collect())
    }

    async fn resolve_wildcard(&self, token: &str) -> Result<Vec<MetricMatch>, DatasourceError> {
        let pattern = Regex::new(&token.replace('*', ".*"))
            .map_err(|e| DatasourceError::InvalidRequest(format!("bad wildcard pattern: {e}")))?;
        let names = self.fetch_metric_names().await?;
        Ok(names
            .into_iter()
            .filter(|name| pattern.is_match(name))
            .map(|name| MetricMatch { name, expandable: true })
            .collect())
    }

    async fn resolve_literal(&self, expr: &str) -> Result<Vec<MetricMatch>, DatasourceError> {
        let url = self.version.instant_query_url(&self.base_url, expr)?;
        let body = self.transport.get_json(&url).await?.unwrap_or_default();
        let samples = self.version.parse_query_response(&body)?;
        Ok(samples
            .into_iter()
            .map(|sample| MetricMatch {
                name: render_legend(&sample.metric, None),
                expandable: true,
            })
            .collect())
    }

    async fn fetch_metric_names(&self) -> Result<Vec<String>, DatasourceError> {
        let url = self.version.suggest_url(&self.base_url)?;
        // An absent body is an empty suggestion list, not an error.
        let Some(body) = self.transport.get_json(&url).await? else {
            return Ok(Vec::new());
        };
        self.version.parse_suggest_response(&body)
    }
}

/// Converts one metric result into a series: legend from the label set,
/// points as `(value, timestamp-millis)` in response order.
fn to_series(sample: MetricSample, legend_format: Option<&str>) -> TimeSeries {
    let target = render_legend(&sample.metric, legend_format);
    let datapoints = sample
        .values
        .into_iter()
        .map(|(timestamp, value)| {
            (value.parse::<f64>().unwrap_or(f64::NAN), (timestamp * 1000.0) as i64)
        })
        .collect();
    TimeSeries { target, datapoints }
}
