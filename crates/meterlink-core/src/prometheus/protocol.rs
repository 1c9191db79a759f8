//! Protocol dialect abstraction for the metrics backend.
//!
//! The backend speaks two incompatible protocol versions. Rather than
//! branching ad hoc at every call site, each dialect exposes a uniform
//! build-request / parse-response pair, and the client depends only on
//! that surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::DatasourceError;
use crate::prometheus::range::RangeParams;

/// A single metric result from a range or instant query: a label set and
/// `(epoch-seconds, stringified-value)` sample pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricSample {
    #[serde(default)]
    pub metric: serde_json::Map<String, Value>,
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

/// Metrics-backend protocol version.
///
/// - [`V1`](Self::V1) (legacy): absolute `start`/`end` range queries under
///   `/api/v1/...`, results nested under `data.result`, errors flagged via
///   `status: "error"`.
/// - [`V2`](Self::V2) (newer): relative `range`/`end` queries under
///   `/api/...`, results nested under `value`, errors flagged via
///   `type: "error"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2")]
    V2,
}

impl ApiVersion {
    /// Builds the range-query URL for this dialect.
    ///
    /// Both dialects derive their parameters from the same
    /// [`RangeParams`]; only the wire encoding differs.
    ///
    /// # Errors
    ///
    /// Returns [`DatasourceError::InvalidRequest`] if `base` is not a
    /// valid URL.
    pub fn range_query_url(
        &self,
        base: &str,
        expr: &str,
        params: RangeParams,
    ) -> Result<Url, DatasourceError> {
        let mut url = match self {
            Self::V1 => {
                let mut url = parse_base(base, "/api/v1/query_range")?;
                url.query_pairs_mut()
                    .append_pair("query", expr)
                    .append_pair("start", &params.start.to_string())
                    .append_pair("end", &params.end.to_string());
                url
            }
            Self::V2 => {
                let mut url = parse_base(base, "/api/query_range")?;
                url.query_pairs_mut()
                    .append_pair("expr", expr)
                    .append_pair("range", &params.range_secs().to_string())
                    .append_pair("end", &params.end.to_string());
                url
            }
        };
        url.query_pairs_mut().append_pair("step", &params.step.to_string());
        Ok(url)
    }

    /// Builds the instant (literal expression) query URL.
    ///
    /// # Errors
    ///
    /// Returns [`DatasourceError::InvalidRequest`] if `base` is not a
    /// valid URL.
    pub fn instant_query_url(&self, base: &str, expr: &str) -> Result<Url, DatasourceError> {
        let (path, param) = match self {
            Self::V1 => ("/api/v1/query", "query"),
            Self::V2 => ("/api/query", "expr"),
        };
        let mut url = parse_base(base, path)?;
        url.query_pairs_mut().append_pair(param, expr);
        Ok(url)
    }

    /// Builds the metric-name suggestion URL.
    ///
    /// # Errors
    ///
    /// Returns [`DatasourceError::InvalidRequest`] if `base` is not a
    /// valid URL.
    pub fn suggest_url(&self, base: &str) -> Result<Url, DatasourceError> {
        match self {
            Self::V1 => parse_base(base, "/api/v1/label/__name__/values"),
            Self::V2 => parse_base(base, "/api/metrics"),
        }
    }

    /// Builds the distinct-label-values URL. Only the legacy dialect
    /// exposes a label endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DatasourceError::InvalidRequest`] for the newer dialect,
    /// or if `base` is not a valid URL.
    pub fn label_values_url(&self, base: &str, label: &str) -> Result<Url, DatasourceError> {
        match self {
            Self::V1 => parse_base(base, &format!("/api/v1/label/{label}/values")),
            Self::V2 => Err(DatasourceError::InvalidRequest(
                "label value lookup is not supported by this API version".to_string(),
            )),
        }
    }

    /// Extracts the metric result list from a query response body,
    /// surfacing backend-reported query errors.
    ///
    /// # Errors
    ///
    /// Returns [`DatasourceError::Query`] when the body flags an error,
    /// or [`DatasourceError::InvalidResponse`] when the expected result
    /// nesting is missing.
    pub fn parse_query_response(&self, body: &Value) -> Result<Vec<MetricSample>, DatasourceError> {
        let result = self.unwrap_result_list(body)?;
        serde_json::from_value(Value::Array(result))
            .map_err(|e| DatasourceError::InvalidResponse(format!("malformed metric result: {e}")))
    }

    /// Extracts the metric-name list from a suggestion response body.
    ///
    /// # Errors
    ///
    /// Returns [`DatasourceError::InvalidResponse`] when the body is not
    /// a name array in this dialect's nesting.
    pub fn parse_suggest_response(&self, body: &Value) -> Result<Vec<String>, DatasourceError> {
        let names = match self {
            Self::V1 => body.get("data"),
            Self::V2 => Some(body),
        };
        names
            .and_then(Value::as_array)
            .map(|list| {
                list.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .ok_or_else(|| {
                DatasourceError::InvalidResponse("suggestion response is not a name list".into())
            })
    }

    fn unwrap_result_list(&self, body: &Value) -> Result<Vec<Value>, DatasourceError> {
        match self {
            Self::V1 => {
                if body.get("status").and_then(Value::as_str) == Some("error") {
                    let message = body
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown query error");
                    return Err(DatasourceError::Query(message.to_string()));
                }
                body.get("data")
                    .and_then(|data| data.get("result"))
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| {
                        DatasourceError::InvalidResponse("missing data.result".to_string())
                    })
            }
            Self::V2 => {
                if body.get("type").and_then(Value::as_str) == Some("error") {
                    let message = match body.get("value") {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => "unknown query error".to_string(),
                    };
                    return Err(DatasourceError::Query(message));
                }
                body.get("value").and_then(Value::as_array).cloned().ok_or_else(|| {
                    DatasourceError::InvalidResponse("missing value list".to_string())
                })
            }
        }
    }
}

fn parse_base(base: &str, path: &str) -> Result<Url, DatasourceError> {
    Url::parse(&format!("{base}{path}"))
        .map_err(|e| DatasourceError::InvalidRequest(format!("invalid backend URL: {e}")))
}
