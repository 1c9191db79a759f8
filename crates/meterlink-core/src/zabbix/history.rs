//! Raw history and trend retrieval.
//!
//! The backend stores samples in per-value-type tables, so a mixed item
//! set requires one RPC call per distinct value type. The aggregator
//! partitions item ids, fires the calls concurrently, and concatenates
//! the results.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::DatasourceError;
use crate::zabbix::client::ZabbixClient;
use crate::zabbix::types::{HistoryPoint, Item, TrendPoint, ValueType};

/// Fetches history and trend samples for heterogeneous item sets.
pub struct HistoryAggregator {
    client: Arc<ZabbixClient>,
}

impl HistoryAggregator {
    #[must_use]
    pub fn new(client: Arc<ZabbixClient>) -> Self {
        Self { client }
    }

    /// Fetches raw history samples for the given items between `start`
    /// and (optionally) `end`, both epoch seconds.
    ///
    /// Within each value-type partition the backend returns samples in
    /// ascending clock order; partitions are concatenated in ascending
    /// value-type order.
    ///
    /// # Errors
    ///
    /// Fails on the first RPC error; no partial result is returned.
    pub async fn fetch_history(
        &self,
        items: &[Item],
        start: i64,
        end: Option<i64>,
    ) -> Result<Vec<HistoryPoint>, DatasourceError> {
        self.fetch_partitioned("history.get", "history", items, start, end).await
    }

    /// Fetches trend rows (per-interval min/avg/max aggregates) for the
    /// given items. Partitioning and ordering match [`fetch_history`].
    ///
    /// # Errors
    ///
    /// Fails on the first RPC error; no partial result is returned.
    ///
    /// [`fetch_history`]: Self::fetch_history
    pub async fn fetch_trends(
        &self,
        items: &[Item],
        start: i64,
        end: Option<i64>,
    ) -> Result<Vec<TrendPoint>, DatasourceError> {
        self.fetch_partitioned("trend.get", "trend", items, start, end).await
    }

    async fn fetch_partitioned<T: DeserializeOwned>(
        &self,
        method: &str,
        type_param: &str,
        items: &[Item],
        start: i64,
        end: Option<i64>,
    ) -> Result<Vec<T>, DatasourceError> {
        let partitions = partition_by_value_type(items);
        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            method = %method,
            partitions = partitions.len(),
            items = items.len(),
            "fetching samples"
        );

        let calls = partitions.iter().map(|(value_type, itemids)| {
            let params = sample_params(type_param, *value_type, itemids, start, end);
            self.fetch_one(method, params)
        });

        let batches: Vec<Vec<T>> = futures::future::try_join_all(calls).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Vec<T>, DatasourceError> {
        let result = self.client.call(method, Value::Object(params)).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(result).map_err(|e| {
            DatasourceError::InvalidResponse(format!("malformed {method} result: {e}"))
        })
    }
}

/// Groups item ids by value type. `BTreeMap` keeps the partitions in
/// ascending value-type order so output ordering is deterministic.
fn partition_by_value_type(items: &[Item]) -> BTreeMap<ValueType, Vec<&str>> {
    let mut partitions: BTreeMap<ValueType, Vec<&str>> = BTreeMap::new();
    for item in items {
        partitions.entry(item.value_type).or_default().push(&item.itemid);
    }
    partitions
}

fn sample_params(
    type_param: &str,
    value_type: ValueType,
    itemids: &[&str],
    start: i64,
    end: Option<i64>,
) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("output".to_string(), json!("extend"));
    params.insert(type_param.to_string(), json!(value_type.code()));
    params.insert("itemids".to_string(), json!(itemids));
    params.insert("sortfield".to_string(), json!("clock"));
    params.insert("sortorder".to_string(), json!("ASC"));
    params.insert("time_from".to_string(), json!(start));
    if let Some(end) = end {
        params.insert("time_till".to_string(), json!(end));
    }
    params
}
