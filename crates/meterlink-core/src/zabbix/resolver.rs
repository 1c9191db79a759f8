//! Hierarchical name-to-id resolution against the monitoring backend.
//!
//! Human-entered group/host/application names cascade into backend ids
//! (group → host → application), which then feed a single filtered item
//! lookup. Each step performs a fresh lookup; nothing is cached.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::DatasourceError;
use crate::zabbix::client::ZabbixClient;
use crate::zabbix::types::{Application, Host, HostGroup, Item, NameFilter};

/// Resolver for the group → host → application → item cascade.
pub struct EntityResolver {
    client: Arc<ZabbixClient>,
}

impl EntityResolver {
    #[must_use]
    pub fn new(client: Arc<ZabbixClient>) -> Self {
        Self { client }
    }

    /// Fetches host groups by exact name, or all groups for the
    /// wildcard-all sentinel.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn get_groups(&self, filter: &NameFilter) -> Result<Vec<HostGroup>, DatasourceError> {
        let mut params = json_map(&[("output", json!(["name"]))]);
        apply_name_filter(&mut params, filter);
        self.fetch("hostgroup.get", params).await
    }

    /// Fetches hosts by exact name, or all hosts for the wildcard-all
    /// sentinel.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn get_hosts(&self, filter: &NameFilter) -> Result<Vec<Host>, DatasourceError> {
        let mut params = json_map(&[("output", json!(["host", "name"]))]);
        apply_name_filter(&mut params, filter);
        self.fetch("host.get", params).await
    }

    /// Fetches applications by exact name, or all applications for the
    /// wildcard-all sentinel.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn get_applications(
        &self,
        filter: &NameFilter,
    ) -> Result<Vec<Application>, DatasourceError> {
        let mut params = json_map(&[("output", json!(["name"]))]);
        apply_name_filter(&mut params, filter);
        self.fetch("application.get", params).await
    }

    /// Searches groups by pattern with backend-side wildcard expansion.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn search_groups(&self, pattern: &str) -> Result<Vec<HostGroup>, DatasourceError> {
        let params = json_map(&[
            ("output", json!(["name"])),
            ("search", json!({ "name": pattern })),
            ("searchWildcardsEnabled", json!(true)),
        ]);
        self.fetch("hostgroup.get", params).await
    }

    /// Lists host groups for editor suggestions: only groups containing
    /// monitored hosts.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn suggest_groups(&self) -> Result<Vec<HostGroup>, DatasourceError> {
        let params = json_map(&[
            ("output", json!(["name"])),
            ("sortfield", json!("name")),
            ("real_hosts", json!(true)),
            ("monitored_hosts", json!(true)),
        ]);
        self.fetch("hostgroup.get", params).await
    }

    /// Lists monitored hosts with numeric items for editor suggestions,
    /// optionally restricted to the given groups.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn suggest_hosts(
        &self,
        groupids: Option<&[String]>,
    ) -> Result<Vec<Host>, DatasourceError> {
        let mut params = json_map(&[
            ("output", json!(["name", "host"])),
            ("sortfield", json!("name")),
            ("with_simple_graph_items", json!(true)),
            ("monitored_hosts", json!(true)),
        ]);
        if let Some(groupids) = groupids {
            params.insert("groupids".to_string(), json!(groupids));
        }
        self.fetch("host.get", params).await
    }

    /// Lists applications for editor suggestions, restricted to hosts or,
    /// failing that, to groups.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn suggest_applications(
        &self,
        hostids: Option<&[String]>,
        groupids: Option<&[String]>,
    ) -> Result<Vec<Application>, DatasourceError> {
        let mut params =
            json_map(&[("output", json!(["name"])), ("sortfield", json!("name"))]);
        if let Some(hostids) = hostids {
            params.insert("hostids".to_string(), json!(hostids));
        } else if let Some(groupids) = groupids {
            params.insert("groupids".to_string(), json!(groupids));
        }
        self.fetch("application.get", params).await
    }

    /// Single filtered item lookup: enabled, numeric-typed items matched
    /// by any of the given id filters (`searchByAny` semantics).
    ///
    /// When no host filter (or more than one host) is in scope, each
    /// item's owning host name is requested for later display
    /// disambiguation.
    ///
    /// # Errors
    ///
    /// Propagates RPC and response-shape errors.
    pub async fn suggest_items(
        &self,
        hostids: Option<&[String]>,
        applicationids: Option<&[String]>,
        groupids: Option<&[String]>,
    ) -> Result<Vec<Item>, DatasourceError> {
        let mut params = json_map(&[
            ("output", json!(["name", "key_", "value_type", "delay"])),
            ("sortfield", json!("name")),
            ("webitems", json!(true)),
            // Numeric float and unsigned history tables only.
            ("filter", json!({ "value_type": [0, 3] })),
            ("monitored", json!(true)),
            ("searchByAny", json!(true)),
        ]);

        if let Some(hostids) = hostids {
            params.insert("hostids".to_string(), json!(hostids));
        } else if let Some(groupids) = groupids {
            params.insert("groupids".to_string(), json!(groupids));
        }
        if let Some(applicationids) = applicationids {
            params.insert("applicationids".to_string(), json!(applicationids));
        }
        if hostids.map_or(true, |ids| ids.len() > 1) {
            params.insert("selectHosts".to_string(), json!(["name"]));
        }

        self.fetch("item.get", params).await
    }

    /// Resolves names down the full cascade and returns matching items.
    ///
    /// Hosts take precedence over groups for the primary id filter:
    /// explicit host names (other than wildcard-all) are resolved to host
    /// ids; otherwise group names are resolved to group ids. Application
    /// names are resolved independently and concurrently.
    ///
    /// # Errors
    ///
    /// Fails on the first lookup error (no partial cascade).
    pub async fn find_items(
        &self,
        groups: Option<&NameFilter>,
        hosts: Option<&NameFilter>,
        apps: Option<&NameFilter>,
    ) -> Result<Vec<Item>, DatasourceError> {
        let (hostids, groupids, applicationids) =
            self.resolve_scope(groups, hosts, apps).await?;

        tracing::debug!(
            hosts = hostids.as_ref().map_or(0, Vec::len),
            groups = groupids.as_ref().map_or(0, Vec::len),
            applications = applicationids.as_ref().map_or(0, Vec::len),
            "resolved item lookup scope"
        );

        self.suggest_items(hostids.as_deref(), applicationids.as_deref(), groupids.as_deref())
            .await
    }

    /// Resolves names one level short of items and returns matching
    /// applications.
    ///
    /// # Errors
    ///
    /// Fails on the first lookup error.
    pub async fn find_applications(
        &self,
        hosts: Option<&NameFilter>,
        groups: Option<&NameFilter>,
    ) -> Result<Vec<Application>, DatasourceError> {
        let (hostids, groupids, _) = self.resolve_scope(groups, hosts, None).await?;
        self.suggest_applications(hostids.as_deref(), groupids.as_deref()).await
    }

    /// Resolves group names and returns the hosts they contain.
    ///
    /// # Errors
    ///
    /// Fails on the first lookup error.
    pub async fn find_hosts(&self, groups: &NameFilter) -> Result<Vec<Host>, DatasourceError> {
        let resolved = self.get_groups(groups).await?;
        let groupids: Vec<String> = resolved.into_iter().map(|group| group.groupid).collect();
        self.suggest_hosts(Some(&groupids)).await
    }

    /// Resolves the host/group primary filter and the independent
    /// application filter into id lists.
    async fn resolve_scope(
        &self,
        groups: Option<&NameFilter>,
        hosts: Option<&NameFilter>,
        apps: Option<&NameFilter>,
    ) -> ScopeIds {
        let host_filter = hosts.filter(|filter| !filter.is_all());

        let primary = async {
            let (hostids, groupids) = if let Some(filter) = host_filter {
                let hosts = self.get_hosts(filter).await?;
                (Some(hosts.into_iter().map(|h| h.hostid).collect::<Vec<_>>()), None)
            } else if let Some(filter) = groups {
                let groups = self.get_groups(filter).await?;
                (None, Some(groups.into_iter().map(|g| g.groupid).collect::<Vec<_>>()))
            } else {
                (None, None)
            };
            Ok::<_, DatasourceError>((hostids, groupids))
        };

        let applications = async {
            let applicationids = match apps {
                Some(filter) => {
                    let apps = self.get_applications(filter).await?;
                    Some(apps.into_iter().map(|a| a.applicationid).collect::<Vec<_>>())
                }
                None => None,
            };
            Ok::<_, DatasourceError>(applicationids)
        };

        let ((hostids, groupids), applicationids) =
            tokio::try_join!(primary, applications)?;
        Ok((hostids, groupids, applicationids))
    }

    async fn fetch<T: DeserializeOwned>(
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

type ScopeIds =
    Result<(Option<Vec<String>>, Option<Vec<String>>, Option<Vec<String>>), DatasourceError>;

fn json_map(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
}

fn apply_name_filter(params: &mut Map<String, Value>, filter: &NameFilter) {
    if let Some(names) = filter.names() {
        params.insert("filter".to_string(), json!({ "name": names }));
    }
}

/// Expands positional `$N` placeholders in an item's display name with the
/// comma-separated parameters between the first `[` and last `]` of its
/// key: `CPU $2 time ($3)` + `system.cpu.util[,system,avg1]` becomes
/// `CPU system time (avg1)`.
///
/// Substitution runs from the highest index down so `$1` never matches
/// inside `$10`.
#[must_use]
pub fn expand_item_name(item: &Item) -> String {
    let (Some(open), Some(close)) = (item.key.find('['), item.key.rfind(']')) else {
        return item.name.clone();
    };
    if open + 1 > close {
        return item.name.clone();
    }

    let params: Vec<&str> = item.key[open + 1..close].split(',').collect();
    let mut name = item.name.clone();
    for index in (1..=params.len()).rev() {
        name = name.replacen(&format!("${index}"), params[index - 1], 1);
    }
    name
}
