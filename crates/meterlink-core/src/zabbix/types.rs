//! Read-only projections of monitoring-backend entities.
//!
//! Entities are fetched on demand; the core holds no long-lived cache, so
//! every resolution sees fresh backend state. The backend serializes ids
//! and numeric fields as decimal strings, which these types preserve.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Host group: the top of the resolution cascade.
#[derive(Debug, Clone, Deserialize)]
pub struct HostGroup {
    pub groupid: String,
    pub name: String,
}

/// Monitored host.
#[derive(Debug, Clone, Deserialize)]
pub struct Host {
    pub hostid: String,
    pub name: String,
    /// Technical host name, present on suggestion queries.
    #[serde(default)]
    pub host: Option<String>,
}

/// Application grouping items on a host.
#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    pub applicationid: String,
    pub name: String,
}

/// Owning-host reference attached to items when more than one host is in
/// scope.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemHost {
    pub name: String,
}

/// A monitored item: the leaf of the resolution cascade.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub itemid: String,
    /// Display name, possibly containing positional `$N` placeholders
    /// expanded from the key parameters.
    pub name: String,
    /// Item key, e.g. `system.cpu.util[,system,avg1]`.
    #[serde(rename = "key_")]
    pub key: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub delay: Option<String>,
    /// Owning hosts, requested for disambiguation when multiple hosts are
    /// in scope.
    #[serde(default)]
    pub hosts: Vec<ItemHost>,
}

/// Backend-side classification of an item's data kind, determining which
/// history/trend table it lives in. Serialized as a decimal string by the
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    NumericFloat,
    Character,
    Log,
    NumericUnsigned,
    Text,
}

impl ValueType {
    /// Backend wire code for this value type.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::NumericFloat => 0,
            Self::Character => 1,
            Self::Log => 2,
            Self::NumericUnsigned => 3,
            Self::Text => 4,
        }
    }

    /// Whether the type lives in a numeric history table.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::NumericFloat | Self::NumericUnsigned)
    }

    fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::NumericFloat),
            1 => Some(Self::Character),
            2 => Some(Self::Log),
            3 => Some(Self::NumericUnsigned),
            4 => Some(Self::Text),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let code = match &value {
            Value::String(s) => s.parse::<u64>().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        };
        code.and_then(Self::from_code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown value type: {value}")))
    }
}

/// One history sample. `clock` is epoch seconds and `value` the raw
/// stringified reading, both as the backend sends them.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HistoryPoint {
    pub itemid: String,
    pub clock: String,
    pub value: String,
}

impl HistoryPoint {
    /// Sample time in epoch seconds.
    #[must_use]
    pub fn clock_secs(&self) -> Option<i64> {
        self.clock.parse().ok()
    }

    /// Sample value as a float, when the item is numeric.
    #[must_use]
    pub fn value_f64(&self) -> Option<f64> {
        self.value.parse().ok()
    }
}

/// One trend row: per-interval min/avg/max aggregates.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TrendPoint {
    pub itemid: String,
    pub clock: String,
    #[serde(default)]
    pub num: Option<String>,
    pub value_min: String,
    pub value_avg: String,
    pub value_max: String,
}

/// A name filter for entity lookups: either the wildcard-all sentinel
/// (`*`, no filter applied) or an exact name list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFilter {
    All,
    Names(Vec<String>),
}

/// Wildcard-all sentinel accepted in name patterns.
pub const WILDCARD_ALL: &str = "*";

impl NameFilter {
    /// Builds a filter from a single user-entered pattern.
    #[must_use]
    pub fn from_pattern(pattern: &str) -> Self {
        if pattern == WILDCARD_ALL {
            Self::All
        } else {
            Self::Names(vec![pattern.to_string()])
        }
    }

    /// Builds a filter from an explicit name list. A lone `*` is the
    /// wildcard-all sentinel; a list of several names is always exact.
    #[must_use]
    pub fn from_names(names: Vec<String>) -> Self {
        match names.as_slice() {
            [single] if single == WILDCARD_ALL => Self::All,
            _ => Self::Names(names),
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Exact names, or `None` for the wildcard-all sentinel.
    #[must_use]
    pub fn names(&self) -> Option<&[String]> {
        match self {
            Self::All => None,
            Self::Names(names) => Some(names),
        }
    }
}
