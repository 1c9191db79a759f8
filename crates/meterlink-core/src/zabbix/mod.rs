//! Monitoring backend support: the session-aware JSON-RPC client, entity
//! resolution, and history/trend aggregation.

pub mod client;
pub mod history;
pub mod resolver;
pub mod types;

pub use client::ZabbixClient;
pub use history::HistoryAggregator;
pub use resolver::{expand_item_name, EntityResolver};
pub use types::{
    Application, HistoryPoint, Host, HostGroup, Item, NameFilter, TrendPoint, ValueType,
};
