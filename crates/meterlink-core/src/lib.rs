//! # Meterlink Core
//!
//! Core library for the Meterlink datasource bridge. It lets a dashboard run
//! issue time-range queries against two different monitoring backends without
//! the caller knowing backend-specific query syntax, authentication, or
//! result shapes:
//!
//! - **[`prometheus`]**: range-query translation for a Prometheus-style
//!   metrics API with two incompatible protocol dialects, including step
//!   calibration, response normalization, and legend templating.
//!
//! - **[`zabbix`]**: a session-aware JSON-RPC client for a Zabbix-style
//!   monitoring API with transparent re-login, hierarchical name-to-id
//!   resolution (group → host → application → item), and history/trend
//!   aggregation batched by item value type.
//!
//! - **[`transport`]**: the shared reqwest-backed HTTP layer both clients
//!   dispatch through.
//!
//! - **[`config`]**: layered datasource configuration (defaults → TOML →
//!   environment overrides).
//!
//! ## Request Flow
//!
//! ```text
//! Panel query
//!      │
//!      ├── metrics path ──► RangeParams ──► MetricsQueryClient ──► HttpTransport
//!      │                    (step calibration)      │
//!      │                                            ▼
//!      │                                   protocol normalization
//!      │                                            │
//!      │                                            ▼
//!      │                                   legend rendering ──► TimeSeries
//!      │
//!      └── monitoring path ──► EntityResolver ──► HistoryAggregator
//!                                   │                  │
//!                                   ▼                  ▼
//!                              ZabbixClient (JSON-RPC, auto re-login)
//! ```
//!
//! Fan-out calls are joined with wait-for-all, fail-on-first-error
//! semantics; result order is positional with respect to request order.

pub mod config;
pub mod error;
pub mod prometheus;
pub mod transport;
pub mod types;
pub mod zabbix;

pub use error::DatasourceError;
