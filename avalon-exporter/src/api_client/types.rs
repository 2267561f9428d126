//! API data transfer objects.
//!
//! These types define the API contract shared between the server and
//! clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `/version`.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
    pub exporter: String,
}

/// Body of `/debug`: the exporter's full internal state.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct DebugInfo {
    pub version: String,
    /// Unix time the report was built.
    pub timestamp: f64,
    pub configuration: DebugConfig,
    pub targets: Vec<TargetAddr>,
    pub poller: PollerDebug,
    pub miners: BTreeMap<String, MinerDebug>,
}

/// Effective configuration, echoed for diagnosis.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct DebugConfig {
    pub update_interval_secs: f64,
    pub exporter_port: u16,
    pub miner_timeout_secs: f64,
    pub export_chip_metrics: bool,
}

/// One configured miner address.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct TargetAddr {
    pub ip: String,
    pub port: u16,
}

/// Poller loop liveness.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct PollerDebug {
    /// Unix time of the last cycle start, if any.
    pub last_heartbeat: Option<f64>,
    pub heartbeat_age_seconds: Option<f64>,
    pub shutdown_requested: bool,
}

/// Per-miner health state.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct MinerDebug {
    pub up: bool,
    pub last_update: Option<f64>,
    pub last_update_age_seconds: Option<f64>,
    pub last_error: Option<String>,
    pub scrape_errors_total: u64,
    pub scrape_duration_seconds: Option<f64>,
    pub has_metrics: bool,
    pub has_pools: bool,
    pub has_chips: bool,
    pub has_version_info: bool,
}
