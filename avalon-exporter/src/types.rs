//! Core data types shared across the poller, store, and exposition layers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One miner endpoint under observation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Flat metric namespace for one miner. BTreeMap keeps exposition output
/// deterministic without a separate sort pass.
pub type MetricSet = BTreeMap<String, f64>;

/// One upstream pool slot: a label set plus the metrics scoped to it.
///
/// Records for the same pool index are merged from two protocol sections
/// (connection-level `pools` and transport-level `stats`), so fields from
/// either source must survive construction from the other.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoolRecord {
    pub labels: BTreeMap<String, String>,
    pub metrics: MetricSet,
}

/// One per-chip sample, emitted only when per-chip export is enabled.
#[derive(Clone, Debug, PartialEq)]
pub struct ChipRecord {
    /// Zero-padded chip index, e.g. "007".
    pub chip: String,
    /// Metric name, e.g. "avalon_chip_temp_celsius".
    pub name: &'static str,
    pub value: f64,
}

/// Static identity of one miner, from the `version` section.
///
/// Always a complete fixed-shape record; fields the miner didn't report
/// stay empty strings. Unlike the dynamic collections this survives failed
/// polls (identity rarely changes and is useful context while down).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VersionInfo {
    pub model: String,
    pub prod: String,
    pub firmware: String,
    pub cgminer: String,
    pub api: String,
    pub hwtype: String,
    pub swtype: String,
    pub dna: String,
    pub mac: String,
}

impl VersionInfo {
    /// True when the decoder found nothing at all; an empty record never
    /// overwrites previously known identity.
    pub fn is_empty(&self) -> bool {
        self.label_pairs().iter().all(|(_, v)| v.is_empty())
    }

    /// Field name/value pairs in exposition label order.
    pub fn label_pairs(&self) -> [(&'static str, &str); 9] {
        [
            ("model", &self.model),
            ("prod", &self.prod),
            ("firmware", &self.firmware),
            ("cgminer", &self.cgminer),
            ("api", &self.api),
            ("hwtype", &self.hwtype),
            ("swtype", &self.swtype),
            ("dna", &self.dna),
            ("mac", &self.mac),
        ]
    }
}
