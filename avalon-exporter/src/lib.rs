//! Prometheus exporter for Avalon Home-series ASIC miners.
//!
//! The exporter polls miners over the CGMiner TCP API, decodes the
//! semi-structured reply into typed metrics, and republishes them in the
//! Prometheus text exposition format over HTTP.

pub mod api;
pub mod api_client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod exposition;
pub mod poller;
pub mod protocol;
pub mod scheduler;
pub mod store;
pub mod types;

/// Exporter version, reported on `/version` and as the info metric label.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
