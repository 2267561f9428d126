//! Exporter configuration, loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Result, bail};

use crate::types::Target;

/// One-shot combined command: every section in a single TCP round trip,
/// so each miner costs one connection per cycle.
pub const COMBINED_CMD: &str = "version+summary+stats+config+devs+devdetails+pools";

/// Raw chip voltage units per volt (e.g. 303 -> 3.03 V).
pub const VOLTAGE_DIVISOR: f64 = 100.0;

/// Poller is unhealthy once the heartbeat is older than this many intervals.
pub const HEALTH_CHECK_MULTIPLIER: f64 = 3.0;

/// Floor for the heartbeat staleness threshold.
pub const MIN_HEALTH_CHECK_THRESHOLD: Duration = Duration::from_secs(30);

/// How long a poll cycle waits for stragglers: `GRACE_FACTOR * miner_timeout`.
pub const GRACE_FACTOR: u32 = 2;

#[derive(Clone, Debug)]
pub struct Config {
    /// Miners to poll. Immutable after startup.
    pub targets: Vec<Target>,

    /// Poll cadence.
    pub update_interval: Duration,

    /// HTTP listen port for the exposition endpoint.
    pub exporter_port: u16,

    /// Per-call TCP timeout to the miner API.
    pub miner_timeout: Duration,

    /// Export one series per chip. Off by default: chip counts run into the
    /// hundreds per miner, so this multiplies cardinality.
    pub export_chip_metrics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            update_interval: Duration::from_secs(10),
            exporter_port: 9100,
            miner_timeout: Duration::from_secs(5),
            export_chip_metrics: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `AVALON_IPS` (comma-separated) wins over `AVALON_IP`; one of the two
    /// is required. All values are validated here so the daemon fails at
    /// startup rather than mid-cycle.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any key -> value lookup. `from_env` passes the
    /// process environment; tests pass a fixed map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = parse_var(&lookup, "AVALON_PORT", 4028u16)?;
        let update_interval = parse_var(&lookup, "UPDATE_INTERVAL", 10.0f64)?;
        let exporter_port = parse_var(&lookup, "EXPORTER_PORT", 9100u16)?;
        let miner_timeout = parse_var(&lookup, "MINER_TIMEOUT", 5.0f64)?;
        let export_chip_metrics = flag_var(&lookup, "EXPORT_CHIP_METRICS");

        if update_interval <= 0.0 {
            bail!("UPDATE_INTERVAL must be > 0, got {update_interval}");
        }
        if miner_timeout <= 0.0 {
            bail!("MINER_TIMEOUT must be > 0, got {miner_timeout}");
        }
        if port == 0 {
            bail!("AVALON_PORT must be between 1 and 65535");
        }
        if exporter_port == 0 {
            bail!("EXPORTER_PORT must be between 1 and 65535");
        }

        let targets = targets_from(&lookup, port)?;

        Ok(Self {
            targets,
            update_interval: Duration::from_secs_f64(update_interval),
            exporter_port,
            miner_timeout: Duration::from_secs_f64(miner_timeout),
            export_chip_metrics,
        })
    }

    /// Heartbeat age beyond which the poller is considered stuck.
    pub fn health_threshold(&self) -> Duration {
        self.update_interval
            .mul_f64(HEALTH_CHECK_MULTIPLIER)
            .max(MIN_HEALTH_CHECK_THRESHOLD)
    }

    /// How long one cycle waits for all pollers before moving on.
    pub fn cycle_grace(&self) -> Duration {
        self.miner_timeout * GRACE_FACTOR
    }
}

fn targets_from(lookup: &impl Fn(&str) -> Option<String>, port: u16) -> Result<Vec<Target>> {
    let many = lookup("AVALON_IPS").unwrap_or_default();
    let single = lookup("AVALON_IP").unwrap_or_default();

    let hosts: Vec<&str> = if !many.trim().is_empty() {
        many.split(',').map(str::trim).filter(|h| !h.is_empty()).collect()
    } else if !single.trim().is_empty() {
        vec![single.trim()]
    } else {
        bail!(
            "You must set AVALON_IPS (comma-separated) or AVALON_IP \
             to tell the exporter which miner(s) to scrape."
        );
    };

    let mut targets = Vec::with_capacity(hosts.len());
    for host in hosts {
        if host.len() > 253 {
            bail!("Invalid hostname/IP: {host}");
        }
        targets.push(Target::new(host, port));
    }
    Ok(targets)
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => bail!("{name} is not a valid value: {raw}"),
        },
        None => Ok(default),
    }
}

/// Truthy flag: 1/true/yes/on, case-insensitive.
fn flag_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> bool {
    matches!(
        lookup(name).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
