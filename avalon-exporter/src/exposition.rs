//! Prometheus text exposition (format 0.0.4) of a store snapshot.
//!
//! Rendering operates on an owned snapshot; the store lock is never held
//! here. Output is deterministic: targets render in configured order,
//! per-miner metric sets iterate sorted.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use strum::IntoEnumIterator;

use crate::config::Config;
use crate::error::ErrorCategory;
use crate::store::Snapshot;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

fn unix_secs(t: SystemTime) -> f64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Label values are normalized, not escaped: embedded quotes become
/// apostrophes so the output line stays well-formed.
fn normalize(value: &str) -> String {
    value.replace('"', "'")
}

fn label_str(ip: &str, extra: &BTreeMap<String, String>) -> String {
    let mut parts = vec![format!("ip=\"{}\"", normalize(ip))];
    for (key, value) in extra {
        parts.push(format!("{key}=\"{}\"", normalize(value)));
    }
    parts.join(",")
}

/// Render one snapshot as exposition text.
pub fn render(snapshot: &Snapshot, config: &Config, now: SystemTime) -> String {
    let now_secs = unix_secs(now);
    let mut lines: Vec<String> = Vec::new();

    lines.push("# HELP avalon_exporter_info Exporter version information.".into());
    lines.push("# TYPE avalon_exporter_info gauge".into());
    lines.push(format!(
        "avalon_exporter_info{{version=\"{}\"}} 1",
        crate::VERSION
    ));
    lines.push("# HELP avalon_scrape_duration_seconds Duration of the last scrape in seconds.".into());
    lines.push("# TYPE avalon_scrape_duration_seconds gauge".into());

    lines.push("# HELP avalon_up Was the last scrape of the Avalon miner successful.".into());
    lines.push("# TYPE avalon_up gauge".into());
    lines.push("# HELP avalon_last_scrape_timestamp_seconds Unix time of last successful scrape.".into());
    lines.push("# TYPE avalon_last_scrape_timestamp_seconds gauge".into());
    lines.push("# HELP avalon_down_duration_seconds How long the miner has been down (seconds).".into());
    lines.push("# TYPE avalon_down_duration_seconds gauge".into());
    lines.push("# HELP avalon_scrape_errors_total Total number of scrape errors for this miner.".into());
    lines.push("# TYPE avalon_scrape_errors_total counter".into());
    for category in ErrorCategory::iter() {
        let name = format!("avalon_scrape_errors_{category}_total");
        lines.push(format!(
            "# HELP {name} Total number of {category} scrape errors for this miner."
        ));
        lines.push(format!("# TYPE {name} counter"));
    }
    lines.push("# HELP avalon_status_changes_total Total number of up/down status changes for this miner.".into());
    lines.push("# TYPE avalon_status_changes_total counter".into());
    lines.push("# HELP avalon_status_ups_total Total number of transitions to UP for this miner.".into());
    lines.push("# TYPE avalon_status_ups_total counter".into());
    lines.push("# HELP avalon_status_downs_total Total number of transitions to DOWN for this miner.".into());
    lines.push("# TYPE avalon_status_downs_total counter".into());

    for target in &config.targets {
        let ip = normalize(&target.host);
        let entry = snapshot.targets.get(&target.host).cloned().unwrap_or_default();

        let up = if entry.up == Some(true) { 1.0 } else { 0.0 };
        let updated = entry.last_success.map(unix_secs).unwrap_or(0.0);
        let down_for = if up == 0.0 && updated > 0.0 {
            (now_secs - updated).max(0.0)
        } else {
            0.0
        };
        let duration = entry
            .last_duration
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        lines.push(format!("avalon_up{{ip=\"{ip}\"}} {up}"));
        lines.push(format!(
            "avalon_last_scrape_timestamp_seconds{{ip=\"{ip}\"}} {updated}"
        ));
        lines.push(format!(
            "avalon_down_duration_seconds{{ip=\"{ip}\"}} {down_for}"
        ));
        lines.push(format!(
            "avalon_scrape_duration_seconds{{ip=\"{ip}\"}} {duration}"
        ));
        lines.push(format!(
            "avalon_scrape_errors_total{{ip=\"{ip}\"}} {}",
            entry.errors.total
        ));
        for category in ErrorCategory::iter() {
            lines.push(format!(
                "avalon_scrape_errors_{category}_total{{ip=\"{ip}\"}} {}",
                entry.errors.get(category)
            ));
        }
        for (name, value) in [
            ("avalon_status_changes_total", entry.transitions.changes),
            ("avalon_status_ups_total", entry.transitions.ups),
            ("avalon_status_downs_total", entry.transitions.downs),
        ] {
            lines.push(format!("{name}{{ip=\"{ip}\"}} {value}"));
        }
    }

    // Per-miner dynamic metric sets.
    for (host, entry) in &snapshot.targets {
        let Some(samples) = &entry.samples else { continue };
        let ip = normalize(host);
        for (name, value) in &samples.metrics {
            lines.push(format!("{name}{{ip=\"{ip}\"}} {value}"));
        }
    }

    // Per-chip series, opt-in because the cardinality scales with chips.
    if config.export_chip_metrics {
        lines.push("# HELP avalon_chip_temp_celsius Per-chip temperature derived from PVT_T0 (if present).".into());
        lines.push("# TYPE avalon_chip_temp_celsius gauge".into());
        lines.push("# HELP avalon_chip_voltage_volts Per-chip voltage derived from PVT_V0 (if present).".into());
        lines.push("# TYPE avalon_chip_voltage_volts gauge".into());
        lines.push("# HELP avalon_chip_matching_work Per-chip matching-work telemetry derived from MW0 (if present).".into());
        lines.push("# TYPE avalon_chip_matching_work gauge".into());

        for (host, entry) in &snapshot.targets {
            let Some(samples) = &entry.samples else { continue };
            let ip = normalize(host);
            for chip in &samples.chips {
                lines.push(format!(
                    "{}{{ip=\"{ip}\",chip=\"{}\"}} {}",
                    chip.name, chip.chip, chip.value
                ));
            }
        }
    }

    // Pool records.
    for (host, entry) in &snapshot.targets {
        let Some(samples) = &entry.samples else { continue };
        for pool in &samples.pools {
            let labels = label_str(host, &pool.labels);
            for (name, value) in &pool.metrics {
                lines.push(format!("{name}{{{labels}}} {value}"));
            }
        }
    }

    lines.push("# HELP avalon_info Static info about the Avalon miner (model, firmware, etc).".into());
    lines.push("# TYPE avalon_info gauge".into());
    for (host, entry) in &snapshot.targets {
        let Some(vinfo) = &entry.version_info else { continue };
        let mut labels = vec![format!("ip=\"{}\"", normalize(host))];
        for (key, value) in vinfo.label_pairs() {
            labels.push(format!("{key}=\"{}\"", normalize(value)));
        }
        lines.push(format!("avalon_info{{{}}} 1", labels.join(",")));
    }

    let mut body = lines.join("\n");
    body.push('\n');
    body
}
