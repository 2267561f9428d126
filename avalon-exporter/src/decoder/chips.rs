//! Chip-array telemetry from the `STATS=0` segment.
//!
//! Three parallel bracketed integer arrays, keyed by position = chip index:
//! `PVT_T0` (temperature), `PVT_V0` (raw voltage) and `MW0` (matching-work
//! count). Aggregates are always cheap; one record per chip is opt-in
//! because the series count scales with chip count.

use crate::config::VOLTAGE_DIVISOR;
use crate::protocol::{agg_stats, find_bracket, parse_int_list};
use crate::types::{ChipRecord, MetricSet};

/// Decode chip aggregates, plus per-chip records when `per_chip` is set.
pub fn decode_chips(stats0: &str, per_chip: bool) -> (MetricSet, Vec<ChipRecord>) {
    let mut metrics = MetricSet::new();
    let mut chips = Vec::new();

    let temps = parse_int_list(find_bracket("PVT_T0", stats0).as_deref());
    let volts_raw = parse_int_list(find_bracket("PVT_V0", stats0).as_deref());
    let matching_work = parse_int_list(find_bracket("MW0", stats0).as_deref());

    let chip_count = temps.len().max(volts_raw.len()).max(matching_work.len());
    if chip_count > 0 {
        metrics.insert("avalon_chip_count".to_string(), chip_count as f64);
    }

    let temps_f: Vec<f64> = temps.iter().map(|&v| v as f64).collect();
    if let Some(agg) = agg_stats(&temps_f) {
        metrics.insert("avalon_chip_temp_min_celsius".to_string(), agg.min);
        metrics.insert("avalon_chip_temp_avg_celsius".to_string(), agg.mean);
        metrics.insert("avalon_chip_temp_max_celsius".to_string(), agg.max);
    }

    let volts: Vec<f64> = volts_raw.iter().map(|&v| v as f64 / VOLTAGE_DIVISOR).collect();
    if let Some(agg) = agg_stats(&volts) {
        metrics.insert("avalon_chip_voltage_min_volts".to_string(), agg.min);
        metrics.insert("avalon_chip_voltage_avg_volts".to_string(), agg.mean);
        metrics.insert("avalon_chip_voltage_max_volts".to_string(), agg.max);
    }

    let mw_f: Vec<f64> = matching_work.iter().map(|&v| v as f64).collect();
    if let Some(agg) = agg_stats(&mw_f) {
        metrics.insert("avalon_chip_matching_work_min".to_string(), agg.min);
        metrics.insert("avalon_chip_matching_work_avg".to_string(), agg.mean);
        metrics.insert("avalon_chip_matching_work_max".to_string(), agg.max);
        metrics.insert("avalon_chip_matching_work_sum".to_string(), agg.sum);
    }

    if per_chip {
        for (idx, &value) in temps.iter().enumerate() {
            chips.push(chip_record(idx, "avalon_chip_temp_celsius", value as f64));
        }
        for (idx, &value) in volts_raw.iter().enumerate() {
            chips.push(chip_record(
                idx,
                "avalon_chip_voltage_volts",
                value as f64 / VOLTAGE_DIVISOR,
            ));
        }
        for (idx, &value) in matching_work.iter().enumerate() {
            chips.push(chip_record(idx, "avalon_chip_matching_work", value as f64));
        }
    }

    (metrics, chips)
}

fn chip_record(idx: usize, name: &'static str, value: f64) -> ChipRecord {
    ChipRecord {
        chip: format!("{idx:03}"),
        name,
        value,
    }
}
