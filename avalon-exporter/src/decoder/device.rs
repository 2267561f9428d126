//! Device-level metrics from the `STATS=0` segment and the summary section.

use crate::protocol::{find_bracket, find_kv, on_off_gauge, parse_float, parse_int};
use crate::types::MetricSet;

/// Named power-status slots at fixed offsets into the `PS[...]` array.
///
/// Offsets follow the Nano3s firmware family (driver-avalon.c semantics);
/// other firmwares may lay the array out differently. A too-short array
/// just omits the named fields.
const PS_NAMED_SLOTS: [(usize, &str); 5] = [
    (0, "avalon_power_err"),
    (2, "avalon_power_vout"),
    (3, "avalon_power_iout"),
    (5, "avalon_power_vout_cmd"),
    (6, "avalon_power_pout_wall"),
];

/// Bracket fields exported verbatim as float gauges.
const BRACKET_FLOATS: [(&str, &str); 12] = [
    ("avalon_temp_inlet_celsius", "ITemp"),
    ("avalon_temp_outlet_celsius", "OTemp"),
    ("avalon_temp_avg_celsius", "TAvg"),
    ("avalon_temp_max_celsius", "TMax"),
    ("avalon_temp_target_celsius", "TarT"),
    ("avalon_fan1_rpm", "Fan1"),
    ("avalon_fan_duty_percent", "FanR"),
    ("avalon_hashrate_ghs", "GHSspd"),
    ("avalon_hashrate_moving_ghs", "GHSmm"),
    ("avalon_hashrate_avg_ghs", "GHSavg"),
    ("avalon_work_utility", "WU"),
    ("avalon_frequency_mhz", "Freq"),
];

/// Summary `key=value` fields exported as float gauges/counters.
const SUMMARY_FLOATS: [(&str, &str); 10] = [
    ("avalon_shares_accepted_total", "Accepted"),
    ("avalon_shares_rejected_total", "Rejected"),
    ("avalon_shares_stale_total", "Stale"),
    ("avalon_blocks_found_total", "Found Blocks"),
    ("avalon_best_share", "Best Share"),
    ("avalon_device_hw_error_percent", "Device Hardware%"),
    ("avalon_device_rejected_percent", "Device Rejected%"),
    ("avalon_pool_rejected_percent", "Pool Rejected%"),
    ("avalon_pool_stale_percent", "Pool Stale%"),
    ("avalon_work_utility_summary", "Work Utility"),
];

/// Decode device-level metrics from the `STATS=0` segment and summary.
///
/// Temperatures are reported as-is, including physically implausible
/// sentinels like -273; filtering is the dashboard's job, not ours.
pub fn decode_device(stats0: &str, summary: &str) -> MetricSet {
    let mut metrics = MetricSet::new();

    // Uptime: prefer the summary's elapsed time, fall back to stats0.
    let mut elapsed = find_kv("Elapsed", summary).unwrap_or_else(|| "0".to_string());
    if elapsed == "0" {
        elapsed = find_kv("Elapsed", stats0).unwrap_or_else(|| "0".to_string());
    }
    metrics.insert(
        "avalon_uptime_seconds".to_string(),
        parse_float(Some(&elapsed)).unwrap_or(0.0),
    );

    if let Some(mode) = parse_int(find_bracket("WORKMODE", stats0).as_deref()) {
        metrics.insert("avalon_work_mode".to_string(), mode as f64);
    }

    for (name, key) in [
        ("avalon_activation", "Activation"),
        ("avalon_soft_power_off", "SoftOFF"),
        ("avalon_lcd_on", "LcdOnoff"),
        ("avalon_lcd_switch", "LcdSwitch"),
    ] {
        let raw = find_bracket(key, stats0).unwrap_or_else(|| "0".to_string());
        metrics.insert(name.to_string(), on_off_gauge(&raw));
    }

    for (name, key) in BRACKET_FLOATS {
        if let Some(value) = parse_float(find_bracket(key, stats0).as_deref()) {
            metrics.insert(name.to_string(), value);
        }
    }

    // TA = Total ASICs (not ambient temperature).
    if let Some(total_asics) = parse_int(find_bracket("TA", stats0).as_deref()) {
        metrics.insert("avalon_total_asics".to_string(), total_asics as f64);
    }

    if let Some(dh) = parse_float(find_bracket("DH", stats0).as_deref()) {
        metrics.insert("avalon_hw_error_rate_percent".to_string(), dh);
    }
    if let Some(dhspd) = parse_float(find_bracket("DHspd", stats0).as_deref()) {
        metrics.insert("avalon_hw_error_rate_speed_percent".to_string(), dhspd);
    }
    if let Some(hw) = parse_int(find_bracket("HW", stats0).as_deref()) {
        metrics.insert("avalon_hw_errors_total".to_string(), hw as f64);
    }

    // MPO: target power, unit as reported by the firmware.
    if let Some(mpo) = parse_float(find_bracket("MPO", stats0).as_deref()) {
        metrics.insert("avalon_mpo_target".to_string(), mpo);
    }

    if let Some(mm_count) = parse_int(find_kv("MM Count", stats0).as_deref()) {
        metrics.insert("avalon_mm_count".to_string(), mm_count as f64);
    }
    if let Some(nonce_mask) = parse_int(find_kv("Nonce Mask", stats0).as_deref()) {
        metrics.insert("avalon_nonce_mask".to_string(), nonce_mask as f64);
    }

    // Power-status array: every element as a raw positional slot, plus the
    // named fields at the known offsets.
    let ps = crate::protocol::parse_int_list(find_bracket("PS", stats0).as_deref());
    for (idx, value) in ps.iter().enumerate() {
        metrics.insert(format!("avalon_ps_slot_{idx}"), *value as f64);
    }
    for (offset, name) in PS_NAMED_SLOTS {
        if let Some(value) = ps.get(offset) {
            metrics.insert(name.to_string(), *value as f64);
        }
    }

    for (name, key) in SUMMARY_FLOATS {
        if let Some(value) = parse_float(find_kv(key, summary).as_deref()) {
            metrics.insert(name.to_string(), value);
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS0: &str = "STATS=0,ID=AVA100,Elapsed=3668,MM Count=1,Nonce Mask=25,\
        MM ID0 Ver[1.1.3] WORKMODE[1] Activation[1] SoftOFF[0] LcdOnoff[1] LcdSwitch[0] \
        Elapsed[3668] ITemp[31] OTemp[44] TAvg[52] TMax[58] TarT[65] TA[160] \
        Fan1[2760] FanR[38%] GHSspd[3421.22] GHSmm[3512.05] GHSavg[3399.80] \
        WU[47498.34] Freq[431.25] DH[0.817%] DHspd[1.23%] HW[331] MPO[3600] \
        PS[0 1197 1232 246 2946 1231 3035]";

    const SUMMARY: &str = "CMD=summary|SUMMARY,Elapsed=3670,Accepted=217,Rejected=2,\
        Stale=1,Found Blocks=0,Best Share=1430482,Device Hardware%=0.8172,\
        Device Rejected%=0.9132,Pool Rejected%=0.9132,Pool Stale%=0.4566,\
        Work Utility=47498.34|";

    #[test]
    fn prefers_summary_elapsed() {
        let metrics = decode_device(STATS0, SUMMARY);
        assert_eq!(metrics["avalon_uptime_seconds"], 3670.0);
    }

    #[test]
    fn falls_back_to_stats_elapsed() {
        let metrics = decode_device(STATS0, "");
        assert_eq!(metrics["avalon_uptime_seconds"], 3668.0);
    }

    #[test]
    fn decodes_flags_and_gauges() {
        let metrics = decode_device(STATS0, SUMMARY);
        assert_eq!(metrics["avalon_work_mode"], 1.0);
        assert_eq!(metrics["avalon_activation"], 1.0);
        assert_eq!(metrics["avalon_soft_power_off"], 0.0);
        assert_eq!(metrics["avalon_lcd_on"], 1.0);
        assert_eq!(metrics["avalon_fan1_rpm"], 2760.0);
        assert_eq!(metrics["avalon_fan_duty_percent"], 38.0);
        assert_eq!(metrics["avalon_hashrate_avg_ghs"], 3399.80);
        assert_eq!(metrics["avalon_frequency_mhz"], 431.25);
        assert_eq!(metrics["avalon_total_asics"], 160.0);
        assert_eq!(metrics["avalon_hw_errors_total"], 331.0);
        assert_eq!(metrics["avalon_hw_error_rate_percent"], 0.817);
        assert_eq!(metrics["avalon_mpo_target"], 3600.0);
        assert_eq!(metrics["avalon_mm_count"], 1.0);
        assert_eq!(metrics["avalon_nonce_mask"], 25.0);
    }

    #[test]
    fn implausible_temperatures_pass_through() {
        let stats0 = "STATS=0,MM ITemp[-273] OTemp[44]";
        let metrics = decode_device(stats0, "");
        assert_eq!(metrics["avalon_temp_inlet_celsius"], -273.0);
        assert_eq!(metrics["avalon_temp_outlet_celsius"], 44.0);
    }

    #[test]
    fn absent_fields_are_omitted_not_zeroed() {
        let metrics = decode_device("STATS=0,MM WORKMODE[2]", "");
        assert!(!metrics.contains_key("avalon_temp_inlet_celsius"));
        assert!(!metrics.contains_key("avalon_hashrate_ghs"));
        assert!(!metrics.contains_key("avalon_hw_errors_total"));
    }

    #[test]
    fn ps_array_exports_slots_and_named_fields() {
        let metrics = decode_device(STATS0, SUMMARY);
        assert_eq!(metrics["avalon_ps_slot_0"], 0.0);
        assert_eq!(metrics["avalon_ps_slot_6"], 3035.0);
        assert_eq!(metrics["avalon_power_err"], 0.0);
        assert_eq!(metrics["avalon_power_vout"], 1232.0);
        assert_eq!(metrics["avalon_power_iout"], 246.0);
        assert_eq!(metrics["avalon_power_vout_cmd"], 1231.0);
        assert_eq!(metrics["avalon_power_pout_wall"], 3035.0);
    }

    #[test]
    fn short_ps_array_omits_missing_named_fields() {
        let metrics = decode_device("STATS=0,MM PS[7 8 9]", "");
        assert_eq!(metrics["avalon_power_err"], 7.0);
        assert_eq!(metrics["avalon_power_vout"], 9.0);
        assert!(!metrics.contains_key("avalon_power_iout"));
        assert!(!metrics.contains_key("avalon_power_pout_wall"));
    }

    #[test]
    fn summary_share_counters() {
        let metrics = decode_device(STATS0, SUMMARY);
        assert_eq!(metrics["avalon_shares_accepted_total"], 217.0);
        assert_eq!(metrics["avalon_shares_rejected_total"], 2.0);
        assert_eq!(metrics["avalon_blocks_found_total"], 0.0);
        assert_eq!(metrics["avalon_best_share"], 1430482.0);
        assert_eq!(metrics["avalon_pool_stale_percent"], 0.4566);
    }

    #[test]
    fn decoding_is_deterministic() {
        assert_eq!(decode_device(STATS0, SUMMARY), decode_device(STATS0, SUMMARY));
    }
}
