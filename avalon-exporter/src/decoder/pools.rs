//! Per-pool records, merged from two sections.
//!
//! The `pools` section carries connection-level fields (URL, status,
//! share/difficulty counters); the `stats` section's `STATS=1..` segments
//! carry transport counters for the same pools. Both passes land in the
//! same record keyed by pool index, so fields from either source survive.

use std::collections::BTreeMap;

use crate::protocol::{
    bool_gauge, parse_csv_kv, parse_float, pool_index_from_id, stats_segments,
};
use crate::types::PoolRecord;

/// Connection-level counters from the `pools` section, all optional.
const POOL_FLOATS: [(&str, &str); 22] = [
    ("avalon_pool_getworks_total", "Getworks"),
    ("avalon_pool_works_total", "Works"),
    ("avalon_pool_discarded_total", "Discarded"),
    ("avalon_pool_stale_total", "Stale"),
    ("avalon_pool_bad_work_total", "Bad Work"),
    ("avalon_pool_get_failures_total", "Get Failures"),
    ("avalon_pool_remote_failures_total", "Remote Failures"),
    ("avalon_pool_shares_accepted_total", "Accepted"),
    ("avalon_pool_shares_rejected_total", "Rejected"),
    ("avalon_pool_diff1_shares_total", "Diff1 Shares"),
    ("avalon_pool_difficulty_accepted", "Difficulty Accepted"),
    ("avalon_pool_difficulty_rejected", "Difficulty Rejected"),
    ("avalon_pool_difficulty_stale", "Difficulty Stale"),
    ("avalon_pool_last_share_difficulty", "Last Share Difficulty"),
    ("avalon_pool_work_difficulty", "Work Difficulty"),
    ("avalon_pool_stratum_difficulty", "Stratum Difficulty"),
    ("avalon_pool_best_share", "Best Share"),
    ("avalon_pool_rejected_percent", "Pool Rejected%"),
    ("avalon_pool_stale_percent", "Pool Stale%"),
    ("avalon_pool_current_block_height", "Current Block Height"),
    ("avalon_pool_current_block_version", "Current Block Version"),
    ("avalon_pool_last_share_time", "Last Share Time"),
];

/// Transport counters from the stats pool segments, all optional.
const STATS_FLOATS: [(&str, &str); 12] = [
    ("avalon_pool_times_sent_total", "Times Sent"),
    ("avalon_pool_times_recv_total", "Times Recv"),
    ("avalon_pool_bytes_sent_total", "Bytes Sent"),
    ("avalon_pool_bytes_recv_total", "Bytes Recv"),
    ("avalon_pool_net_bytes_sent_total", "Net Bytes Sent"),
    ("avalon_pool_net_bytes_recv_total", "Net Bytes Recv"),
    ("avalon_pool_work_diff", "Work Diff"),
    ("avalon_pool_min_diff", "Min Diff"),
    ("avalon_pool_max_diff", "Max Diff"),
    ("avalon_pool_min_diff_count", "Min Diff Count"),
    ("avalon_pool_max_diff_count", "Max Diff Count"),
    ("avalon_pool_work_roll_time_seconds", "Work Roll Time"),
];

/// Roll-time capability flags, exported as gauges (absent reads as false).
const STATS_BOOLS: [(&str, &str); 3] = [
    ("avalon_pool_work_had_roll_time", "Work Had Roll Time"),
    ("avalon_pool_work_can_roll", "Work Can Roll"),
    ("avalon_pool_work_had_expire", "Work Had Expire"),
];

/// Decode all pool records, sorted by numeric pool index (non-numeric last).
pub fn decode_pools(pools_section: &str, stats_section: &str) -> Vec<PoolRecord> {
    let mut pool_map: BTreeMap<String, PoolRecord> = BTreeMap::new();

    // Pass 1: connection-oriented fields from pools().
    for segment in pools_section.split('|') {
        let segment = segment.trim();
        if !segment.starts_with("POOL=") {
            continue;
        }
        let kv = parse_csv_kv(segment);
        let get = |key: &str| kv.get(key).cloned().unwrap_or_default();

        let pool_index = get("POOL");
        let status = get("Status");
        let stratum_active = get("Stratum Active");
        let pool_up = status.trim().eq_ignore_ascii_case("alive")
            && stratum_active.trim().eq_ignore_ascii_case("true");

        let mut record = PoolRecord::default();
        record.labels.insert("pool_index".to_string(), pool_index.clone());
        record.labels.insert("url".to_string(), get("URL"));
        record.labels.insert("priority".to_string(), get("Priority"));
        record.labels.insert("status".to_string(), status);
        record
            .metrics
            .insert("avalon_pool_up".to_string(), if pool_up { 1.0 } else { 0.0 });

        for (name, key) in POOL_FLOATS {
            if let Some(value) = parse_float(kv.get(key).map(String::as_str)) {
                record.metrics.insert(name.to_string(), value);
            }
        }

        pool_map.insert(pool_index, record);
    }

    // Pass 2: transport counters from stats() pool sub-records, merged by
    // pool index into the same records.
    for segment in stats_segments(stats_section) {
        let kv = parse_csv_kv(segment);
        let stats_num = kv.get("STATS").cloned().unwrap_or_default();
        let pool_id = kv.get("ID").cloned().unwrap_or_default();
        if !pool_id.to_uppercase().starts_with("POOL") {
            continue;
        }

        let pool_index = pool_index_from_id(&pool_id, &stats_num).unwrap_or_default();
        let record = pool_map.entry(pool_index.clone()).or_insert_with(|| {
            let mut stub = PoolRecord::default();
            stub.labels.insert("pool_index".to_string(), pool_index);
            stub.labels.insert("url".to_string(), String::new());
            stub.labels.insert("priority".to_string(), String::new());
            stub.labels.insert("status".to_string(), String::new());
            stub.metrics.insert("avalon_pool_up".to_string(), 0.0);
            stub
        });
        record.labels.insert("id".to_string(), pool_id);

        for (name, key) in STATS_FLOATS {
            if let Some(value) = parse_float(kv.get(key).map(String::as_str)) {
                record.metrics.insert(name.to_string(), value);
            }
        }
        for (name, key) in STATS_BOOLS {
            let value = bool_gauge(kv.get(key).map(String::as_str));
            record.metrics.insert(name.to_string(), value);
        }
    }

    let mut records: Vec<(String, PoolRecord)> = pool_map.into_iter().collect();
    records.sort_by_key(|(index, _)| index.parse::<i64>().unwrap_or(9999));
    records.into_iter().map(|(_, record)| record).collect()
}
