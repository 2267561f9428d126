//! Lexical primitives for the CGMiner ASCII protocol.
//!
//! A combined reply is a pipe-delimited stream of sections, each introduced
//! by `CMD=<name>`. Within a section, fields are either `KEY[value]`
//! (bracket form) or comma-separated `KEY=value` pairs. Everything here is
//! a pure function over text; "not found" is always `None`, never an error
//! and never a sentinel number.

pub mod transport;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static INT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").unwrap());

static POOL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)POOL(\d+)").unwrap());

/// Find a `KEY[...]` bracket field, e.g. `WORKMODE[2]` -> `"2"`.
pub fn find_bracket(key: &str, text: &str) -> Option<String> {
    let pattern = format!(r"{}\[([^\]]*)\]", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .map(|caps| caps[1].trim().to_string())
}

/// Find a `KEY=value` field, stopping at comma or pipe.
pub fn find_kv(key: &str, text: &str) -> Option<String> {
    let pattern = format!(r"{}=([^,|]+)", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .map(|caps| caps[1].trim().to_string())
}

/// Parse a float; strips `%` and maps empty / `N/A` to absent.
pub fn parse_float(value: Option<&str>) -> Option<f64> {
    let s = value?.trim().replace('%', "");
    if s.is_empty() || s.eq_ignore_ascii_case("N/A") {
        return None;
    }
    s.parse().ok()
}

/// Parse an integer, truncating through float so `"12.0"` is accepted.
pub fn parse_int(value: Option<&str>) -> Option<i64> {
    let s = value?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("N/A") {
        return None;
    }
    s.parse::<f64>().ok().map(|f| f as i64)
}

/// Map a firmware on/off field to a gauge: exactly `"1"` is on.
pub fn on_off_gauge(raw: &str) -> f64 {
    if raw == "1" { 1.0 } else { 0.0 }
}

/// Map true/false, Y/N, Alive/Dead and friends to a gauge.
pub fn bool_gauge(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else { return 0.0 };
    match raw.trim().to_lowercase().as_str() {
        "true" | "y" | "yes" | "1" | "alive" | "up" => 1.0,
        _ => 0.0,
    }
}

/// Parse a comma-separated `key=value` segment into a map.
///
/// Keys may contain spaces (`Bytes Sent=123`); the first `=` splits.
pub fn parse_csv_kv(segment: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for token in segment.split(',') {
        let token = token.trim();
        if let Some((key, value)) = token.split_once('=') {
            out.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    out
}

/// Extract every integer run from a bracket list like `" 83 90 -94"`,
/// preserving order.
pub fn parse_int_list(s: Option<&str>) -> Vec<i64> {
    let Some(s) = s else { return Vec::new() };
    INT_RUN
        .find_iter(s)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// (min, mean, max, sum) over a numeric sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aggregate {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub sum: f64,
}

/// Aggregate a sequence; empty input is absent, so callers skip emitting
/// aggregate metrics entirely rather than emitting zeros.
pub fn agg_stats(values: &[f64]) -> Option<Aggregate> {
    if values.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    Some(Aggregate {
        min,
        max,
        sum,
        mean: sum / values.len() as f64,
    })
}

/// Split one combined reply into sections keyed by lowercased command name.
///
/// Each section retains its own `CMD=` marker. An absent section simply
/// yields no entry; nothing here fails.
pub fn split_sections(raw: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if raw.is_empty() {
        return out;
    }

    // Split on '|CMD=' boundaries, re-attaching the marker to each piece.
    let mut parts = raw.split("|CMD=");
    let first = parts.next().unwrap_or_default();
    let mut pieces: Vec<String> = Vec::new();
    if first.starts_with("CMD=") {
        pieces.push(first.to_string());
    } else {
        pieces.push(format!("CMD={first}"));
    }
    for part in parts {
        pieces.push(format!("CMD={part}"));
    }

    for piece in pieces {
        let piece = piece.trim();
        if !piece.starts_with("CMD=") {
            continue;
        }
        if let Some(name) = find_kv("CMD", piece) {
            let name = name.to_lowercase();
            if !name.is_empty() {
                out.insert(name, piece.to_string());
            }
        }
    }
    out
}

/// Pipe-split pieces of a stats section that begin with `STATS=`.
pub fn stats_segments(stats_section: &str) -> Vec<&str> {
    stats_section
        .split('|')
        .map(str::trim)
        .filter(|seg| seg.starts_with("STATS="))
        .collect()
}

/// The `STATS=0` segment carries device-level telemetry; `STATS=1..` are
/// per-pool transport records.
pub fn device_segment(stats_section: &str) -> Option<&str> {
    stats_segments(stats_section)
        .into_iter()
        .find(|seg| seg.starts_with("STATS=0"))
}

/// Recover a pool index from an ID like `POOL0`.
///
/// Fallback: some firmwares omit the digit, but stats sub-segment ordinals
/// are offset by one from the pool index (STATS=1 is pool 0). That mapping
/// is a heuristic, not a guarantee; a direct `POOL<n>` ID always wins.
pub fn pool_index_from_id(pool_id: &str, stats_num: &str) -> Option<String> {
    if let Some(caps) = POOL_ID.captures(pool_id.trim()) {
        return Some(caps[1].to_string());
    }
    match stats_num.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Some((n - 1).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn bracket_lookup_finds_and_trims() {
        let text = "STATS=0,MM ID0 Ver[1.2] WORKMODE[ 2 ],Elapsed=83";
        assert_eq!(find_bracket("WORKMODE", text).as_deref(), Some("2"));
        assert_eq!(find_bracket("Ver", text).as_deref(), Some("1.2"));
    }

    #[test]
    fn bracket_lookup_absent_key_is_none() {
        assert_eq!(find_bracket("ITemp", "WORKMODE[2]"), None);
    }

    #[test]
    fn kv_lookup_stops_at_comma_or_pipe() {
        let text = "Elapsed=83,Accepted=12|Status=Alive";
        assert_eq!(find_kv("Elapsed", text).as_deref(), Some("83"));
        assert_eq!(find_kv("Accepted", text).as_deref(), Some("12"));
        assert_eq!(find_kv("Status", text).as_deref(), Some("Alive"));
        assert_eq!(find_kv("Rejected", text), None);
    }

    #[test_case(Some("73%") => Some(73.0))]
    #[test_case(Some("  -1.5 ") => Some(-1.5))]
    #[test_case(Some("N/A") => None)]
    #[test_case(Some("n/a") => None; "some lowercase n_a expects none")]
    #[test_case(Some("") => None)]
    #[test_case(Some("garbage") => None)]
    #[test_case(None => None)]
    fn float_coercion(value: Option<&str>) -> Option<f64> {
        parse_float(value)
    }

    #[test_case(Some("12.0") => Some(12))]
    #[test_case(Some("12.9") => Some(12))]
    #[test_case(Some("-3") => Some(-3))]
    #[test_case(Some("N/A") => None)]
    #[test_case(Some("") => None)]
    #[test_case(None => None)]
    fn int_coercion(value: Option<&str>) -> Option<i64> {
        parse_int(value)
    }

    #[test_case(Some("true") => 1.0)]
    #[test_case(Some("Alive") => 1.0)]
    #[test_case(Some("Y") => 1.0)]
    #[test_case(Some("Dead") => 0.0)]
    #[test_case(Some("false") => 0.0)]
    #[test_case(None => 0.0)]
    fn bool_gauge_mapping(raw: Option<&str>) -> f64 {
        bool_gauge(raw)
    }

    #[test]
    fn csv_kv_handles_keys_with_spaces() {
        let kv = parse_csv_kv("STATS=1,ID=POOL0,Bytes Sent=1234, Times Recv = 7 ");
        assert_eq!(kv.get("Bytes Sent").map(String::as_str), Some("1234"));
        assert_eq!(kv.get("Times Recv").map(String::as_str), Some("7"));
        assert_eq!(kv.get("ID").map(String::as_str), Some("POOL0"));
    }

    #[test]
    fn int_list_preserves_order_and_signs() {
        assert_eq!(parse_int_list(Some(" 83 90 -94")), vec![83, 90, -94]);
        assert_eq!(parse_int_list(Some("N/A")), Vec::<i64>::new());
        assert_eq!(parse_int_list(None), Vec::<i64>::new());
    }

    #[test]
    fn agg_stats_empty_is_absent() {
        assert_eq!(agg_stats(&[]), None);
    }

    #[test]
    fn agg_stats_computes_min_mean_max_sum() {
        let agg = agg_stats(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(agg.min, 10.0);
        assert_eq!(agg.mean, 20.0);
        assert_eq!(agg.max, 30.0);
        assert_eq!(agg.sum, 60.0);
    }

    #[test]
    fn splitter_yields_one_entry_per_marker() {
        let raw = "CMD=version|VERSION,MODEL=X|CMD=summary|SUMMARY,Elapsed=83|";
        let sections = split_sections(raw);
        assert_eq!(sections.len(), 2);
        assert!(sections["version"].starts_with("CMD=version"));
        assert!(sections["version"].contains("MODEL=X"));
        assert!(sections["summary"].starts_with("CMD=summary"));
        assert!(sections["summary"].contains("Elapsed=83"));
    }

    #[test]
    fn splitter_tolerates_missing_leading_marker() {
        // Some firmwares emit a status preamble before the first CMD.
        let sections = split_sections("junk|CMD=pools|POOL=0,URL=x|");
        assert!(sections.contains_key("pools"));
    }

    #[test]
    fn splitter_on_empty_input_is_empty() {
        assert!(split_sections("").is_empty());
    }

    #[test]
    fn stats_segments_and_device_segment() {
        let stats = "CMD=stats|STATS=0,WORKMODE[1]|STATS=1,ID=POOL0|STATS=2,ID=POOL1|";
        let segments = stats_segments(stats);
        assert_eq!(segments.len(), 3);
        assert_eq!(device_segment(stats), Some("STATS=0,WORKMODE[1]"));
    }

    #[test_case("POOL0", "" => Some("0".to_string()); "direct id")]
    #[test_case("pool7", "" => Some("7".to_string()); "case insensitive")]
    #[test_case("", "2" => Some("1".to_string()); "ordinal fallback")]
    #[test_case("", "0" => None; "stats zero is the device segment")]
    #[test_case("", "" => None; "nothing to go on")]
    fn pool_index_derivation(pool_id: &str, stats_num: &str) -> Option<String> {
        pool_index_from_id(pool_id, stats_num)
    }

    /// The ordinal fallback assumes STATS=n maps to pool n-1. Firmware
    /// variants that break this assumption should fail here first.
    #[test]
    fn pool_index_fallback_is_heuristic() {
        assert_eq!(pool_index_from_id("", "1").as_deref(), Some("0"));
        assert_eq!(pool_index_from_id("", "3").as_deref(), Some("2"));
        // A direct ID always wins over the ordinal.
        assert_eq!(pool_index_from_id("POOL5", "1").as_deref(), Some("5"));
    }
}
