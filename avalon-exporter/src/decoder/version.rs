//! Static identity from the `version` section.

use crate::protocol::parse_csv_kv;
use crate::types::VersionInfo;

/// Decode the fixed-shape identity record.
///
/// Finds the first pipe-segment beginning with `VERSION`, strips the
/// leading `VERSION,` token if present, and reads eight fixed fields.
/// Fields the miner didn't report stay empty strings; the record shape
/// never varies.
pub fn decode_version(section: &str) -> VersionInfo {
    let Some(segment) = section
        .split('|')
        .map(str::trim)
        .find(|seg| seg.starts_with("VERSION"))
    else {
        return VersionInfo::default();
    };

    let kv = match segment.strip_prefix("VERSION,") {
        Some(rest) => parse_csv_kv(rest),
        None => parse_csv_kv(segment),
    };
    let get = |key: &str| kv.get(key).cloned().unwrap_or_default();

    // LVERSION is the canonical firmware field; older firmwares only
    // report CGVERSION.
    let mut firmware = get("LVERSION");
    if firmware.is_empty() {
        firmware = get("CGVERSION");
    }

    VersionInfo {
        model: get("MODEL"),
        prod: get("PROD"),
        firmware,
        cgminer: get("CGMiner"),
        api: get("API"),
        hwtype: get("HWTYPE"),
        swtype: get("SWTYPE"),
        dna: get("DNA"),
        mac: get("MAC"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTION: &str = "CMD=version|VERSION,CGMiner=4.11.1,API=3.7,\
        MODEL=Nano3S,HWTYPE=MM3v2_X3,SWTYPE=MM319,LVERSION=25042201_6eff2bb,\
        PROD=AvalonNano,DNA=020100003ac77f66,MAC=b4fbe4000001|";

    #[test]
    fn extracts_all_identity_fields() {
        let vinfo = decode_version(SECTION);
        assert_eq!(vinfo.model, "Nano3S");
        assert_eq!(vinfo.prod, "AvalonNano");
        assert_eq!(vinfo.firmware, "25042201_6eff2bb");
        assert_eq!(vinfo.cgminer, "4.11.1");
        assert_eq!(vinfo.api, "3.7");
        assert_eq!(vinfo.hwtype, "MM3v2_X3");
        assert_eq!(vinfo.swtype, "MM319");
        assert_eq!(vinfo.dna, "020100003ac77f66");
        assert_eq!(vinfo.mac, "b4fbe4000001");
    }

    #[test]
    fn firmware_falls_back_to_cgversion() {
        let vinfo = decode_version("CMD=version|VERSION,MODEL=Q,CGVERSION=1.2.3|");
        assert_eq!(vinfo.firmware, "1.2.3");
    }

    #[test]
    fn missing_fields_are_empty_strings() {
        let vinfo = decode_version("CMD=version|VERSION,MODEL=Q|");
        assert_eq!(vinfo.model, "Q");
        assert_eq!(vinfo.mac, "");
        assert!(!vinfo.is_empty());
    }

    #[test]
    fn absent_version_segment_yields_empty_record() {
        assert!(decode_version("CMD=version|STATUS=S|").is_empty());
        assert!(decode_version("").is_empty());
    }
}
