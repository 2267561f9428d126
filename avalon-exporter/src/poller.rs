//! Per-target poll orchestration.
//!
//! One poll is one TCP round trip with the combined command, four facet
//! decodes, and one atomic publish into the store. Failures are classified,
//! counted, and converted into a cleared entry for that target only; they
//! never propagate to the scheduler.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::COMBINED_CMD;
use crate::decoder::{decode_chips, decode_device, decode_pools, decode_version};
use crate::error::PollError;
use crate::protocol::{device_segment, split_sections, transport::query_miner};
use crate::store::{Samples, SnapshotStore, Transition};
use crate::types::{Target, VersionInfo};

/// Poll one miner and publish the outcome.
pub async fn poll_target(
    store: &SnapshotStore,
    target: &Target,
    timeout: Duration,
    per_chip: bool,
) {
    let start = Instant::now();

    match collect(target, timeout, per_chip).await {
        Ok((samples, version)) => {
            let duration = start.elapsed();
            let transition = store.record_success(target, samples, version, duration);
            debug!(target = %target, duration_ms = duration.as_millis() as u64, "Poll succeeded");
            if transition == Some(Transition::Up) {
                info!(target = %target, "Miner came back online");
            }
        }
        Err(err) => {
            let duration = start.elapsed();
            let category = err.category();
            warn!(
                target = %target,
                category = %category,
                error = %err,
                duration_ms = duration.as_millis() as u64,
                "Poll failed"
            );
            let transition = store.record_failure(target, category, err.to_string(), duration);
            if transition == Some(Transition::Down) {
                warn!(target = %target, "Miner went offline");
            }
        }
    }
}

/// One transport call plus the four facet decodes.
///
/// Decoders are independent: a section that is missing or malformed yields
/// an empty facet, never an error. The only data fault raised here is a
/// blank response, which classifies as parse, not network.
async fn collect(
    target: &Target,
    timeout: Duration,
    per_chip: bool,
) -> Result<(Samples, VersionInfo), PollError> {
    let raw = query_miner(&target.host, target.port, COMBINED_CMD, timeout).await?;

    if raw.trim().is_empty() {
        return Err(PollError::EmptyResponse {
            host: target.host.clone(),
            port: target.port,
        });
    }

    let sections = split_sections(&raw);
    let empty = String::new();
    let version_section = sections.get("version").unwrap_or(&empty);
    let summary_section = sections.get("summary").unwrap_or(&empty);
    let stats_section = sections.get("stats").unwrap_or(&empty);
    let pools_section = sections.get("pools").unwrap_or(&empty);

    let stats0 = device_segment(stats_section).unwrap_or("");

    let mut metrics = decode_device(stats0, summary_section);
    let (chip_metrics, chips) = decode_chips(stats0, per_chip);
    metrics.extend(chip_metrics);
    let pools = decode_pools(pools_section, stats_section);
    let version = decode_version(version_section);

    Ok((
        Samples {
            metrics,
            pools,
            chips,
        },
        version,
    ))
}
