//! API endpoints.
//!
//! `/metrics` is the Prometheus scrape surface. `/health` reports whether
//! the poller loop itself is still ticking -- it says nothing about miner
//! health, which is what the metrics are for. `/debug` exposes the raw
//! per-miner health state for operational diagnosis.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::server::SharedState;
use crate::api_client::types::{
    DebugConfig, DebugInfo, MinerDebug, PollerDebug, TargetAddr, VersionResponse,
};
use crate::exposition;

/// Build the API routes with OpenAPI metadata.
pub fn routes() -> OpenApiRouter<SharedState> {
    OpenApiRouter::new()
        .routes(routes!(metrics))
        .routes(routes!(health))
        .routes(routes!(version))
        .routes(routes!(debug))
        // The root path doubles as the health check, for probes that
        // only hit "/".
        .route("/", get(health))
}

fn unix_secs(t: SystemTime) -> f64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Prometheus exposition of the current snapshot.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "metrics",
    responses(
        (status = OK, description = "Metrics in Prometheus text format", body = String),
    ),
)]
async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    let snapshot = state.store.snapshot();
    let body = exposition::render(&snapshot, &state.config, SystemTime::now());
    ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body)
}

/// Poller liveness check.
///
/// Healthy means the HTTP server is up and the poller loop is still
/// ticking -- not "all miners are up".
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = OK, description = "Poller heartbeat is fresh", body = String),
        (status = SERVICE_UNAVAILABLE, description = "Poller heartbeat stale or missing", body = String),
    ),
)]
async fn health(State(state): State<SharedState>) -> (StatusCode, String) {
    let Some(heartbeat) = state.store.last_heartbeat() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "UNHEALTHY: poller heartbeat never recorded\n".to_string(),
        );
    };

    let age = SystemTime::now()
        .duration_since(heartbeat)
        .unwrap_or_default();
    if age > state.config.health_threshold() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!(
                "UNHEALTHY: poller heartbeat stale (age={:.1}s)\n",
                age.as_secs_f64()
            ),
        )
    } else {
        (StatusCode::OK, format!("OK\nversion={}\n", crate::VERSION))
    }
}

/// Exporter version information.
#[utoipa::path(
    get,
    path = "/version",
    tag = "version",
    responses(
        (status = OK, description = "Exporter version", body = VersionResponse),
    ),
)]
async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: crate::VERSION.to_string(),
        exporter: "avalon-exporter".to_string(),
    })
}

/// Raw internal state for debugging.
#[utoipa::path(
    get,
    path = "/debug",
    tag = "debug",
    responses(
        (status = OK, description = "Internal exporter state", body = DebugInfo),
    ),
)]
async fn debug(State(state): State<SharedState>) -> Json<DebugInfo> {
    let now = SystemTime::now();
    let now_secs = unix_secs(now);
    let snapshot = state.store.snapshot();

    let mut miners = BTreeMap::new();
    for target in &state.config.targets {
        let entry = snapshot.targets.get(&target.host).cloned().unwrap_or_default();
        let last_update = entry.last_success.map(unix_secs);
        miners.insert(
            target.host.clone(),
            MinerDebug {
                up: entry.up == Some(true),
                last_update,
                last_update_age_seconds: last_update.map(|ts| now_secs - ts),
                last_error: entry.last_error,
                scrape_errors_total: entry.errors.total,
                scrape_duration_seconds: entry.last_duration.map(|d| d.as_secs_f64()),
                // All three collections are published as one unit, so
                // presence is a property of the poll, not of each vector.
                has_metrics: entry.samples.is_some(),
                has_pools: entry.samples.is_some(),
                has_chips: entry.samples.is_some(),
                has_version_info: entry.version_info.is_some(),
            },
        );
    }

    let heartbeat = snapshot.heartbeat.map(unix_secs);
    Json(DebugInfo {
        version: crate::VERSION.to_string(),
        timestamp: now_secs,
        configuration: DebugConfig {
            update_interval_secs: state.config.update_interval.as_secs_f64(),
            exporter_port: state.config.exporter_port,
            miner_timeout_secs: state.config.miner_timeout.as_secs_f64(),
            export_chip_metrics: state.config.export_chip_metrics,
        },
        targets: state
            .config
            .targets
            .iter()
            .map(|t| TargetAddr {
                ip: t.host.clone(),
                port: t.port,
            })
            .collect(),
        poller: PollerDebug {
            last_heartbeat: heartbeat,
            heartbeat_age_seconds: heartbeat.map(|hb| now_secs - hb),
            shutdown_requested: state.shutdown.is_cancelled(),
        },
        miners,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::SnapshotStore;
    use crate::types::Target;
    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn state() -> SharedState {
        SharedState {
            store: Arc::new(SnapshotStore::new()),
            config: Arc::new(Config {
                targets: vec![Target::new("10.0.0.1", 4028)],
                ..Default::default()
            }),
            shutdown: CancellationToken::new(),
        }
    }

    async fn get_path(state: SharedState, path: &str) -> (StatusCode, String) {
        let app = crate::api::server::router(state);
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn health_is_503_before_first_heartbeat() {
        let (status, body) = get_path(state(), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("UNHEALTHY"));
    }

    #[tokio::test]
    async fn health_is_200_with_fresh_heartbeat() {
        let state = state();
        state.store.beat();
        let (status, body) = get_path(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("OK"));
    }

    #[tokio::test]
    async fn root_aliases_health() {
        let state = state();
        state.store.beat();
        let (status, _) = get_path(state, "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_returns_exposition_text() {
        let (status, body) = get_path(state(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("avalon_up{ip=\"10.0.0.1\"} 0"));
        assert!(body.contains("avalon_exporter_info"));
    }

    #[tokio::test]
    async fn version_reports_the_crate_version() {
        let (status, body) = get_path(state(), "/version").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: VersionResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.version, crate::VERSION);
        assert_eq!(parsed.exporter, "avalon-exporter");
    }

    #[tokio::test]
    async fn debug_lists_every_configured_target() {
        let (status, body) = get_path(state(), "/debug").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: DebugInfo = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.targets.len(), 1);
        assert_eq!(parsed.targets[0].ip, "10.0.0.1");
        let miner = &parsed.miners["10.0.0.1"];
        assert!(!miner.up);
        assert!(!miner.has_metrics);
        assert!(!parsed.poller.shutdown_requested);
    }

    #[tokio::test]
    async fn debug_has_flags_track_the_poll_not_the_vectors() {
        let state = state();
        // A successful poll with zero pools and zero chips.
        state.store.record_success(
            &Target::new("10.0.0.1", 4028),
            crate::store::Samples::default(),
            crate::types::VersionInfo::default(),
            std::time::Duration::ZERO,
        );

        let (_, body) = get_path(state, "/debug").await;
        let parsed: DebugInfo = serde_json::from_str(&body).unwrap();
        let miner = &parsed.miners["10.0.0.1"];
        assert!(miner.has_metrics);
        assert!(miner.has_pools);
        assert!(miner.has_chips);
        assert!(!miner.has_version_info);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let (status, _) = get_path(state(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
