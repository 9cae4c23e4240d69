use crate::generator::profile::{build_scan, GeneratorConfig};
use crate::viewer_bridge::model::BridgeModel;
use crate::workflow::report::{BatchSummary, ScanReport};
use crate::workflow::runner::Runner;
use anyhow::Context;
use log::{info, warn};
use nvcore::ScanDataset;
use serde_json::{json, Value};
use std::{
    future::Future,
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
};
use warp::{
    http::StatusCode,
    reply::{Json, WithStatus},
    Filter,
};

pub fn bridge_bind_address(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Local HTTP endpoint serving detection results to an external viewer.
///
/// - `GET /results`: latest batch summary and scan report
/// - `POST /detect`: scan container body, answers with a scan report
/// - `POST /generate`: generator config body, answers with a scan report
pub struct DetectionBridge {
    state: Arc<RwLock<BridgeModel>>,
    runner: Arc<Runner>,
}

type BridgeReply = WithStatus<Json>;

impl DetectionBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self {
            state: Arc::new(RwLock::new(BridgeModel::new())),
            runner,
        }
    }

    pub fn publish_summary(&self, summary: &BatchSummary) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.summary = Some(summary.clone());
        info!(
            "[bridge] summary published: {} files, {} centers",
            summary.files.len(),
            summary.total_centers
        );
    }

    pub fn publish_scan(&self, report: &ScanReport) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.last_scan = Some(report.clone());
        info!(
            "[bridge] scan {} published: {} centers",
            report.source,
            report.detection.len()
        );
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());

        let results_route = warp::path("results")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: Arc<RwLock<BridgeModel>>| {
                let guard = state.read().unwrap_or_else(PoisonError::into_inner);
                warp::reply::with_status(warp::reply::json(&*guard), StatusCode::OK)
            });

        let detect_route = warp::path("detect")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter.clone())
            .and(runner_filter.clone())
            .map(
                |document: Value, state: Arc<RwLock<BridgeModel>>, runner: Arc<Runner>| {
                    match ScanDataset::from_json_value(document, "request") {
                        Ok(dataset) => store_and_reply(&state, runner.execute("request", &dataset)),
                        Err(err) => {
                            warn!("[bridge] rejected scan: {}", err);
                            error_reply(StatusCode::BAD_REQUEST, &err.to_string())
                        }
                    }
                },
            );

        let generate_route = warp::path("generate")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(runner_filter)
            .map(
                |config: GeneratorConfig, state: Arc<RwLock<BridgeModel>>, runner: Arc<Runner>| {
                    match build_scan(&config) {
                        Ok(scan) => {
                            store_and_reply(&state, runner.execute("synthetic", &scan.dataset))
                        }
                        Err(err) => {
                            warn!("[bridge] generator failed: {:#}", err);
                            error_reply(StatusCode::UNPROCESSABLE_ENTITY, &format!("{:#}", err))
                        }
                    }
                },
            );

        results_route.or(detect_route).or(generate_route)
    }

    /// Serves the routes until `shutdown` resolves.
    pub async fn serve(
        &self,
        address: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(address, shutdown)
            .with_context(|| format!("binding detection bridge on {}", address))?;
        info!("[bridge] listening on http://{}", bound);
        server.await;
        Ok(())
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> BridgeModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn store_and_reply(state: &RwLock<BridgeModel>, report: ScanReport) -> BridgeReply {
    let reply = warp::reply::with_status(warp::reply::json(&report), StatusCode::OK);
    let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
    guard.last_scan = Some(report);
    reply
}

fn error_reply(status: StatusCode, message: &str) -> BridgeReply {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::WorkflowConfig;

    fn bridge() -> DetectionBridge {
        let runner = Runner::new(WorkflowConfig::default()).unwrap();
        DetectionBridge::new(Arc::new(runner))
    }

    #[tokio::test]
    async fn detect_route_returns_report_and_stores_it() {
        let bridge = bridge();
        let body = json!({
            "datasets": {
                "ScanCounts": [
                    [0, 0, 0, 0, 0],
                    [0, 0, 0, 0, 0],
                    [0, 0, 100, 0, 0],
                    [0, 0, 0, 0, 0],
                    [0, 0, 0, 0, 0]
                ],
                "xSteps": [0, 1, 2, 3, 4],
                "ySteps": [0, 1, 2, 3, 4]
            }
        });
        let response = warp::test::request()
            .method("POST")
            .path("/detect")
            .json(&body)
            .reply(&bridge.routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let report: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(report["detection"]["x_positions"][0], 2.0);
        assert_eq!(
            bridge.snapshot().last_scan.map(|r| r.detection.len()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn detect_route_rejects_malformed_scan() {
        let bridge = bridge();
        let response = warp::test::request()
            .method("POST")
            .path("/detect")
            .json(&json!({"datasets": {"ScanCounts": [[1.0]]}}))
            .reply(&bridge.routes())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["error"].as_str().unwrap().contains("datasets.xSteps"));
        assert!(bridge.snapshot().last_scan.is_none());
    }

    #[tokio::test]
    async fn results_route_reflects_published_summary() {
        let bridge = bridge();
        bridge.publish_summary(&BatchSummary {
            processed: 2,
            total_centers: 7,
            ..Default::default()
        });
        let response = warp::test::request()
            .method("GET")
            .path("/results")
            .reply(&bridge.routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["summary"]["total_centers"], 7);
        assert!(body["last_scan"].is_null());
    }

    #[tokio::test]
    async fn generate_route_runs_synthetic_scan() {
        let bridge = bridge();
        let response = warp::test::request()
            .method("POST")
            .path("/generate")
            .json(&json!({"width": 32, "height": 32, "spot_count": 1, "seed": 3}))
            .reply(&bridge.routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["source"], "synthetic");
        assert_eq!(body["params"]["synthetic"], true);
    }

    #[tokio::test]
    async fn generate_route_rejects_oversized_noise() {
        let bridge = bridge();
        let response = warp::test::request()
            .method("POST")
            .path("/generate")
            .json(&json!({"width": 8, "height": 8, "noise": 1e308}))
            .reply(&bridge.routes())
            .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["error"].as_str().unwrap().contains("noise"));
        assert!(bridge.snapshot().last_scan.is_none());
    }
}
