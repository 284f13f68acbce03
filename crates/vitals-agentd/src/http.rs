use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{error, warn};
use vitals_core::{CounterMetric, DistributionMetric, MetricError, Registry};

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state of the scrape endpoint, including its own self-metrics.
#[derive(Clone)]
pub struct ScrapeState {
    registry: Arc<Registry>,
    scrapes: Arc<CounterMetric>,
    body_bytes: Arc<DistributionMetric>,
}

impl ScrapeState {
    /// Register the endpoint's metrics under `vitals.http` and build the state.
    pub fn new(registry: Arc<Registry>) -> Result<Self, MetricError> {
        let ns = registry.namespace_for("vitals.http");
        let scrapes = ns.register_counter("scrapes", &["outcome"])?;
        let body_bytes = ns.register_distribution("scrape_bytes", &[])?;

        Ok(Self {
            registry,
            scrapes,
            body_bytes,
        })
    }

    fn record_scrape(&self, outcome: &str, body_len: Option<usize>) {
        if let Err(e) = self.scrapes.inc(&[outcome]) {
            warn!(error = %e, outcome, "failed to count scrape");
        }
        if let Some(len) = body_len {
            if let Err(e) = self.body_bytes.inc_by(len as u64, &[]) {
                warn!(error = %e, "failed to record scrape size");
            }
        }
    }
}

/// Build the router exposing `GET /metrics`.
pub fn router(state: ScrapeState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// GET /metrics
async fn metrics(State(state): State<ScrapeState>) -> Response {
    match state.registry.render_all() {
        Ok(body) => {
            state.record_scrape("ok", Some(body.len()));
            ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            state.record_scrape("error", None);
            error!(error = %e, "render pass aborted");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn metrics_returns_exposition_text() {
        let registry = Registry::new();
        let state = ScrapeState::new(registry.clone()).unwrap();

        let resp = metrics(State(state.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            EXPOSITION_CONTENT_TYPE
        );

        let body = body_string(resp).await;
        assert!(body.contains("process_resource_utime "));
        assert!(body.ends_with('\n'));
        assert_eq!(state.scrapes.get(&["ok"]).unwrap(), 1);
    }

    #[test]
    fn record_scrape_counts_outcomes_and_sizes() {
        let state = ScrapeState::new(Registry::without_process_metrics()).unwrap();

        state.record_scrape("ok", Some(10));
        state.record_scrape("ok", Some(5));
        state.record_scrape("error", None);

        assert_eq!(state.scrapes.get(&["ok"]).unwrap(), 2);
        assert_eq!(state.scrapes.get(&["error"]).unwrap(), 1);
        assert_eq!(state.body_bytes.get(&[]).unwrap(), (2, 15));
    }

    #[tokio::test]
    async fn second_scrape_sees_first_in_self_metrics() {
        let registry = Registry::without_process_metrics();
        let state = ScrapeState::new(registry).unwrap();

        let _ = metrics(State(state.clone())).await;
        let body = body_string(metrics(State(state)).await).await;

        assert!(body.contains("vitals_http_scrape_bytes:count 1\n"));
        assert!(body.contains("vitals_http_scrapes{outcome=\"ok\"} 1\n"));
    }
}
