use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use jobboard::{
    application_router, gate_router, AccessGate, BearerSessions, DocumentStore, TokenVerifier,
};
use serde_json::json;
use std::sync::Arc;

/// Gate and application endpoints plus the operational probes.
pub(crate) fn marketplace_routes<V, D>(
    sessions: Arc<BearerSessions<V, D>>,
    documents: Arc<D>,
    gate: Arc<AccessGate>,
) -> axum::Router
where
    V: TokenVerifier + 'static,
    D: DocumentStore + 'static,
{
    gate_router(gate)
        .merge(application_router(sessions, documents))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use jobboard::documents::{Collection, WriteMode};
    use jobboard::session::Credential;
    use jobboard::{MemoryDocumentStore, MemoryTokenVerifier};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    async fn app(ready: bool) -> (axum::Router, Arc<AtomicBool>) {
        let readiness = Arc::new(AtomicBool::new(ready));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };

        let documents = Arc::new(MemoryDocumentStore::new());
        documents
            .put(
                Collection::Users,
                "emp-1",
                json!({ "userType": "employer" }).as_object().cloned().unwrap(),
                WriteMode::Replace,
            )
            .await
            .unwrap();
        let tokens = Arc::new(MemoryTokenVerifier::new());
        tokens.issue("tok-emp-1", Credential::new("emp-1"));

        let router = marketplace_routes(
            Arc::new(BearerSessions::new(tokens, documents.clone())),
            documents,
            Arc::new(AccessGate::default()),
        )
        .layer(Extension(state));
        (router, readiness)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        let (router, readiness) = app(false).await;
        let response = router
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "initializing");

        readiness.store(true, Ordering::Release);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let (router, _) = app(true).await;
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn gate_and_application_routes_share_one_router() {
        let (router, _) = app(true).await;

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/gate/decisions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "session": {
                                "state": "ready",
                                "user_id": "seeker-1",
                                "role": "job_seeker",
                                "profile_complete": true,
                            },
                            "path": "/employer",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["to"], "/find-jobs");
        assert_eq!(body["reason"], "role_mismatch");

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/v1/applications")
                    .header(header::AUTHORIZATION, "Bearer tok-emp-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["counts"]["total"], 0);

        let response = router
            .oneshot(Request::get("/api/v1/applications").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
