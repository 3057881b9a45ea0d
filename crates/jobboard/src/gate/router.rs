use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::{AccessGate, Chrome, GateDecision};
use crate::session::{LoadingState, Session};

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) session: Session,
    pub(crate) path: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DecisionResponse {
    pub(crate) path: String,
    pub(crate) loading_state: LoadingState,
    pub(crate) chrome: Chrome,
    #[serde(flatten)]
    pub(crate) decision: GateDecision,
}

/// Router exposing the gate to view layers that cannot link the crate directly.
pub fn gate_router(gate: Arc<AccessGate>) -> Router {
    Router::new()
        .route("/api/v1/gate/decisions", post(decision_handler))
        .with_state(gate)
}

pub(crate) async fn decision_handler(
    State(gate): State<Arc<AccessGate>>,
    Json(request): Json<DecisionRequest>,
) -> (StatusCode, Json<DecisionResponse>) {
    let DecisionRequest { session, path } = request;
    let decision = gate.navigate(&session, &path);

    (
        StatusCode::OK,
        Json(DecisionResponse {
            loading_state: session.loading_state(),
            chrome: gate.chrome_for(&session, &path),
            path,
            decision,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn post_decision(body: Value) -> Value {
        let router = gate_router(Arc::new(AccessGate::default()));
        let response = router
            .oneshot(
                axum::http::Request::post("/api/v1/gate/decisions")
                    .header(axum::http::header::CONTENT_TYPE, "application/json")
                    .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn incomplete_employer_is_redirected_over_http() {
        let body = post_decision(json!({
            "session": {
                "state": "ready",
                "user_id": "emp-1",
                "role": "employer",
                "profile_complete": false,
            },
            "path": "/employer/post-job",
        }))
        .await;

        assert_eq!(body["decision"], "redirect");
        assert_eq!(body["to"], "/employer/complete-profile");
        assert_eq!(body["reason"], "incomplete_profile");
        assert_eq!(body["chrome"], "employer");
    }

    #[tokio::test]
    async fn absent_session_carries_resume_path() {
        let body = post_decision(json!({
            "session": { "state": "absent" },
            "path": "/employer/candidates",
        }))
        .await;

        assert_eq!(body["decision"], "redirect");
        assert_eq!(body["to"], "/login");
        assert_eq!(body["resume"], "/employer/candidates");
        assert_eq!(body["loading_state"], "absent");
    }

    #[tokio::test]
    async fn pending_session_waits() {
        let body = post_decision(json!({
            "session": { "state": "pending" },
            "path": "/profile",
        }))
        .await;
        assert_eq!(body["decision"], "wait");
    }
}
