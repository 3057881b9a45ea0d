use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::{ApplicationId, ApplicationStatus, JobListing};
use super::engine::{ApplicationStatusEngine, TransitionError};
use super::store::ApplicationStore;
use crate::documents::DocumentStore;
use crate::error::failure_response;
use crate::session::{require_visitor, BearerSessions, Role, Session, TokenVerifier, Visitor};

/// Store and engine sharing one document collaborator.
pub(crate) struct ApplicationDesk<D> {
    pub(crate) store: ApplicationStore<D>,
    pub(crate) engine: ApplicationStatusEngine<D>,
}

impl<D: DocumentStore> ApplicationDesk<D> {
    pub(crate) fn new(documents: Arc<D>) -> Self {
        Self {
            store: ApplicationStore::new(documents.clone()),
            engine: ApplicationStatusEngine::new(documents),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub(crate) listing: JobListing,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: ApplicationStatus,
}

/// Router exposing intake, listing, and status decisions.
///
/// Every route requires a bearer token; the caller is always the verified visitor, never a
/// user named in the request.
pub fn application_router<V, U, D>(sessions: Arc<BearerSessions<V, U>>, documents: Arc<D>) -> Router
where
    V: TokenVerifier + 'static,
    U: DocumentStore + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(apply_handler::<D>).get(board_handler::<D>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(status_handler::<D>),
        )
        .route_layer(middleware::from_fn_with_state(
            sessions,
            require_visitor::<V, U>,
        ))
        .with_state(Arc::new(ApplicationDesk::new(documents)))
}

pub(crate) async fn apply_handler<D>(
    State(desk): State<Arc<ApplicationDesk<D>>>,
    Extension(visitor): Extension<Visitor>,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    D: DocumentStore + 'static,
{
    let session = Session::Ready(visitor);
    match desk.store.apply(&session, &request.listing).await {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => failure_response(error.kind(), error.to_string()),
    }
}

pub(crate) async fn board_handler<D>(
    State(desk): State<Arc<ApplicationDesk<D>>>,
    Extension(visitor): Extension<Visitor>,
) -> Response
where
    D: DocumentStore + 'static,
{
    let session = Session::Ready(visitor);
    match desk.store.fetch(&session).await {
        Ok(board) => (StatusCode::OK, Json(board.view())).into_response(),
        Err(error) => failure_response(error.kind(), error.to_string()),
    }
}

pub(crate) async fn status_handler<D>(
    State(desk): State<Arc<ApplicationDesk<D>>>,
    Extension(visitor): Extension<Visitor>,
    Path(application_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Response
where
    D: DocumentStore + 'static,
{
    let id = ApplicationId(application_id);
    if visitor.role != Role::Employer {
        warn!(user = %visitor.user_id, application = %id, "non-employer attempted a decision");
        let error = TransitionError::Forbidden(id);
        return failure_response(error.kind(), error.to_string());
    }

    match desk.engine.transition(&visitor.user_id, &id, request.status).await {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(TransitionError::NotFound(id)) => {
            let payload = json!({
                "error": format!("application {id} not found"),
                "application_id": id,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(TransitionError::Conflict { id, current }) => {
            let payload = json!({
                "error": format!("application {id} was already {current}"),
                "kind": "conflict",
                "retryable": false,
                "current": current,
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(other) => failure_response(other.kind(), other.to_string()),
    }
}
