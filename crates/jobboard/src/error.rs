use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Failure classes shared by every core component.
///
/// Module errors map onto exactly one class so the view layer can pick a presentation
/// (redirect, inline message, retry notice, re-fetch) without matching on concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential missing, expired, or not entitled to the operation.
    AuthFailure,
    /// A local constraint failed; no network call was made.
    ValidationFailure,
    /// A collaborator was unreachable or errored; state is left at the last known good value.
    BackendFailure,
    /// A conditional write lost; re-fetch instead of retrying the same write.
    Conflict,
    /// A terminal record was asked to move again.
    InvalidTransition,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::AuthFailure => "auth_failure",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::BackendFailure => "backend_failure",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidTransition => "invalid_transition",
        }
    }

    pub const fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::BackendFailure)
    }

    pub const fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::AuthFailure => StatusCode::FORBIDDEN,
            ErrorKind::ValidationFailure => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::BackendFailure => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Shell-level error for the binary: startup and serving failures.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    /// A marketplace operation failed outside an HTTP handler, e.g. in the demo.
    Workflow(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Workflow(err) => write!(f, "workflow error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Workflow(err) => Some(err.as_ref()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Workflow(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

macro_rules! workflow_error {
    ($($error:ty),+ $(,)?) => {
        $(
            impl From<$error> for AppError {
                fn from(value: $error) -> Self {
                    Self::Workflow(Box::new(value))
                }
            }
        )+
    };
}

workflow_error!(
    crate::session::SessionError,
    crate::profile::ProfileError,
    crate::applications::IntakeError,
    crate::applications::StoreError,
    crate::applications::TransitionError,
);

/// JSON body used by the routers for every typed failure.
pub(crate) fn failure_response(kind: ErrorKind, message: String) -> Response {
    let payload = json!({
        "error": message,
        "kind": kind.label(),
        "retryable": kind.is_retryable(),
    });
    (kind.status_code(), Json(payload)).into_response()
}
