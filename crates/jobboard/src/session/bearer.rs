use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::domain::{ProfileRecord, Visitor};
use super::identity::{Credential, IdentityError};
use super::store::SessionError;
use crate::documents::{Collection, DocumentStore};
use crate::error::{failure_response, ErrorKind};

/// Server-side check of a bearer token issued by the identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Credential, IdentityError>;
}

/// Token table held in process memory.
#[derive(Debug, Default)]
pub struct MemoryTokenVerifier {
    tokens: Mutex<HashMap<String, Credential>>,
}

impl MemoryTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, token: impl Into<String>, credential: Credential) {
        self.tokens
            .lock()
            .expect("token table mutex poisoned")
            .insert(token.into(), credential);
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .expect("token table mutex poisoned")
            .remove(token)
            .is_some()
    }
}

#[async_trait]
impl TokenVerifier for MemoryTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Credential, IdentityError> {
        self.tokens
            .lock()
            .expect("token table mutex poisoned")
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected("unknown or revoked token".to_string()))
    }
}

/// Resolves the calling visitor of an HTTP request from its bearer token and profile record.
///
/// Unlike [`SessionStore`](super::SessionStore) this never creates a profile: a caller without a
/// recorded role is refused.
pub struct BearerSessions<V, D> {
    verifier: Arc<V>,
    documents: Arc<D>,
}

impl<V, D> BearerSessions<V, D>
where
    V: TokenVerifier,
    D: DocumentStore,
{
    pub fn new(verifier: Arc<V>, documents: Arc<D>) -> Self {
        Self {
            verifier,
            documents,
        }
    }

    pub async fn authenticate(&self, token: &str) -> Result<Visitor, SessionError> {
        let credential = self.verifier.verify(token).await?;
        let user_id = credential.user_id.clone();

        let record = self
            .documents
            .get(Collection::Users, user_id.as_str())
            .await?
            .map(ProfileRecord::from_document);
        let Some(record) = record else {
            return Err(SessionError::MissingRole(user_id));
        };
        let Some(role) = record.role else {
            return Err(SessionError::MissingRole(user_id));
        };

        let email = credential
            .email
            .or_else(|| record.email().map(str::to_string));

        Ok(Visitor {
            profile_complete: role.profile_complete(&record.fields),
            user_id,
            role,
            email,
        })
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Route layer that admits only requests carrying a verified bearer token.
///
/// The resolved [`Visitor`] is inserted into the request extensions for handlers to read.
pub async fn require_visitor<V, D>(
    State(sessions): State<Arc<BearerSessions<V, D>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    V: TokenVerifier + 'static,
    D: DocumentStore + 'static,
{
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        debug!("request without bearer token");
        return unauthorized("missing bearer token".to_string());
    };

    let outcome = sessions.authenticate(&token).await;
    match outcome {
        Ok(visitor) => {
            request.extensions_mut().insert(visitor);
            next.run(request).await
        }
        Err(err) if err.kind() == ErrorKind::AuthFailure => {
            warn!(error = %err, "bearer token refused");
            unauthorized(err.to_string())
        }
        Err(err) => failure_response(err.kind(), err.to_string()),
    }
}

fn unauthorized(message: String) -> Response {
    let mut response = failure_response(ErrorKind::AuthFailure, message);
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{Fields, MemoryDocumentStore, WriteMode};
    use crate::session::{Role, UserId};
    use axum::http::HeaderValue;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().expect("object literal")
    }

    async fn sessions_with(
        profile: Option<Fields>,
    ) -> BearerSessions<MemoryTokenVerifier, MemoryDocumentStore> {
        let verifier = Arc::new(MemoryTokenVerifier::new());
        verifier.issue("tok-emp", Credential::new("emp-1").with_email("hr@medrin.example"));
        let documents = Arc::new(MemoryDocumentStore::new());
        if let Some(profile) = profile {
            documents
                .put(Collection::Users, "emp-1", profile, WriteMode::Replace)
                .await
                .expect("seed profile");
        }
        BearerSessions::new(verifier, documents)
    }

    #[tokio::test]
    async fn verified_token_resolves_recorded_role() {
        let sessions = sessions_with(Some(fields(json!({ "userType": "employer" })))).await;

        let visitor = sessions.authenticate("tok-emp").await.expect("authenticated");
        assert_eq!(visitor.user_id, UserId::new("emp-1"));
        assert_eq!(visitor.role, Role::Employer);
        assert!(!visitor.profile_complete);
        assert_eq!(visitor.email.as_deref(), Some("hr@medrin.example"));
    }

    #[tokio::test]
    async fn unknown_token_and_missing_profile_are_auth_failures() {
        let sessions = sessions_with(None).await;

        let err = sessions.authenticate("forged").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthFailure);

        let err = sessions.authenticate("tok-emp").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingRole(_)));
        assert_eq!(err.kind(), ErrorKind::AuthFailure);
    }

    #[tokio::test]
    async fn revoked_token_is_refused() {
        let sessions = sessions_with(Some(fields(json!({ "userType": "employer" })))).await;
        assert!(sessions.verifier.revoke("tok-emp"));
        assert!(sessions.authenticate("tok-emp").await.is_err());
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-emp"));
        assert_eq!(bearer_token(&headers), Some("tok-emp"));
    }
}
