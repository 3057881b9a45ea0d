use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join_all;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{
    parse_date_of_birth, AssetBucket, AssetReference, ProfileForm, UploadMetadata,
    ValidationFailure,
};
use super::upload::{validate_asset, AssetUploader, UploadError};
use crate::config::UploadConfig;
use crate::documents::{Collection, DocumentError, DocumentStore, Fields, WriteMode};
use crate::error::ErrorKind;
use crate::session::{IdentityProvider, Session, SessionStore, Visitor, PROFILE_COMPLETE_FIELD};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("no signed-in visitor")]
    NotSignedIn,
    #[error("profile must be completed before it can be edited")]
    NotYetComplete,
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Documents(#[from] DocumentError),
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProfileError::NotSignedIn | ProfileError::NotYetComplete => ErrorKind::AuthFailure,
            ProfileError::Validation(_) => ErrorKind::ValidationFailure,
            ProfileError::Upload(error) => error.kind(),
            ProfileError::Documents(_) => ErrorKind::BackendFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Collects a role-specific profile, uploads its assets, and persists it in one merge write.
///
/// Nothing is written until every asset has uploaded. If the flow is dropped mid-way the
/// profile record is untouched, though already-finished uploads stay in storage.
pub struct ProfileCompletionFlow<I, D, U> {
    sessions: Arc<SessionStore<I, D>>,
    documents: Arc<D>,
    uploader: Arc<U>,
    limits: UploadConfig,
}

impl<I, D, U> ProfileCompletionFlow<I, D, U>
where
    I: IdentityProvider + 'static,
    D: DocumentStore + 'static,
    U: AssetUploader,
{
    pub fn new(
        sessions: Arc<SessionStore<I, D>>,
        documents: Arc<D>,
        uploader: Arc<U>,
        limits: UploadConfig,
    ) -> Self {
        Self {
            sessions,
            documents,
            uploader,
            limits,
        }
    }

    /// Submit the completion form. On success the session reports the profile complete.
    pub async fn submit(&self, form: ProfileForm) -> Result<Visitor, ProfileError> {
        let visitor = self.current_visitor(&form)?;

        for (field, value) in form.text_fields() {
            if value.trim().is_empty() {
                return Err(ValidationFailure::MissingField { field }.into());
            }
        }

        let mut fields = self.persist(&visitor, &form).await?;
        fields.insert(PROFILE_COMPLETE_FIELD.to_string(), Value::Bool(true));
        self.documents
            .put(
                Collection::Users,
                visitor.user_id.as_str(),
                fields,
                WriteMode::Merge,
            )
            .await
            .map_err(|err| {
                warn!(user = %visitor.user_id, error = %err, "profile write failed");
                err
            })?;

        if !self.sessions.mark_profile_complete(&visitor.user_id) {
            warn!(user = %visitor.user_id, "session changed while the profile was saved");
        }
        info!(user = %visitor.user_id, role = %visitor.role, "profile completed");

        Ok(Visitor {
            profile_complete: true,
            ..visitor
        })
    }

    /// Edit a completed profile. Empty text fields and missing assets leave the stored values
    /// in place. Returns the fields that were written.
    pub async fn update_profile(&self, form: ProfileForm) -> Result<Fields, ProfileError> {
        let visitor = self.current_visitor(&form)?;
        if !visitor.profile_complete {
            warn!(user = %visitor.user_id, "profile edit before completion");
            return Err(ProfileError::NotYetComplete);
        }
        let fields = self.persist(&visitor, &form).await?;

        self.documents
            .put(
                Collection::Users,
                visitor.user_id.as_str(),
                fields.clone(),
                WriteMode::Merge,
            )
            .await?;
        info!(user = %visitor.user_id, fields = fields.len(), "profile updated");
        Ok(fields)
    }

    fn current_visitor(&self, form: &ProfileForm) -> Result<Visitor, ProfileError> {
        let Session::Ready(visitor) = self.sessions.session() else {
            return Err(ProfileError::NotSignedIn);
        };

        if form.role() != visitor.role {
            return Err(ValidationFailure::RoleMismatch {
                form: form.role(),
                session: visitor.role,
            }
            .into());
        }
        Ok(visitor)
    }

    /// Validate locally, upload assets concurrently, and build the merge payload.
    async fn persist(&self, visitor: &Visitor, form: &ProfileForm) -> Result<Fields, ProfileError> {
        if let Some(raw) = form.date_of_birth() {
            parse_date_of_birth(raw)?;
        }

        let assets = form.assets();
        for (bucket, asset) in &assets {
            validate_asset(asset, *bucket, self.limits.max_asset_bytes)?;
        }

        let uploads = assets.into_iter().map(|(bucket, asset)| {
            let metadata = UploadMetadata {
                user_id: visitor.user_id.clone(),
                asset_type: bucket.asset_type(),
            };
            let asset = asset.clone();
            async move {
                self.uploader
                    .upload(asset, bucket, metadata)
                    .await
                    .map(|reference| (bucket, reference))
            }
        });
        let references: Vec<(AssetBucket, AssetReference)> =
            try_join_all(uploads).await.map_err(|err| {
                warn!(user = %visitor.user_id, error = %err, "asset upload failed");
                err
            })?;

        let mut fields = Fields::new();
        for (name, value) in form.text_fields() {
            let value = value.trim();
            if !value.is_empty() {
                fields.insert(name.to_string(), json!(value));
            }
        }
        for (bucket, reference) in references {
            fields.insert(bucket.record_field().to_string(), json!(reference));
        }
        fields.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
        Ok(fields)
    }
}
