use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::domain::{Application, ApplicationId, ApplicationStatus, EMPLOYER_FIELD, STATUS_FIELD};
use super::store::{ApplicationBoard, BoardMode};
use crate::documents::{Collection, DocumentError, DocumentStore, Fields, Predicate};
use crate::error::ErrorKind;
use crate::session::UserId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("application {id} was already {current}")]
    Conflict {
        id: ApplicationId,
        current: ApplicationStatus,
    },
    #[error("application {id} cannot move to {to}")]
    InvalidTransition {
        id: ApplicationId,
        from: Option<ApplicationStatus>,
        to: ApplicationStatus,
    },
    #[error("only the posting employer may decide application {0}")]
    Forbidden(ApplicationId),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application board is closed")]
    BoardClosed,
    #[error(transparent)]
    Backend(DocumentError),
}

impl TransitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransitionError::Conflict { .. } => ErrorKind::Conflict,
            TransitionError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            TransitionError::Forbidden(_) => ErrorKind::AuthFailure,
            TransitionError::NotFound(_) | TransitionError::BoardClosed => {
                ErrorKind::ValidationFailure
            }
            TransitionError::Backend(_) => ErrorKind::BackendFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Enforces `pending -> accepted | rejected`, at most once per application.
///
/// The backend's conditional update is the only arbiter between racing employers; the
/// engine never reads then writes.
pub struct ApplicationStatusEngine<D> {
    documents: Arc<D>,
}

impl<D> ApplicationStatusEngine<D>
where
    D: DocumentStore,
{
    pub fn new(documents: Arc<D>) -> Self {
        Self { documents }
    }

    pub async fn transition(
        &self,
        caller: &UserId,
        id: &ApplicationId,
        target: ApplicationStatus,
    ) -> Result<Application, TransitionError> {
        if !target.is_terminal() {
            warn!(application = %id, to = %target, "rejected transition to non-terminal status");
            return Err(TransitionError::InvalidTransition {
                id: id.clone(),
                from: None,
                to: target,
            });
        }

        let condition = Predicate::new()
            .field_eq(STATUS_FIELD, ApplicationStatus::Pending.label())
            .field_eq(EMPLOYER_FIELD, caller.as_str());
        let mut fields = Fields::new();
        fields.insert(STATUS_FIELD.to_string(), json!(target.label()));
        fields.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));

        match self
            .documents
            .update(Collection::Applications, id.as_str(), fields, &condition)
            .await
        {
            Ok(document) => {
                let record = Application::from_document(document).map_err(|err| {
                    error!(application = %id, error = %err, "decided application unreadable");
                    TransitionError::Backend(err)
                })?;
                info!(application = %id, employer = %caller, status = %target, "application decided");
                Ok(record)
            }
            Err(DocumentError::ConditionFailed) => Err(self.classify(caller, id).await),
            Err(DocumentError::NotFound) => Err(TransitionError::NotFound(id.clone())),
            Err(err) => {
                error!(application = %id, error = %err, "status write failed");
                Err(TransitionError::Backend(err))
            }
        }
    }

    /// Optimistically move a board entry to `target`, then confirm or roll back.
    ///
    /// Dropping the returned future before it completes also rolls the entry back.
    pub async fn resolve(
        &self,
        board: &ApplicationBoard,
        id: &ApplicationId,
        target: ApplicationStatus,
    ) -> Result<Application, TransitionError> {
        if board.mode() != BoardMode::Triage {
            return Err(TransitionError::Forbidden(id.clone()));
        }

        if let Err(err) = board.begin_write(id, target) {
            if matches!(err, TransitionError::InvalidTransition { .. }) {
                warn!(application = %id, to = %target, "ignored transition on decided or busy entry");
            }
            return Err(err);
        }

        let write = InFlightWrite::new(board, id);
        let record = self.transition(board.viewer(), id, target).await?;
        write.confirm(record.status);
        Ok(record)
    }

    /// Explain a failed conditional write by reading the record back.
    async fn classify(&self, caller: &UserId, id: &ApplicationId) -> TransitionError {
        let document = match self
            .documents
            .get(Collection::Applications, id.as_str())
            .await
        {
            Ok(Some(document)) => document,
            Ok(None) => return TransitionError::NotFound(id.clone()),
            Err(err) => {
                error!(application = %id, error = %err, "status read-back failed");
                return TransitionError::Backend(err);
            }
        };

        match Application::from_document(document) {
            Ok(record) if record.employer_id != *caller => {
                warn!(application = %id, caller = %caller, "transition attempted by another employer");
                TransitionError::Forbidden(id.clone())
            }
            Ok(record) => {
                info!(application = %id, current = %record.status, "transition lost to an earlier decision");
                TransitionError::Conflict {
                    id: id.clone(),
                    current: record.status,
                }
            }
            Err(err) => TransitionError::Backend(err),
        }
    }
}

/// Restores the board entry to its confirmed status unless the write was confirmed.
struct InFlightWrite<'a> {
    board: &'a ApplicationBoard,
    id: &'a ApplicationId,
    settled: bool,
}

impl<'a> InFlightWrite<'a> {
    fn new(board: &'a ApplicationBoard, id: &'a ApplicationId) -> Self {
        Self {
            board,
            id,
            settled: false,
        }
    }

    fn confirm(mut self, status: ApplicationStatus) {
        self.settled = true;
        if !self.board.settle(self.id, Some(status)) {
            debug!(application = %self.id, "board closed before the write confirmed");
        }
    }
}

impl Drop for InFlightWrite<'_> {
    fn drop(&mut self) {
        if !self.settled && self.board.settle(self.id, None) {
            debug!(application = %self.id, "optimistic status rolled back");
        }
    }
}
