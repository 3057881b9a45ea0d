use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationView, APPLICANT_FIELD,
    EMPLOYER_FIELD,
};
use super::engine::TransitionError;
use crate::documents::{Collection, DocumentError, DocumentStore, Predicate};
use crate::error::ErrorKind;
use crate::session::{Role, Session, UserId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("applications are only listed for a signed-in visitor")]
    NotSignedIn,
    #[error(transparent)]
    Documents(#[from] DocumentError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotSignedIn => ErrorKind::AuthFailure,
            StoreError::Documents(_) => ErrorKind::BackendFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Whether the cached status is what the backend last confirmed or a write is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Confirmed,
    PendingWrite { target: ApplicationStatus },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEntry {
    /// Record as last confirmed by the backend.
    pub record: Application,
    pub state: CacheState,
}

impl BoardEntry {
    /// Status to render: the in-flight target while a write is pending.
    pub fn effective_status(&self) -> ApplicationStatus {
        match self.state {
            CacheState::Confirmed => self.record.status,
            CacheState::PendingWrite { target } => target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardMode {
    /// Job seeker's own applications.
    ReadOnly,
    /// Employer's incoming applications; transitions allowed.
    Triage,
}

#[derive(Debug, Default)]
struct BoardState {
    entries: Vec<BoardEntry>,
    closed: bool,
}

/// Point-in-time set of applications for one viewer.
///
/// Clones share the same entries. After [`ApplicationBoard::close`] late write results are
/// dropped instead of applied.
#[derive(Debug, Clone)]
pub struct ApplicationBoard {
    viewer: UserId,
    mode: BoardMode,
    fetched_at: DateTime<Utc>,
    state: Arc<Mutex<BoardState>>,
}

impl ApplicationBoard {
    pub fn new(viewer: UserId, mode: BoardMode, records: Vec<Application>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| BoardEntry {
                record,
                state: CacheState::Confirmed,
            })
            .collect();

        Self {
            viewer,
            mode,
            fetched_at: Utc::now(),
            state: Arc::new(Mutex::new(BoardState {
                entries,
                closed: false,
            })),
        }
    }

    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }

    pub fn mode(&self) -> BoardMode {
        self.mode
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("board mutex poisoned").closed
    }

    pub fn entries(&self) -> Vec<BoardEntry> {
        self.state.lock().expect("board mutex poisoned").entries.clone()
    }

    pub fn entry(&self, id: &ApplicationId) -> Option<BoardEntry> {
        self.state
            .lock()
            .expect("board mutex poisoned")
            .entries
            .iter()
            .find(|entry| entry.record.id == *id)
            .cloned()
    }

    /// Partition by effective status, preserving newest-first order.
    pub fn view(&self) -> ApplicationView {
        let guard = self.state.lock().expect("board mutex poisoned");
        ApplicationView::from_records(guard.entries.iter().map(|entry| Application {
            status: entry.effective_status(),
            ..entry.record.clone()
        }))
    }

    pub fn close(&self) {
        let mut guard = self.state.lock().expect("board mutex poisoned");
        guard.closed = true;
        guard.entries.clear();
    }

    /// Mark `id` as having a write to `target` in flight. Returns the confirmed status.
    pub(crate) fn begin_write(
        &self,
        id: &ApplicationId,
        target: ApplicationStatus,
    ) -> Result<ApplicationStatus, TransitionError> {
        let mut guard = self.state.lock().expect("board mutex poisoned");
        if guard.closed {
            return Err(TransitionError::BoardClosed);
        }

        let entry = guard
            .entries
            .iter_mut()
            .find(|entry| entry.record.id == *id)
            .ok_or_else(|| TransitionError::NotFound(id.clone()))?;

        let from = entry.record.status;
        if entry.state != CacheState::Confirmed || !from.can_transition_to(target) {
            return Err(TransitionError::InvalidTransition {
                id: id.clone(),
                from: Some(from),
                to: target,
            });
        }

        entry.state = CacheState::PendingWrite { target };
        Ok(from)
    }

    /// Settle an in-flight write: `Some(status)` confirms, `None` restores the confirmed value.
    /// Returns `false` when the board was closed or the entry is gone.
    pub(crate) fn settle(&self, id: &ApplicationId, confirmed: Option<ApplicationStatus>) -> bool {
        let mut guard = self.state.lock().expect("board mutex poisoned");
        if guard.closed {
            return false;
        }

        let Some(entry) = guard.entries.iter_mut().find(|entry| entry.record.id == *id) else {
            return false;
        };
        if let Some(status) = confirmed {
            entry.record.status = status;
        }
        entry.state = CacheState::Confirmed;
        true
    }
}

/// Reads applications for the current viewer.
pub struct ApplicationStore<D> {
    pub(super) documents: Arc<D>,
}

impl<D> ApplicationStore<D>
where
    D: DocumentStore,
{
    pub fn new(documents: Arc<D>) -> Self {
        Self { documents }
    }

    /// Seekers get their own applications read-only; employers get a triage board of the
    /// applications addressed to them. Newest first.
    pub async fn fetch(&self, session: &Session) -> Result<ApplicationBoard, StoreError> {
        let visitor = session.visitor().ok_or(StoreError::NotSignedIn)?;
        let (field, mode) = match visitor.role {
            Role::JobSeeker => (APPLICANT_FIELD, BoardMode::ReadOnly),
            Role::Employer => (EMPLOYER_FIELD, BoardMode::Triage),
        };

        let predicate = Predicate::new().field_eq(field, visitor.user_id.as_str());
        let documents = self
            .documents
            .query(Collection::Applications, &predicate)
            .await?;

        let mut records = Vec::with_capacity(documents.len());
        for document in documents {
            match Application::from_document(document) {
                Ok(record) => records.push(record),
                Err(err) => warn!(error = %err, "skipping unreadable application"),
            }
        }
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        debug!(
            viewer = %visitor.user_id,
            role = %visitor.role,
            count = records.len(),
            "applications fetched"
        );
        Ok(ApplicationBoard::new(visitor.user_id.clone(), mode, records))
    }
}
