use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::domain::{
    ProfileRecord, Role, Session, SessionSnapshot, UserId, Visitor, PROFILE_COMPLETE_FIELD,
    USER_TYPE_FIELD,
};
use super::identity::{Credential, CredentialState, IdentityError, IdentityProvider};
use crate::documents::{Collection, DocumentError, DocumentStore, Fields, WriteMode};
use crate::error::ErrorKind;

/// Error raised while resolving or ending a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Documents(#[from] DocumentError),
    #[error("no role recorded for {0} and no sign-up selection pending")]
    MissingRole(UserId),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Identity(error) => error.kind(),
            SessionError::Documents(_) => ErrorKind::BackendFailure,
            SessionError::MissingRole(_) => ErrorKind::AuthFailure,
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    /// Bumped by every credential change and sign-out; results fetched under an older epoch
    /// are stale.
    epoch: u64,
    sign_up_role: Option<Role>,
}

/// Single writer of the visitor-wide session.
///
/// Readers hold a [`watch::Receiver`] and only ever see complete snapshots. The store owns the
/// identity subscription task and tears it down on [`SessionStore::shutdown`] or drop.
pub struct SessionStore<I, D> {
    identity: Arc<I>,
    documents: Arc<D>,
    state: watch::Sender<SessionSnapshot>,
    ledger: Mutex<Ledger>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<I, D> SessionStore<I, D>
where
    I: IdentityProvider + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(identity: Arc<I>, documents: Arc<D>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot {
            version: 0,
            session: Session::Pending,
        });

        Arc::new(Self {
            identity,
            documents,
            state,
            ledger: Mutex::new(Ledger::default()),
            listener: Mutex::new(None),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Session {
        self.state.borrow().session.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Follow the identity provider. Each credential change re-resolves the session.
    ///
    /// Must be called from within a tokio runtime. Calling it again replaces the listener.
    pub fn initialize(self: &Arc<Self>) {
        let mut subscription = self.identity.subscribe();
        let store = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut state = subscription.current();
            loop {
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.apply(state).await;
                drop(store);

                match subscription.changed().await {
                    Some(next) => state = next,
                    None => break,
                }
            }
            debug!("identity subscription closed");
        });

        let previous = self
            .listener
            .lock()
            .expect("listener mutex poisoned")
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Re-read the current credential and resolve the session once.
    pub async fn refresh(&self) -> Session {
        let state = CredentialState::from(self.identity.current_credential().await);
        self.apply(state).await;
        self.session()
    }

    /// Record the role chosen on the sign-up page for the next credential without a profile.
    pub fn select_sign_up_role(&self, role: Role) {
        self.ledger
            .lock()
            .expect("session ledger mutex poisoned")
            .sign_up_role = Some(role);
    }

    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let previous = self.session();
        let epoch = {
            let mut ledger = self.ledger.lock().expect("session ledger mutex poisoned");
            ledger.epoch += 1;
            ledger.sign_up_role = None;
            ledger.epoch
        };

        match self.identity.sign_out().await {
            Ok(()) => {
                self.publish_if_current(epoch, Session::Absent);
                info!("visitor signed out");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "sign-out failed");
                let fallback = if previous.is_settled() {
                    previous
                } else {
                    Session::Error {
                        reason: err.to_string(),
                    }
                };
                self.publish_if_current(epoch, fallback);
                Err(err.into())
            }
        }
    }

    /// Flip the completeness flag for `user`. Returns `false` when the session has moved on.
    pub fn mark_profile_complete(&self, user: &UserId) -> bool {
        let _ledger = self.ledger.lock().expect("session ledger mutex poisoned");
        let changed = self.state.send_if_modified(|snapshot| match &mut snapshot.session {
            Session::Ready(visitor) if visitor.user_id == *user && !visitor.profile_complete => {
                visitor.profile_complete = true;
                snapshot.version += 1;
                true
            }
            _ => false,
        });

        if changed {
            info!(user = %user, "profile marked complete");
        } else {
            debug!(user = %user, "completeness flip ignored");
        }
        changed
    }

    /// Cancel the identity subscription. The last snapshot stays readable.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().expect("listener mutex poisoned").take() {
            handle.abort();
        }
    }

    async fn apply(&self, state: CredentialState) {
        let epoch = self.begin_epoch();

        match state {
            CredentialState::SignedOut => {
                self.publish_if_current(epoch, Session::Absent);
            }
            CredentialState::Failed(err) => {
                warn!(error = %err, "credential rejected");
                self.publish_if_current(
                    epoch,
                    Session::Error {
                        reason: err.to_string(),
                    },
                );
            }
            CredentialState::SignedIn(credential) => {
                self.publish_if_current(epoch, Session::Pending);

                let session = match self.resolve_visitor(&credential).await {
                    Ok(visitor) => Session::Ready(visitor),
                    Err(err) => {
                        error!(user = %credential.user_id, error = %err, "profile fetch failed");
                        Session::Error {
                            reason: err.to_string(),
                        }
                    }
                };

                if !self.publish_if_current(epoch, session) {
                    debug!(user = %credential.user_id, "discarding stale profile fetch");
                }
            }
        }
    }

    async fn resolve_visitor(&self, credential: &Credential) -> Result<Visitor, SessionError> {
        let user_id = credential.user_id.clone();
        let document = self
            .documents
            .get(Collection::Users, user_id.as_str())
            .await?;

        let Some(document) = document else {
            let role = self
                .take_sign_up_role()
                .ok_or_else(|| SessionError::MissingRole(user_id.clone()))?;
            self.documents
                .put(
                    Collection::Users,
                    user_id.as_str(),
                    initial_profile(role, credential),
                    WriteMode::Replace,
                )
                .await?;
            info!(user = %user_id, role = %role, "created profile record from sign-up selection");

            return Ok(Visitor {
                user_id,
                role,
                profile_complete: false,
                email: credential.email.clone(),
            });
        };

        let record = ProfileRecord::from_document(document);
        let role = match record.role {
            Some(role) => role,
            None => {
                let role = self
                    .take_sign_up_role()
                    .ok_or_else(|| SessionError::MissingRole(user_id.clone()))?;
                let mut patch = Fields::new();
                patch.insert(USER_TYPE_FIELD.to_string(), json!(role.label()));
                self.documents
                    .put(Collection::Users, user_id.as_str(), patch, WriteMode::Merge)
                    .await?;
                role
            }
        };

        let email = credential
            .email
            .clone()
            .or_else(|| record.email().map(str::to_string));

        Ok(Visitor {
            profile_complete: role.profile_complete(&record.fields),
            user_id,
            role,
            email,
        })
    }

    fn begin_epoch(&self) -> u64 {
        let mut ledger = self.ledger.lock().expect("session ledger mutex poisoned");
        ledger.epoch += 1;
        ledger.epoch
    }

    fn take_sign_up_role(&self) -> Option<Role> {
        self.ledger
            .lock()
            .expect("session ledger mutex poisoned")
            .sign_up_role
            .take()
    }

    fn publish_if_current(&self, epoch: u64, session: Session) -> bool {
        let ledger = self.ledger.lock().expect("session ledger mutex poisoned");
        if ledger.epoch != epoch {
            return false;
        }

        self.state.send_modify(|snapshot| {
            snapshot.version += 1;
            snapshot.session = session;
        });
        true
    }
}

impl<I, D> Drop for SessionStore<I, D> {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

fn initial_profile(role: Role, credential: &Credential) -> Fields {
    let mut fields = Fields::new();
    fields.insert(USER_TYPE_FIELD.to_string(), json!(role.label()));
    fields.insert(PROFILE_COMPLETE_FIELD.to_string(), Value::Bool(false));
    fields.insert("createdAt".to_string(), json!(Utc::now().to_rfc3339()));
    if let Some(email) = &credential.email {
        fields.insert("email".to_string(), json!(email));
    }
    fields
}
