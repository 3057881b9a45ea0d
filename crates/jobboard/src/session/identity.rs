use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use super::domain::UserId;
use crate::error::ErrorKind;

/// Credential confirmed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl Credential {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Latest credential state reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    SignedIn(Credential),
    SignedOut,
    Failed(IdentityError),
}

impl From<Result<Option<Credential>, IdentityError>> for CredentialState {
    fn from(value: Result<Option<Credential>, IdentityError>) -> Self {
        match value {
            Ok(Some(credential)) => CredentialState::SignedIn(credential),
            Ok(None) => CredentialState::SignedOut,
            Err(error) => CredentialState::Failed(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("credential rejected: {0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Rejected(_) => ErrorKind::AuthFailure,
            IdentityError::Unavailable(_) => ErrorKind::BackendFailure,
        }
    }
}

/// Cancellable feed of credential changes. Dropping it ends the subscription.
///
/// Intermediate states may be coalesced; a slow reader always sees the latest one.
#[derive(Debug)]
pub struct CredentialSubscription {
    receiver: watch::Receiver<CredentialState>,
}

impl CredentialSubscription {
    pub fn new(receiver: watch::Receiver<CredentialState>) -> Self {
        Self { receiver }
    }

    pub fn current(&mut self) -> CredentialState {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next change; `None` once the provider has gone away.
    pub async fn changed(&mut self) -> Option<CredentialState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_credential(&self) -> Result<Option<Credential>, IdentityError>;
    fn subscribe(&self) -> CredentialSubscription;
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Process-local identity provider driven by explicit calls.
#[derive(Debug)]
pub struct MemoryIdentityProvider {
    state: watch::Sender<CredentialState>,
    refuse_sign_out: AtomicBool,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        let (state, _) = watch::channel(CredentialState::SignedOut);
        Self {
            state,
            refuse_sign_out: AtomicBool::new(false),
        }
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, credential: Credential) {
        self.state
            .send_replace(CredentialState::SignedIn(credential));
    }

    /// Simulate the provider revoking the current credential.
    pub fn expire(&self, reason: impl Into<String>) {
        self.state
            .send_replace(CredentialState::Failed(IdentityError::Rejected(reason.into())));
    }

    pub fn refuse_sign_out(&self, refuse: bool) {
        self.refuse_sign_out.store(refuse, Ordering::Release);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_credential(&self) -> Result<Option<Credential>, IdentityError> {
        match &*self.state.borrow() {
            CredentialState::SignedIn(credential) => Ok(Some(credential.clone())),
            CredentialState::SignedOut => Ok(None),
            CredentialState::Failed(error) => Err(error.clone()),
        }
    }

    fn subscribe(&self) -> CredentialSubscription {
        CredentialSubscription::new(self.state.subscribe())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if self.refuse_sign_out.load(Ordering::Acquire) {
            return Err(IdentityError::Unavailable("sign-out endpoint unreachable".to_string()));
        }
        self.state.send_replace(CredentialState::SignedOut);
        Ok(())
    }
}
