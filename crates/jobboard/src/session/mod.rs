//! Visitor session: who is browsing, in which role, and whether their profile is complete.

pub mod bearer;
pub mod domain;
pub mod identity;
mod store;

pub use bearer::{require_visitor, BearerSessions, MemoryTokenVerifier, TokenVerifier};
pub use domain::{
    LoadingState, ProfileRecord, Role, Session, SessionSnapshot, UserId, Visitor,
    PROFILE_COMPLETE_FIELD, USER_TYPE_FIELD,
};
pub use identity::{
    Credential, CredentialState, CredentialSubscription, IdentityError, IdentityProvider,
    MemoryIdentityProvider,
};
pub use store::{SessionError, SessionStore};
