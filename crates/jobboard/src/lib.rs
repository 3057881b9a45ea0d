//! Core of the job marketplace: who the visitor is, where they may go, and how applications
//! move from pending to a final decision.

pub mod applications;
pub mod config;
pub mod documents;
pub mod error;
pub mod gate;
pub mod profile;
pub mod session;
pub mod telemetry;

pub use applications::{
    application_router, Application, ApplicationBoard, ApplicationId, ApplicationStatus,
    ApplicationStatusEngine, ApplicationStore, ApplicationView, JobListing, TransitionError,
};
pub use config::{AppConfig, AppEnvironment, ConfigError};
pub use documents::{DocumentStore, MemoryDocumentStore};
pub use error::{AppError, ErrorKind};
pub use gate::{decide, gate_router, AccessGate, GateDecision, NavigationRequest};
pub use profile::{MemoryAssetUploader, ProfileCompletionFlow, ProfileForm};
pub use session::{
    BearerSessions, MemoryIdentityProvider, MemoryTokenVerifier, Role, Session, SessionSnapshot,
    SessionStore, TokenVerifier, UserId, Visitor,
};
