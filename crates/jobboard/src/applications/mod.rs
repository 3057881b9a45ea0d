//! Job applications: intake, per-viewer boards, and the status engine.

pub mod domain;
mod engine;
mod intake;
pub mod router;
mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantContact, Application, ApplicationId, ApplicationStatus, ApplicationView,
    JobListing, StatusCounts,
};
pub use engine::{ApplicationStatusEngine, TransitionError};
pub use intake::IntakeError;
pub use router::application_router;
pub use store::{
    ApplicationBoard, ApplicationStore, BoardEntry, BoardMode, CacheState, StoreError,
};
