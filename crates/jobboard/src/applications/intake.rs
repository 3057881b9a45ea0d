use chrono::Utc;
use tracing::info;

use super::domain::{ApplicantContact, Application, ApplicationId, ApplicationStatus, JobListing};
use super::store::ApplicationStore;
use crate::documents::{Collection, DocumentError, DocumentStore};
use crate::error::ErrorKind;
use crate::session::{ProfileRecord, Role, Session};

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("sign in to apply")]
    NotSignedIn,
    #[error("only job seekers can apply (signed in as {0})")]
    NotJobSeeker(Role),
    #[error("complete your profile before applying")]
    IncompleteProfile,
    #[error("no contact email on record")]
    MissingContact,
    #[error("already applied ({0})")]
    Duplicate(ApplicationId),
    #[error(transparent)]
    Documents(#[from] DocumentError),
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::NotSignedIn
            | IntakeError::NotJobSeeker(_)
            | IntakeError::IncompleteProfile => ErrorKind::AuthFailure,
            IntakeError::MissingContact => ErrorKind::ValidationFailure,
            IntakeError::Duplicate(_) => ErrorKind::Conflict,
            IntakeError::Documents(_) => ErrorKind::BackendFailure,
        }
    }
}

impl<D> ApplicationStore<D>
where
    D: DocumentStore,
{
    /// Create a pending application from the signed-in seeker to `listing`.
    pub async fn apply(
        &self,
        session: &Session,
        listing: &JobListing,
    ) -> Result<Application, IntakeError> {
        let visitor = session.visitor().ok_or(IntakeError::NotSignedIn)?;
        if visitor.role != Role::JobSeeker {
            return Err(IntakeError::NotJobSeeker(visitor.role));
        }
        if !visitor.profile_complete {
            return Err(IntakeError::IncompleteProfile);
        }

        let profile = self
            .documents
            .get(Collection::Users, visitor.user_id.as_str())
            .await?
            .map(ProfileRecord::from_document);
        let phone = profile
            .as_ref()
            .and_then(|record| record.fields.get("phone"))
            .and_then(|value| value.as_str())
            .map(str::to_string);
        let email = visitor
            .email
            .clone()
            .or_else(|| profile.as_ref().and_then(|record| record.email().map(str::to_string)))
            .ok_or(IntakeError::MissingContact)?;

        let application = Application {
            id: ApplicationId::for_listing(&listing.job_id, &visitor.user_id),
            job_id: listing.job_id.clone(),
            applicant_id: visitor.user_id.clone(),
            employer_id: listing.employer_id.clone(),
            job_title: listing.job_title.clone(),
            company_name: listing.company_name.clone(),
            applicant_contact: ApplicantContact { email, phone },
            status: ApplicationStatus::Pending,
            created_at: Utc::now(),
        };

        match self
            .documents
            .create(
                Collection::Applications,
                application.id.as_str(),
                application.to_fields(),
            )
            .await
        {
            Ok(()) => {
                info!(
                    application = %application.id,
                    applicant = %application.applicant_id,
                    employer = %application.employer_id,
                    "application submitted"
                );
                Ok(application)
            }
            Err(DocumentError::AlreadyExists) => Err(IntakeError::Duplicate(application.id)),
            Err(err) => Err(err.into()),
        }
    }
}
