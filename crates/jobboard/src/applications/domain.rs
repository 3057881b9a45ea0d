use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::documents::{Document, DocumentError, Fields};
use crate::session::UserId;

pub(crate) const STATUS_FIELD: &str = "status";
pub(crate) const EMPLOYER_FIELD: &str = "employerId";
pub(crate) const APPLICANT_FIELD: &str = "applicantId";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// One application per seeker and job; the key doubles as the duplicate guard.
    ///
    /// The job id is length-prefixed so distinct pairs never share a key, whatever characters
    /// either id contains.
    pub fn for_listing(job_id: &str, applicant: &UserId) -> Self {
        Self(format!("{}.{job_id}_{applicant}", job_id.len()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an application: created `Pending`, decided once, never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub const fn can_transition_to(self, target: ApplicationStatus) -> bool {
        !self.is_terminal() && target.is_terminal()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantContact {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Stored application record. Field names follow the document layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: String,
    pub applicant_id: UserId,
    pub employer_id: UserId,
    pub job_title: String,
    pub company_name: String,
    pub applicant_contact: ApplicantContact,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl Application {
    pub fn from_document(document: Document) -> Result<Self, DocumentError> {
        let Document { id, mut fields } = document;
        fields.insert("id".to_string(), Value::String(id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|err| DocumentError::Malformed {
            id,
            reason: err.to_string(),
        })
    }

    /// Document fields for this record; the id is the document key and is not repeated.
    pub fn to_fields(&self) -> Fields {
        let mut fields = match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Fields::new(),
        };
        fields.remove("id");
        fields
    }
}

/// Job listing a seeker applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub job_id: String,
    pub job_title: String,
    pub company_name: String,
    pub employer_id: UserId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub total: usize,
}

/// Applications partitioned by status for one viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationView {
    pub pending: Vec<Application>,
    pub accepted: Vec<Application>,
    pub rejected: Vec<Application>,
    pub counts: StatusCounts,
}

impl ApplicationView {
    pub fn from_records(records: impl IntoIterator<Item = Application>) -> Self {
        let mut view = Self::default();
        for record in records {
            match record.status {
                ApplicationStatus::Pending => view.pending.push(record),
                ApplicationStatus::Accepted => view.accepted.push(record),
                ApplicationStatus::Rejected => view.rejected.push(record),
            }
        }

        view.counts = StatusCounts {
            pending: view.pending.len(),
            accepted: view.accepted.len(),
            rejected: view.rejected.len(),
            total: view.pending.len() + view.accepted.len() + view.rejected.len(),
        };
        view
    }
}
