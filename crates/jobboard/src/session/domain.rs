use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::documents::{Document, Fields};

/// Profile document field carrying the role picked at sign-up.
pub const USER_TYPE_FIELD: &str = "userType";
/// Mirror of the completeness flag kept on the profile document for other readers.
pub const PROFILE_COMPLETE_FIELD: &str = "profileComplete";

/// Opaque identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marketplace roles. Every role-dependent branch dispatches through the methods below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    JobSeeker,
    Employer,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::JobSeeker, Role::Employer];

    pub const fn label(self) -> &'static str {
        match self {
            Role::JobSeeker => "job_seeker",
            Role::Employer => "employer",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "job_seeker" => Some(Role::JobSeeker),
            "employer" => Some(Role::Employer),
            _ => None,
        }
    }

    /// Where a visitor of this role lands when sent away from another role's destination.
    pub const fn landing_path(self) -> &'static str {
        match self {
            Role::JobSeeker => "/find-jobs",
            Role::Employer => "/employer",
        }
    }

    pub const fn completion_path(self) -> &'static str {
        match self {
            Role::JobSeeker => "/jobseeker/complete-profile",
            Role::Employer => "/employer/complete-profile",
        }
    }

    /// Text fields that must be non-empty for the profile to count as complete.
    pub const fn required_profile_fields(self) -> &'static [&'static str] {
        match self {
            Role::JobSeeker => &["firstname", "lastname", "location", "phone", "dateOfBirth"],
            Role::Employer => &["company_name", "location", "description", "mission", "vision"],
        }
    }

    pub fn profile_complete(self, fields: &Fields) -> bool {
        self.required_profile_fields()
            .iter()
            .all(|name| is_filled(fields.get(*name)))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn is_filled(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Coarse loading state exposed alongside the session variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingState {
    Pending,
    Ready,
    Absent,
    Error,
}

/// Authenticated visitor whose profile record has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitor {
    pub user_id: UserId,
    pub role: Role,
    pub profile_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Snapshot of who the current visitor is and what they can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Session {
    Pending,
    Ready(Visitor),
    Absent,
    Error { reason: String },
}

impl Session {
    pub fn loading_state(&self) -> LoadingState {
        match self {
            Session::Pending => LoadingState::Pending,
            Session::Ready(_) => LoadingState::Ready,
            Session::Absent => LoadingState::Absent,
            Session::Error { .. } => LoadingState::Error,
        }
    }

    pub fn visitor(&self) -> Option<&Visitor> {
        match self {
            Session::Ready(visitor) => Some(visitor),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, Session::Pending)
    }
}

/// Versioned session published by the store. `version` increases with every publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub version: u64,
    pub session: Session,
}

/// Profile document as read back from the document collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub user_id: UserId,
    pub role: Option<Role>,
    pub fields: Fields,
}

impl ProfileRecord {
    pub fn from_document(document: Document) -> Self {
        let role = document.str_field(USER_TYPE_FIELD).and_then(Role::from_label);
        Self {
            user_id: UserId(document.id),
            role,
            fields: document.fields,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.fields.get("email").and_then(Value::as_str)
    }
}
