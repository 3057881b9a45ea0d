use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::session::{Role, UserId};

/// Storage buckets for profile assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetBucket {
    CompanyLogos,
    ProfileImages,
    Cvs,
}

impl AssetBucket {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssetBucket::CompanyLogos => "company-logos",
            AssetBucket::ProfileImages => "profile-images",
            AssetBucket::Cvs => "cvs",
        }
    }

    /// Metadata `type` tag sent with each upload.
    pub const fn asset_type(self) -> &'static str {
        match self {
            AssetBucket::CompanyLogos => "company_logo",
            AssetBucket::ProfileImages => "profile_image",
            AssetBucket::Cvs => "cv",
        }
    }

    /// Profile field holding the returned reference.
    pub const fn record_field(self) -> &'static str {
        match self {
            AssetBucket::CompanyLogos => "logoData",
            AssetBucket::ProfileImages => "profileImageData",
            AssetBucket::Cvs => "cvData",
        }
    }
}

/// Raw file picked in a form, before upload.
#[derive(Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AssetUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for AssetUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Reference returned by the upload collaborator; persisted in place of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReference {
    pub bucket: String,
    pub path: String,
    pub url: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub user_id: UserId,
    pub asset_type: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployerProfileForm {
    pub company_name: String,
    pub location: String,
    pub description: String,
    pub mission: String,
    pub vision: String,
    pub logo: Option<AssetUpload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSeekerProfileForm {
    pub firstname: String,
    pub lastname: String,
    pub location: String,
    pub phone: String,
    /// `YYYY-MM-DD`, as entered in the date picker.
    pub date_of_birth: String,
    pub profile_image: Option<AssetUpload>,
    pub cv: Option<AssetUpload>,
}

/// Role-tagged profile submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileForm {
    Employer(EmployerProfileForm),
    JobSeeker(JobSeekerProfileForm),
}

impl ProfileForm {
    pub fn role(&self) -> Role {
        match self {
            ProfileForm::Employer(_) => Role::Employer,
            ProfileForm::JobSeeker(_) => Role::JobSeeker,
        }
    }

    /// Text fields keyed by their profile record name, in `Role::required_profile_fields` order.
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            ProfileForm::Employer(form) => vec![
                ("company_name", form.company_name.as_str()),
                ("location", form.location.as_str()),
                ("description", form.description.as_str()),
                ("mission", form.mission.as_str()),
                ("vision", form.vision.as_str()),
            ],
            ProfileForm::JobSeeker(form) => vec![
                ("firstname", form.firstname.as_str()),
                ("lastname", form.lastname.as_str()),
                ("location", form.location.as_str()),
                ("phone", form.phone.as_str()),
                ("dateOfBirth", form.date_of_birth.as_str()),
            ],
        }
    }

    pub fn assets(&self) -> Vec<(AssetBucket, &AssetUpload)> {
        match self {
            ProfileForm::Employer(form) => form
                .logo
                .iter()
                .map(|logo| (AssetBucket::CompanyLogos, logo))
                .collect(),
            ProfileForm::JobSeeker(form) => {
                let images = form
                    .profile_image
                    .iter()
                    .map(|image| (AssetBucket::ProfileImages, image));
                let cvs = form.cv.iter().map(|cv| (AssetBucket::Cvs, cv));
                images.chain(cvs).collect()
            }
        }
    }

    pub(crate) fn date_of_birth(&self) -> Option<&str> {
        match self {
            ProfileForm::JobSeeker(form) if !form.date_of_birth.trim().is_empty() => {
                Some(form.date_of_birth.trim())
            }
            _ => None,
        }
    }
}

/// Local constraint violations; raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{file_name} is {size} bytes, over the {limit} byte limit")]
    AssetTooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },
    #[error("{file_name} ({content_type}) cannot be stored in {bucket}")]
    UnsupportedAssetType {
        file_name: String,
        content_type: String,
        bucket: &'static str,
    },
    #[error("date of birth must be YYYY-MM-DD (found '{0}')")]
    InvalidDate(String),
    #[error("{form} profile submitted by a {session} session")]
    RoleMismatch { form: Role, session: Role },
}

pub(crate) fn parse_date_of_birth(raw: &str) -> Result<NaiveDate, ValidationFailure> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationFailure::InvalidDate(raw.to_string()))
}
