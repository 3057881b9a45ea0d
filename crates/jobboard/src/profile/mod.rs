//! Profile completion: role-specific forms, asset uploads, and the completeness flip.

pub mod domain;
mod flow;
pub mod upload;

pub use domain::{
    AssetBucket, AssetReference, AssetUpload, EmployerProfileForm, JobSeekerProfileForm,
    ProfileForm, UploadMetadata, ValidationFailure,
};
pub use flow::{ProfileCompletionFlow, ProfileError};
pub use upload::{validate_asset, AssetUploader, MemoryAssetUploader, StoredAsset, UploadError};
