use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mime::Mime;

use super::domain::{AssetBucket, AssetReference, AssetUpload, UploadMetadata, ValidationFailure};
use crate::error::ErrorKind;

const WORD_DOCUMENT: &str = "application/msword";
const WORD_OPEN_XML: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(
        &self,
        asset: AssetUpload,
        bucket: AssetBucket,
        metadata: UploadMetadata,
    ) -> Result<AssetReference, UploadError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("upload service unavailable: {0}")]
    Unavailable(String),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Rejected(_) => ErrorKind::ValidationFailure,
            UploadError::Unavailable(_) => ErrorKind::BackendFailure,
        }
    }
}

/// Size and type checks applied before the asset is handed to the uploader.
pub fn validate_asset(
    asset: &AssetUpload,
    bucket: AssetBucket,
    max_bytes: u64,
) -> Result<(), ValidationFailure> {
    if asset.size() > max_bytes {
        return Err(ValidationFailure::AssetTooLarge {
            file_name: asset.file_name.clone(),
            size: asset.size(),
            limit: max_bytes,
        });
    }

    let accepted = asset
        .content_type
        .parse::<Mime>()
        .map(|mime| accepts(bucket, &mime))
        .unwrap_or(false);

    if accepted {
        Ok(())
    } else {
        Err(ValidationFailure::UnsupportedAssetType {
            file_name: asset.file_name.clone(),
            content_type: asset.content_type.clone(),
            bucket: bucket.as_str(),
        })
    }
}

fn accepts(bucket: AssetBucket, mime: &Mime) -> bool {
    match bucket {
        AssetBucket::CompanyLogos | AssetBucket::ProfileImages => mime.type_() == mime::IMAGE,
        AssetBucket::Cvs => {
            let essence = mime.essence_str();
            essence == mime::APPLICATION_PDF.essence_str()
                || essence == WORD_DOCUMENT
                || essence == WORD_OPEN_XML
        }
    }
}

/// Upload record kept by [`MemoryAssetUploader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub bucket: AssetBucket,
    pub metadata: UploadMetadata,
    pub reference: AssetReference,
}

/// Process-local uploader that keeps references in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssetUploader {
    stored: Arc<Mutex<Vec<StoredAsset>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryAssetUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    pub fn stored(&self) -> Vec<StoredAsset> {
        self.stored.lock().expect("upload mutex poisoned").clone()
    }
}

#[async_trait]
impl AssetUploader for MemoryAssetUploader {
    async fn upload(
        &self,
        asset: AssetUpload,
        bucket: AssetBucket,
        metadata: UploadMetadata,
    ) -> Result<AssetReference, UploadError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(UploadError::Unavailable("storage offline".to_string()));
        }

        let path = format!(
            "{}/{}/{}",
            bucket.as_str(),
            metadata.user_id,
            asset.file_name
        );
        let reference = AssetReference {
            bucket: bucket.as_str().to_string(),
            url: format!("memory://{path}"),
            path,
            content_type: asset.content_type.clone(),
            size: asset.size(),
        };

        self.stored
            .lock()
            .expect("upload mutex poisoned")
            .push(StoredAsset {
                bucket,
                metadata,
                reference: reference.clone(),
            });
        Ok(reference)
    }
}
