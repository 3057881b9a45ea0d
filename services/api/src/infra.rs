use jobboard::profile::AssetUpload;
use jobboard::{BearerSessions, MemoryDocumentStore, MemoryTokenVerifier};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local stand-ins for the shared document service and the token issuer.
#[derive(Clone, Default)]
pub(crate) struct Collaborators {
    pub(crate) documents: Arc<MemoryDocumentStore>,
    pub(crate) tokens: Arc<MemoryTokenVerifier>,
}

impl Collaborators {
    pub(crate) fn in_memory() -> Self {
        Self::default()
    }

    pub(crate) fn sessions(&self) -> Arc<BearerSessions<MemoryTokenVerifier, MemoryDocumentStore>> {
        Arc::new(BearerSessions::new(
            self.tokens.clone(),
            self.documents.clone(),
        ))
    }
}

/// Read a file from disk as an upload, guessing its content type from the extension.
pub(crate) fn load_asset(path: &Path) -> std::io::Result<AssetUpload> {
    let bytes = std::fs::read(path)?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    Ok(AssetUpload::new(
        file_name,
        content_type.essence_str(),
        bytes,
    ))
}
