use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::attachment::store::AttachmentStore;
use crate::modules::message::schema::{Attachment, AttachmentKind};

#[derive(Clone)]
pub struct AttachmentService {
    store: Arc<dyn AttachmentStore + Send + Sync>,
    max_size: usize,
}

/// Prefers the declared MIME type and falls back to the file extension.
pub fn detect_kind(original_name: &str, mime_type: Option<&str>) -> AttachmentKind {
    match mime_type {
        Some(mime) if mime != "application/octet-stream" => AttachmentKind::from_mime(mime),
        _ => {
            let guessed = mime_guess::from_path(original_name).first_or_octet_stream();
            AttachmentKind::from_mime(guessed.essence_str())
        }
    }
}

impl AttachmentService {
    pub fn with_dependencies(store: Arc<dyn AttachmentStore + Send + Sync>, max_size: usize) -> Self {
        AttachmentService { store, max_size }
    }

    /// Rejects a payload as soon as it grows past the configured limit.
    pub fn check_size(&self, size: usize) -> Result<(), error::SystemError> {
        if size > self.max_size {
            return Err(error::SystemError::invalid_operation(format!(
                "File size exceeds maximum allowed size of {} bytes",
                self.max_size
            )));
        }
        Ok(())
    }

    fn generate_filename(original_name: &str) -> String {
        let extension =
            Path::new(original_name).extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let id = Uuid::now_v7();
        if extension.is_empty() {
            id.to_string()
        } else {
            format!("{}.{}", id, extension.to_lowercase())
        }
    }

    pub async fn upload(
        &self,
        original_name: &str,
        bytes: &[u8],
        mime_type: Option<&str>,
    ) -> Result<Attachment, error::SystemError> {
        if bytes.is_empty() {
            return Err(error::SystemError::invalid_operation("Uploaded file is empty"));
        }
        self.check_size(bytes.len())?;

        let filename = Self::generate_filename(original_name);
        let url = self.store.put(&filename, bytes).await.map_err(|e| {
            tracing::error!(error = %e, file = %filename, "attachment store failed");
            error::SystemError::upload_failed("Could not store the uploaded file")
        })?;

        tracing::info!(url = %url, size = bytes.len(), "attachment stored");
        Ok(Attachment {
            url,
            kind: detect_kind(original_name, mime_type),
            original_name: original_name.to_string(),
        })
    }
}
