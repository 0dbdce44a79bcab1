//! File storage for profile pictures, product images, employee documents and resources.

use crate::errors::ServiceError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const PRODUCT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];
pub const CV_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];
pub const RESOURCE_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx"];

/// Lowercased extension of a client-supplied filename
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Content type served for a stored file
pub fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Stored names are `<uuid-hex>.<ext>`; anything else is refused on download.
pub fn is_stored_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((stem, ext)) => {
            stem.len() == 32
                && stem.chars().all(|c| c.is_ascii_hexdigit())
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Upload directory rooted at `upload_dir`
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn path_of(&self, area: &str, stored_name: &str) -> PathBuf {
        self.root.join(area).join(stored_name)
    }

    /// Save `bytes` under `area`, returning the generated file name.
    pub async fn save(
        &self,
        area: &str,
        original_name: &str,
        bytes: &[u8],
        allowed: &[&str],
    ) -> Result<String, ServiceError> {
        let ext = extension_of(original_name)
            .filter(|ext| allowed.contains(&ext.as_str()))
            .ok_or_else(|| {
                ServiceError::UnsupportedMediaType(format!(
                    "Allowed file types: {}",
                    allowed.join(", ")
                ))
            })?;

        if bytes.len() > self.max_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "File exceeds {} bytes",
                self.max_bytes
            )));
        }
        if bytes.is_empty() {
            return Err(ServiceError::ValidationError("Uploaded file is empty".into()));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let dir = self.root.join(area);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&stored_name), bytes).await?;

        info!(area, file = %stored_name, size = bytes.len(), "stored upload");
        Ok(stored_name)
    }

    /// Remove a file whose database row was never written
    pub async fn discard(&self, area: &str, stored_name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.path_of(area, stored_name)).await {
            warn!(area, file = %stored_name, error = %e, "could not remove orphaned upload");
        }
    }

    pub async fn read(&self, area: &str, stored_name: &str) -> Result<Vec<u8>, ServiceError> {
        if !is_stored_name(stored_name) {
            return Err(ServiceError::NotFound(format!("File {} not found", stored_name)));
        }
        match tokio::fs::read(self.path_of(area, stored_name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::NotFound(
                format!("File {} not found", stored_name),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn extensions_and_content_types() {
        assert_eq!(extension_of("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(content_type_for("a.xlsx"), "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }

    #[test]
    fn stored_names_reject_traversal() {
        assert!(is_stored_name("0123456789abcdef0123456789abcdef.pdf"));
        assert!(!is_stored_name("../etc/passwd"));
        assert!(!is_stored_name("0123456789abcdef0123456789abcdef.p/f"));
        assert!(!is_stored_name("short.pdf"));
    }

    #[tokio::test]
    async fn save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 16);

        let name = store.save("docs", "sop.pdf", b"%PDF-1", RESOURCE_EXTENSIONS).await.unwrap();
        assert!(is_stored_name(&name));
        assert_eq!(store.read("docs", &name).await.unwrap(), b"%PDF-1");

        assert_matches!(
            store.save("docs", "x.exe", b"MZ", RESOURCE_EXTENSIONS).await,
            Err(ServiceError::UnsupportedMediaType(_))
        );
        assert_matches!(
            store.save("docs", "big.pdf", &[0u8; 17], RESOURCE_EXTENSIONS).await,
            Err(ServiceError::PayloadTooLarge(_))
        );

        store.discard("docs", &name).await;
        assert_matches!(store.read("docs", &name).await, Err(ServiceError::NotFound(_)));
        // Already gone
        store.discard("docs", &name).await;
    }
}
