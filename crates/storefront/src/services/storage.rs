//! Local file storage for product images and payment slips.
//!
//! Files are written under the configured upload directory with
//! UUID-derived names and served back from `/uploads`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Errors from storing an upload.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file is empty")]
    Empty,

    #[error("file exceeds the {max} byte limit")]
    TooLarge { max: usize },

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an upload is for; decides its subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProductImage,
    PaymentSlip,
}

impl UploadKind {
    const fn directory(self) -> &'static str {
        match self {
            Self::ProductImage => "products",
            Self::PaymentSlip => "slips",
        }
    }
}

/// Accepted image types as (content type, extension, magic bytes).
const IMAGE_TYPES: &[(&str, &str, &[u8])] = &[
    ("image/jpeg", "jpg", &[0xFF, 0xD8, 0xFF]),
    ("image/png", "png", &[0x89, b'P', b'N', b'G']),
    ("image/gif", "gif", b"GIF8"),
    ("image/webp", "webp", b"RIFF"),
];

/// Pick the file extension for an upload, checking the declared content
/// type against the file's leading bytes.
fn image_extension(content_type: Option<&str>, bytes: &[u8]) -> Result<&'static str, StorageError> {
    let declared = content_type.unwrap_or_default().trim().to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _, magic)| *mime == declared && bytes.starts_with(magic))
        .map(|(_, ext, _)| *ext)
        .ok_or_else(|| {
            StorageError::UnsupportedType(if declared.is_empty() {
                "unknown".to_owned()
            } else {
                declared
            })
        })
}

/// Writes uploads to a local directory.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStorage {
    #[must_use]
    pub const fn new(root: PathBuf, max_bytes: usize) -> Self {
        Self { root, max_bytes }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an image and return its public URL path.
    ///
    /// # Errors
    ///
    /// Rejects empty, oversized and non-image files; I/O errors are passed
    /// through.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store_image(
        &self,
        kind: UploadKind,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                max: self.max_bytes,
            });
        }
        let ext = image_extension(content_type, bytes)?;

        let dir = self.root.join(kind.directory());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        tracing::info!(file = %file_name, "Stored upload");
        Ok(format!("{PUBLIC_PREFIX}/{}/{file_name}", kind.directory()))
    }

    /// Delete a file previously returned by [`Self::store_image`]. URLs
    /// outside the upload directories and files already gone are ignored.
    #[instrument(skip(self))]
    pub async fn discard(&self, url: &str) {
        let Some(path) = self.local_path(url) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(error = %e, "Failed to remove upload");
        }
    }

    /// Map a public upload URL back to its file, refusing anything that
    /// could step outside the upload directories.
    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let (dir, file) = url
            .strip_prefix(PUBLIC_PREFIX)?
            .strip_prefix('/')?
            .split_once('/')?;
        let known = [UploadKind::ProductImage, UploadKind::PaymentSlip]
            .iter()
            .any(|kind| kind.directory() == dir);
        if !known || file.is_empty() || file.starts_with('.') || file.contains(['/', '\\']) {
            return None;
        }
        Some(self.root.join(dir).join(file))
    }
}
