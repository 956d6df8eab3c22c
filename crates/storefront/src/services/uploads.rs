//! Admin image uploads.
//!
//! Files are checked against a MIME allow-list and a size limit before
//! anything touches the disk, then written under a generated name into the
//! directory for the current [`AppEnv`](crate::config::AppEnv). The
//! directory is served back under the configured public prefix.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use thiserror::Error;

use crate::config::VitrinaConfig;

/// Accepted MIME types and the extension each maps to.
const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Extensions kept from the client's file name.
const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Length of the random part of generated names.
const RANDOM_SUFFIX_LEN: usize = 8;

/// Reasons an upload is refused or fails.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file was uploaded")]
    MissingFile,

    #[error("Unsupported file type {0:?}. Allowed types: JPEG, PNG, WebP")]
    UnsupportedType(String),

    #[error("File too large: maximum size is {max_mib} MiB")]
    TooLarge { max_mib: usize },

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received from the client, fully buffered.
#[derive(Debug)]
pub struct IncomingFile {
    pub original_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Response body of a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    pub success: bool,
    /// Public URL path of the stored file.
    pub url: String,
    pub file_name: String,
    pub original_name: Option<String>,
    pub size: usize,
    /// Echo of the client's `sizePreference` field.
    pub size_preference: Option<String>,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Stores uploads into one directory.
#[derive(Debug, Clone)]
pub struct Uploader {
    dir: PathBuf,
    public_prefix: String,
    max_bytes: usize,
}

impl Uploader {
    #[must_use]
    pub fn new(dir: PathBuf, public_prefix: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            dir,
            public_prefix: public_prefix.into().trim_end_matches('/').to_owned(),
            max_bytes,
        }
    }

    /// Uploader for the configured environment's directory.
    #[must_use]
    pub fn from_config(config: &VitrinaConfig) -> Self {
        Self::new(
            config.upload_dir().clone(),
            config.uploads.public_prefix.clone(),
            config.uploads.max_bytes,
        )
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Error for a body that went over the size limit while streaming.
    #[must_use]
    pub const fn too_large(&self) -> UploadError {
        UploadError::TooLarge {
            max_mib: self.max_bytes / (1024 * 1024),
        }
    }

    /// Check type and size without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::UnsupportedType`] or [`UploadError::TooLarge`].
    pub fn validate(&self, content_type: &str, size: usize) -> Result<(), UploadError> {
        extension_for(content_type)?;
        if size > self.max_bytes {
            return Err(self.too_large());
        }
        Ok(())
    }

    /// Validate and write `file`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a validation error (nothing written) or [`UploadError::Io`].
    pub async fn store(
        &self,
        file: IncomingFile,
        size_preference: Option<String>,
    ) -> Result<StoredUpload, UploadError> {
        self.validate(&file.content_type, file.bytes.len())?;

        let file_name = generate_file_name(
            file.original_name.as_deref(),
            &file.content_type,
            Utc::now().timestamp_millis(),
            &mut rand::rng(),
        )?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &file.bytes).await?;

        tracing::info!(
            file_name = %file_name,
            size = file.bytes.len(),
            content_type = %file.content_type,
            "Stored upload"
        );

        Ok(StoredUpload {
            success: true,
            url: format!("{}/{file_name}", self.public_prefix),
            file_name,
            original_name: file.original_name,
            size: file.bytes.len(),
            size_preference,
            path,
        })
    }
}

/// Extension for an allowed MIME type (parameters such as `; charset` are
/// ignored).
fn extension_for(content_type: &str) -> Result<&'static str, UploadError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| UploadError::UnsupportedType(content_type.to_owned()))
}

/// `<unix millis>-<8 random alphanumerics>.<extension>`.
///
/// The client's extension is kept (lowercased) when it is an image
/// extension; otherwise the extension comes from the MIME type.
fn generate_file_name(
    original_name: Option<&str>,
    content_type: &str,
    millis: i64,
    rng: &mut impl Rng,
) -> Result<String, UploadError> {
    let from_mime = extension_for(content_type)?;

    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| from_mime.to_owned());

    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();

    Ok(format!("{millis}-{suffix}.{extension}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MAX_UPLOAD_BYTES;

    const MIB: usize = 1024 * 1024;

    fn uploader(dir: &Path) -> Uploader {
        Uploader::new(dir.join("uploads"), "/uploads/", MAX_UPLOAD_BYTES)
    }

    fn file(name: &str, content_type: &str, size: usize) -> IncomingFile {
        IncomingFile {
            original_name: Some(name.to_owned()),
            content_type: content_type.to_owned(),
            bytes: vec![0u8; size],
        }
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map_or(0, Iterator::count)
    }

    #[tokio::test]
    async fn test_oversized_jpeg_is_rejected_and_nothing_written() {
        let tmp = tempfile::tempdir().unwrap();
        let uploader = uploader(tmp.path());

        let err = uploader
            .store(file("photo.jpg", "image/jpeg", 20 * MIB), None)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::TooLarge { max_mib: 15 }));
        assert_eq!(err.to_string(), "File too large: maximum size is 15 MiB");
        assert_eq!(files_in(uploader.dir()), 0);
    }

    #[tokio::test]
    async fn test_png_is_stored_at_returned_url() {
        let tmp = tempfile::tempdir().unwrap();
        let uploader = uploader(tmp.path());

        let stored = uploader
            .store(file("Banner.PNG", "image/png", 2 * MIB), Some("large".to_owned()))
            .await
            .unwrap();

        assert!(stored.success);
        assert_eq!(stored.size, 2 * MIB);
        assert_eq!(stored.url, format!("/uploads/{}", stored.file_name));
        assert!(stored.file_name.ends_with(".png"));
        assert_eq!(stored.original_name.as_deref(), Some("Banner.PNG"));
        assert_eq!(stored.size_preference.as_deref(), Some("large"));

        let on_disk = uploader.dir().join(&stored.file_name);
        assert_eq!(on_disk, stored.path);
        assert_eq!(std::fs::metadata(&on_disk).unwrap().len(), (2 * MIB) as u64);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let uploader = uploader(tmp.path());

        let err = uploader
            .store(file("doc.pdf", "application/pdf", 10), None)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::UnsupportedType(_)));
        assert_eq!(files_in(uploader.dir()), 0);
    }

    #[test]
    fn test_limit_is_inclusive() {
        let uploader = Uploader::new(PathBuf::from("unused"), "/uploads", MAX_UPLOAD_BYTES);
        assert!(uploader.validate("image/webp", MAX_UPLOAD_BYTES).is_ok());
        assert!(uploader.validate("image/webp", MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn test_mime_parameters_and_case_are_ignored() {
        assert_eq!(extension_for("Image/JPEG; charset=binary").unwrap(), "jpg");
        assert_eq!(extension_for("image/jpg").unwrap(), "jpg");
        assert!(extension_for("image/gif").is_err());
        assert!(extension_for("").is_err());
    }

    #[test]
    fn test_file_name_shape() {
        let mut rng = rand::rng();
        let name = generate_file_name(Some("IMG_01.JPEG"), "image/jpeg", 1_700_000_000_123, &mut rng)
            .unwrap();
        let (stamp, rest) = name.split_once('-').unwrap();
        let (random, ext) = rest.split_once('.').unwrap();
        assert_eq!(stamp, "1700000000123");
        assert_eq!(random.len(), RANDOM_SUFFIX_LEN);
        assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(ext, "jpeg");
    }

    #[test]
    fn test_extension_falls_back_to_mime() {
        let mut rng = rand::rng();
        let no_ext = generate_file_name(Some("blob"), "image/webp", 1, &mut rng).unwrap();
        assert!(no_ext.ends_with(".webp"));

        let script = generate_file_name(Some("x.html"), "image/png", 1, &mut rng).unwrap();
        assert!(script.ends_with(".png"));

        let unnamed = generate_file_name(None, "image/jpg", 1, &mut rng).unwrap();
        assert!(unnamed.ends_with(".jpg"));
    }
}
