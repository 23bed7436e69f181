use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AvatarError {
    #[error("Select an image file (JPG, PNG, GIF or WebP)")]
    NotAnImage,

    #[error("Image must be at most {limit_mb} MB")]
    TooLarge { limit_mb: u64 },

    #[error("Could not read the selected file: {0}")]
    Read(String),
}

/// A file picked by the user. Only metadata, nothing has been read yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarFile {
    pub path: PathBuf,

    /// MIME type declared by the picker, when it reported one.
    pub content_type: Option<String>,

    pub size: u64,
}

impl AvatarFile {
    /// Builds the selection from the file system metadata.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AvatarError> {
        let path = path.as_ref().to_path_buf();
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| AvatarError::Read(e.to_string()))?;

        Ok(Self {
            path,
            content_type: None,
            size: metadata.len(),
        })
    }

    #[must_use]
    pub fn mime_type(&self) -> String {
        self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.path)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
    }

    /// Rejects non-images and oversized files from metadata alone.
    pub fn validate(&self, max_bytes: u64) -> Result<(), AvatarError> {
        if !self.mime_type().starts_with("image/") {
            return Err(AvatarError::NotAnImage);
        }

        if self.size > max_bytes {
            return Err(AvatarError::TooLarge {
                limit_mb: max_bytes.div_ceil(1024 * 1024),
            });
        }

        Ok(())
    }

    /// Validates, then reads and encodes the image as a data URL.
    pub async fn into_data_url(self, max_bytes: u64) -> Result<String, AvatarError> {
        self.validate(max_bytes)?;

        let bytes = fs::read(&self.path)
            .await
            .map_err(|e| AvatarError::Read(e.to_string()))?;

        // the file may have grown between selection and read
        if bytes.len() as u64 > max_bytes {
            return Err(AvatarError::TooLarge {
                limit_mb: max_bytes.div_ceil(1024 * 1024),
            });
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "Encoded avatar");

        Ok(encode_data_url(&self.mime_type(), &bytes))
    }
}

#[must_use]
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: Option<&str>, size: u64) -> AvatarFile {
        AvatarFile {
            path: PathBuf::from(name),
            content_type: content_type.map(str::to_string),
            size,
        }
    }

    #[test]
    fn test_validate_mime() {
        assert!(file("me.png", None, 10).validate(100).is_ok());
        assert!(file("me.jpeg", None, 10).validate(100).is_ok());
        assert_eq!(
            file("me.pdf", None, 10).validate(100),
            Err(AvatarError::NotAnImage)
        );
        assert_eq!(
            file("me.png", Some("text/plain"), 10).validate(100),
            Err(AvatarError::NotAnImage)
        );
        assert!(file("blob", Some("image/webp"), 10).validate(100).is_ok());
    }

    #[test]
    fn test_validate_size() {
        let limit = 2 * 1024 * 1024;
        assert!(file("me.png", None, limit).validate(limit).is_ok());
        assert_eq!(
            file("me.png", None, limit + 1).validate(limit),
            Err(AvatarError::TooLarge { limit_mb: 2 })
        );
    }

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[tokio::test]
    async fn test_into_data_url_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        tokio::fs::write(&path, b"\x89PNG").await.unwrap();

        let selected = AvatarFile::from_path(&path).await.unwrap();
        assert_eq!(selected.size, 4);

        let url = selected.into_data_url(1024).await.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = AvatarFile::from_path("/definitely/not/here.png").await;
        assert!(matches!(result, Err(AvatarError::Read(_))));
    }
}
