//! Image capture adapter
//!
//! Photos reach the draft through [`ImageCaptureAdapter`], so the store and
//! validator never touch a camera or the file system. Implementations return
//! a data-URI encoded image for the requested specimen and angle.

use crate::error::CaptureError;
use crate::models::PhotoAngle;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Which photo is being taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTarget {
    /// 0-based row position
    pub specimen: usize,
    pub angle: PhotoAngle,
}

impl CaptureTarget {
    pub fn new(specimen: usize, angle: PhotoAngle) -> Self {
        Self { specimen, angle }
    }
}

/// Source of encoded specimen photos (camera, file upload, test double)
#[async_trait]
pub trait ImageCaptureAdapter: Send + Sync {
    /// Produce a data-URI image for `target`
    async fn capture(&self, target: CaptureTarget) -> Result<String, CaptureError>;
}

/// Upload of an existing image file
#[derive(Debug, Clone)]
pub struct FileUploadCapture {
    path: PathBuf,
}

impl FileUploadCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageCaptureAdapter for FileUploadCapture {
    async fn capture(&self, target: CaptureTarget) -> Result<String, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                CaptureError::CaptureDenied(format!("{}: {}", self.path.display(), e))
            }
            _ => CaptureError::Unreadable(format!("{}: {}", self.path.display(), e)),
        })?;

        let uri = encode_data_uri(&bytes)?;
        debug!(
            row = target.specimen,
            angle = %target.angle,
            bytes = bytes.len(),
            path = %self.path.display(),
            "Photo loaded from file"
        );
        Ok(uri)
    }
}

/// Encode raw image bytes as `data:<mime>;base64,...`
///
/// The MIME type comes from the file's magic bytes; anything that is not an
/// image is refused.
pub fn encode_data_uri(bytes: &[u8]) -> Result<String, CaptureError> {
    if bytes.is_empty() {
        return Err(CaptureError::Unreadable("file is empty".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| CaptureError::UnsupportedFormat("unrecognised file type".to_string()))?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(CaptureError::UnsupportedFormat(kind.mime_type().to_string()));
    }

    Ok(format!(
        "data:{};base64,{}",
        kind.mime_type(),
        general_purpose::STANDARD.encode(bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_png_bytes_become_data_uri() {
        let uri = encode_data_uri(PNG_HEADER).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        let encoded = uri.trim_start_matches("data:image/png;base64,");
        assert_eq!(general_purpose::STANDARD.decode(encoded).unwrap(), PNG_HEADER);
    }

    #[test]
    fn test_non_image_rejected() {
        let err = encode_data_uri(b"%PDF-1.7\n%binary").unwrap_err();
        assert_eq!(err, CaptureError::UnsupportedFormat("application/pdf".to_string()));

        assert!(matches!(
            encode_data_uri(b"just some text"),
            Err(CaptureError::UnsupportedFormat(_))
        ));
        assert!(matches!(encode_data_uri(&[]), Err(CaptureError::Unreadable(_))));
    }

    #[tokio::test]
    async fn test_file_upload_capture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();

        let capture = FileUploadCapture::new(file.path());
        let uri = capture
            .capture(CaptureTarget::new(0, PhotoAngle::FrontFailure))
            .await
            .unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let capture = FileUploadCapture::new(dir.path().join("nope.jpg"));
        let err = capture
            .capture(CaptureTarget::new(1, PhotoAngle::BackFailure))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Unreadable(_)));
    }
}
