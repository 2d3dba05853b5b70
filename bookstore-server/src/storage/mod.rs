//! Image storage
//!
//! Uploads are validated, re-encoded as JPEG and named by the SHA-256 of the
//! encoded bytes, so re-uploading the same picture yields the same URL.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use sha2::{Digest, Sha256};
use shared::error::{AppError, ErrorCode};

/// Maximum upload size (10MB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

const JPEG_QUALITY: u8 = 85;

const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Destination folder of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFolder {
    CoverImages,
    ProductImages,
    Avatars,
}

impl ImageFolder {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CoverImages => "coverImages",
            Self::ProductImages => "productImages",
            Self::Avatars => "avatars",
        }
    }
}

/// A file received in a multipart form
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_url: String,
    pub hash: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, file: &UploadFile, folder: ImageFolder) -> Result<StoredImage, AppError>;
}

/// Stores images under `{root}/{folder}/{hash}.jpg`
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, file: &UploadFile, folder: ImageFolder) -> Result<StoredImage, AppError> {
        validate_upload(file)?;
        let (buffer, hash) = compress_to_jpeg(&file.data)?;

        let dir = self.root.join(folder.as_str());
        let path = dir.join(format!("{hash}.jpg"));

        // Content-addressed: an existing file already holds these bytes
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                tracing::error!(dir = %dir.display(), error = %e, "Failed to create upload dir");
                AppError::new(ErrorCode::FileStorageFailed)
            })?;
            tokio::fs::write(&path, &buffer).await.map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Failed to write image");
                AppError::new(ErrorCode::FileStorageFailed)
            })?;
        }

        tracing::info!(
            folder = folder.as_str(),
            hash = %hash,
            size = buffer.len(),
            "Image stored"
        );

        Ok(StoredImage {
            file_url: format!("{}/{}/{hash}.jpg", self.public_base_url, folder.as_str()),
            hash,
        })
    }
}

/// Size and extension checks, before any decoding
fn validate_upload(file: &UploadFile) -> Result<(), AppError> {
    if file.data.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyFile).with_detail("file", file.file_name.clone()));
    }

    if file.data.len() > MAX_FILE_SIZE {
        return Err(AppError::with_message(
            ErrorCode::FileTooLarge,
            format!(
                "File too large: {} bytes (max {})",
                file.data.len(),
                MAX_FILE_SIZE
            ),
        ));
    }

    let ext = std::path::Path::new(&file.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(AppError::with_message(
            ErrorCode::UnsupportedFileFormat,
            format!("Unsupported format: {ext}. Supported: png, jpg, jpeg, webp"),
        ));
    }
    Ok(())
}

/// Decode, re-encode as JPEG and hash the encoded bytes
fn compress_to_jpeg(data: &[u8]) -> Result<(Vec<u8>, String), AppError> {
    let img = image::load_from_memory(data).map_err(|e| {
        AppError::with_message(ErrorCode::InvalidImageFile, format!("Invalid image: {e}"))
    })?;

    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let rgb_img = img.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
        rgb_img.write_with_encoder(encoder).map_err(|e| {
            AppError::with_message(
                ErrorCode::InternalError,
                format!("Image compression failed: {e}"),
            )
        })?;
    }

    let mut hasher = Sha256::new();
    hasher.update(&buffer);
    let hash = hex::encode(hasher.finalize());
    Ok((buffer, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(color: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb(color));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn upload(name: &str, data: Vec<u8>) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn test_upload_writes_hash_named_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "http://localhost/uploads/");

        let stored = store
            .upload(&upload("cover.PNG", png_bytes([200, 10, 10])), ImageFolder::CoverImages)
            .await
            .unwrap();

        assert_eq!(stored.hash.len(), 64);
        assert_eq!(
            stored.file_url,
            format!("http://localhost/uploads/coverImages/{}.jpg", stored.hash)
        );
        let written = std::fs::read(dir.path().join("coverImages").join(format!("{}.jpg", stored.hash)))
            .unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), image::ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_same_content_same_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads");
        let a = store
            .upload(&upload("a.png", png_bytes([1, 2, 3])), ImageFolder::ProductImages)
            .await
            .unwrap();
        let b = store
            .upload(&upload("b.png", png_bytes([1, 2, 3])), ImageFolder::ProductImages)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads");
        let err = store
            .upload(&upload("cover.gif", png_bytes([0, 0, 0])), ImageFolder::CoverImages)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedFileFormat);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let err = validate_upload(&upload("a.png", vec![])).unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyFile);

        let err = validate_upload(&upload("a.png", vec![0; MAX_FILE_SIZE + 1])).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileTooLarge);
        assert_eq!(err.http_status(), http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_rejects_undecodable_content() {
        let err = compress_to_jpeg(b"definitely not an image").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidImageFile);
    }
}
