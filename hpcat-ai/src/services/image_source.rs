//! Image acquisition
//!
//! Both acquisition modes end in a plain reference string handed to the
//! pipeline; pixel data is never decoded here.
//!
//! - Remote images: a `HEAD` request must answer 200 with an `image/*`
//!   content type. Any transport failure counts as invalid.
//! - Local files (CLI): same type checks as uploads, the path is used as is.
//! - Uploaded images: only JPEG and PNG are accepted (checked by file
//!   extension when a name is given, and by magic number). The bytes are
//!   written to a temporary file that is kept after the process exits, and
//!   its path becomes the reference.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::CatalogError;

/// Upload file extensions accepted
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Timeout for the reachability check
pub const VALIDATION_TIMEOUT_SECS: u64 = 15;

/// Validates remote image references and persists uploads
#[derive(Debug, Clone)]
pub struct ImageSource {
    http_client: reqwest::Client,
    upload_dir: Option<PathBuf>,
}

impl ImageSource {
    pub fn new() -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(VALIDATION_TIMEOUT_SECS))
            .build()
            .map_err(|e| CatalogError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            upload_dir: None,
        })
    }

    /// Write uploads under `dir` instead of the system temp directory
    pub fn with_upload_dir(mut self, dir: PathBuf) -> Self {
        self.upload_dir = Some(dir);
        self
    }

    /// Check that `url` points at a reachable image and return it as the reference
    pub async fn validate_url(&self, url: &str) -> Result<String, CatalogError> {
        let url = url.trim();
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| CatalogError::Validation(format!("invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CatalogError::Validation(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let response = self.http_client.head(parsed).send().await.map_err(|e| {
            warn!(url, error = %e, "Image URL unreachable");
            CatalogError::Validation(format!("image URL unreachable: {}", url))
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        debug!(url, status = status.as_u16(), content_type = %content_type, "Image URL checked");

        if status != reqwest::StatusCode::OK {
            return Err(CatalogError::Validation(format!(
                "image URL returned HTTP {}",
                status.as_u16()
            )));
        }
        if !content_type.contains("image") {
            return Err(CatalogError::Validation(format!(
                "URL is not an image (content-type '{}')",
                content_type
            )));
        }

        Ok(url.to_string())
    }

    /// Check a local image file and return its path as the reference
    pub fn validate_file(&self, path: &Path) -> Result<String, CatalogError> {
        check_extension(&path.to_string_lossy())?;
        let bytes = std::fs::read(path).map_err(|e| {
            CatalogError::Validation(format!("cannot read {}: {}", path.display(), e))
        })?;
        sniff_image(&bytes)?;

        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        debug!(path = %path.display(), "Local image accepted");
        Ok(path.to_string_lossy().into_owned())
    }

    /// Persist uploaded bytes and return the temporary file path as the reference
    pub fn persist_upload(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, CatalogError> {
        if let Some(name) = file_name {
            check_extension(name)?;
        }
        let extension = sniff_image(bytes)?;

        let suffix = format!(".{}", extension);
        let mut builder = tempfile::Builder::new();
        builder.prefix("hpcat-").suffix(&suffix);
        let mut file = match &self.upload_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| CatalogError::Validation(format!("cannot store upload: {}", e)))?;

        file.write_all(bytes)
            .map_err(|e| CatalogError::Validation(format!("cannot store upload: {}", e)))?;
        let (_, path) = file
            .keep()
            .map_err(|e| CatalogError::Validation(format!("cannot keep upload: {}", e)))?;

        info!(
            path = %path.display(),
            bytes = bytes.len(),
            "Uploaded image stored"
        );
        Ok(path.to_string_lossy().into_owned())
    }
}

fn check_extension(file_name: &str) -> Result<(), CatalogError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(CatalogError::Validation(format!(
            "unsupported file type '{}' (allowed: {})",
            file_name,
            ALLOWED_UPLOAD_EXTENSIONS.join(", ")
        )))
    }
}

/// Detect JPEG/PNG by magic number, returning the file extension
fn sniff_image(bytes: &[u8]) -> Result<&'static str, CatalogError> {
    match infer::get(bytes) {
        Some(kind) if kind.mime_type() == "image/jpeg" || kind.mime_type() == "image/png" => {
            Ok(kind.extension())
        }
        Some(kind) => Err(CatalogError::Validation(format!(
            "unsupported image type {}",
            kind.mime_type()
        ))),
        None => Err(CatalogError::Validation("upload is not an image".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0x0d];
    const JPEG_HEADER: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_check_extension() {
        assert!(check_extension("foto.JPG").is_ok());
        assert!(check_extension("foto.jpeg").is_ok());
        assert!(check_extension("foto.png").is_ok());
        assert!(check_extension("foto.gif").is_err());
        assert!(check_extension("foto").is_err());
    }

    #[test]
    fn test_sniff_image() {
        assert_eq!(sniff_image(PNG_HEADER).unwrap(), "png");
        assert_eq!(sniff_image(JPEG_HEADER).unwrap(), "jpg");
        assert!(sniff_image(b"GIF89a....").is_err());
        assert!(sniff_image(b"plain text").is_err());
    }

    #[test]
    fn test_persist_upload_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::new().unwrap().with_upload_dir(dir.path().to_path_buf());

        let reference = source.persist_upload(Some("plaza.png"), PNG_HEADER).unwrap();
        let path = PathBuf::from(&reference);
        assert!(path.starts_with(dir.path()));
        assert!(reference.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), PNG_HEADER);
    }

    #[test]
    fn test_persist_upload_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::new().unwrap().with_upload_dir(dir.path().to_path_buf());

        let result = source.persist_upload(Some("notas.png"), b"not an image");
        assert!(matches!(result, Err(CatalogError::Validation(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_validate_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = ImageSource::new().unwrap();

        let jpeg = dir.path().join("alameda.jpeg");
        std::fs::write(&jpeg, JPEG_HEADER).unwrap();
        let reference = source.validate_file(&jpeg).unwrap();
        assert!(reference.ends_with("alameda.jpeg"));

        let mislabeled = dir.path().join("texto.png");
        std::fs::write(&mislabeled, b"plain text").unwrap();
        assert!(source.validate_file(&mislabeled).is_err());

        assert!(source.validate_file(&dir.path().join("missing.jpg")).is_err());
    }

    #[tokio::test]
    async fn test_validate_url_rejects_bad_scheme() {
        let source = ImageSource::new().unwrap();
        let result = source.validate_url("ftp://example.com/a.jpg").await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_validate_url_rejects_garbage() {
        let source = ImageSource::new().unwrap();
        assert!(source.validate_url("no es una url").await.is_err());
    }

    /// Serve `app` on an ephemeral local port and return its base URL
    async fn spawn_stub(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn archive_stub() -> axum::Router {
        use axum::http::header::CONTENT_TYPE;
        use axum::routing::get;

        axum::Router::new()
            .route(
                "/plaza.jpg",
                get(|| async { ([(CONTENT_TYPE, "image/jpeg")], JPEG_HEADER) }),
            )
            .route(
                "/ficha",
                get(|| async { ([(CONTENT_TYPE, "text/html; charset=utf-8")], "<html></html>") }),
            )
    }

    #[tokio::test]
    async fn test_validate_url_accepts_image() {
        let base = spawn_stub(archive_stub()).await;
        let source = ImageSource::new().unwrap();

        let url = format!("{}/plaza.jpg", base);
        let reference = source.validate_url(&format!("  {}  ", url)).await.unwrap();
        assert_eq!(reference, url);
    }

    #[tokio::test]
    async fn test_validate_url_rejects_non_image_content_type() {
        let base = spawn_stub(archive_stub()).await;
        let source = ImageSource::new().unwrap();

        let result = source.validate_url(&format!("{}/ficha", base)).await;
        match result {
            Err(CatalogError::Validation(msg)) => assert!(msg.contains("text/html")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_url_rejects_not_found() {
        let base = spawn_stub(archive_stub()).await;
        let source = ImageSource::new().unwrap();

        let result = source.validate_url(&format!("{}/perdida.jpg", base)).await;
        match result {
            Err(CatalogError::Validation(msg)) => assert!(msg.contains("404")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_url_unreachable() {
        let source = ImageSource::new().unwrap();
        let result = source.validate_url("http://127.0.0.1:9/foto.jpg").await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }
}
