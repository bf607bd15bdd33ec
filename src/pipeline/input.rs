//! PDF sources: a remote URL, an in-memory buffer, or a local file.
//!
//! pdfium decodes from a byte buffer, so every source is normalised to
//! `Vec<u8>` before it reaches the decode worker. The `%PDF` magic bytes are
//! checked up front so a wrong upload fails with [`RenderError::NotAPdf`]
//! instead of an opaque pdfium error.

use crate::error::RenderError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Where to read a PDF from.
#[derive(Clone, PartialEq, Eq)]
pub enum PdfSource {
    /// Public URL, fetched with a GET.
    Url(String),
    /// Bytes already in memory.
    Bytes(Vec<u8>),
    /// A file on the local disk.
    File(PathBuf),
}

impl fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfSource::Url(url) => f.debug_tuple("Url").field(url).finish(),
            PdfSource::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            PdfSource::File(p) => f.debug_tuple("File").field(p).finish(),
        }
    }
}

impl PdfSource {
    /// Interpret a user-supplied string: `http(s)://` is a URL, anything else a path.
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            PdfSource::Url(input.to_string())
        } else {
            PdfSource::File(PathBuf::from(input))
        }
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            PdfSource::Url(url) => url.clone(),
            PdfSource::Bytes(b) => format!("<{} bytes>", b.len()),
            PdfSource::File(p) => p.display().to_string(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve any source to validated PDF bytes.
pub async fn load_bytes(source: PdfSource, timeout_secs: u64) -> Result<Vec<u8>, RenderError> {
    let bytes = match source {
        PdfSource::Bytes(bytes) => bytes,
        PdfSource::Url(url) => download_url(&url, timeout_secs).await?,
        PdfSource::File(path) => tokio::fs::read(&path)
            .await
            .map_err(|e| RenderError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
    };
    check_magic(&bytes)?;
    Ok(bytes)
}

/// Reject buffers that do not start with `%PDF`.
pub fn check_magic(bytes: &[u8]) -> Result<(), RenderError> {
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Err(RenderError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, RenderError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RenderError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            RenderError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            RenderError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(RenderError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RenderError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn parse_picks_variant() {
        assert!(matches!(PdfSource::parse("https://x/y.pdf"), PdfSource::Url(_)));
        assert!(matches!(PdfSource::parse("deck.pdf"), PdfSource::File(_)));
    }

    #[test]
    fn magic_check() {
        assert!(check_magic(b"%PDF-1.7\n").is_ok());
        assert!(matches!(
            check_magic(b"PK\x03\x04"),
            Err(RenderError::NotAPdf { .. })
        ));
        assert!(check_magic(b"%P").is_err());
    }

    #[tokio::test]
    async fn bytes_source_is_validated() {
        let err = load_bytes(PdfSource::Bytes(b"hello".to_vec()), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::NotAPdf { .. }));

        let ok = load_bytes(PdfSource::Bytes(b"%PDF-1.4 ...".to_vec()), 5)
            .await
            .unwrap();
        assert_eq!(&ok[..4], b"%PDF");
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let err = load_bytes(PdfSource::File("/definitely/not/here.pdf".into()), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::ReadFailed { .. }));
    }

    #[tokio::test]
    async fn local_file_is_read_and_checked() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("deck.pdf");
        std::fs::write(&pdf, b"%PDF-1.7\n%%EOF\n").unwrap();
        let bytes = load_bytes(PdfSource::File(pdf), 5).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let html = dir.path().join("page.pdf");
        std::fs::write(&html, b"<!doctype html>").unwrap();
        let err = load_bytes(PdfSource::File(html), 5).await.unwrap_err();
        assert!(matches!(err, RenderError::NotAPdf { .. }));
    }
}
