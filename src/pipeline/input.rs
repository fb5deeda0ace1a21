//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Scanned mail is small (a few hundred KB per page), and pdfium can open a
//! document straight from a byte slice, so nothing is spooled to disk. The
//! document kind is sniffed from magic bytes before returning, so callers get
//! a meaningful error rather than a pdfium failure on an HTML error page.

use crate::error::VerifyError;
use std::path::PathBuf;
use tracing::{debug, info};

/// What the loaded bytes turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// A single scanned page supplied directly as an image.
    Image(image::ImageFormat),
}

/// A document loaded into memory.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// Path or URL the bytes came from, for messages.
    pub source_name: String,
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to in-memory document bytes.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, VerifyError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    from_bytes(input, bytes)
}

/// Classify already-loaded bytes as a PDF or an image.
pub fn from_bytes(source_name: &str, bytes: Vec<u8>) -> Result<ResolvedInput, VerifyError> {
    let kind = sniff_kind(&bytes).ok_or_else(|| {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        VerifyError::UnsupportedDocument {
            source_name: source_name.to_string(),
            magic,
        }
    })?;
    debug!("{} is {:?} ({} bytes)", source_name, kind, bytes.len());
    Ok(ResolvedInput {
        source_name: source_name.to_string(),
        bytes,
        kind,
    })
}

fn sniff_kind(bytes: &[u8]) -> Option<DocumentKind> {
    if bytes.starts_with(b"%PDF") {
        return Some(DocumentKind::Pdf);
    }
    match image::guess_format(bytes) {
        Ok(fmt @ (image::ImageFormat::Jpeg | image::ImageFormat::Png)) => {
            Some(DocumentKind::Image(fmt))
        }
        _ => None,
    }
}

/// Read a local file, mapping I/O failures onto input errors.
async fn read_local(path_str: &str) -> Result<Vec<u8>, VerifyError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local document: {}", path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VerifyError::FileNotFound { path })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(VerifyError::PermissionDenied { path })
        }
        Err(_) => Err(VerifyError::InvalidInput {
            input: path_str.to_string(),
        }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, VerifyError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VerifyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            VerifyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            VerifyError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(VerifyError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_send_err)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
