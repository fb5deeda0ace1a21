//! Error types for the domicile-verify library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`VerifyError`] — **Fatal for one request**: the document cannot be
//!   verified at all (input unreachable, corrupt PDF, provider not configured,
//!   invalid configuration). Returned as `Err(VerifyError)` from the top-level
//!   `verify_*` functions. The HTTP layer turns it into an `{"error": …}` body.
//!
//! * [`ParseError`] — **Recoverable**: the model answered, but no usable JSON
//!   object could be located in its reply. The orchestrator degrades to the
//!   default verdict instead of failing.
//!
//! * [`CoercionError`] — **Recoverable, field-level**: one field of the decoded
//!   reply had an unexpected shape. The matcher defaults that field, keeps
//!   going, and reports the problem as a diagnostic.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the domicile-verify library.
///
/// Model-output problems use [`ParseError`] / [`CoercionError`] and never
/// surface here.
#[derive(Debug, Error)]
pub enum VerifyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes are neither a PDF nor a decodable image.
    #[error("Document '{source_name}' is neither a PDF nor a supported image\nFirst bytes: {magic:?}")]
    UnsupportedDocument { source_name: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{source_name}' is corrupt: {detail}")]
    CorruptPdf { source_name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{source_name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{source_name}'")]
    WrongPassword { source_name: String },

    /// The PDF parsed fine but carries no embedded raster image to classify.
    #[error("PDF '{source_name}' contains no embedded images")]
    NoImages { source_name: String },

    /// An embedded image could not be decoded or re-encoded.
    #[error("Image {index} could not be processed: {detail}")]
    ImageFailed { index: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The classifier call failed after every retry.
    #[error("LLM classification failed after {retries} retries: {message}")]
    ClassifierFailed { retries: u32, message: String },

    /// The classifier call timed out on its final attempt.
    #[error("LLM classification timed out after {secs}s")]
    ClassifierTimeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerifyError {
    /// `true` for failures of an external collaborator (input, PDF, LLM).
    ///
    /// Everything else is an operational error: a broken contract inside
    /// this process rather than a bad document or an unavailable service.
    pub fn is_collaborator_error(&self) -> bool {
        !matches!(self, VerifyError::InvalidConfig(_) | VerifyError::Internal(_))
    }
}

/// Failure to locate a JSON object in a raw model reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No `{` … `}` pair in the reply, or the last `}` precedes the first `{`.
    #[error("no JSON object found in model response")]
    NoJsonFound,

    /// A brace-delimited slice was found but is not valid JSON.
    #[error("malformed JSON in model response ({reason}): {fragment}")]
    MalformedJson { fragment: String, reason: String },
}

/// A single field of the decoded reply had an unexpected shape.
///
/// Collected by [`crate::verify::verify_with_diagnostics`]; the affected field
/// falls back to its default and matching continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoercionError {
    /// `Publicity` was neither a boolean nor exactly `"True"` / `"False"`.
    #[error("Publicity value {found} is not boolean-like; defaulting to false")]
    Publicity { found: String },

    /// `destinataires` was present but not an array.
    #[error("destinataires is {found}, expected an array; treating as empty")]
    Destinataires { found: String },

    /// A recipient entry was not a JSON object.
    #[error("recipient #{index} is {found}, expected an object")]
    RecipientShape { index: usize, found: String },

    /// A recipient field was missing or not a string.
    #[error("recipient #{index} field '{field}' is {found}; using empty string")]
    RecipientField {
        index: usize,
        field: &'static str,
        found: String,
    },
}
