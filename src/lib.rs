//! # domicile-verify
//!
//! Check whether scanned mail received by a domiciliation company is really
//! addressed to the domiciliation address, using a Vision Language Model to
//! read the recipient block and fuzzy matching to judge what it read.
//!
//! ## Why a matching engine on top of the VLM?
//!
//! The model is good at *reading* an address block and bad at *judging* it:
//! it returns `"PARIS 08"` where the reference says `"PARIS"`, `François`
//! where the reference says `FRANCOIS`, wraps its JSON in prose, or drops a
//! key. This crate treats the model as an opaque reader and makes every
//! decision itself, deterministically.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / image
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   embedded scans via pdfium (spawn_blocking)
//!  ├─ 3. Encode    image → base64 JPEG ImageData
//!  ├─ 4. Classify  one VLM call with all images → raw text
//!  ├─ 5. Parse     first `{` … last `}` → JSON object
//!  ├─ 6. Match     token-set scores vs. reference address → verdict
//!  └─ 7. Output    verdict + timing / token / cost metrics
//! ```
//!
//! Steps 5–6 are pure and live in [`verify`]; they can be run on a saved
//! model reply with [`analyze_and_verify`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domicile_verify::{verify_document, VerificationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = VerificationConfig::default();
//!     let report = verify_document("https://example.org/mail.pdf", &config).await?;
//!     println!("valid: {}", report.verdict.valid_recipients);
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `domverify` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Enables [`server`], the HTTP API (axum + tower-http) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod verify;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze_and_verify, attach_metrics, verify_bytes, verify_document, verify_document_response,
    verify_document_sync, Measurements,
};
pub use config::{MatchSettings, VerificationConfig, VerificationConfigBuilder};
pub use error::{CoercionError, ParseError, VerifyError};
pub use output::{DocumentResponse, SpeedMetrics, VerificationReport};
pub use verify::{
    extract_json, token_set_ratio, verify, verify_with_diagnostics, MatchVerdict, ParsedAnalysis,
    RecipientRecord,
};
