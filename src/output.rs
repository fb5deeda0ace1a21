//! Output types returned by the verification entry points.
//!
//! The JSON produced here is the public response format of the HTTP API, so
//! field names are fixed with `serde(rename)` rather than following Rust
//! naming.

use crate::verify::MatchVerdict;
use serde::{Deserialize, Serialize};

/// Operational metrics for one verified document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedMetrics {
    /// Seconds spent loading the document and extracting its images.
    #[serde(rename = "Convert PDF to image")]
    pub conversion_secs: f64,
    /// Seconds spent in the classifier call, retries included.
    #[serde(rename = "GPT-4 Inference Time")]
    pub inference_secs: f64,
    /// Wall-clock seconds for the whole request.
    #[serde(rename = "Total processing Time")]
    pub total_secs: f64,
    #[serde(rename = "Number images")]
    pub image_count: usize,
    #[serde(rename = "Tokens used")]
    pub tokens_used: u64,
    /// Estimated cost, fixed three decimals followed by `$`, e.g. `"0.013$"`.
    #[serde(rename = "Cost")]
    pub cost: String,
}

impl SpeedMetrics {
    /// Render a cost estimate the way it appears in `Cost`.
    pub fn format_cost(cost: f64) -> String {
        format!("{:.3}$", cost)
    }
}

/// Verdict plus metrics for one document: the success body of the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    #[serde(flatten)]
    pub verdict: MatchVerdict,
    #[serde(rename = "Speed")]
    pub speed: SpeedMetrics,
}

/// What a caller of the document endpoint always receives.
///
/// Document-level failures are a normal response, not a transport error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentResponse {
    Report(Box<VerificationReport>),
    Error { error: String },
}

impl DocumentResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, DocumentResponse::Error { .. })
    }
}
