//! Verification orchestrator and document entry points.
//!
//! Two layers live here:
//!
//! * [`analyze_and_verify`] / [`attach_metrics`] — the pure orchestration of
//!   parser → matcher → metrics. No I/O; usable on a saved model reply.
//! * [`verify_document`] and friends — the full request: load the document,
//!   extract and encode its images, call the classifier, then run the pure
//!   layer on the reply.

use crate::config::{MatchSettings, VerificationConfig};
use crate::error::VerifyError;
use crate::output::{DocumentResponse, SpeedMetrics, VerificationReport};
use crate::pipeline::classify;
use crate::pipeline::input::{self, DocumentKind, ResolvedInput};
use crate::pipeline::{encode, extract};
use crate::verify::{self, MatchVerdict};
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Turn a raw model reply into a verdict.
///
/// A reply without usable JSON yields the default verdict (everything false
/// or null); the parse failure is logged, not returned. The only error is a
/// contract violation by the caller: settings that fail validation.
pub fn analyze_and_verify(
    raw_text: &str,
    settings: &MatchSettings,
) -> Result<MatchVerdict, VerifyError> {
    settings.validate()?;

    let parsed = match verify::extract_json(raw_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Model reply unusable, returning default verdict: {}", e);
            return Ok(MatchVerdict::default());
        }
    };

    Ok(verify::verify(&parsed, settings))
}

/// Operational measurements gathered while verifying one document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurements {
    /// Loading the document plus extracting and encoding its images.
    pub conversion: Duration,
    /// The classifier call.
    pub inference: Duration,
    /// The whole request.
    pub total: Duration,
    pub image_count: usize,
    pub tokens_used: u64,
}

/// Attach operational metrics to a verdict.
///
/// Cost is `tokens_used * unit_cost_per_token`, rendered with three decimals.
pub fn attach_metrics(
    verdict: MatchVerdict,
    measurements: &Measurements,
    unit_cost_per_token: f64,
) -> VerificationReport {
    let cost = measurements.tokens_used as f64 * unit_cost_per_token;
    VerificationReport {
        verdict,
        speed: SpeedMetrics {
            conversion_secs: measurements.conversion.as_secs_f64(),
            inference_secs: measurements.inference.as_secs_f64(),
            total_secs: measurements.total.as_secs_f64(),
            image_count: measurements.image_count,
            tokens_used: measurements.tokens_used,
            cost: SpeedMetrics::format_cost(cost),
        },
    }
}

/// Verify a PDF (or scanned image) given as a local path or HTTP/HTTPS URL.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(VerificationReport)` whenever the classifier answered, even if its
/// answer was unusable (the verdict is then the default one).
///
/// # Errors
/// Returns `Err(VerifyError)` when a collaborator fails:
/// - document not found / not downloadable / not a PDF or image
/// - corrupt or locked PDF, or no embedded image
/// - provider not configured, or classifier failing after all retries
pub async fn verify_document(
    input_str: impl AsRef<str>,
    config: &VerificationConfig,
) -> Result<VerificationReport, VerifyError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting verification: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    verify_resolved(resolved, config, start).await
}

/// Verify a document already held in memory.
///
/// `source_name` is only used in log and error messages.
pub async fn verify_bytes(
    bytes: Vec<u8>,
    source_name: &str,
    config: &VerificationConfig,
) -> Result<VerificationReport, VerifyError> {
    let start = Instant::now();
    let resolved = input::from_bytes(source_name, bytes)?;
    verify_resolved(resolved, config, start).await
}

/// Synchronous wrapper around [`verify_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn verify_document_sync(
    input_str: impl AsRef<str>,
    config: &VerificationConfig,
) -> Result<VerificationReport, VerifyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| VerifyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(verify_document(input_str, config))
}

/// Like [`verify_document`], but never fails: errors become
/// `DocumentResponse::Error` with a readable message.
pub async fn verify_document_response(
    input_str: impl AsRef<str>,
    config: &VerificationConfig,
) -> DocumentResponse {
    let input_str = input_str.as_ref();
    match verify_document(input_str, config).await {
        Ok(report) => DocumentResponse::Report(Box::new(report)),
        Err(e) => {
            if e.is_collaborator_error() {
                warn!("Verification of {} failed: {}", input_str, e);
            } else {
                error!("Unexpected failure verifying {}: {}", input_str, e);
            }
            DocumentResponse::Error {
                error: e.to_string(),
            }
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn verify_resolved(
    resolved: ResolvedInput,
    config: &VerificationConfig,
    start: Instant,
) -> Result<VerificationReport, VerifyError> {
    config.matching.validate()?;
    let provider = resolve_provider(config).await?;

    // ── Step 1: Images ───────────────────────────────────────────────────
    let encoded = load_images(resolved, config).await?;
    let conversion = start.elapsed();
    info!(
        "Prepared {} image(s) in {}ms",
        encoded.len(),
        conversion.as_millis()
    );

    // ── Step 2: Classifier ───────────────────────────────────────────────
    let image_count = encoded.len();
    let inference_start = Instant::now();
    let classification = classify::classify_document(&provider, encoded, config).await?;
    let inference = inference_start.elapsed();
    debug!(
        "Classifier answered after {} retries: {} chars",
        classification.retries,
        classification.raw_text.len()
    );

    // ── Step 3: Verdict ──────────────────────────────────────────────────
    let verdict = analyze_and_verify(&classification.raw_text, &config.matching)?;

    let measurements = Measurements {
        conversion,
        inference,
        total: start.elapsed(),
        image_count,
        tokens_used: classification.tokens_used(),
    };
    info!(
        "Verification complete: valid={} publicity={} in {}ms",
        verdict.valid_recipients,
        verdict.publicity,
        measurements.total.as_millis()
    );

    Ok(attach_metrics(
        verdict,
        &measurements,
        config.unit_cost_per_token,
    ))
}

/// Extract (PDF) or decode (image) the document, then encode every image.
async fn load_images(
    resolved: ResolvedInput,
    config: &VerificationConfig,
) -> Result<Vec<ImageData>, VerifyError> {
    let ResolvedInput {
        source_name,
        bytes,
        kind,
    } = resolved;

    let images = match kind {
        DocumentKind::Pdf => {
            let (images, count) =
                extract::extract_document_images(bytes, &source_name, config.password.as_deref())
                    .await?;
            info!("Extracted {} image(s) from {}", count, source_name);
            images
        }
        DocumentKind::Image(_) => vec![extract::decode_single_image(&bytes, &source_name)?],
    };

    images
        .iter()
        .enumerate()
        .map(|(index, img)| {
            encode::encode_image(img).map_err(|e| VerifyError::ImageFailed {
                index: index + 1,
                detail: format!("JPEG encoding failed: {}", e),
            })
        })
        .collect()
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        VerifyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — the factory reads
///    the matching API key (`OPENAI_API_KEY`, …) from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
///
/// Keys are only ever read from the environment, never written to it.
pub async fn resolve_provider(
    config: &VerificationConfig,
) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| VerifyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
