//! VLM interaction: send the document images and collect the raw reply.
//!
//! The classifier is opaque to the rest of the crate: it returns whatever
//! text the model produced plus token usage. Turning that text into a verdict
//! is the job of [`crate::verify`], which tolerates malformed replies.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Failed calls are retried
//! with exponential backoff (`retry_backoff_ms * 2^attempt`): with 500 ms base
//! and 3 retries the wait sequence is 500 ms → 1 s → 2 s.

use crate::config::VerificationConfig;
use crate::error::VerifyError;
use crate::prompts::extraction_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Raw classifier output for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Free-form model reply; may or may not contain JSON.
    pub raw_text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Attempts beyond the first one.
    pub retries: u32,
}

impl Classification {
    /// Total tokens billed for the call.
    pub fn tokens_used(&self) -> u64 {
        (self.input_tokens + self.output_tokens) as u64
    }
}

/// Send every image of one document to the VLM in a single request.
///
/// ## Message Layout
///
/// 1. **System message** — the extraction prompt (or user-supplied override)
/// 2. **User message** — all document images as attachments, empty text
///
/// Pages go in one request because recipients and advertising are judged on
/// the document as a whole, not page by page.
pub async fn classify_document(
    provider: &Arc<dyn LLMProvider>,
    images: Vec<ImageData>,
    config: &VerificationConfig,
) -> Result<Classification, VerifyError> {
    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| extraction_prompt(&config.matching.reference_address));

    let messages = vec![
        ChatMessage::system(system_prompt.as_str()),
        ChatMessage::user_with_images("", images),
    ];
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err = VerifyError::ClassifierFailed {
        retries: 0,
        message: "no attempt made".to_string(),
    };

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay(config.retry_backoff_ms, attempt);
            warn!(
                "Classifier: retry {}/{} after {}ms",
                attempt,
                config.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                debug!(
                    "Classifier: {} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                return Ok(Classification {
                    raw_text: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    retries: attempt,
                });
            }
            Ok(Err(e)) => {
                warn!("Classifier: attempt {} failed — {}", attempt + 1, e);
                last_err = VerifyError::ClassifierFailed {
                    retries: config.max_retries,
                    message: e.to_string(),
                };
            }
            Err(_) => {
                warn!(
                    "Classifier: attempt {} timed out after {}s",
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = VerifyError::ClassifierTimeout {
                    secs: config.api_timeout_secs,
                };
            }
        }
    }

    Err(last_err)
}

/// Delay before retry number `attempt` (1-based): `base_ms * 2^(attempt-1)`,
/// saturating instead of overflowing.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Build `CompletionOptions` from the verification config.
fn build_options(config: &VerificationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = VerificationConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1000));
    }

    #[test]
    fn backoff_doubles_then_saturates() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(500, 200), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(u64::MAX, u32::MAX), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn tokens_used_sums_both_directions() {
        let c = Classification {
            raw_text: String::new(),
            input_tokens: 1200,
            output_tokens: 80,
            retries: 0,
        };
        assert_eq!(c.tokens_used(), 1280);
    }
}
