//! Configuration types for document verification.
//!
//! All verification behaviour is controlled through [`VerificationConfig`],
//! built via its [`VerificationConfigBuilder`]. The pure matching knobs
//! (reference address and the two similarity thresholds) live in the smaller
//! [`MatchSettings`] so the offline path can be driven without any of the
//! LLM or download settings.

use crate::error::VerifyError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default reference address mail is expected to be delivered to.
pub const DEFAULT_REFERENCE_ADDRESS: &str = "60 RUE FRANCOIS 1ER 75008 PARIS";

/// Default minimum token-set score between a recipient address and the reference.
pub const DEFAULT_ADDRESS_THRESHOLD: u8 = 60;

/// Default minimum token-set score between two recipient identities.
pub const DEFAULT_IDENTITY_THRESHOLD: u8 = 70;

/// Default estimated cost per token, in currency units.
pub const DEFAULT_UNIT_COST_PER_TOKEN: f64 = 0.00001;

/// Upper bound accepted for [`VerificationConfig::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Reference address and similarity thresholds used by the matcher.
///
/// Both thresholds are on the 0–100 scale returned by
/// [`crate::verify::token_set_ratio`]. A score equal to the threshold passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSettings {
    pub reference_address: String,
    pub address_threshold: u8,
    pub identity_threshold: u8,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            reference_address: DEFAULT_REFERENCE_ADDRESS.to_string(),
            address_threshold: DEFAULT_ADDRESS_THRESHOLD,
            identity_threshold: DEFAULT_IDENTITY_THRESHOLD,
        }
    }
}

impl MatchSettings {
    pub fn new(reference_address: impl Into<String>) -> Self {
        Self {
            reference_address: reference_address.into(),
            ..Self::default()
        }
    }

    /// Check the settings are usable by the matcher.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if self.reference_address.trim().is_empty() {
            return Err(VerifyError::InvalidConfig(
                "reference address must not be blank".into(),
            ));
        }
        if self.address_threshold > 100 {
            return Err(VerifyError::InvalidConfig(format!(
                "address threshold must be 0–100, got {}",
                self.address_threshold
            )));
        }
        if self.identity_threshold > 100 {
            return Err(VerifyError::InvalidConfig(format!(
                "identity threshold must be 0–100, got {}",
                self.identity_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for verifying one document.
///
/// Built via [`VerificationConfig::builder()`] or using
/// [`VerificationConfig::default()`].
///
/// # Example
/// ```rust
/// use domicile_verify::VerificationConfig;
///
/// let config = VerificationConfig::builder()
///     .reference_address("12 AVENUE DE L'OPERA 75001 PARIS")
///     .address_threshold(65)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VerificationConfig {
    /// Reference address and thresholds for the matcher.
    pub matching: MatchSettings,

    /// Estimated cost of one token, used for the `Cost` metric. Default: 0.00001.
    pub unit_cost_per_token: f64,

    /// LLM model identifier, e.g. "gpt-4.1-mini", "claude-sonnet-4-20250514".
    /// If None, uses `gpt-4.1-mini`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the classifier call. Default: 0.0.
    ///
    /// Extraction wants the same answer for the same scan every time.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1000.
    ///
    /// A reply lists a handful of recipients; 1 000 tokens is far above what a
    /// well-formed answer needs and still bounds the cost of a rambling one.
    pub max_tokens: usize,

    /// Maximum retry attempts on a failed classifier call. Default: 3,
    /// at most [`MAX_RETRIES_LIMIT`].
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom extraction prompt. If None, built from the reference address.
    pub system_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 10.
    pub download_timeout_secs: u64,

    /// Per-classifier-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            matching: MatchSettings::default(),
            unit_cost_per_token: DEFAULT_UNIT_COST_PER_TOKEN,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 1000,
            max_retries: 3,
            retry_backoff_ms: 500,
            password: None,
            system_prompt: None,
            download_timeout_secs: 10,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for VerificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationConfig")
            .field("matching", &self.matching)
            .field("unit_cost_per_token", &self.unit_cost_per_token)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl VerificationConfig {
    /// Create a new builder for `VerificationConfig`.
    pub fn builder() -> VerificationConfigBuilder {
        VerificationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`VerificationConfig`].
#[derive(Debug)]
pub struct VerificationConfigBuilder {
    config: VerificationConfig,
}

impl VerificationConfigBuilder {
    pub fn reference_address(mut self, address: impl Into<String>) -> Self {
        self.config.matching.reference_address = address.into();
        self
    }

    pub fn address_threshold(mut self, threshold: u8) -> Self {
        self.config.matching.address_threshold = threshold;
        self
    }

    pub fn identity_threshold(mut self, threshold: u8) -> Self {
        self.config.matching.identity_threshold = threshold;
        self
    }

    pub fn matching(mut self, settings: MatchSettings) -> Self {
        self.config.matching = settings;
        self
    }

    pub fn unit_cost_per_token(mut self, cost: f64) -> Self {
        self.config.unit_cost_per_token = cost;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VerificationConfig, VerifyError> {
        let c = &self.config;
        c.matching.validate()?;
        if !c.unit_cost_per_token.is_finite() || c.unit_cost_per_token < 0.0 {
            return Err(VerifyError::InvalidConfig(format!(
                "unit cost per token must be a non-negative number, got {}",
                c.unit_cost_per_token
            )));
        }
        if c.max_tokens == 0 {
            return Err(VerifyError::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        if c.download_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(VerifyError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES_LIMIT {
            return Err(VerifyError::InvalidConfig(format!(
                "max retries must be ≤ {MAX_RETRIES_LIMIT}, got {}",
                c.max_retries
            )));
        }
        Ok(self.config)
    }
}
