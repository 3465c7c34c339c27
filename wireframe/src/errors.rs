//! Error types for the wireframe generation core.
//!
//! Errors are scoped per boundary: the recovery layer, the provider client,
//! and stage execution each get their own enum. By contract the stage layer
//! reduces every error to an appended string on the `GenerationRecord`, so
//! nothing here escapes `Pipeline::generate`.

use thiserror::Error;

/// Error type for the text recovery layer
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Structured-document parse failed even after trailing-comma repair.
    /// Carries the original (pre-repair) parse failure reason.
    #[error("malformed JSON payload: {0}")]
    MalformedPayload(String),

    /// Markup extraction produced a string with no recognizable root element.
    #[error("cleaned markup contains no <svg> or <!DOCTYPE root")]
    EmptyOrInvalidMarkup,
}

/// Error type for generative text service calls
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("LLM API returned error status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM API response had unexpected shape: {0}")]
    UnexpectedResponse(String),

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("provider configuration invalid: {0}")]
    Configuration(String),
}

/// Error type covering everything that can go wrong inside one stage.
/// Stages convert these into a single prefixed entry on `record.errors`.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
