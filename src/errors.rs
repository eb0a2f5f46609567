//! # Error Types Module
//!
//! Error types for the capability adapters and the callback codec. Handler
//! and persistence code propagates `anyhow::Error`; these enums exist where a
//! caller has to pick a user-facing message based on what went wrong.

use thiserror::Error;

/// Failures talking to a remote intelligence capability.
///
/// All variants are transient from the pipeline's point of view: the stage
/// fails, the user is told, nothing is retried.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// HTTP request failed before a response arrived
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The API answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// The call did not finish within the configured deadline
    #[error("timed out after {0}s")]
    Timeout(u64),
    /// The API answered but carried no text
    #[error("response contained no content")]
    EmptyResponse,
    /// The circuit breaker is open for this capability
    #[error("capability temporarily unavailable")]
    Unavailable,
}

impl CapabilityError {
    /// Whether this failure should count against the circuit breaker.
    pub fn is_transport_failure(&self) -> bool {
        !matches!(self, CapabilityError::Unavailable)
    }
}

/// Failures coercing free-form model text into typed data.
#[derive(Debug, Error)]
pub enum StructuredOutputError {
    /// Neither a bracketed object nor usable lines were found
    #[error("no usable content in model output")]
    NoUsableContent,
    /// A bracketed object was found but did not decode against the schema
    #[error("malformed structured output: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
    /// The object decoded but a required field was empty or missing
    #[error("incomplete structured output: field `{0}` is empty")]
    Incomplete(&'static str),
}

impl StructuredOutputError {
    /// The raw text that failed to decode, when there is one to log.
    pub fn raw(&self) -> Option<&str> {
        match self {
            StructuredOutputError::Malformed { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Item recognition failures, each mapped to its own user-facing message.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("vision capability failed: {0}")]
    Capability(#[from] CapabilityError),
    #[error("unsupported image format")]
    UnsupportedImage,
    #[error("no items recognized")]
    Empty,
    #[error(transparent)]
    Malformed(StructuredOutputError),
}

impl From<StructuredOutputError> for RecognitionError {
    fn from(err: StructuredOutputError) -> Self {
        match err {
            StructuredOutputError::NoUsableContent | StructuredOutputError::Incomplete(_) => {
                RecognitionError::Empty
            }
            other => RecognitionError::Malformed(other),
        }
    }
}

/// Recipe generation failures.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation capability failed: {0}")]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Malformed(#[from] StructuredOutputError),
}

/// Rejected callback tokens. Never defaulted to an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackDecodeError {
    #[error("unknown callback action: {0:?}")]
    Unknown(String),
    #[error("malformed callback token: {0:?}")]
    Malformed(String),
    #[error("callback id out of range: {0:?}")]
    OutOfRange(String),
}
