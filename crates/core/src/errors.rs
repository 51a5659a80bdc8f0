//! Error types for the diffmerge core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Comparison errors
// ---------------------------------------------------------------------------

/// Failures surfaced by the comparison and merge operations.
///
/// Degenerate inputs (empty, identical, fully disjoint) are never errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    /// The inputs exceed the configured size/complexity ceiling.
    #[error("diff too big: estimated work {work} exceeds limit {limit}")]
    TooBig { work: u64, limit: u64 },

    /// The cancellation checker reported cancellation mid-computation.
    #[error("comparison cancelled")]
    Cancelled,

    /// A supplied range does not lie within the bounds of its buffer.
    #[error("invalid {side} range {start}..{end} for buffer of {len} lines")]
    InvalidRange {
        side: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
}

impl ComparisonError {
    /// `true` for [`ComparisonError::TooBig`].
    pub fn is_too_big(&self) -> bool {
        matches!(self, Self::TooBig { .. })
    }

    /// `true` for [`ComparisonError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
