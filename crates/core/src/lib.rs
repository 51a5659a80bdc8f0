//! diffmerge core library.
//!
//! This crate provides hierarchical text comparison and three-way merging:
//! line, word and character diffs under whitespace policies, post-processing
//! of line fragments, three-way window classification, merged-text
//! rendering, cooperative cancellation, and configuration.

pub mod cancellation;
pub mod comparison;
pub mod config;
pub mod errors;
pub mod merger;
pub mod models;

// Re-exports for convenience.
pub use cancellation::{CancellationChecker, CancellationFlag, Deadline, NeverCancelled};
pub use comparison::{ComparisonManager, ComparisonPolicy};
pub use config::{ComparisonConfig, DiffLimits};
pub use errors::{ComparisonError, ConfigError, CoreError};
pub use merger::{MergeResult, Merger};
pub use models::{DiffFragment, LineFragment, MergeKind, MergeLineFragment, MergeRange};
