//! Line, word and character comparison plus three-way line merging.
//!
//! - `tokenizer`: splits text into keyed units
//! - `policy`: which differences count
//! - `matcher`: minimal edit scripts over unit sequences
//! - `fragments`: two-way fragment trees
//! - `post_process`: squashing and trimming of line fragments
//! - `merge`: three-way windows and their classification
//! - `manager`: the engine entry point

pub mod fragments;
pub mod manager;
pub mod matcher;
pub mod merge;
pub mod policy;
pub mod post_process;
pub mod tokenizer;

pub use manager::ComparisonManager;
pub use policy::ComparisonPolicy;
