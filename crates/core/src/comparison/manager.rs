//! The comparison engine entry point.

use std::time::Duration;

use tracing::debug;

use super::fragments::FragmentBuilder;
use super::merge::ThreeWayMerger;
use super::policy::ComparisonPolicy;
use super::post_process;
use crate::cancellation::{CancellationChecker, CancellationFlag, Deadline};
use crate::config::{ComparisonConfig, DiffLimits};
use crate::errors::ComparisonError;
use crate::models::{DiffFragment, LineFragment, MergeLineFragment, MergeRange};

/// Stateless comparison engine.
///
/// Every operation takes its policy and cancellation checker explicitly;
/// an instance only carries limits and line-table settings, so it can be
/// cloned freely and shared between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonManager {
    builder: FragmentBuilder,
}

impl ComparisonManager {
    pub fn new(limits: DiffLimits) -> Self {
        Self {
            builder: FragmentBuilder::new(limits, false),
        }
    }

    pub fn from_config(config: &ComparisonConfig) -> Self {
        Self {
            builder: FragmentBuilder::new(
                config.limits,
                config.comparison.keep_trailing_empty_line,
            ),
        }
    }

    pub fn limits(&self) -> &DiffLimits {
        &self.builder.limits
    }

    /// A checker that reports cancellation once `flag` is raised or, when
    /// given, once `timeout` has elapsed.
    pub fn create_cancellation_checker(
        flag: &CancellationFlag,
        timeout: Option<Duration>,
    ) -> Box<dyn CancellationChecker> {
        match timeout {
            None => Box::new(flag.clone()),
            Some(timeout) => {
                let flag = flag.clone();
                let deadline = Deadline::after(timeout);
                Box::new(move || flag.is_cancelled() || deadline.is_cancelled())
            }
        }
    }

    fn merger(&self) -> ThreeWayMerger {
        ThreeWayMerger::new(self.builder)
    }

    // -- two-way -----------------------------------------------------------

    /// Changed line blocks, without word refinement.
    pub fn compare_lines(
        &self,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<LineFragment>, ComparisonError> {
        self.builder
            .build_line_fragments(text1, text2, policy, false, checker)
    }

    /// Changed line blocks refined by word.
    pub fn compare_lines_inner(
        &self,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<LineFragment>, ComparisonError> {
        self.builder
            .build_line_fragments(text1, text2, policy, true, checker)
    }

    pub fn compare_words(
        &self,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<DiffFragment>, ComparisonError> {
        self.builder
            .build_word_fragments(text1, text2, policy, checker)
    }

    pub fn compare_chars(
        &self,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<DiffFragment>, ComparisonError> {
        self.builder
            .build_char_fragments(text1, text2, policy, checker)
    }

    // -- three-way ---------------------------------------------------------

    /// Three-way comparison with both diffs under `policy`.
    pub fn compare_lines_three_way(
        &self,
        left: &str,
        base: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<MergeLineFragment>, ComparisonError> {
        self.merger().compare_lines(left, base, right, policy, checker)
    }

    pub fn merge_lines(
        &self,
        left: &str,
        base: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<MergeLineFragment>, ComparisonError> {
        self.merger().merge_lines(left, base, right, policy, checker)
    }

    pub fn merge_lines_within_range(
        &self,
        left: &str,
        base: &str,
        right: &str,
        boundary: &MergeRange,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<MergeLineFragment>, ComparisonError> {
        self.merger()
            .merge_lines_within_range(left, base, right, boundary, policy, checker)
    }

    /// An ad-hoc merge base: the lines LEFT and RIGHT share.
    pub fn merge_lines_additions(
        &self,
        left: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<String, ComparisonError> {
        self.merger()
            .merge_lines_additions(left, right, policy, checker)
    }

    // -- utilities ---------------------------------------------------------

    /// `true` iff [`compare_lines`](Self::compare_lines) would report no
    /// change. Never runs the matcher.
    pub fn is_equals(&self, text1: &str, text2: &str, policy: ComparisonPolicy) -> bool {
        if std::ptr::eq(text1, text2) || text1 == text2 {
            return true;
        }
        let lines1 = self.builder.line_offsets(text1);
        let lines2 = self.builder.line_offsets(text2);
        if lines1.line_count() != lines2.line_count() {
            return false;
        }
        let equal = (0..lines1.line_count()).all(|i| {
            policy.line_key(&text1[lines1.line_range(i)])
                == policy.line_key(&text2[lines2.line_range(i)])
        });
        debug!(lines = lines1.line_count(), %policy, equal, "checked equality");
        equal
    }

    pub fn squash(&self, fragments: Vec<LineFragment>) -> Vec<LineFragment> {
        post_process::squash(fragments)
    }

    pub fn process_blocks(
        &self,
        fragments: Vec<LineFragment>,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        squash: bool,
        trim: bool,
    ) -> Vec<LineFragment> {
        post_process::process_blocks(fragments, text1, text2, policy, squash, trim)
    }
}
