//! Merged-text rendering on top of the three-way line merge.
//!
//! Clean windows take the side that changed them; conflicting windows are
//! written as diff3-style marker blocks.

use serde::Serialize;
use tracing::{debug, info};

use crate::cancellation::CancellationChecker;
use crate::comparison::tokenizer::LineOffsets;
use crate::comparison::{ComparisonManager, ComparisonPolicy};
use crate::errors::ComparisonError;
use crate::models::{MergeKind, MergeLineFragment};

pub const LEFT_MARKER: &str = "<<<<<<< left";
pub const BASE_MARKER: &str = "||||||| base";
pub const SEPARATOR_MARKER: &str = "=======";
pub const RIGHT_MARKER: &str = ">>>>>>> right";

/// The result of a three-way merge attempt.
#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    /// The merged content (may contain conflict markers if `has_conflicts` is true).
    pub merged_content: String,
    /// Whether any window conflicted.
    pub has_conflicts: bool,
    /// Locations of conflict markers within the merged content.
    pub conflict_markers: Vec<ConflictMarker>,
}

impl MergeResult {
    fn clean(merged_content: &str) -> Self {
        Self {
            merged_content: merged_content.to_string(),
            has_conflicts: false,
            conflict_markers: Vec::new(),
        }
    }
}

/// A single conflict region within merged output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictMarker {
    /// Line number (1-indexed) of the `<<<<<<<` line.
    pub start_line: usize,
    /// Line number (1-indexed) of the `>>>>>>>` line.
    pub end_line: usize,
}

/// Three-way merge producing merged text.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    manager: ComparisonManager,
}

impl Merger {
    pub fn new(manager: ComparisonManager) -> Self {
        Self { manager }
    }

    /// Merge `left` and `right` against their common `base`.
    ///
    /// The result always contains merged content. Conflicting windows are
    /// written as `<<<<<<< left` / `||||||| base` / `=======` /
    /// `>>>>>>> right` blocks and `has_conflicts` is set.
    pub fn three_way_merge(
        &self,
        base: &str,
        left: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<MergeResult, ComparisonError> {
        info!(%policy, "performing three-way merge");

        // Fast path: if either side is identical to base, the other side wins cleanly.
        if left == base {
            debug!("left == base, right wins cleanly");
            return Ok(MergeResult::clean(right));
        }
        if right == base {
            debug!("right == base, left wins cleanly");
            return Ok(MergeResult::clean(left));
        }
        // Fast path: if both sides made the exact same change, no conflict.
        if left == right {
            debug!("left == right, identical changes");
            return Ok(MergeResult::clean(left));
        }

        let fragments = self
            .manager
            .merge_lines(left, base, right, policy, checker)?;
        let result = render(&fragments, base, left, right);
        debug!(
            windows = fragments.len(),
            conflicts = result.conflict_markers.len(),
            "rendered merge"
        );
        Ok(result)
    }

    /// Quick check: can these three versions be merged without conflicts?
    pub fn can_auto_merge(
        &self,
        base: &str,
        left: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<bool, ComparisonError> {
        if left == base || right == base || left == right {
            return Ok(true);
        }
        let fragments = self
            .manager
            .merge_lines(left, base, right, policy, checker)?;
        Ok(fragments.iter().all(|f| f.kind != MergeKind::Conflict))
    }
}

/// Output text with a running line count.
struct Output {
    text: String,
    lines: usize,
}

impl Output {
    fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.lines += chunk.matches('\n').count();
    }

    /// End the current line if the last chunk left it open.
    fn end_line(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.push("\n");
        }
    }

    /// Push whole lines taken from one of the inputs.
    ///
    /// Only the final chunk of the output may keep its source's missing
    /// separator.
    fn push_chunk(&mut self, chunk: &str) {
        if !chunk.is_empty() {
            self.end_line();
            self.push(chunk);
        }
    }

    /// Push a chunk and make sure it ends a line.
    fn push_lines(&mut self, chunk: &str) {
        self.push_chunk(chunk);
        self.end_line();
    }

    fn push_marker(&mut self, marker: &str) -> usize {
        self.end_line();
        self.push(marker);
        self.push("\n");
        self.lines
    }
}

fn render(
    fragments: &[MergeLineFragment],
    base: &str,
    left: &str,
    right: &str,
) -> MergeResult {
    let base_lines = LineOffsets::new(base, false);
    let left_lines = LineOffsets::new(left, false);
    let right_lines = LineOffsets::new(right, false);
    let base_text = |f: &MergeLineFragment| &base[base_lines.span(&f.base)];
    let left_text = |f: &MergeLineFragment| &left[left_lines.span(&f.left)];
    let right_text = |f: &MergeLineFragment| &right[right_lines.span(&f.right)];

    let mut out = Output {
        text: String::with_capacity(base.len().max(left.len()).max(right.len())),
        lines: 0,
    };
    let mut markers = Vec::new();
    for fragment in fragments {
        match fragment.kind {
            MergeKind::Unchanged => out.push_chunk(base_text(fragment)),
            MergeKind::LeftOnly | MergeKind::BothSame => {
                out.push_chunk(left_text(fragment))
            }
            MergeKind::RightOnly => out.push_chunk(right_text(fragment)),
            MergeKind::Conflict => {
                let start_line = out.push_marker(LEFT_MARKER);
                out.push_lines(left_text(fragment));
                out.push_marker(BASE_MARKER);
                out.push_lines(base_text(fragment));
                out.push_marker(SEPARATOR_MARKER);
                out.push_lines(right_text(fragment));
                let end_line = out.push_marker(RIGHT_MARKER);
                markers.push(ConflictMarker {
                    start_line,
                    end_line,
                });
            }
        }
    }

    MergeResult {
        merged_content: out.text,
        has_conflicts: !markers.is_empty(),
        conflict_markers: markers,
    }
}
