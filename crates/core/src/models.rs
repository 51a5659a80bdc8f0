//! Fragment types produced by the comparison and merge operations.
//!
//! Byte offsets index into the `&str` inputs and always fall on `char`
//! boundaries. Line indices are 0-based. All ranges are half-open.

use std::ops::Range;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Two-way fragments
// ---------------------------------------------------------------------------

/// A changed span between two texts (insert, delete or replace).
///
/// Fragment lists hold changed spans only; the spans between consecutive
/// fragments are equal under the comparison policy that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFragment {
    pub range1: Range<usize>,
    pub range2: Range<usize>,
}

impl DiffFragment {
    pub fn new(range1: Range<usize>, range2: Range<usize>) -> Self {
        Self { range1, range2 }
    }

    /// Shift both ranges left by the given bases.
    pub(crate) fn rebased(&self, base1: usize, base2: usize) -> Self {
        Self {
            range1: self.range1.start - base1..self.range1.end - base1,
            range2: self.range2.start - base2..self.range2.end - base2,
        }
    }

    /// Shift both ranges right by the given offsets.
    pub(crate) fn shifted(&self, by1: usize, by2: usize) -> Self {
        Self {
            range1: self.range1.start + by1..self.range1.end + by1,
            range2: self.range2.start + by2..self.range2.end + by2,
        }
    }
}

/// A changed block of whole lines, optionally refined by word fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFragment {
    /// Line range in the first text.
    pub lines1: Range<usize>,
    /// Line range in the second text.
    pub lines2: Range<usize>,
    /// Byte range of `lines1`, separators included.
    pub offsets1: Range<usize>,
    /// Byte range of `lines2`, separators included.
    pub offsets2: Range<usize>,
    /// Word-level fragments relative to `offsets1.start` / `offsets2.start`.
    ///
    /// `None` when inner comparison was not requested or the block is a
    /// wholesale replacement with nothing in common.
    pub inner: Option<Vec<DiffFragment>>,
}

impl LineFragment {
    /// `true` when the block only inserts lines into the second text.
    pub fn is_insertion(&self) -> bool {
        self.lines1.is_empty() && !self.lines2.is_empty()
    }

    /// `true` when the block only deletes lines from the first text.
    pub fn is_deletion(&self) -> bool {
        !self.lines1.is_empty() && self.lines2.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Three-way fragments
// ---------------------------------------------------------------------------

/// Line ranges in LEFT, BASE and RIGHT bounding a region of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub left: Range<usize>,
    pub base: Range<usize>,
    pub right: Range<usize>,
}

impl MergeRange {
    pub fn new(left: Range<usize>, base: Range<usize>, right: Range<usize>) -> Self {
        Self { left, base, right }
    }
}

/// Classification of a three-way merge window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// Neither side changed the window.
    Unchanged,
    /// Only LEFT changed the window.
    LeftOnly,
    /// Only RIGHT changed the window.
    RightOnly,
    /// Both sides made the same change.
    BothSame,
    /// Both sides changed the window to different content.
    Conflict,
}

impl MergeKind {
    /// `true` for every kind except [`MergeKind::Unchanged`].
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl std::fmt::Display for MergeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::LeftOnly => write!(f, "left_only"),
            Self::RightOnly => write!(f, "right_only"),
            Self::BothSame => write!(f, "both_same"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// Shape of a change relative to BASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Inserted,
    Deleted,
    Modified,
}

/// One window of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeLineFragment {
    pub left: Range<usize>,
    pub base: Range<usize>,
    pub right: Range<usize>,
    pub kind: MergeKind,
    /// Set when an edit inside the window is insignificant under the policy.
    pub ignored: bool,
}

impl MergeLineFragment {
    /// Shape of the change for windows that carry one.
    ///
    /// Conflicts are `Modified` unless every side agrees on the shape.
    pub fn change_type(&self) -> Option<ChangeType> {
        let shape = |side: &Range<usize>| match (self.base.is_empty(), side.is_empty()) {
            (true, _) => ChangeType::Inserted,
            (false, true) => ChangeType::Deleted,
            (false, false) => ChangeType::Modified,
        };
        match self.kind {
            MergeKind::Unchanged => None,
            MergeKind::LeftOnly | MergeKind::BothSame => Some(shape(&self.left)),
            MergeKind::RightOnly => Some(shape(&self.right)),
            MergeKind::Conflict => {
                let (l, r) = (shape(&self.left), shape(&self.right));
                Some(if l == r { l } else { ChangeType::Modified })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Equal-gap iteration
// ---------------------------------------------------------------------------

/// A span of a two-way comparison, either matched or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRange {
    pub range1: Range<usize>,
    pub range2: Range<usize>,
    pub equal: bool,
}

/// Interleave changed spans with the implicit equal spans between them so
/// the result covers `0..len1` and `0..len2` completely.
pub fn with_equal_gaps<I>(changes: I, len1: usize, len2: usize) -> Vec<DiffRange>
where
    I: IntoIterator<Item = (Range<usize>, Range<usize>)>,
{
    let mut out = Vec::new();
    let (mut pos1, mut pos2) = (0, 0);
    for (range1, range2) in changes {
        if range1.start > pos1 || range2.start > pos2 {
            out.push(DiffRange {
                range1: pos1..range1.start,
                range2: pos2..range2.start,
                equal: true,
            });
        }
        pos1 = range1.end;
        pos2 = range2.end;
        out.push(DiffRange {
            range1,
            range2,
            equal: false,
        });
    }
    if pos1 < len1 || pos2 < len2 {
        out.push(DiffRange {
            range1: pos1..len1,
            range2: pos2..len2,
            equal: true,
        });
    }
    out
}
