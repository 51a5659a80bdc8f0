//! Three-way line merge.
//!
//! BASE is diffed against LEFT and against RIGHT. Base spans matched by both
//! diffs are sync regions; the spans between consecutive sync regions are
//! change windows, classified by which sides changed them. A zero-length
//! sync region always sits at the end of the three buffers so the last
//! window reaches every buffer's end.

use std::ops::Range;

use tracing::debug;

use super::fragments::FragmentBuilder;
use super::matcher::{self, MatchBlock};
use super::policy::ComparisonPolicy;
use super::tokenizer::{self, LineOffsets, Unit};
use crate::cancellation::CancellationChecker;
use crate::errors::ComparisonError;
use crate::models::{MergeKind, MergeLineFragment, MergeRange};

/// Three-way line comparison on top of a [`FragmentBuilder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeWayMerger {
    builder: FragmentBuilder,
}

/// LEFT, BASE and RIGHT with their line tables.
struct Texts<'a> {
    left: &'a str,
    base: &'a str,
    right: &'a str,
    left_lines: LineOffsets,
    base_lines: LineOffsets,
    right_lines: LineOffsets,
}

/// Line units of all three texts, keyed by one policy.
struct Units<'a> {
    left: Vec<Unit<'a>>,
    base: Vec<Unit<'a>>,
    right: Vec<Unit<'a>>,
}

impl<'a> Texts<'a> {
    fn units(&self, policy: ComparisonPolicy) -> Units<'a> {
        Units {
            left: tokenizer::split_lines(self.left, &self.left_lines, policy),
            base: tokenizer::split_lines(self.base, &self.base_lines, policy),
            right: tokenizer::split_lines(self.right, &self.right_lines, policy),
        }
    }

    fn full_range(&self) -> MergeRange {
        MergeRange::new(
            0..self.left_lines.line_count(),
            0..self.base_lines.line_count(),
            0..self.right_lines.line_count(),
        )
    }
}

impl ThreeWayMerger {
    pub fn new(builder: FragmentBuilder) -> Self {
        Self { builder }
    }

    fn texts<'a>(&self, left: &'a str, base: &'a str, right: &'a str) -> Texts<'a> {
        Texts {
            left,
            base,
            right,
            left_lines: self.builder.line_offsets(left),
            base_lines: self.builder.line_offsets(base),
            right_lines: self.builder.line_offsets(right),
        }
    }

    /// Three-way comparison where both diffs use `policy`, so edits the
    /// policy ignores fall into unchanged windows.
    pub fn compare_lines(
        &self,
        left: &str,
        base: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<MergeLineFragment>, ComparisonError> {
        let texts = self.texts(left, base, right);
        let boundary = texts.full_range();
        self.merge_windows(&texts, &boundary, policy, policy, checker)
    }

    /// Three-way merge: windows are aligned on exact lines and classified
    /// under `policy`, so an ignored edit keeps its window but never forces a
    /// conflict.
    pub fn merge_lines(
        &self,
        left: &str,
        base: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<MergeLineFragment>, ComparisonError> {
        let texts = self.texts(left, base, right);
        let boundary = texts.full_range();
        self.merge_windows(
            &texts,
            &boundary,
            ComparisonPolicy::Default,
            policy,
            checker,
        )
    }

    /// [`merge_lines`](Self::merge_lines) restricted to `boundary`. Output
    /// ranges are absolute line indices.
    pub fn merge_lines_within_range(
        &self,
        left: &str,
        base: &str,
        right: &str,
        boundary: &MergeRange,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<MergeLineFragment>, ComparisonError> {
        let texts = self.texts(left, base, right);
        check_range("left", &boundary.left, &texts.left_lines)?;
        check_range("base", &boundary.base, &texts.base_lines)?;
        check_range("right", &boundary.right, &texts.right_lines)?;
        self.merge_windows(&texts, boundary, ComparisonPolicy::Default, policy, checker)
    }

    /// Lines shared by LEFT and RIGHT under `policy`, as LEFT spells them,
    /// each terminated by `\n`.
    pub fn merge_lines_additions(
        &self,
        left: &str,
        right: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<String, ComparisonError> {
        let left_lines = self.builder.line_offsets(left);
        let right_lines = self.builder.line_offsets(right);
        let changes =
            self.builder
                .line_changes(left, &left_lines, right, &right_lines, policy, checker)?;

        let mut out = String::new();
        let mut kept = 0;
        for (i, _) in matcher::matched_pairs(
            &changes,
            left_lines.line_count(),
            right_lines.line_count(),
        ) {
            out.push_str(&left[left_lines.line_range(i)]);
            out.push('\n');
            kept += 1;
        }
        debug!(
            left = left_lines.line_count(),
            right = right_lines.line_count(),
            kept,
            "built ad-hoc merge base"
        );
        Ok(out)
    }

    fn merge_windows(
        &self,
        texts: &Texts<'_>,
        boundary: &MergeRange,
        align_policy: ComparisonPolicy,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<MergeLineFragment>, ComparisonError> {
        let align_units = texts.units(align_policy);
        let policy_units = (align_policy != policy).then(|| texts.units(policy));

        let align = Slices::new(&align_units, boundary);
        let keyed = policy_units
            .as_ref()
            .map(|units| Slices::new(units, boundary))
            .unwrap_or(align);

        let limits = &self.builder.limits;
        let to_left = matcher::diff(align.base, align.left, limits, checker)?;
        let to_right = matcher::diff(align.base, align.right, limits, checker)?;
        let sync = sync_regions(
            &matcher::matching_blocks(&to_left, align.base.len(), align.left.len()),
            &matcher::matching_blocks(&to_right, align.base.len(), align.right.len()),
            (align.left.len(), align.base.len(), align.right.len()),
        );

        let mut windows = WindowList::new(boundary);
        let (mut left, mut base, mut right) = (0, 0, 0);
        for region in sync {
            let window = MergeRange::new(
                left..region.left.start,
                base..region.base.start,
                right..region.right.start,
            );
            if !(window.left.is_empty() && window.base.is_empty() && window.right.is_empty()) {
                let (kind, ignored) = classify(&align, &keyed, &window, policy);
                windows.push(window, kind, ignored);
            }
            if !region.base.is_empty() {
                windows.push(region.clone(), MergeKind::Unchanged, false);
            }
            left = region.left.end;
            base = region.base.end;
            right = region.right.end;
        }

        let fragments = windows.finish();
        debug!(
            windows = fragments.len(),
            conflicts = fragments
                .iter()
                .filter(|f| f.kind == MergeKind::Conflict)
                .count(),
            %policy,
            "merged lines"
        );
        Ok(fragments)
    }
}

fn check_range(
    side: &'static str,
    range: &Range<usize>,
    lines: &LineOffsets,
) -> Result<(), ComparisonError> {
    let len = lines.line_count();
    if range.start > range.end || range.end > len {
        return Err(ComparisonError::InvalidRange {
            side,
            start: range.start,
            end: range.end,
            len,
        });
    }
    Ok(())
}

/// Units of the three texts inside a merge boundary.
#[derive(Clone, Copy)]
struct Slices<'u, 'a> {
    left: &'u [Unit<'a>],
    base: &'u [Unit<'a>],
    right: &'u [Unit<'a>],
}

impl<'u, 'a> Slices<'u, 'a> {
    fn new(units: &'u Units<'a>, boundary: &MergeRange) -> Self {
        Self {
            left: &units.left[boundary.left.clone()],
            base: &units.base[boundary.base.clone()],
            right: &units.right[boundary.right.clone()],
        }
    }
}

/// Intersections of the BASE→LEFT and BASE→RIGHT matched blocks, followed
/// by the zero-length region at the buffer ends.
fn sync_regions(
    to_left: &[MatchBlock],
    to_right: &[MatchBlock],
    (left_len, base_len, right_len): (usize, usize, usize),
) -> Vec<MergeRange> {
    let mut regions = Vec::new();
    let (mut il, mut ir) = (0, 0);
    while il < to_left.len() && ir < to_right.len() {
        let (l, r) = (to_left[il], to_right[ir]);
        let start = l.start1.max(r.start1);
        let end = (l.start1 + l.len).min(r.start1 + r.len);
        if start < end {
            let left_start = l.start2 + (start - l.start1);
            let right_start = r.start2 + (start - r.start1);
            let len = end - start;
            regions.push(MergeRange::new(
                left_start..left_start + len,
                start..end,
                right_start..right_start + len,
            ));
        }
        // advance whichever block ends first in BASE
        if l.start1 + l.len < r.start1 + r.len {
            il += 1;
        } else {
            ir += 1;
        }
    }
    regions.push(MergeRange::new(
        left_len..left_len,
        base_len..base_len,
        right_len..right_len,
    ));
    regions
}

/// Classify a change window. Returns the kind and whether an edit inside
/// the window is insignificant under `policy`.
fn classify(
    align: &Slices<'_, '_>,
    keyed: &Slices<'_, '_>,
    window: &MergeRange,
    policy: ComparisonPolicy,
) -> (MergeKind, bool) {
    let base = window.base.clone();
    let left_changed = align.left[window.left.clone()] != align.base[base.clone()];
    let right_changed = align.right[window.right.clone()] != align.base[base.clone()];
    let left_significant =
        left_changed && keyed.left[window.left.clone()] != keyed.base[base.clone()];
    let right_significant =
        right_changed && keyed.right[window.right.clone()] != keyed.base[base];

    let kind = match (left_changed, right_changed) {
        (false, false) => MergeKind::Unchanged,
        (true, false) => MergeKind::LeftOnly,
        (false, true) => MergeKind::RightOnly,
        (true, true) => match (left_significant, right_significant) {
            (true, true) => {
                if keyed.left[window.left.clone()] == keyed.right[window.right.clone()] {
                    MergeKind::BothSame
                } else {
                    MergeKind::Conflict
                }
            }
            (true, false) => MergeKind::LeftOnly,
            (false, true) => MergeKind::RightOnly,
            (false, false) => MergeKind::BothSame,
        },
    };
    let ignored = policy != ComparisonPolicy::Default
        && ((left_changed && !left_significant) || (right_changed && !right_significant));
    (kind, ignored)
}

/// Accumulates windows, merging neighbouring unchanged ones and shifting
/// everything to absolute line indices.
struct WindowList {
    offset: (usize, usize, usize),
    fragments: Vec<MergeLineFragment>,
}

impl WindowList {
    fn new(boundary: &MergeRange) -> Self {
        Self {
            offset: (boundary.left.start, boundary.base.start, boundary.right.start),
            fragments: Vec::new(),
        }
    }

    fn push(&mut self, window: MergeRange, kind: MergeKind, ignored: bool) {
        let (dl, db, dr) = self.offset;
        let window = MergeRange::new(
            window.left.start + dl..window.left.end + dl,
            window.base.start + db..window.base.end + db,
            window.right.start + dr..window.right.end + dr,
        );
        if kind == MergeKind::Unchanged {
            if let Some(last) = self.fragments.last_mut() {
                if last.kind == MergeKind::Unchanged {
                    last.left.end = window.left.end;
                    last.base.end = window.base.end;
                    last.right.end = window.right.end;
                    return;
                }
            }
        }
        self.fragments.push(MergeLineFragment {
            left: window.left,
            base: window.base,
            right: window.right,
            kind,
            ignored,
        });
    }

    fn finish(self) -> Vec<MergeLineFragment> {
        self.fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::NeverCancelled;

    fn merger() -> ThreeWayMerger {
        ThreeWayMerger::default()
    }

    fn kinds(fragments: &[MergeLineFragment]) -> Vec<MergeKind> {
        fragments.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_right_only_change() {
        let fragments = merger()
            .merge_lines(
                "A\nB\n",
                "A\nB\n",
                "A\nC\n",
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::Unchanged, MergeKind::RightOnly]);
        assert_eq!(fragments[0].base, 0..1);
        assert_eq!(fragments[1].right, 1..2);
    }

    #[test]
    fn test_conflict() {
        let fragments = merger()
            .merge_lines(
                "A\nX\n",
                "A\nB\n",
                "A\nY\n",
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::Unchanged, MergeKind::Conflict]);
        assert_eq!(fragments[1].left, 1..2);
        assert_eq!(fragments[1].base, 1..2);
        assert_eq!(fragments[1].right, 1..2);
    }

    #[test]
    fn test_both_same() {
        let fragments = merger()
            .merge_lines(
                "A\nZ\n",
                "A\nB\n",
                "A\nZ\n",
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::Unchanged, MergeKind::BothSame]);
    }

    #[test]
    fn test_separate_edits_do_not_conflict() {
        let fragments = merger()
            .merge_lines(
                "a\nL\nc\nd\ne\n",
                "a\nb\nc\nd\ne\n",
                "a\nb\nc\nd\nR\n",
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(
            kinds(&fragments),
            vec![
                MergeKind::Unchanged,
                MergeKind::LeftOnly,
                MergeKind::Unchanged,
                MergeKind::RightOnly
            ]
        );
        assert_eq!(fragments[2].base, 2..4);
    }

    #[test]
    fn test_whitespace_edit_does_not_conflict() {
        let fragments = merger()
            .merge_lines(
                "A\n  B\n",
                "A\nB\n",
                "A\nC\n",
                ComparisonPolicy::TrimWhitespace,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::Unchanged, MergeKind::RightOnly]);
        assert!(fragments[1].ignored);

        let fragments = merger()
            .merge_lines(
                "A\n  B\n",
                "A\nB\n",
                "A\nC\n",
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(fragments[1].kind, MergeKind::Conflict);
    }

    #[test]
    fn test_ignored_edit_keeps_window() {
        let fragments = merger()
            .merge_lines(
                "A\nB \n",
                "A\nB\n",
                "A\nB\n",
                ComparisonPolicy::IgnoreWhitespace,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::Unchanged, MergeKind::LeftOnly]);
        assert!(fragments[1].ignored);
    }

    #[test]
    fn test_compare_lines_absorbs_ignored_edits() {
        let fragments = merger()
            .compare_lines(
                "A\nB \n",
                "A\nB\n",
                "A\nB\n",
                ComparisonPolicy::IgnoreWhitespace,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::Unchanged]);
        assert_eq!(fragments[0].left, 0..2);
    }

    #[test]
    fn test_empty_inputs() {
        let fragments = merger()
            .merge_lines("", "", "", ComparisonPolicy::Default, &NeverCancelled)
            .unwrap();
        assert!(fragments.is_empty());

        let fragments = merger()
            .merge_lines("x\n", "", "", ComparisonPolicy::Default, &NeverCancelled)
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::LeftOnly]);
        assert_eq!(fragments[0].left, 0..1);
        assert_eq!(fragments[0].base, 0..0);
    }

    #[test]
    fn test_within_range_offsets() {
        let left = "a\nX\nc\nd\ne\n";
        let base = "a\nb\nc\nd\ne\n";
        let right = "a\nb\nc\nY\ne\n";
        let boundary = MergeRange::new(1..4, 1..4, 1..4);
        let fragments = merger()
            .merge_lines_within_range(
                left,
                base,
                right,
                &boundary,
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(
            kinds(&fragments),
            vec![MergeKind::LeftOnly, MergeKind::Unchanged, MergeKind::RightOnly]
        );
        assert_eq!(fragments[0].base, 1..2);
        assert_eq!(fragments[1].base, 2..3);
        assert_eq!(fragments[2].base, 3..4);
        assert_eq!(fragments[2].right, 3..4);
    }

    #[test]
    fn test_adjacent_edits_conflict() {
        let fragments = merger()
            .merge_lines(
                "X\nb\n",
                "a\nb\n",
                "a\nY\n",
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(kinds(&fragments), vec![MergeKind::Conflict]);
    }

    #[test]
    fn test_within_range_rejects_out_of_bounds() {
        let boundary = MergeRange::new(0..1, 0..5, 0..1);
        let err = merger()
            .merge_lines_within_range(
                "a\n",
                "a\n",
                "a\n",
                &boundary,
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ComparisonError::InvalidRange {
                side: "base",
                start: 0,
                end: 5,
                len: 1
            }
        );
    }

    #[test]
    fn test_additions() {
        let base = merger()
            .merge_lines_additions(
                "a\nleft\nb\nc",
                "a\nb\nright\nc\n",
                ComparisonPolicy::Default,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(base, "a\nb\nc\n");
    }

    #[test]
    fn test_additions_use_left_spelling() {
        let base = merger()
            .merge_lines_additions(
                "  a\n",
                "a\n",
                ComparisonPolicy::TrimWhitespace,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(base, "  a\n");
    }

    #[test]
    fn test_sync_regions_intersect_blocks() {
        let to_left = [MatchBlock {
            start1: 0,
            start2: 0,
            len: 4,
        }];
        let to_right = [
            MatchBlock {
                start1: 0,
                start2: 0,
                len: 1,
            },
            MatchBlock {
                start1: 2,
                start2: 3,
                len: 2,
            },
        ];
        let regions = sync_regions(&to_left, &to_right, (4, 4, 5));
        assert_eq!(
            regions,
            vec![
                MergeRange::new(0..1, 0..1, 0..1),
                MergeRange::new(2..4, 2..4, 3..5),
                MergeRange::new(4..4, 4..4, 5..5),
            ]
        );
    }
}
