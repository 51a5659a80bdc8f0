//! Building fragment lists from matcher results.
//!
//! Lines are compared first; with inner comparison each changed block whose
//! sides are both non-empty is compared again by word, and the word
//! fragments are regrouped into per-line chunks where the equal text between
//! them crosses line boundaries on both sides.

use std::ops::Range;

use tracing::debug;

use super::matcher::{self, Change};
use super::policy::ComparisonPolicy;
use super::tokenizer::{self, LineOffsets, Unit};
use crate::cancellation::CancellationChecker;
use crate::config::DiffLimits;
use crate::errors::ComparisonError;
use crate::models::{DiffFragment, LineFragment};

/// Turns matcher results into fragment trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentBuilder {
    pub limits: DiffLimits,
    pub keep_trailing_empty_line: bool,
}

/// Word or character fragments of two regions plus the number of units the
/// regions share.
pub(crate) struct UnitComparison {
    pub fragments: Vec<DiffFragment>,
    pub matched: usize,
}

impl FragmentBuilder {
    pub fn new(limits: DiffLimits, keep_trailing_empty_line: bool) -> Self {
        Self {
            limits,
            keep_trailing_empty_line,
        }
    }

    pub fn line_offsets(&self, text: &str) -> LineOffsets {
        LineOffsets::new(text, self.keep_trailing_empty_line)
    }

    /// Line-level changes between two line tables, in line-index space.
    pub(crate) fn line_changes(
        &self,
        text1: &str,
        lines1: &LineOffsets,
        text2: &str,
        lines2: &LineOffsets,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<Change>, ComparisonError> {
        let units1 = tokenizer::split_lines(text1, lines1, policy);
        let units2 = tokenizer::split_lines(text2, lines2, policy);
        matcher::diff(&units1, &units2, &self.limits, checker)
    }

    /// Compare two texts by line, optionally refining changed blocks by word.
    pub fn build_line_fragments(
        &self,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        inner: bool,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<LineFragment>, ComparisonError> {
        let lines1 = self.line_offsets(text1);
        let lines2 = self.line_offsets(text2);
        let changes = self.line_changes(text1, &lines1, text2, &lines2, policy, checker)?;
        debug!(
            lines1 = lines1.line_count(),
            lines2 = lines2.line_count(),
            changes = changes.len(),
            %policy,
            inner,
            "compared lines"
        );

        let mut fragments = Vec::with_capacity(changes.len());
        for change in changes {
            let block = LineFragment {
                offsets1: lines1.span(&change.range1),
                offsets2: lines2.span(&change.range2),
                lines1: change.range1,
                lines2: change.range2,
                inner: None,
            };
            if !inner || block.lines1.is_empty() || block.lines2.is_empty() {
                fragments.push(block);
                continue;
            }
            let sides = Sides {
                text1,
                lines1: &lines1,
                text2,
                lines2: &lines2,
                policy,
            };
            match self.refine_block(&sides, block.clone(), checker) {
                Ok(refined) => fragments.extend(refined),
                Err(err @ ComparisonError::TooBig { .. }) => {
                    debug!(
                        lines1 = ?block.lines1,
                        lines2 = ?block.lines2,
                        error = %err,
                        "word refinement too big, keeping block unrefined"
                    );
                    fragments.push(block);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(fragments)
    }

    /// Compare two whole texts by word.
    pub fn build_word_fragments(
        &self,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<DiffFragment>, ComparisonError> {
        let units1 = tokenizer::split_words(text1, 0..text1.len());
        let units2 = tokenizer::split_words(text2, 0..text2.len());
        let result = self.compare_units(
            text1,
            &units1,
            0..text1.len(),
            text2,
            &units2,
            0..text2.len(),
            policy,
            checker,
        )?;
        debug!(
            words1 = units1.len(),
            words2 = units2.len(),
            fragments = result.fragments.len(),
            "compared words"
        );
        Ok(result.fragments)
    }

    /// Compare two whole texts by character.
    pub fn build_char_fragments(
        &self,
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<DiffFragment>, ComparisonError> {
        let units1 = tokenizer::split_chars(text1, 0..text1.len(), policy);
        let units2 = tokenizer::split_chars(text2, 0..text2.len(), policy);
        let result = self.compare_units(
            text1,
            &units1,
            0..text1.len(),
            text2,
            &units2,
            0..text2.len(),
            policy,
            checker,
        )?;
        debug!(
            chars1 = units1.len(),
            chars2 = units2.len(),
            fragments = result.fragments.len(),
            "compared chars"
        );
        Ok(result.fragments)
    }

    /// Match units, then turn every region between consecutive matched
    /// units that differs under `policy` into a fragment.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn compare_units(
        &self,
        text1: &str,
        units1: &[Unit<'_>],
        span1: Range<usize>,
        text2: &str,
        units2: &[Unit<'_>],
        span2: Range<usize>,
        policy: ComparisonPolicy,
        checker: &dyn CancellationChecker,
    ) -> Result<UnitComparison, ComparisonError> {
        let changes = matcher::diff(units1, units2, &self.limits, checker)?;

        let mut fragments = Vec::new();
        let mut matched = 0;
        let (mut pos1, mut pos2) = (span1.start, span2.start);
        for (i, j) in matcher::matched_pairs(&changes, units1.len(), units2.len()) {
            let (u1, u2) = (&units1[i], &units2[j]);
            push_region(
                &mut fragments,
                text1,
                pos1..u1.range.start,
                text2,
                pos2..u2.range.start,
                policy,
            );
            pos1 = u1.range.end;
            pos2 = u2.range.end;
            matched += 1;
        }
        push_region(
            &mut fragments,
            text1,
            pos1..span1.end,
            text2,
            pos2..span2.end,
            policy,
        );
        let fragments = close_gaps(fragments, text1, span1, text2, span2, policy);

        Ok(UnitComparison { fragments, matched })
    }

    /// Word-refine one changed line block, splitting it into per-line
    /// chunks where possible.
    fn refine_block(
        &self,
        sides: &Sides<'_>,
        mut block: LineFragment,
        checker: &dyn CancellationChecker,
    ) -> Result<Vec<LineFragment>, ComparisonError> {
        // The separator after the block's last line stays out of the word
        // pass so a missing final newline on one side is not reported.
        let span1 = sides.lines1.line_start(block.lines1.start)
            ..sides.lines1.line_end(block.lines1.end - 1);
        let span2 = sides.lines2.line_start(block.lines2.start)
            ..sides.lines2.line_end(block.lines2.end - 1);

        let units1 = tokenizer::split_words(sides.text1, span1.clone());
        let units2 = tokenizer::split_words(sides.text2, span2.clone());
        let words = self.compare_units(
            sides.text1,
            &units1,
            span1,
            sides.text2,
            &units2,
            span2,
            sides.policy,
            checker,
        )?;

        if words.matched == 0 {
            return Ok(vec![block]);
        }
        if words.fragments.is_empty() {
            block.inner = Some(Vec::new());
            return Ok(vec![block]);
        }

        let groups = group_by_lines(sides, &block, words.fragments);
        Ok(groups
            .into_iter()
            .map(|group| {
                let offsets1 = sides.lines1.span(&group.lines1);
                let offsets2 = sides.lines2.span(&group.lines2);
                let inner = group
                    .fragments
                    .iter()
                    .map(|f| f.rebased(offsets1.start, offsets2.start))
                    .collect();
                LineFragment {
                    lines1: group.lines1,
                    lines2: group.lines2,
                    offsets1,
                    offsets2,
                    inner: Some(inner),
                }
            })
            .collect())
    }
}

/// Both texts of a two-way comparison with their line tables.
struct Sides<'a> {
    text1: &'a str,
    lines1: &'a LineOffsets,
    text2: &'a str,
    lines2: &'a LineOffsets,
    policy: ComparisonPolicy,
}

impl Sides<'_> {
    /// `true` when the two line ranges pair up line by line with equal keys.
    fn lines_equal(&self, range1: Range<usize>, range2: Range<usize>) -> bool {
        range1.len() == range2.len()
            && range1.zip(range2).all(|(i, j)| {
                self.policy.line_key(&self.text1[self.lines1.line_range(i)])
                    == self.policy.line_key(&self.text2[self.lines2.line_range(j)])
            })
    }

    /// `true` when the text from the start of a chunk's first lines up to
    /// its first fragment is equal.
    fn head_equal(
        &self,
        lines1: &Range<usize>,
        lines2: &Range<usize>,
        first: &DiffFragment,
    ) -> bool {
        self.policy.regions_equal(
            self.text1,
            self.lines1.line_start(lines1.start)..first.range1.start,
            self.text2,
            self.lines2.line_start(lines2.start)..first.range2.start,
        )
    }

    /// `true` when the text from a chunk's last fragment to the end of its
    /// last lines is equal.
    fn tail_equal(&self, group: &LineGroup) -> bool {
        group.fragments.last().map_or(true, |last| {
            let end1 = self.lines1.line_end(group.lines1.end - 1).max(last.range1.end);
            let end2 = self.lines2.line_end(group.lines2.end - 1).max(last.range2.end);
            self.policy.regions_equal(
                self.text1,
                last.range1.end..end1,
                self.text2,
                last.range2.end..end2,
            )
        })
    }
}

/// Append the fragment for one inter-unit region, if it differs.
fn push_region(
    fragments: &mut Vec<DiffFragment>,
    text1: &str,
    range1: Range<usize>,
    text2: &str,
    range2: Range<usize>,
    policy: ComparisonPolicy,
) {
    if range1.is_empty() && range2.is_empty() {
        return;
    }
    if policy.regions_equal(text1, range1.clone(), text2, range2.clone()) {
        return;
    }
    let (narrow1, narrow2) = match policy {
        ComparisonPolicy::Default => {
            strip_common_affixes(text1, range1.clone(), text2, range2.clone())
        }
        ComparisonPolicy::TrimWhitespace => {
            let (r1, r2) = strip_common_affixes(text1, range1.clone(), text2, range2.clone());
            (policy.trim_region(text1, r1), policy.trim_region(text2, r2))
        }
        ComparisonPolicy::IgnoreWhitespace => (
            policy.trim_region(text1, range1.clone()),
            policy.trim_region(text2, range2.clone()),
        ),
    };
    // A differing region is never reported as empty on both sides.
    if narrow1.is_empty() && narrow2.is_empty() {
        fragments.push(DiffFragment::new(range1, range2));
    } else {
        fragments.push(DiffFragment::new(narrow1, narrow2));
    }
}

/// Merge fragments across every gap `policy` does not judge equal, so the
/// spans between fragments, and between the fragments and the span edges,
/// are all equal.
fn close_gaps(
    fragments: Vec<DiffFragment>,
    text1: &str,
    span1: Range<usize>,
    text2: &str,
    span2: Range<usize>,
    policy: ComparisonPolicy,
) -> Vec<DiffFragment> {
    let mut out: Vec<DiffFragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let (from1, from2) = out
            .last()
            .map_or((span1.start, span2.start), |f| (f.range1.end, f.range2.end));
        if policy.regions_equal(
            text1,
            from1..fragment.range1.start,
            text2,
            from2..fragment.range2.start,
        ) {
            out.push(fragment);
            continue;
        }
        match out.last_mut() {
            Some(last) => {
                last.range1.end = fragment.range1.end;
                last.range2.end = fragment.range2.end;
            }
            None => out.push(DiffFragment::new(
                span1.start..fragment.range1.end,
                span2.start..fragment.range2.end,
            )),
        }
    }

    let (from1, from2) = out
        .last()
        .map_or((span1.start, span2.start), |f| (f.range1.end, f.range2.end));
    if !policy.regions_equal(text1, from1..span1.end, text2, from2..span2.end) {
        match out.last_mut() {
            Some(last) => {
                last.range1.end = span1.end;
                last.range2.end = span2.end;
            }
            None => out.push(DiffFragment::new(span1, span2)),
        }
    }
    out
}

/// Narrow two differing regions by their common exact prefix and suffix.
fn strip_common_affixes(
    text1: &str,
    range1: Range<usize>,
    text2: &str,
    range2: Range<usize>,
) -> (Range<usize>, Range<usize>) {
    let (s1, s2) = (&text1[range1.clone()], &text2[range2.clone()]);
    let prefix: usize = s1
        .chars()
        .zip(s2.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    let (r1, r2) = (&s1[prefix..], &s2[prefix..]);
    let suffix: usize = r1
        .chars()
        .rev()
        .zip(r2.chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    (
        range1.start + prefix..range1.end - suffix,
        range2.start + prefix..range2.end - suffix,
    )
}

/// Word fragments sharing a line chunk.
struct LineGroup {
    lines1: Range<usize>,
    lines2: Range<usize>,
    fragments: Vec<DiffFragment>,
}

/// Lines touched by a byte range; an empty range touches its line.
fn touched_lines(lines: &LineOffsets, range: &Range<usize>) -> Range<usize> {
    let first = lines.line_of(range.start);
    let last = if range.is_empty() {
        first
    } else {
        lines.line_of(range.end - 1)
    };
    first..last + 1
}

fn group_by_lines(
    sides: &Sides<'_>,
    block: &LineFragment,
    fragments: Vec<DiffFragment>,
) -> Vec<LineGroup> {
    let mut groups: Vec<LineGroup> = Vec::new();
    for fragment in fragments {
        let lines1 = touched_lines(sides.lines1, &fragment.range1);
        let lines2 = touched_lines(sides.lines2, &fragment.range2);
        if let Some(last) = groups.last_mut() {
            let separate = last.lines1.end <= lines1.start
                && last.lines2.end <= lines2.start
                && sides.lines_equal(last.lines1.end..lines1.start, last.lines2.end..lines2.start)
                && sides.tail_equal(last)
                && sides.head_equal(&lines1, &lines2, &fragment);
            if !separate {
                last.lines1.end = last.lines1.end.max(lines1.end);
                last.lines2.end = last.lines2.end.max(lines2.end);
                last.fragments.push(fragment);
                continue;
            }
        }
        groups.push(LineGroup {
            lines1,
            lines2,
            fragments: vec![fragment],
        });
    }

    // Untouched lines at the block edges may only stay outside the chunks
    // when they pair up with equal keys and the partial lines next to the
    // outer fragments are equal too.
    if let Some(first) = groups.first_mut() {
        let keep = sides.lines_equal(
            block.lines1.start..first.lines1.start,
            block.lines2.start..first.lines2.start,
        ) && first
            .fragments
            .first()
            .map_or(true, |f| sides.head_equal(&first.lines1, &first.lines2, f));
        if !keep {
            first.lines1.start = block.lines1.start;
            first.lines2.start = block.lines2.start;
        }
    }
    if let Some(last) = groups.last_mut() {
        let keep = sides.lines_equal(
            last.lines1.end..block.lines1.end,
            last.lines2.end..block.lines2.end,
        ) && sides.tail_equal(last);
        if !keep {
            last.lines1.end = block.lines1.end;
            last.lines2.end = block.lines2.end;
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::NeverCancelled;

    fn builder() -> FragmentBuilder {
        FragmentBuilder::default()
    }

    fn lines(text1: &str, text2: &str, inner: bool) -> Vec<LineFragment> {
        builder()
            .build_line_fragments(
                text1,
                text2,
                ComparisonPolicy::Default,
                inner,
                &NeverCancelled,
            )
            .unwrap()
    }

    fn slices<'a>(text1: &'a str, text2: &'a str, f: &DiffFragment) -> (&'a str, &'a str) {
        (&text1[f.range1.clone()], &text2[f.range2.clone()])
    }

    /// The text between inner fragments, and between them and the edges of
    /// their chunk, must be equal under `policy`.
    fn assert_inner_gaps_equal(
        text1: &str,
        text2: &str,
        policy: ComparisonPolicy,
        fragments: &[LineFragment],
    ) {
        let lines1 = builder().line_offsets(text1);
        let lines2 = builder().line_offsets(text2);
        for f in fragments {
            let Some(inner) = &f.inner else { continue };
            let (base1, base2) = (f.offsets1.start, f.offsets2.start);
            let (mut pos1, mut pos2) = (base1, base2);
            for d in inner {
                let gap1 = pos1..base1 + d.range1.start;
                let gap2 = pos2..base2 + d.range2.start;
                assert!(
                    policy.regions_equal(text1, gap1.clone(), text2, gap2.clone()),
                    "{:?} vs {:?}",
                    &text1[gap1],
                    &text2[gap2]
                );
                pos1 = base1 + d.range1.end;
                pos2 = base2 + d.range2.end;
            }
            let end1 = lines1.line_end(f.lines1.end - 1).max(pos1);
            let end2 = lines2.line_end(f.lines2.end - 1).max(pos2);
            assert!(policy.regions_equal(text1, pos1..end1, text2, pos2..end2));
        }
    }

    #[test]
    fn test_single_changed_line() {
        let fragments = lines("A\nB\n", "A\nX\n", false);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].lines1, 1..2);
        assert_eq!(fragments[0].lines2, 1..2);
        assert_eq!(fragments[0].offsets1, 2..4);
        assert!(fragments[0].inner.is_none());
    }

    #[test]
    fn test_empty_side() {
        let fragments = lines("", "a\nb\n", true);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].lines1, 0..0);
        assert_eq!(fragments[0].lines2, 0..2);
        assert_eq!(fragments[0].offsets2, 0..4);
        assert!(fragments[0].is_insertion());
    }

    #[test]
    fn test_trailing_newline_is_not_a_change() {
        assert!(lines("a\nb", "a\nb\n", true).is_empty());
    }

    #[test]
    fn test_wholesale_replace_has_no_inner() {
        let fragments = lines("alpha\n", "beta\n", true);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].inner.is_none());
    }

    #[test]
    fn test_inner_word_fragment_is_relative() {
        let text1 = "keep\nlet x = 1;\n";
        let text2 = "keep\nlet y = 1;\n";
        let fragments = lines(text1, text2, true);
        assert_eq!(fragments.len(), 1);
        let fragment = &fragments[0];
        let inner = fragment.inner.as_ref().unwrap();
        assert_eq!(inner, &vec![DiffFragment::new(4..5, 4..5)]);
        let local1 = &text1[fragment.offsets1.clone()];
        assert_eq!(&local1[inner[0].range1.clone()], "x");
    }

    #[test]
    fn test_inner_splits_adjacent_line_changes() {
        let fragments = lines("A\nB\nC\n", "A X\nB Y\nC\n", true);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].lines1, 0..1);
        assert_eq!(fragments[0].lines2, 0..1);
        assert_eq!(fragments[1].lines1, 1..2);
        assert_eq!(fragments[1].lines2, 1..2);
        assert_eq!(
            fragments[1].inner.as_ref().unwrap(),
            &vec![DiffFragment::new(1..1, 1..3)]
        );
    }

    #[test]
    fn test_inner_chunk_starts_with_equal_text() {
        // The matched "a" sits inside the third line of the second text, so
        // a chunk starting there would hide "a " in its leading gap.
        let text1 = "a\na\nb\na";
        let text2 = "a\naa\na a\naa\naa\na";
        let policy = ComparisonPolicy::IgnoreWhitespace;
        let fragments = builder()
            .build_line_fragments(text1, text2, policy, true, &NeverCancelled)
            .unwrap();
        assert!(!fragments.is_empty());
        assert!(fragments.iter().all(|f| f.inner.is_some()));
        assert_inner_gaps_equal(text1, text2, policy, &fragments);
    }

    #[test]
    fn test_inner_trim_whitespace_keeps_inner_whitespace() {
        let (text1, text2) = ("a b\n", "a  b\n");
        let policy = ComparisonPolicy::TrimWhitespace;
        let fragments = builder()
            .build_line_fragments(text1, text2, policy, true, &NeverCancelled)
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(
            fragments[0].inner.as_ref().unwrap(),
            &vec![DiffFragment::new(2..2, 2..3)]
        );
        assert_inner_gaps_equal(text1, text2, policy, &fragments);
    }

    #[test]
    fn test_inner_keeps_chunks_together_across_unequal_lines() {
        let text1 = "X\na b\nc\nY\n";
        let text2 = "Z\na\nb c\nW\n";
        let fragments = builder()
            .build_line_fragments(
                text1,
                text2,
                ComparisonPolicy::IgnoreWhitespace,
                true,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].lines1, 0..4);
        assert_eq!(fragments[0].lines2, 0..4);
        assert_eq!(fragments[0].inner.as_ref().unwrap().len(), 2);
        assert_inner_gaps_equal(
            text1,
            text2,
            ComparisonPolicy::IgnoreWhitespace,
            &fragments,
        );
    }

    #[test]
    fn test_words_default_policy_reports_whitespace() {
        let (t1, t2) = ("a b", "a  b");
        let fragments = builder()
            .build_word_fragments(t1, t2, ComparisonPolicy::Default, &NeverCancelled)
            .unwrap();
        assert_eq!(fragments, vec![DiffFragment::new(2..2, 2..3)]);
    }

    #[test]
    fn test_words_ignore_whitespace() {
        let (t1, t2) = ("a b", "a  b");
        let fragments = builder()
            .build_word_fragments(t1, t2, ComparisonPolicy::IgnoreWhitespace, &NeverCancelled)
            .unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_words_replacement() {
        let (t1, t2) = ("call foo(bar)", "call baz(bar)");
        let fragments = builder()
            .build_word_fragments(t1, t2, ComparisonPolicy::Default, &NeverCancelled)
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(slices(t1, t2, &fragments[0]), ("foo", "baz"));
    }

    #[test]
    fn test_words_trimmed_under_policy() {
        let (t1, t2) = ("a X b", "a b");
        let fragments = builder()
            .build_word_fragments(t1, t2, ComparisonPolicy::IgnoreWhitespace, &NeverCancelled)
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(slices(t1, t2, &fragments[0]), ("X", ""));

        let fragments = builder()
            .build_word_fragments(t1, t2, ComparisonPolicy::TrimWhitespace, &NeverCancelled)
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(slices(t1, t2, &fragments[0]), ("X ", ""));
    }

    #[test]
    fn test_words_trim_whitespace_reports_inner_whitespace() {
        let (t1, t2) = ("a b", "a  b");
        let fragments = builder()
            .build_word_fragments(t1, t2, ComparisonPolicy::TrimWhitespace, &NeverCancelled)
            .unwrap();
        assert_eq!(fragments, vec![DiffFragment::new(2..2, 2..3)]);

        // indentation and trailing blanks still vanish
        let fragments = builder()
            .build_word_fragments(
                "  a b\n",
                "a b  \n",
                ComparisonPolicy::TrimWhitespace,
                &NeverCancelled,
            )
            .unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_word_gaps_merge_when_unequal() {
        let (t1, t2) = ("a b\na", "b");
        let policy = ComparisonPolicy::TrimWhitespace;
        let fragments = builder()
            .build_word_fragments(t1, t2, policy, &NeverCancelled)
            .unwrap();
        assert!(!fragments.is_empty());
        let mut pos = (0, 0);
        for f in &fragments {
            assert!(!(f.range1.is_empty() && f.range2.is_empty()));
            assert!(policy.regions_equal(t1, pos.0..f.range1.start, t2, pos.1..f.range2.start));
            pos = (f.range1.end, f.range2.end);
        }
        assert!(policy.regions_equal(t1, pos.0..t1.len(), t2, pos.1..t2.len()));
    }

    #[test]
    fn test_chars() {
        let (t1, t2) = ("kitten", "sitting");
        let fragments = builder()
            .build_char_fragments(t1, t2, ComparisonPolicy::Default, &NeverCancelled)
            .unwrap();
        let pieces: Vec<_> = fragments.iter().map(|f| slices(t1, t2, f)).collect();
        assert_eq!(pieces, vec![("k", "s"), ("e", "i"), ("", "g")]);
    }

    #[test]
    fn test_chars_ignore_whitespace() {
        let fragments = builder()
            .build_char_fragments(
                "a b c",
                "abc",
                ComparisonPolicy::IgnoreWhitespace,
                &NeverCancelled,
            )
            .unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_word_pass_too_big_keeps_block() {
        let builder = FragmentBuilder::new(
            DiffLimits {
                max_unit_product: 3,
                ..DiffLimits::default()
            },
            false,
        );
        let text1 = "same\na b c d\n";
        let text2 = "same\nw x y z\n";
        let fragments = builder
            .build_line_fragments(
                text1,
                text2,
                ComparisonPolicy::Default,
                true,
                &NeverCancelled,
            )
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].inner.is_none());
    }
}
