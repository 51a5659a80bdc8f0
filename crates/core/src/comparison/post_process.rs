//! Squashing and trimming of line fragments.

use tracing::debug;

use super::policy::ComparisonPolicy;
use super::tokenizer::LineOffsets;
use crate::models::{DiffFragment, LineFragment};

/// Merge runs of touching fragments.
///
/// Two fragments touch when no matched line separates them on either side.
/// Inner lists are concatenated; a merged fragment has no inner list when
/// any of its members has none.
pub fn squash(fragments: Vec<LineFragment>) -> Vec<LineFragment> {
    let before = fragments.len();
    let mut out: Vec<LineFragment> = Vec::with_capacity(before);
    for fragment in fragments {
        match out.last_mut() {
            Some(last)
                if last.lines1.end == fragment.lines1.start
                    && last.lines2.end == fragment.lines2.start =>
            {
                let shift1 = fragment.offsets1.start - last.offsets1.start;
                let shift2 = fragment.offsets2.start - last.offsets2.start;
                last.inner = match (last.inner.take(), fragment.inner) {
                    (Some(mut inner), Some(next)) => {
                        inner.extend(next.iter().map(|f| f.shifted(shift1, shift2)));
                        Some(inner)
                    }
                    _ => None,
                };
                last.lines1.end = fragment.lines1.end;
                last.lines2.end = fragment.lines2.end;
                last.offsets1.end = fragment.offsets1.end;
                last.offsets2.end = fragment.offsets2.end;
            }
            _ => out.push(fragment),
        }
    }
    if out.len() != before {
        debug!(before, after = out.len(), "squashed line fragments");
    }
    out
}

/// Optionally squash, then optionally trim equal edge lines.
///
/// Trimming removes leading and trailing lines whose keys are equal under
/// `policy` from both sides of each fragment. Fragments left empty, and
/// under non-exact policies fragments whose remaining lines are all
/// whitespace, are dropped.
pub fn process_blocks(
    fragments: Vec<LineFragment>,
    text1: &str,
    text2: &str,
    policy: ComparisonPolicy,
    squash_fragments: bool,
    trim: bool,
) -> Vec<LineFragment> {
    let fragments = if squash_fragments {
        squash(fragments)
    } else {
        fragments
    };
    if !trim {
        return fragments;
    }

    // A trailing empty line is addressable so fragments touching the end of
    // a separator-terminated text still resolve.
    let lines1 = LineOffsets::new(text1, true);
    let lines2 = LineOffsets::new(text2, true);
    let before = fragments.len();
    let out: Vec<LineFragment> = fragments
        .into_iter()
        .filter_map(|f| trim_fragment(f, text1, &lines1, text2, &lines2, policy))
        .collect();
    debug!(before, after = out.len(), %policy, "trimmed line fragments");
    out
}

fn trim_fragment(
    fragment: LineFragment,
    text1: &str,
    lines1: &LineOffsets,
    text2: &str,
    lines2: &LineOffsets,
    policy: ComparisonPolicy,
) -> Option<LineFragment> {
    let key1 = |i: usize| policy.line_key(&text1[lines1.line_range(i)]);
    let key2 = |i: usize| policy.line_key(&text2[lines2.line_range(i)]);

    let mut r1 = fragment.lines1.clone();
    let mut r2 = fragment.lines2.clone();
    while !r1.is_empty() && !r2.is_empty() && key1(r1.start) == key2(r2.start) {
        r1.start += 1;
        r2.start += 1;
    }
    while !r1.is_empty() && !r2.is_empty() && key1(r1.end - 1) == key2(r2.end - 1) {
        r1.end -= 1;
        r2.end -= 1;
    }

    if r1.is_empty() && r2.is_empty() {
        return None;
    }
    if policy != ComparisonPolicy::Default
        && r1.clone().all(|i| policy.is_meaningless(&text1[lines1.line_range(i)]))
        && r2.clone().all(|i| policy.is_meaningless(&text2[lines2.line_range(i)]))
    {
        return None;
    }
    if r1 == fragment.lines1 && r2 == fragment.lines2 {
        return Some(fragment);
    }

    let offsets1 = lines1.span(&r1);
    let offsets2 = lines2.span(&r2);
    let inner = fragment.inner.and_then(|inner| {
        rebase_inner(
            &inner,
            &fragment.offsets1,
            &fragment.offsets2,
            &offsets1,
            &offsets2,
        )
    });
    Some(LineFragment {
        lines1: r1,
        lines2: r2,
        offsets1,
        offsets2,
        inner,
    })
}

/// Move inner fragments from the old offsets to the narrowed ones, or give
/// up when one of them falls outside.
fn rebase_inner(
    inner: &[DiffFragment],
    old1: &std::ops::Range<usize>,
    old2: &std::ops::Range<usize>,
    new1: &std::ops::Range<usize>,
    new2: &std::ops::Range<usize>,
) -> Option<Vec<DiffFragment>> {
    inner
        .iter()
        .map(|f| {
            let abs = f.shifted(old1.start, old2.start);
            let fits = new1.start <= abs.range1.start
                && abs.range1.end <= new1.end
                && new2.start <= abs.range2.start
                && abs.range2.end <= new2.end;
            fits.then(|| abs.rebased(new1.start, new2.start))
        })
        .collect()
}
