//! Minimal edit scripts over two unit sequences.
//!
//! Linear-space Myers: common prefix and suffix are stripped, then the
//! middle snake of each sub-problem is found by searching forwards and
//! backwards simultaneously and the halves are solved recursively. The cost
//! of a script is the number of inserted plus deleted units and is globally
//! minimal for the sequences' equality relation.
//!
//! Ties between equally short scripts are broken deterministically: equal
//! units at the front of a sub-problem are always matched first, and the
//! forward search extends the diagonal that reaches furthest, preferring a
//! deletion over an insertion when both reach equally far.

use std::ops::{Index, IndexMut, Range};

use tracing::trace;

use crate::cancellation::CancellationChecker;
use crate::config::DiffLimits;
use crate::errors::ComparisonError;

/// A maximal changed span in unit-index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub range1: Range<usize>,
    pub range2: Range<usize>,
}

/// A run of matched units: `len` units starting at `start1` / `start2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchBlock {
    pub start1: usize,
    pub start2: usize,
    pub len: usize,
}

/// Compute the changes transforming `a` into `b`.
///
/// Fails with [`ComparisonError::TooBig`] when the inputs exceed `limits`
/// and with [`ComparisonError::Cancelled`] when `checker` asks to stop.
pub fn diff<T: PartialEq>(
    a: &[T],
    b: &[T],
    limits: &DiffLimits,
    checker: &dyn CancellationChecker,
) -> Result<Vec<Change>, ComparisonError> {
    checker.check()?;

    let prefix = common_prefix_len(a, 0..a.len(), b, 0..b.len());
    let suffix = common_suffix_len(a, prefix..a.len(), b, prefix..b.len());
    let a_range = prefix..a.len() - suffix;
    let b_range = prefix..b.len() - suffix;

    let product = (a_range.len() as u64).saturating_mul(b_range.len() as u64);
    if product > limits.max_unit_product {
        return Err(ComparisonError::TooBig {
            work: product,
            limit: limits.max_unit_product,
        });
    }

    let mut out = ChangeBuilder::default();
    if a_range.is_empty() || b_range.is_empty() {
        out.replace(a_range, b_range);
    } else {
        let max_d = max_d(a_range.len(), b_range.len());
        let mut vf = V::new(max_d);
        let mut vb = V::new(max_d);
        let mut budget = Budget::new(limits, checker);
        conquer(
            a,
            a_range,
            b,
            b_range,
            &mut vf,
            &mut vb,
            &mut budget,
            &mut out,
        )?;
        trace!(work = budget.spent, "matcher finished");
    }
    Ok(out.finish())
}

/// The matched runs between `changes`, in order.
pub fn matching_blocks(changes: &[Change], len1: usize, len2: usize) -> Vec<MatchBlock> {
    let mut blocks = Vec::with_capacity(changes.len() + 1);
    let (mut pos1, mut pos2) = (0, 0);
    for change in changes {
        let len = change.range1.start - pos1;
        if len > 0 {
            blocks.push(MatchBlock {
                start1: pos1,
                start2: pos2,
                len,
            });
        }
        pos1 = change.range1.end;
        pos2 = change.range2.end;
    }
    if pos1 < len1 {
        blocks.push(MatchBlock {
            start1: pos1,
            start2: pos2,
            len: len1 - pos1,
        });
    }
    debug_assert_eq!(len1 - pos1, len2 - pos2);
    blocks
}

/// Every matched `(i, j)` pair, in order.
pub fn matched_pairs(
    changes: &[Change],
    len1: usize,
    len2: usize,
) -> impl Iterator<Item = (usize, usize)> {
    matching_blocks(changes, len1, len2)
        .into_iter()
        .flat_map(|block| (0..block.len).map(move |k| (block.start1 + k, block.start2 + k)))
}

// ---------------------------------------------------------------------------
// Work accounting
// ---------------------------------------------------------------------------

struct Budget<'a> {
    spent: u64,
    next_check: u64,
    limits: &'a DiffLimits,
    checker: &'a dyn CancellationChecker,
}

impl<'a> Budget<'a> {
    fn new(limits: &'a DiffLimits, checker: &'a dyn CancellationChecker) -> Self {
        Self {
            spent: 0,
            next_check: limits.check_interval,
            limits,
            checker,
        }
    }

    fn spend(&mut self, diagonals: u64) -> Result<(), ComparisonError> {
        self.spent += diagonals;
        if self.spent > self.limits.max_work {
            return Err(ComparisonError::TooBig {
                work: self.spent,
                limit: self.limits.max_work,
            });
        }
        if self.spent >= self.next_check {
            self.checker.check()?;
            self.next_check = self.spent + self.limits.check_interval.max(1);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Change accumulation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ChangeBuilder {
    changes: Vec<Change>,
}

impl ChangeBuilder {
    /// Record `a[range1]` replaced by `b[range2]`, coalescing with a
    /// touching predecessor.
    fn replace(&mut self, range1: Range<usize>, range2: Range<usize>) {
        if range1.is_empty() && range2.is_empty() {
            return;
        }
        if let Some(last) = self.changes.last_mut() {
            if last.range1.end == range1.start && last.range2.end == range2.start {
                last.range1.end = range1.end;
                last.range2.end = range2.end;
                return;
            }
        }
        self.changes.push(Change { range1, range2 });
    }

    fn finish(self) -> Vec<Change> {
        self.changes
    }
}

// ---------------------------------------------------------------------------
// Myers
// ---------------------------------------------------------------------------

/// Furthest-reaching x per diagonal, indexed by diagonal `k` in `-max..=max`.
struct V {
    offset: isize,
    v: Vec<usize>,
}

impl V {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            v: vec![0; 2 * max_d + 1],
        }
    }
}

impl Index<isize> for V {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for V {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn max_d(len1: usize, len2: usize) -> usize {
    (len1 + len2 + 1) / 2 + 1
}

fn common_prefix_len<T: PartialEq>(
    a: &[T],
    a_range: Range<usize>,
    b: &[T],
    b_range: Range<usize>,
) -> usize {
    a[a_range]
        .iter()
        .zip(&b[b_range])
        .take_while(|(x, y)| x == y)
        .count()
}

fn common_suffix_len<T: PartialEq>(
    a: &[T],
    a_range: Range<usize>,
    b: &[T],
    b_range: Range<usize>,
) -> usize {
    a[a_range]
        .iter()
        .rev()
        .zip(b[b_range].iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Locate the start of the middle snake of `a[a_range]` vs `b[b_range]`.
fn find_middle_snake<T: PartialEq>(
    a: &[T],
    a_range: Range<usize>,
    b: &[T],
    b_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
    budget: &mut Budget<'_>,
) -> Result<Option<(usize, usize)>, ComparisonError> {
    let n = a_range.len();
    let m = b_range.len();

    // By Lemma 1 in the Myers paper, the middle snake is found from the
    // forward search when delta is odd and from the backward one otherwise.
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;

    vf[1] = 0;
    vb[1] = 0;

    let d_max = max_d(n, m) as isize;
    debug_assert!(vf.v.len() as isize >= 2 * d_max - 1);
    debug_assert!(vb.v.len() as isize >= 2 * d_max - 1);

    for d in 0..d_max {
        budget.spend(2 * (d as u64 + 1))?;

        // Forward
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vf[k - 1] < vf[k + 1]) {
                vf[k + 1]
            } else {
                vf[k - 1] + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix_len(
                    a,
                    a_range.start + x..a_range.end,
                    b,
                    b_range.start + y..b_range.end,
                );
            }
            vf[k] = x;

            if odd && (k - delta).abs() <= d - 1 && vf[k] + vb[-(k - delta)] >= n {
                return Ok(Some((x0 + a_range.start, y0 + b_range.start)));
            }
        }

        // Backward
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vb[k - 1] < vb[k + 1]) {
                vb[k + 1]
            } else {
                vb[k - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let advance = common_suffix_len(
                    a,
                    a_range.start..a_range.start + n - x,
                    b,
                    b_range.start..b_range.start + m - y,
                );
                x += advance;
                y += advance;
            }
            vb[k] = x;

            if !odd && (k - delta).abs() <= d && vb[k] + vf[-(k - delta)] >= n {
                return Ok(Some((n - x + a_range.start, m - y + b_range.start)));
            }
        }
    }

    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn conquer<T: PartialEq>(
    a: &[T],
    mut a_range: Range<usize>,
    b: &[T],
    mut b_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
    budget: &mut Budget<'_>,
    out: &mut ChangeBuilder,
) -> Result<(), ComparisonError> {
    let prefix = common_prefix_len(a, a_range.clone(), b, b_range.clone());
    a_range.start += prefix;
    b_range.start += prefix;

    let suffix = common_suffix_len(a, a_range.clone(), b, b_range.clone());
    a_range.end -= suffix;
    b_range.end -= suffix;

    if a_range.is_empty() || b_range.is_empty() {
        out.replace(a_range, b_range);
    } else if let Some((x, y)) =
        find_middle_snake(a, a_range.clone(), b, b_range.clone(), vf, vb, budget)?
    {
        conquer(
            a,
            a_range.start..x,
            b,
            b_range.start..y,
            vf,
            vb,
            budget,
            out,
        )?;
        conquer(a, x..a_range.end, b, y..b_range.end, vf, vb, budget, out)?;
    } else {
        out.replace(a_range, b_range);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::{CancellationFlag, NeverCancelled};

    fn run(a: &str, b: &str) -> Vec<Change> {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        diff(&a, &b, &DiffLimits::default(), &NeverCancelled).unwrap()
    }

    fn cost(changes: &[Change]) -> usize {
        changes
            .iter()
            .map(|c| c.range1.len() + c.range2.len())
            .sum()
    }

    #[test]
    fn test_identical() {
        assert!(run("abcabba", "abcabba").is_empty());
        assert!(run("", "").is_empty());
    }

    #[test]
    fn test_one_side_empty() {
        assert_eq!(
            run("", "abc"),
            vec![Change {
                range1: 0..0,
                range2: 0..3
            }]
        );
        assert_eq!(
            run("abc", ""),
            vec![Change {
                range1: 0..3,
                range2: 0..0
            }]
        );
    }

    #[test]
    fn test_classic_example_is_minimal() {
        // The example from the Myers paper has edit distance 5.
        let changes = run("abcabba", "cbabac");
        assert_eq!(cost(&changes), 5);
    }

    #[test]
    fn test_insert_in_middle() {
        assert_eq!(
            run("ac", "abc"),
            vec![Change {
                range1: 1..1,
                range2: 1..2
            }]
        );
    }

    #[test]
    fn test_repeated_elements_match_earliest() {
        // Inserting one of several equal lines is reported after the
        // common prefix, never at an arbitrary later position.
        assert_eq!(
            run("xx", "xxx"),
            vec![Change {
                range1: 2..2,
                range2: 2..3
            }]
        );
    }

    #[test]
    fn test_deterministic() {
        let a = "the quick brown fox jumps over the lazy dog";
        let b = "a quick brown dog jumps over the lazy fox";
        assert_eq!(run(a, b), run(a, b));
    }

    #[test]
    fn test_changes_are_maximal_and_ordered() {
        let changes = run("abcdefgh", "aXcdYYgh");
        for pair in changes.windows(2) {
            assert!(pair[0].range1.end < pair[1].range1.start);
            assert!(pair[0].range2.end < pair[1].range2.start);
        }
        assert_eq!(cost(&changes), 6);
    }

    #[test]
    fn test_matching_blocks_and_pairs() {
        let a: Vec<char> = "abXd".chars().collect();
        let b: Vec<char> = "abd".chars().collect();
        let changes = diff(&a, &b, &DiffLimits::default(), &NeverCancelled).unwrap();
        let blocks = matching_blocks(&changes, a.len(), b.len());
        assert_eq!(
            blocks,
            vec![
                MatchBlock {
                    start1: 0,
                    start2: 0,
                    len: 2
                },
                MatchBlock {
                    start1: 3,
                    start2: 2,
                    len: 1
                },
            ]
        );
        let pairs: Vec<_> = matched_pairs(&changes, a.len(), b.len()).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (3, 2)]);
    }

    #[test]
    fn test_too_big_by_product() {
        let a: Vec<u32> = (0..100).collect();
        let b: Vec<u32> = (1000..1100).collect();
        let limits = DiffLimits {
            max_unit_product: 9_999,
            ..DiffLimits::default()
        };
        let err = diff(&a, &b, &limits, &NeverCancelled).unwrap_err();
        assert_eq!(
            err,
            ComparisonError::TooBig {
                work: 10_000,
                limit: 9_999
            }
        );
    }

    #[test]
    fn test_too_big_by_work() {
        let a: Vec<u32> = (0..200).collect();
        let b: Vec<u32> = (1000..1200).collect();
        let limits = DiffLimits {
            max_work: 50,
            ..DiffLimits::default()
        };
        let err = diff(&a, &b, &limits, &NeverCancelled).unwrap_err();
        assert!(err.is_too_big());
    }

    #[test]
    fn test_common_affixes_do_not_count_towards_product() {
        let mut a: Vec<u32> = (0..1000).collect();
        let mut b = a.clone();
        a.insert(500, 7777);
        b.insert(500, 8888);
        let limits = DiffLimits {
            max_unit_product: 1,
            ..DiffLimits::default()
        };
        let changes = diff(&a, &b, &limits, &NeverCancelled).unwrap();
        assert_eq!(
            changes,
            vec![Change {
                range1: 500..501,
                range2: 500..501
            }]
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let err = diff(&[1, 2], &[2, 1], &DiffLimits::default(), &flag).unwrap_err();
        assert_eq!(err, ComparisonError::Cancelled);
    }

    #[test]
    fn test_cancelled_mid_search() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // Allow the initial check, cancel on the first poll from the loop.
        let polls = AtomicUsize::new(0);
        let checker = move || polls.fetch_add(1, Ordering::Relaxed) >= 1;
        let a: Vec<u32> = (0..300).collect();
        let b: Vec<u32> = (1000..1300).collect();
        let limits = DiffLimits {
            check_interval: 8,
            ..DiffLimits::default()
        };
        let err = diff(&a, &b, &limits, &checker).unwrap_err();
        assert_eq!(err, ComparisonError::Cancelled);
    }
}
