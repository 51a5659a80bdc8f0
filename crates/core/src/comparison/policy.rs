//! Comparison policies: which differences count.

use std::borrow::Cow;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rule set controlling unit equality and which ranges are meaningless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonPolicy {
    /// Exact comparison.
    #[default]
    Default,
    /// Ignore whitespace at the start and end of lines.
    TrimWhitespace,
    /// Ignore all whitespace.
    IgnoreWhitespace,
}

impl ComparisonPolicy {
    /// The key two lines must share to be equal under this policy.
    pub fn line_key<'a>(self, line: &'a str) -> Cow<'a, str> {
        match self {
            Self::Default => Cow::Borrowed(line),
            Self::TrimWhitespace => Cow::Borrowed(line.trim()),
            Self::IgnoreWhitespace => {
                if line.chars().any(char::is_whitespace) {
                    Cow::Owned(line.chars().filter(|c| !c.is_whitespace()).collect())
                } else {
                    Cow::Borrowed(line)
                }
            }
        }
    }

    /// `true` when `text` is whitespace-only and the policy is not exact.
    pub fn is_meaningless(self, text: &str) -> bool {
        self != Self::Default && text.chars().all(char::is_whitespace)
    }

    /// Compare `text1[range1]` with `text2[range2]` under this policy.
    ///
    /// Ranges are judged in the context of their whole text, so
    /// [`TrimWhitespace`](Self::TrimWhitespace) can tell whether a region
    /// edge sits at a line boundary.
    pub fn regions_equal(
        self,
        text1: &str,
        range1: Range<usize>,
        text2: &str,
        range2: Range<usize>,
    ) -> bool {
        match self {
            Self::Default => text1[range1] == text2[range2],
            Self::IgnoreWhitespace => text1[range1]
                .chars()
                .filter(|c| !c.is_whitespace())
                .eq(text2[range2].chars().filter(|c| !c.is_whitespace())),
            Self::TrimWhitespace => {
                trim_line_edges(text1, range1) == trim_line_edges(text2, range2)
            }
        }
    }

    /// Narrow a changed region to its essential extent.
    ///
    /// [`IgnoreWhitespace`](Self::IgnoreWhitespace) drops all surrounding
    /// whitespace; a whitespace-only region collapses to an empty range at
    /// its start. [`TrimWhitespace`](Self::TrimWhitespace) only drops
    /// whitespace that touches a line boundary and never drops a separator.
    pub fn trim_region(self, text: &str, range: Range<usize>) -> Range<usize> {
        match self {
            Self::Default => range,
            Self::IgnoreWhitespace => {
                let slice = &text[range.clone()];
                let trimmed_start = slice.trim_start();
                if trimmed_start.is_empty() {
                    return range.start..range.start;
                }
                let start = range.start + (slice.len() - trimmed_start.len());
                let end = start + trimmed_start.trim_end().len();
                start..end
            }
            Self::TrimWhitespace => trim_blank_edges(text, range),
        }
    }
}

/// Whitespace other than the line separator.
fn is_blank(c: char) -> bool {
    c.is_whitespace() && c != '\n'
}

fn starts_line(text: &str, offset: usize) -> bool {
    offset == 0 || text[..offset].ends_with('\n')
}

fn ends_line(text: &str, offset: usize) -> bool {
    offset == text.len() || text[offset..].starts_with('\n')
}

/// Drop the blank runs at either edge of `text[range]` that reach the start
/// or the end of their line.
fn trim_blank_edges(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let lead = slice.len() - slice.trim_start_matches(is_blank).len();
    let start = if starts_line(text, range.start) || ends_line(text, range.start + lead) {
        range.start + lead
    } else {
        range.start
    };

    let rest = &text[start..range.end];
    let trail = rest.len() - rest.trim_end_matches(is_blank).len();
    let end = if ends_line(text, range.end) || starts_line(text, range.end - trail) {
        range.end - trail
    } else {
        range.end
    };
    start..end.max(start)
}

impl std::fmt::Display for ComparisonPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::TrimWhitespace => write!(f, "trim_whitespace"),
            Self::IgnoreWhitespace => write!(f, "ignore_whitespace"),
        }
    }
}

impl FromStr for ComparisonPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "default" | "exact" => Ok(Self::Default),
            "trim_whitespace" | "trim" => Ok(Self::TrimWhitespace),
            "ignore_whitespace" | "ignore" => Ok(Self::IgnoreWhitespace),
            other => Err(format!(
                "unknown comparison policy '{other}' (expected default, trim_whitespace or ignore_whitespace)"
            )),
        }
    }
}

/// Strip whitespace that touches a line boundary inside `text[range]`.
fn trim_line_edges(text: &str, range: Range<usize>) -> String {
    let at_line_start = starts_line(text, range.start);
    let at_line_end = ends_line(text, range.end);

    let slice = &text[range];
    let pieces: Vec<&str> = slice.split('\n').collect();
    let last = pieces.len() - 1;
    let mut out = String::with_capacity(slice.len());
    for (i, piece) in pieces.iter().enumerate() {
        let mut piece: &str = piece;
        if i > 0 || at_line_start {
            piece = piece.trim_start();
        }
        if i < last || at_line_end {
            piece = piece.trim_end();
        }
        if i > 0 {
            out.push('\n');
        }
        out.push_str(piece);
    }
    out
}
