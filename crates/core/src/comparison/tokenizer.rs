//! Splitting text into comparable units.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use super::policy::ComparisonPolicy;

/// A line, word or character of a source text plus its comparison key.
#[derive(Debug, Clone)]
pub struct Unit<'a> {
    /// Byte range of the unit in its source text.
    pub range: Range<usize>,
    key: Cow<'a, str>,
    hash: u64,
}

impl<'a> Unit<'a> {
    fn new(range: Range<usize>, key: Cow<'a, str>) -> Self {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Self {
            range,
            hash: hasher.finish(),
            key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for Unit<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.key == other.key
    }
}

impl Eq for Unit<'_> {}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Line table of a text using `\n` as the only separator.
#[derive(Debug, Clone)]
pub struct LineOffsets {
    starts: Vec<usize>,
    ends: Vec<usize>,
    text_len: usize,
}

impl LineOffsets {
    /// Build the line table.
    ///
    /// A trailing separator does not start an extra empty line unless
    /// `keep_trailing_empty_line` is set; an empty text then has one empty
    /// line instead of none.
    pub fn new(text: &str, keep_trailing_empty_line: bool) -> Self {
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        let mut start = 0;
        for (i, _) in text.match_indices('\n') {
            starts.push(start);
            ends.push(i);
            start = i + 1;
        }
        if start < text.len() || keep_trailing_empty_line {
            starts.push(start);
            ends.push(text.len());
        }
        Self {
            starts,
            ends,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Start offset of `line`; `line_count()` maps to the end of the text.
    pub fn line_start(&self, line: usize) -> usize {
        self.starts.get(line).copied().unwrap_or(self.text_len)
    }

    /// End offset of `line`, separator excluded.
    pub fn line_end(&self, line: usize) -> usize {
        self.ends.get(line).copied().unwrap_or(self.text_len)
    }

    /// Byte range covering `lines`, separators included.
    pub fn span(&self, lines: &Range<usize>) -> Range<usize> {
        self.line_start(lines.start)..self.line_start(lines.end)
    }

    /// The line containing `offset`; a separator belongs to the line it
    /// terminates.
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    pub fn line_range(&self, line: usize) -> Range<usize> {
        self.line_start(line)..self.line_end(line)
    }
}

/// One unit per line, keyed by the policy's line key.
pub fn split_lines<'a>(
    text: &'a str,
    offsets: &LineOffsets,
    policy: ComparisonPolicy,
) -> Vec<Unit<'a>> {
    (0..offsets.line_count())
        .map(|line| {
            let range = offsets.line_range(line);
            let key = policy.line_key(&text[range.clone()]);
            Unit::new(range, key)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Punctuation,
    Space,
}

fn classify(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if is_word_char(c) {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

/// Maximal runs of identifier characters and of other non-whitespace
/// characters inside `text[range]`. Whitespace is never a unit.
pub fn split_words(text: &str, range: Range<usize>) -> Vec<Unit<'_>> {
    let mut units = Vec::new();
    let mut run: Option<(usize, CharClass)> = None;
    for (i, c) in text[range.clone()].char_indices() {
        let pos = range.start + i;
        let class = classify(c);
        match run {
            Some((_, current)) if current == class => {}
            Some((start, current)) => {
                if current != CharClass::Space {
                    units.push(Unit::new(start..pos, Cow::Borrowed(&text[start..pos])));
                }
                run = Some((pos, class));
            }
            None => run = Some((pos, class)),
        }
    }
    if let Some((start, class)) = run {
        if class != CharClass::Space {
            units.push(Unit::new(
                start..range.end,
                Cow::Borrowed(&text[start..range.end]),
            ));
        }
    }
    units
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

/// One unit per character of `text[range]`.
///
/// Under non-exact policies whitespace characters are skipped; the policy's
/// region comparison judges them instead.
pub fn split_chars(text: &str, range: Range<usize>, policy: ComparisonPolicy) -> Vec<Unit<'_>> {
    text[range.clone()]
        .char_indices()
        .filter(|(_, c)| policy == ComparisonPolicy::Default || !c.is_whitespace())
        .map(|(i, c)| {
            let start = range.start + i;
            let end = start + c.len_utf8();
            Unit::new(start..end, Cow::Borrowed(&text[start..end]))
        })
        .collect()
}
