//! Greedy longest-match-first term detection.
//!
//! Terms are tried longest first and every accepted occurrence claims its
//! range for good, so "New York City" wins over "York" inside it. Matching is
//! case-insensitive and only accepts whole-word occurrences.

use crate::terms::index::TermIndex;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;

/// One occurrence of a dictionary term inside an input string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermMatch {
    /// Surface text exactly as it appeared in the input (original casing)
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// Group owning the matched term
    pub group_id: String,
}

impl TermMatch {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Find all non-overlapping term occurrences in `text`, ordered by position.
pub fn find_matches(text: &str, index: &TermIndex) -> Vec<TermMatch> {
    if index.is_empty() || text.is_empty() {
        return Vec::new();
    }

    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut matches: Vec<TermMatch> = Vec::new();

    for candidate in index.indexed_terms() {
        let Some(group_id) = index.owner_of(&candidate.term) else {
            continue;
        };

        for range in whole_word_occurrences(text, &candidate.pattern) {
            if claimed.iter().any(|taken| overlaps(taken, &range)) {
                continue;
            }
            matches.push(TermMatch {
                text: text[range.clone()].to_string(),
                start: range.start,
                end: range.end,
                group_id: group_id.to_string(),
            });
            claimed.push(range);
        }
    }

    matches.sort_by_key(|m| m.start);
    matches
}

/// All occurrences of `pattern` in `text` bounded by non-word characters or
/// the string edges.
///
/// An occurrence rejected for its boundaries does not hide a later one that
/// starts inside it: scanning resumes one character after its start.
fn whole_word_occurrences(text: &str, pattern: &Regex) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let Some(m) = pattern.find_at(text, pos) else {
            break;
        };
        if m.start() == m.end() {
            break;
        }

        if is_boundary_before(text, m.start()) && is_boundary_after(text, m.end()) {
            found.push(m.range());
            pos = m.end();
        } else {
            pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
    }

    found
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_boundary_before(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !is_word_char(c))
}

fn is_boundary_after(text: &str, end: usize) -> bool {
    text[end..].chars().next().map_or(true, |c| !is_word_char(c))
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}
