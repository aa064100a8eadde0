//! Marker round-trip around the external translation call.
//!
//! Before translation every matched span is wrapped as `{{surface}}`. After
//! translation each marker is replaced with the dictionary's text for the
//! target language, or with the original surface text when the dictionary
//! has none. Markers the translation service dropped or rewrote are skipped:
//! this step never fails.

use crate::terms::index::TermIndex;
use crate::terms::matcher::TermMatch;
use serde::Serialize;
use std::ops::Range;
use tracing::debug;

pub const MARKER_OPEN: &str = "{{";
pub const MARKER_CLOSE: &str = "}}";

/// Outcome of resolving markers in one translated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerResolution {
    pub text: String,
    /// Markers replaced with the target language's dictionary text
    pub resolved: usize,
    /// Markers replaced with the original surface text
    pub fallbacks: usize,
    /// Markers not found in the translated text
    pub lost: usize,
}

/// Wrap a surface string in a marker.
pub fn marker_for(surface: &str) -> String {
    format!("{}{}{}", MARKER_OPEN, surface, MARKER_CLOSE)
}

/// Replace each matched span of `text` with its marker.
///
/// Spans are rewritten from the rightmost one leftwards so that earlier
/// offsets stay valid. A match that does not describe `text` (wrong offsets
/// or different surface) is left alone.
pub fn apply_markers(text: &str, matches: &[TermMatch]) -> String {
    let mut ordered: Vec<&TermMatch> = matches.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    let mut marked = text.to_string();
    let mut last_start = usize::MAX;
    for m in ordered {
        if m.end > last_start || text.get(m.range()) != Some(m.text.as_str()) {
            debug!("Skipping match {:?} that does not fit the input", m.text);
            continue;
        }
        marked.replace_range(m.range(), &marker_for(&m.text));
        last_start = m.start;
    }
    marked
}

/// Replace markers in a translated string with dictionary translations.
pub fn resolve_markers(
    translated: &str,
    matches: &[TermMatch],
    target_language: &str,
    index: &TermIndex,
) -> String {
    resolve_markers_with_report(translated, matches, target_language, index).text
}

/// Same as [`resolve_markers`], also counting what happened to each marker.
///
/// Markers are located once in `translated` and replacements are spliced in
/// a single pass, so dictionary text is never scanned for markers itself.
/// Matches are handled in source order; each one claims the first unclaimed
/// marker carrying its surface text, compared case-insensitively and
/// ignoring whitespace just inside the braces. Unclaimed markers are left
/// as they are.
pub fn resolve_markers_with_report(
    translated: &str,
    matches: &[TermMatch],
    target_language: &str,
    index: &TermIndex,
) -> MarkerResolution {
    let markers = marker_spans(translated);
    let mut claimed = vec![false; markers.len()];
    let mut replacements: Vec<(Range<usize>, &str)> = Vec::with_capacity(matches.len());
    let mut resolved = 0;
    let mut fallbacks = 0;
    let mut lost = 0;

    for m in matches {
        let key = m.text.to_lowercase();
        let Some(slot) = (0..markers.len()).find(|&i| !claimed[i] && markers[i].key == key) else {
            debug!(
                "Marker for {:?} (group {}) not preserved by translation",
                m.text, m.group_id
            );
            lost += 1;
            continue;
        };
        claimed[slot] = true;

        let replacement = match index.translation(&m.group_id, target_language) {
            Some(text) => {
                resolved += 1;
                text
            }
            None => {
                fallbacks += 1;
                m.text.as_str()
            }
        };
        replacements.push((markers[slot].range.clone(), replacement));
    }

    replacements.sort_by_key(|(range, _)| range.start);

    let mut text = String::with_capacity(translated.len());
    let mut cursor = 0;
    for (range, replacement) in replacements {
        text.push_str(&translated[cursor..range.start]);
        text.push_str(replacement);
        cursor = range.end;
    }
    text.push_str(&translated[cursor..]);

    MarkerResolution {
        text,
        resolved,
        fallbacks,
        lost,
    }
}

/// A `{{...}}` envelope found in translated text.
struct MarkerSpan {
    range: Range<usize>,
    /// Trimmed, lowercased contents
    key: String,
}

fn marker_spans(text: &str) -> Vec<MarkerSpan> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(open) = text[pos..].find(MARKER_OPEN) {
        let start = pos + open;
        let inner_start = start + MARKER_OPEN.len();
        let Some(close) = text[inner_start..].find(MARKER_CLOSE) else {
            break;
        };
        let inner_end = inner_start + close;
        let end = inner_end + MARKER_CLOSE.len();

        spans.push(MarkerSpan {
            range: start..end,
            key: text[inner_start..inner_end].trim().to_lowercase(),
        });
        pos = end;
    }

    spans
}
