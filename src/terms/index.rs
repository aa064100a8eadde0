//! Term index: an immutable snapshot of every term known for one scope.

use crate::store::DictionaryRow;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::warn;

/// A term ready for matching, with its case-insensitive pattern compiled once
/// per build rather than once per request.
#[derive(Debug, Clone)]
pub(crate) struct IndexedTerm {
    /// Lowercased key into the owner map
    pub(crate) term: String,
    /// Compiled from the surface text of the row that claimed the key
    pub(crate) pattern: Regex,
}

/// Point-in-time snapshot of a scope's dictionary.
///
/// Built once from the store's rows and never mutated afterwards; a rebuild
/// produces a fresh instance that replaces this one wholesale.
#[derive(Debug, Clone)]
pub struct TermIndex {
    /// group id -> language code -> translated text
    translations: HashMap<String, HashMap<String, String>>,

    /// lowercased term -> owning group id
    term_owner: HashMap<String, String>,

    /// Distinct lowercased terms, longest surface first (ties keep encounter order)
    terms_by_length_desc: Vec<IndexedTerm>,

    built_at: Instant,
}

impl TermIndex {
    /// Build an index from a scope's rows.
    ///
    /// A term is indexed in whichever language it is written, so text
    /// containing the Spanish form of a term is detected even when the
    /// request's source language is English. When two groups share the same
    /// lowercased term, the group whose row comes first keeps it.
    pub fn build<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = DictionaryRow>,
    {
        let mut translations: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut term_owner: HashMap<String, String> = HashMap::new();
        // (lowercased key, surface text of the first row claiming it)
        let mut encounter_order: Vec<(String, String)> = Vec::new();

        for row in rows {
            let term = row.text.trim();
            if term.is_empty() {
                continue;
            }

            let key = term.to_lowercase();
            if !term_owner.contains_key(&key) {
                term_owner.insert(key.clone(), row.group_id.clone());
                encounter_order.push((key, term.to_string()));
            }

            translations
                .entry(row.group_id)
                .or_default()
                .entry(row.language_code)
                .or_insert_with(|| term.to_string());
        }

        // Length is the surface's char count. Stable sort keeps encounter
        // order among equal lengths.
        encounter_order.sort_by_key(|(_, surface)| std::cmp::Reverse(surface.chars().count()));

        // Full lowercasing is not always undone by case-insensitive matching
        // ("İ" lowercases to "i" plus U+0307), so patterns use the surface.
        let terms_by_length_desc = encounter_order
            .into_iter()
            .filter_map(|(term, surface)| match compile_term_pattern(&surface) {
                Ok(pattern) => Some(IndexedTerm { term, pattern }),
                Err(e) => {
                    warn!("Skipping dictionary term {:?}: {}", surface, e);
                    None
                }
            })
            .collect();

        Self {
            translations,
            term_owner,
            terms_by_length_desc,
            built_at: Instant::now(),
        }
    }

    /// An index with no terms.
    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.terms_by_length_desc.is_empty()
    }

    /// Number of distinct (lowercased) terms.
    pub fn term_count(&self) -> usize {
        self.terms_by_length_desc.len()
    }

    /// Number of dictionary groups.
    pub fn group_count(&self) -> usize {
        self.translations.len()
    }

    /// Group owning a lowercased term.
    pub fn owner_of(&self, lowercased_term: &str) -> Option<&str> {
        self.term_owner.get(lowercased_term).map(String::as_str)
    }

    /// A group's text in the given language, if the dictionary has one.
    pub fn translation(&self, group_id: &str, language_code: &str) -> Option<&str> {
        self.translations
            .get(group_id)
            .and_then(|by_language| by_language.get(language_code))
            .map(String::as_str)
    }

    /// Lowercased terms in matching order: longest first.
    pub fn terms_by_length_desc(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms_by_length_desc.iter().map(|t| t.term.as_str())
    }

    pub(crate) fn indexed_terms(&self) -> &[IndexedTerm] {
        &self.terms_by_length_desc
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }
}

impl Default for TermIndex {
    fn default() -> Self {
        Self::empty()
    }
}

fn compile_term_pattern(term: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<DictionaryRow> {
        vec![
            DictionaryRow::new("city", "en", "New York City"),
            DictionaryRow::new("city", "es", "Nueva York"),
            DictionaryRow::new("york", "en", "York"),
            DictionaryRow::new("brand", "en", "Acme"),
            DictionaryRow::new("brand", "es", "Acme"),
        ]
    }

    #[test]
    fn test_build_records_translations_per_language() {
        let index = TermIndex::build(rows());

        assert_eq!(index.translation("city", "es"), Some("Nueva York"));
        assert_eq!(index.translation("city", "en"), Some("New York City"));
        assert_eq!(index.translation("city", "fr"), None);
        assert_eq!(index.translation("missing", "en"), None);
        assert_eq!(index.group_count(), 3);
    }

    #[test]
    fn test_build_indexes_terms_in_every_language() {
        let index = TermIndex::build(rows());

        assert_eq!(index.owner_of("new york city"), Some("city"));
        assert_eq!(index.owner_of("nueva york"), Some("city"));
        assert_eq!(index.owner_of("york"), Some("york"));
        assert_eq!(index.owner_of("New York City"), None, "keys are lowercased");
    }

    #[test]
    fn test_identical_terms_in_same_group_indexed_once() {
        let index = TermIndex::build(rows());
        // "Acme" appears in both en and es for the same group
        assert_eq!(index.term_count(), 4);
    }

    #[test]
    fn test_terms_sorted_longest_first_with_stable_ties() {
        let index = TermIndex::build(vec![
            DictionaryRow::new("a", "en", "abc"),
            DictionaryRow::new("b", "en", "longest term"),
            DictionaryRow::new("c", "en", "xyz"),
            DictionaryRow::new("d", "en", "ab"),
        ]);

        let terms: Vec<&str> = index.terms_by_length_desc().collect();
        assert_eq!(terms, vec!["longest term", "abc", "xyz", "ab"]);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let index = TermIndex::build(vec![
            DictionaryRow::new("a", "en", "abcd"),
            // 3 characters, 6 bytes
            DictionaryRow::new("b", "ja", "日本語"),
        ]);

        let terms: Vec<&str> = index.terms_by_length_desc().collect();
        assert_eq!(terms, vec!["abcd", "日本語"]);
    }

    #[test]
    fn test_first_writer_wins_on_shared_term() {
        let index = TermIndex::build(vec![
            DictionaryRow::new("first", "en", "Gift"),
            DictionaryRow::new("second", "de", "gift"),
        ]);

        assert_eq!(index.owner_of("gift"), Some("first"));
        assert_eq!(index.term_count(), 1);
        // The losing group's translation is still recorded
        assert_eq!(index.translation("second", "de"), Some("gift"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = TermIndex::build(rows());
        let b = TermIndex::build(rows());

        assert_eq!(a.term_owner, b.term_owner);
        assert_eq!(
            a.terms_by_length_desc().collect::<Vec<_>>(),
            b.terms_by_length_desc().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_blank_terms_are_skipped() {
        let index = TermIndex::build(vec![
            DictionaryRow::new("a", "en", "   "),
            DictionaryRow::new("a", "es", ""),
            DictionaryRow::new("b", "en", "  Padded  "),
        ]);

        assert_eq!(index.term_count(), 1);
        assert_eq!(index.owner_of("padded"), Some("b"));
        assert_eq!(index.translation("b", "en"), Some("Padded"));
        assert_eq!(index.translation("a", "en"), None);
    }

    #[test]
    fn test_empty_index() {
        let index = TermIndex::empty();
        assert!(index.is_empty());
        assert_eq!(index.term_count(), 0);
        assert_eq!(index.terms_by_length_desc().count(), 0);
    }
}
