//! Explainable keyword heuristics used to compare manuscripts and reviewer expertise.
//!
//! Every match can be traced back to a literal substring of one keyword inside another.

use serde::Serialize;

const STOP_WORDS: [&str; 14] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

const MAX_KEYWORDS: usize = 10;
const MIN_KEYWORD_CHARS: usize = 4;

/// Lower-cased, punctuation-free tokens longer than three characters, first ten kept.
///
/// Repeated tokens are dropped before the cap, so up to ten distinct keywords survive.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '_' { ch } else { ' ' })
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for token in cleaned.split_whitespace() {
        if token.chars().count() < MIN_KEYWORD_CHARS || STOP_WORDS.contains(&token) {
            continue;
        }
        if keywords.iter().any(|existing| existing == token) {
            continue;
        }
        keywords.push(token.to_string());
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }
    keywords
}

/// Case-insensitive substring test in either direction. Empty tokens never match.
pub fn terms_match(left: &str, right: &str) -> bool {
    let left = left.trim().to_lowercase();
    let right = right.trim().to_lowercase();
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left.contains(&right) || right.contains(&left)
}

pub fn topics_overlap<A, B>(left: &[A], right: &[B]) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    left.iter()
        .any(|a| right.iter().any(|b| terms_match(a.as_ref(), b.as_ref())))
}

/// Ordered collection of comparable terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordBag {
    terms: Vec<String>,
}

impl KeywordBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term verbatim (e.g. a category tag or a field name).
    pub fn push_term(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        if !self.terms.iter().any(|existing| existing.eq_ignore_ascii_case(term)) {
            self.terms.push(term.to_string());
        }
    }

    /// Add the keywords extracted from free text.
    pub fn push_text(&mut self, text: &str) {
        for keyword in extract_keywords(text) {
            self.push_term(&keyword);
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn overlaps(&self, other: &KeywordBag) -> bool {
        topics_overlap(&self.terms, &other.terms)
    }

    /// Terms of `self` that match anything in `other`, in insertion order.
    pub fn matches_in(&self, other: &KeywordBag) -> Vec<String> {
        self.terms
            .iter()
            .filter(|term| other.terms.iter().any(|candidate| terms_match(term, candidate)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_drops_short_words_stop_words_and_punctuation() {
        let keywords = extract_keywords("The Effects of Graph-Neural Networks, on Protein Folding!");
        assert_eq!(
            keywords,
            vec!["effects", "graph", "neural", "networks", "protein", "folding"]
        );
    }

    #[test]
    fn extraction_caps_at_ten_keywords() {
        let text = "alpha bravo charlie delta echoes foxtrot golf hotel india juliet kilo lima";
        let keywords = extract_keywords(text);
        assert_eq!(keywords.len(), 10);
        assert_eq!(keywords.first().map(String::as_str), Some("alpha"));
        assert_eq!(keywords.last().map(String::as_str), Some("juliet"));
    }

    #[test]
    fn repeated_tokens_do_not_use_up_the_cap() {
        let text = "graph graph graph graph graph graph graph graph graph graph protein";
        assert_eq!(extract_keywords(text), vec!["graph", "protein"]);
    }

    #[test]
    fn overlap_is_bidirectional_substring() {
        assert!(topics_overlap(&["Genomics"], &["genomic"]));
        assert!(topics_overlap(&["bio"], &["bioinformatics"]));
        assert!(!topics_overlap(&["chemistry"], &["physics"]));
        assert!(!topics_overlap(&[""], &["physics"]));
    }
}
