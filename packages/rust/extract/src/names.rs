//! Company-name mining from free text.
//!
//! A name is a run of one to five capitalized words followed by a legal-entity
//! suffix (`Acme Rockets Ltd`, `Globex Corporation`, `Initech GmbH`).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use companyintel_shared::{LEGAL_SUFFIXES, normalize_name};

/// Sentence-leading words dropped from the front of a match.
const LEADING_FILLER: &[&str] = &[
    "A", "An", "About", "And", "As", "At", "But", "By", "Contact", "For", "From", "I", "If",
    "In", "Join", "On", "Our", "So", "Then", "Today", "We", "When", "While", "With",
    "Yesterday",
];

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    let mut suffixes: Vec<&str> = LEGAL_SUFFIXES.to_vec();
    suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
    let suffixes = suffixes
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"\b((?:(?:[A-Z][A-Za-z0-9'&\-]*|&)[ \t]+){{1,5}}(?:{suffixes}))\b\.?"
    ))
    .expect("valid regex")
});

/// Company names found in `text`, de-duplicated (case-insensitively) in
/// first-seen order.
pub fn extract(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for caps in NAME_RE.captures_iter(text) {
        let Some(name) = strip_filler(&caps[1]) else {
            continue;
        };
        if seen.insert(normalize_name(&name)) {
            names.push(name);
        }
    }

    names
}

/// Drop leading filler words; `None` if only the suffix would remain.
fn strip_filler(raw: &str) -> Option<String> {
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    while words.len() > 1 && LEADING_FILLER.contains(&words[0]) {
        words.remove(0);
    }
    if words.len() < 2 || words[0] == "&" {
        return None;
    }
    Some(words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_names_with_suffixes() {
        let text = "We partnered with Acme Rockets Ltd and Globex Corporation last year. \
                    Initech GmbH joined later.";
        assert_eq!(
            extract(text),
            vec!["Acme Rockets Ltd", "Globex Corporation", "Initech GmbH"]
        );
    }

    #[test]
    fn deduplicates_preserving_order() {
        let text = "Globex Inc hired us. Acme Ltd too. Then Globex Inc again, and GLOBEX INC.";
        assert_eq!(extract(text), vec!["Globex Inc", "Acme Ltd"]);
    }

    #[test]
    fn strips_sentence_leading_filler() {
        assert_eq!(
            extract("Yesterday Acme Rockets Ltd announced a launch."),
            vec!["Acme Rockets Ltd"]
        );
        assert_eq!(extract("Join Hooli LLC today"), vec!["Hooli LLC"]);
    }

    #[test]
    fn suffix_must_be_a_whole_word() {
        assert!(extract("Acme Consulting grew").is_empty());
        assert!(extract("Big Incubator programme").is_empty());
    }

    #[test]
    fn lowercase_phrases_ignored() {
        assert!(extract("the acme rockets ltd website").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn ampersand_names() {
        assert_eq!(
            extract("Supplied by Smith & Jones LLP."),
            vec!["Smith & Jones LLP"]
        );
    }
}
