//! Keyword-table industry classification.

use companyintel_shared::{EnrichConfig, IndustryEntry, default_industries};
use tracing::debug;

/// Label returned when no keyword matches.
pub const DEFAULT_INDUSTRY: &str = "Other";

/// Pure, deterministic classifier over a fixed industry → keywords table.
#[derive(Debug, Clone)]
pub struct IndustryClassifier {
    table: Vec<IndustryEntry>,
    default_label: String,
}

impl Default for IndustryClassifier {
    fn default() -> Self {
        Self::new(default_industries(), DEFAULT_INDUSTRY)
    }
}

impl IndustryClassifier {
    pub fn new(table: Vec<IndustryEntry>, default_label: impl Into<String>) -> Self {
        let table = table
            .into_iter()
            .map(|entry| IndustryEntry {
                keywords: entry
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                label: entry.label,
            })
            .collect();
        Self {
            table,
            default_label: default_label.into(),
        }
    }

    pub fn from_config(config: &EnrichConfig) -> Self {
        Self::new(config.industries.clone(), config.default_industry.as_str())
    }

    /// Highest-scoring label; ties go to the earlier table entry.
    pub fn classify(&self, text: &str) -> String {
        let mut best: Option<(String, usize)> = None;

        for (label, score) in self.scores(text) {
            if score > 0 && best.as_ref().is_none_or(|(_, top)| score > *top) {
                best = Some((label, score));
            }
        }

        match best {
            Some((label, score)) => {
                debug!(industry = %label, score, "industry classified");
                label
            }
            None => self.default_label.clone(),
        }
    }

    /// Per-label keyword hit counts, in table order.
    pub fn scores(&self, text: &str) -> Vec<(String, usize)> {
        let text = text.to_lowercase();
        self.table
            .iter()
            .map(|entry| {
                let score = entry
                    .keywords
                    .iter()
                    .filter(|k| text.contains(k.as_str()))
                    .count();
                (entry.label.clone(), score)
            })
            .collect()
    }
}

/// Classify with the built-in table and the `"Other"` default.
pub fn infer_industry(text: &str) -> String {
    IndustryClassifier::default().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, keywords: &[&str]) -> IndustryEntry {
        IndustryEntry {
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn cloud_platform_api_is_technology() {
        assert_eq!(infer_industry("cloud platform api"), "Technology");
    }

    #[test]
    fn no_match_returns_default() {
        assert_eq!(infer_industry("zzz qqq"), "Other");
        assert_eq!(infer_industry(""), "Other");
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(
            infer_industry("ACME ROCKETS builds Orbital Launch vehicles"),
            "Aerospace"
        );
    }

    #[test]
    fn ties_go_to_declaration_order() {
        let classifier = IndustryClassifier::new(
            vec![entry("First", &["alpha"]), entry("Second", &["beta"])],
            "None",
        );
        assert_eq!(classifier.classify("beta alpha"), "First");
        assert_eq!(classifier.classify("beta"), "Second");
        assert_eq!(classifier.classify("gamma"), "None");
    }

    #[test]
    fn highest_score_wins() {
        let classifier = IndustryClassifier::new(
            vec![entry("First", &["alpha"]), entry("Second", &["beta", "gamma"])],
            "None",
        );
        assert_eq!(classifier.classify("alpha beta gamma"), "Second");
    }

    #[test]
    fn keywords_are_normalized() {
        let classifier = IndustryClassifier::new(vec![entry("Solar", &["  SOLAR ", ""])], "None");
        assert_eq!(classifier.classify("solar panels"), "Solar");
        assert_eq!(classifier.scores("solar"), vec![("Solar".to_string(), 1)]);
    }

    #[test]
    fn deterministic() {
        let text = "Payment platform for hospitals and clinics";
        let first = infer_industry(text);
        for _ in 0..10 {
            assert_eq!(infer_industry(text), first);
        }
    }
}
