//! Spam classification.
//!
//! Scores the single best-matching category (most distinct keyword hits,
//! earlier category winning ties) and adds a smaller bonus for generic
//! sales phrasing that shows up across every kind of pitch. A transcript
//! that only trips the generic phrases still counts as spam, filed under
//! "unknown spam".

use crate::classify::keywords::{self, KeywordSet};
use crate::classify::ClassificationEvidence;

/// Combined score needed before a call counts as spam.
const SPAM_THRESHOLD: f64 = 0.4;
const CATEGORY_KEYWORD_WEIGHT: f64 = 0.2;
const GENERIC_PHRASE_WEIGHT: f64 = 0.15;
const UNKNOWN_CATEGORY: &str = "unknown spam";

pub struct SpamClassifier {
    categories: Vec<KeywordSet>,
    generic_phrases: KeywordSet,
}

impl Default for SpamClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SpamClassifier {
    pub fn new() -> Self {
        let categories = keywords::SPAM_CATEGORIES
            .iter()
            .map(|(name, terms)| KeywordSet::new(name, CATEGORY_KEYWORD_WEIGHT, 1.0, terms))
            .collect();
        Self {
            categories,
            generic_phrases: KeywordSet::new(
                "generic sales",
                GENERIC_PHRASE_WEIGHT,
                1.0,
                keywords::GENERIC_SALES_PHRASES,
            ),
        }
    }

    pub fn classify(&self, transcript: &str) -> Option<ClassificationEvidence> {
        let text = transcript.to_lowercase();

        let mut best: Option<(&KeywordSet, Vec<String>)> = None;
        for set in &self.categories {
            let matched = set.matches(&text);
            if matched.is_empty() {
                continue;
            }
            // Strictly more matches wins, so ties keep the earlier category.
            let improves = best
                .as_ref()
                .map_or(true, |(_, current)| matched.len() > current.len());
            if improves {
                best = Some((set, matched));
            }
        }

        let generic_matched = self.generic_phrases.matches(&text);

        let category_score = best
            .as_ref()
            .map_or(0.0, |(set, matched)| set.score(matched.len()));
        let total = (category_score + GENERIC_PHRASE_WEIGHT * generic_matched.len() as f64)
            .min(1.0);
        if total < SPAM_THRESHOLD {
            return None;
        }

        let (category, mut matched_terms) = match best {
            Some((set, matched)) => (set.name.to_string(), matched),
            None => (UNKNOWN_CATEGORY.to_string(), Vec::new()),
        };
        matched_terms.extend(generic_matched);

        Some(
            ClassificationEvidence::new(total)
                .with_category(category)
                .with_terms(matched_terms),
        )
    }
}
