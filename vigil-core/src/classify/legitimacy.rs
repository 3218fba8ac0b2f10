//! Legitimate-call classification.
//!
//! Unlike the emergency sets, legitimacy indicators combine: a delivery
//! driver who opens with "hey, it's dan" scores on both the conversational
//! and delivery sets. The verdict is positive once the summed (per-set
//! capped) score clears the threshold; the reported reason is the
//! highest-priority set that matched, so a pharmacy call reads as "medical"
//! even when it also sounds conversational.

use crate::classify::keywords::{self, KeywordSet};
use crate::classify::ClassificationEvidence;

/// Combined score needed before a call counts as legitimate.
const LEGITIMACY_THRESHOLD: f64 = 0.4;

pub struct LegitimacyClassifier {
    sets: Vec<KeywordSet>,
}

impl Default for LegitimacyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LegitimacyClassifier {
    pub fn new() -> Self {
        Self {
            sets: keywords::legitimacy_sets(),
        }
    }

    /// Replaces the built-in tables. Set order is reason priority.
    pub fn with_sets(sets: Vec<KeywordSet>) -> Self {
        Self { sets }
    }

    pub fn classify(&self, transcript: &str) -> Option<ClassificationEvidence> {
        let text = transcript.to_lowercase();
        let mut total = 0.0;
        let mut reason = None;
        let mut matched_terms = Vec::new();
        for set in &self.sets {
            let matched = set.matches(&text);
            if matched.is_empty() {
                continue;
            }
            total += set.score(matched.len());
            if reason.is_none() {
                reason = Some(set.name);
            }
            matched_terms.extend(matched);
        }
        if total < LEGITIMACY_THRESHOLD {
            return None;
        }
        Some(
            ClassificationEvidence::new(total.min(1.0))
                .with_reason(reason?)
                .with_terms(matched_terms),
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn a_lone_conversational_opener_is_not_enough() {
        let classifier = LegitimacyClassifier::new();
        assert!(classifier.classify("hi, this is someone you don't know").is_none());
    }

    #[test]
    fn school_call_clears_the_threshold_on_its_own() {
        let classifier = LegitimacyClassifier::new();
        let evidence = classifier
            .classify("this is the school calling about your child")
            .expect("school terms should classify");
        assert_eq!(evidence.reason.as_deref(), Some("school"));
        assert_relative_eq!(evidence.confidence, 0.6);
    }

    #[test]
    fn sets_combine_across_categories() {
        let classifier = LegitimacyClassifier::new();
        let evidence = classifier
            .classify("hi, this is alex, following up on the invoice for the project")
            .expect("work plus conversational should classify");
        // Three work matches cap at 0.4; the conversational opener adds 0.2.
        assert_eq!(evidence.reason.as_deref(), Some("work"));
        assert_relative_eq!(evidence.confidence, 0.6);
    }

    #[test]
    fn medical_reason_outranks_conversational() {
        let classifier = LegitimacyClassifier::new();
        let evidence = classifier
            .classify("hi, this is the pharmacy, your prescription is ready for pickup")
            .expect("should classify");
        assert_eq!(evidence.reason.as_deref(), Some("medical"));
        assert!(evidence.matched_terms.contains(&"pharmacy".to_string()));
        assert!(evidence.matched_terms.contains(&"hi, this is".to_string()));
    }

    #[test]
    fn delivery_terms_compound_but_cap_per_set() {
        let classifier = LegitimacyClassifier::new();
        let evidence = classifier
            .classify("hey, it's dan, your package is out for delivery, see you at the front door")
            .expect("delivery terms should classify");
        assert_eq!(evidence.reason.as_deref(), Some("delivery"));
        // Four delivery matches would be 1.0 uncapped; the set cap holds them
        // at 0.5 before the conversational 0.2 is added.
        assert_relative_eq!(evidence.confidence, 0.7);
    }

    #[test]
    fn combined_confidence_never_exceeds_one() {
        let classifier = LegitimacyClassifier::new();
        let evidence = classifier
            .classify(
                "this is the clinic about your appointment and test results, \
                 the school principal also called about your child, \
                 and a package delivery needs a signature",
            )
            .expect("should classify");
        assert!(evidence.confidence <= 1.0);
        assert_relative_eq!(evidence.confidence, 1.0);
    }
}
