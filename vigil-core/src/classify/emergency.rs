//! Emergency keyword classification.
//!
//! Four priority-ordered indicator sets: medical > danger > family > work.
//! The first set with a match decides the reason and supplies all of the
//! evidence; lower-priority sets are not consulted, so "hospital" never gets
//! diluted into a work-emergency verdict.

use crate::classify::keywords::{self, KeywordSet};
use crate::classify::ClassificationEvidence;

pub struct EmergencyClassifier {
    sets: Vec<KeywordSet>,
}

impl Default for EmergencyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyClassifier {
    pub fn new() -> Self {
        Self {
            sets: keywords::emergency_sets(),
        }
    }

    /// Replaces the built-in tables. Set order is priority order.
    pub fn with_sets(sets: Vec<KeywordSet>) -> Self {
        Self { sets }
    }

    pub fn classify(&self, transcript: &str) -> Option<ClassificationEvidence> {
        let text = transcript.to_lowercase();
        for set in &self.sets {
            let matched = set.matches(&text);
            if matched.is_empty() {
                continue;
            }
            let confidence = set.score(matched.len());
            return Some(
                ClassificationEvidence::new(confidence)
                    .with_reason(set.name)
                    .with_terms(matched),
            );
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn ordinary_speech_yields_no_evidence() {
        let classifier = EmergencyClassifier::new();
        assert!(classifier
            .classify("hey, want to grab lunch later this week?")
            .is_none());
    }

    #[test]
    fn medical_terms_add_up_per_match() {
        let classifier = EmergencyClassifier::new();
        let evidence = classifier
            .classify("your father was in an accident and is at the hospital")
            .expect("medical terms should classify");
        assert_eq!(evidence.reason.as_deref(), Some("medical"));
        assert_relative_eq!(evidence.confidence, 0.8);
        // Matched terms come back in table order, not transcript order.
        assert_eq!(evidence.matched_terms, vec!["hospital", "accident"]);
    }

    #[test]
    fn medical_outranks_family_when_both_match() {
        let classifier = EmergencyClassifier::new();
        // "your father" is a family term, but the hospital mention wins.
        let evidence = classifier
            .classify("your father is at the hospital")
            .expect("should classify");
        assert_eq!(evidence.reason.as_deref(), Some("medical"));
        assert_eq!(evidence.matched_terms, vec!["hospital"]);
    }

    #[test]
    fn danger_set_caps_below_medical() {
        let classifier = EmergencyClassifier::new();
        let evidence = classifier
            .classify("urgent, call 911, the police are on the way, help me")
            .expect("danger terms should classify");
        assert_eq!(evidence.reason.as_deref(), Some("danger"));
        // Four matches at 0.35 apiece would be 1.4; the danger cap holds it at 0.9.
        assert_relative_eq!(evidence.confidence, 0.9);
    }

    #[test]
    fn work_emergency_scores_lowest() {
        let classifier = EmergencyClassifier::new();
        let evidence = classifier
            .classify("production is down and nobody can reach you")
            .expect("work terms should classify");
        assert_eq!(evidence.reason.as_deref(), Some("work"));
        assert_relative_eq!(evidence.confidence, 0.2);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let classifier = EmergencyClassifier::new();
        let evidence = classifier
            .classify("YOUR MOTHER had a STROKE")
            .expect("should classify");
        assert_eq!(evidence.reason.as_deref(), Some("medical"));
        assert_eq!(evidence.matched_terms, vec!["stroke"]);
    }
}
