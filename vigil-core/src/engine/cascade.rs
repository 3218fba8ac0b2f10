//! Ordered rule cascade for legitimate/emergency evidence.
//!
//! One rule per priority level, each returning optional evidence; evaluation
//! short-circuits on the first hit. The order is load-bearing:
//!
//! ```text
//! 1. configured user name said        → Legitimate 0.9
//! 2. any configured family name said  → Legitimate 0.85
//! 3. any custom emergency keyword     → Emergency 0.9
//! 4. EmergencyClassifier              → Emergency (scored)
//! 5. LegitimacyClassifier             → Legitimate (scored)
//! ```
//!
//! Names and keywords match by case-insensitive containment; empty entries
//! are dropped at construction so they can never match everything.

use crate::classify::{
    ClassificationEvidence, EmergencyClassifier, LegitimacyClassifier,
};
use crate::engine::ScreeningConfig;
use crate::events::Classification;

const USER_NAME_CONFIDENCE: f64 = 0.9;
const FAMILY_NAME_CONFIDENCE: f64 = 0.85;
const CUSTOM_KEYWORD_CONFIDENCE: f64 = 0.9;

const USER_NAME_REASON: &str = "said user name";
const FAMILY_NAME_REASON: &str = "said family name";
const CUSTOM_KEYWORD_REASON: &str = "emergency keywords";

/// A decisive cascade result: the classification to finalize with and why.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CascadeHit {
    pub classification: Classification,
    pub evidence: ClassificationEvidence,
}

pub(crate) struct EvidenceCascade {
    user_name: Option<String>,
    family_names: Vec<String>,
    custom_keywords: Vec<String>,
    emergency: EmergencyClassifier,
    legitimacy: LegitimacyClassifier,
}

impl EvidenceCascade {
    pub fn from_config(config: &ScreeningConfig) -> Self {
        let non_empty_lower = |value: &str| {
            let value = value.trim().to_lowercase();
            (!value.is_empty()).then_some(value)
        };
        Self {
            user_name: non_empty_lower(&config.user_name),
            family_names: config
                .family_names
                .iter()
                .filter_map(|name| non_empty_lower(name))
                .collect(),
            custom_keywords: config
                .custom_keywords
                .iter()
                .filter_map(|keyword| non_empty_lower(keyword))
                .collect(),
            emergency: EmergencyClassifier::new(),
            legitimacy: LegitimacyClassifier::new(),
        }
    }

    /// Evaluates the rules in priority order against the full transcript.
    pub fn evaluate(&self, transcript: &str) -> Option<CascadeHit> {
        let text = transcript.to_lowercase();
        self.said_user_name(&text)
            .or_else(|| self.said_family_name(&text))
            .or_else(|| self.said_custom_keyword(&text))
            .or_else(|| self.emergency_evidence(&text))
            .or_else(|| self.legitimacy_evidence(&text))
    }

    fn said_user_name(&self, text: &str) -> Option<CascadeHit> {
        let name = self.user_name.as_deref()?;
        text.contains(name).then(|| CascadeHit {
            classification: Classification::Legitimate,
            evidence: ClassificationEvidence::new(USER_NAME_CONFIDENCE)
                .with_reason(USER_NAME_REASON)
                .with_terms(vec![name.to_string()]),
        })
    }

    fn said_family_name(&self, text: &str) -> Option<CascadeHit> {
        let matched: Vec<String> = self
            .family_names
            .iter()
            .filter(|name| text.contains(name.as_str()))
            .cloned()
            .collect();
        if matched.is_empty() {
            return None;
        }
        Some(CascadeHit {
            classification: Classification::Legitimate,
            evidence: ClassificationEvidence::new(FAMILY_NAME_CONFIDENCE)
                .with_reason(FAMILY_NAME_REASON)
                .with_terms(matched),
        })
    }

    fn said_custom_keyword(&self, text: &str) -> Option<CascadeHit> {
        let matched: Vec<String> = self
            .custom_keywords
            .iter()
            .filter(|keyword| text.contains(keyword.as_str()))
            .cloned()
            .collect();
        if matched.is_empty() {
            return None;
        }
        Some(CascadeHit {
            classification: Classification::Emergency,
            evidence: ClassificationEvidence::new(CUSTOM_KEYWORD_CONFIDENCE)
                .with_reason(CUSTOM_KEYWORD_REASON)
                .with_terms(matched),
        })
    }

    fn emergency_evidence(&self, text: &str) -> Option<CascadeHit> {
        self.emergency.classify(text).map(|evidence| CascadeHit {
            classification: Classification::Emergency,
            evidence,
        })
    }

    fn legitimacy_evidence(&self, text: &str) -> Option<CascadeHit> {
        self.legitimacy.classify(text).map(|evidence| CascadeHit {
            classification: Classification::Legitimate,
            evidence,
        })
    }
}
