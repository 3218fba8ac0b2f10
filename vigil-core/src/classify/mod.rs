//! Transcript classifiers.
//!
//! Every classifier here is a deterministic pure function of the transcript
//! text: same input, same output, no clocks, no randomness, no I/O. The
//! session loop runs them in a fixed priority order and stops at the first
//! positive verdict, so the per-classifier scoring below never has to
//! arbitrate between categories itself.
//!
//! | Classifier | Question it answers |
//! |------------|---------------------|
//! | [`robot::RobotTextDetector`] | Is this a machine reading a menu? |
//! | [`emergency::EmergencyClassifier`] | Does the caller need a human now? |
//! | [`legitimacy::LegitimacyClassifier`] | Is this a call worth taking? |
//! | [`spam::SpamClassifier`] | Is this an unsolicited pitch? |

use serde::{Deserialize, Serialize};

pub mod emergency;
pub mod keywords;
pub mod legitimacy;
pub mod robot;
pub mod spam;

pub use emergency::EmergencyClassifier;
pub use keywords::KeywordSet;
pub use legitimacy::LegitimacyClassifier;
pub use robot::RobotTextDetector;
pub use spam::SpamClassifier;

/// What a classifier found and how sure it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationEvidence {
    /// Category label (e.g. a spam category), if the classifier assigns one.
    pub category: Option<String>,
    /// Short human-readable reason (e.g. the matched indicator set).
    pub reason: Option<String>,
    /// Confidence in [0.0, 1.0].
    pub confidence: f64,
    /// The distinct terms or snippets that triggered the verdict.
    pub matched_terms: Vec<String>,
}

impl ClassificationEvidence {
    pub fn new(confidence: f64) -> Self {
        Self {
            category: None,
            reason: None,
            confidence,
            matched_terms: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_terms(mut self, terms: Vec<String>) -> Self {
        self.matched_terms = terms;
        self
    }
}
