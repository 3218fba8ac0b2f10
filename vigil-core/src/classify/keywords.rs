//! Keyword tables and the weighted set they plug into.
//!
//! Everything in this file is configuration data: swapping a table changes
//! what the classifiers look for, never how they score. All terms are stored
//! lowercase and matched by substring containment.

/// Named set of lowercase keywords with a per-match weight and a score cap.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    pub name: &'static str,
    /// Confidence contributed by each distinct matched term.
    pub weight: f64,
    /// Upper bound on this set's total contribution.
    pub cap: f64,
    pub terms: Vec<String>,
}

impl KeywordSet {
    pub fn new(name: &'static str, weight: f64, cap: f64, terms: &[&str]) -> Self {
        Self {
            name,
            weight,
            cap,
            terms: terms.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Distinct terms of this set contained in `text`.
    ///
    /// `text` must already be lowercase; each term counts at most once no
    /// matter how often it appears.
    pub fn matches(&self, text: &str) -> Vec<String> {
        self.terms
            .iter()
            .filter(|term| text.contains(term.as_str()))
            .cloned()
            .collect()
    }

    /// Weighted, capped score for `match_count` distinct matches.
    pub fn score(&self, match_count: usize) -> f64 {
        (self.weight * match_count as f64).min(self.cap)
    }
}

// ── Robot speech ─────────────────────────────────────────────────────────

/// Single tokens whose density marks menu-reading robots.
pub(crate) const ROBOT_KEYWORDS: &[&str] = &[
    "press",
    "menu",
    "option",
    "options",
    "representative",
    "operator",
    "agent",
    "hold",
    "recorded",
    "automated",
    "extension",
    "dial",
    "transfer",
    "queue",
    "callback",
];

/// Canned phrases prerecorded systems play verbatim.
pub(crate) const CANNED_PHRASES: &[&str] = &[
    "this is an automated message",
    "this is an automated call",
    "please hold",
    "press pound",
    "press star",
    "your call is important to us",
    "this call may be recorded",
    "please stay on the line",
    "thank you for calling",
    "our menu options have changed",
    "to speak with a representative",
    "para español",
];

// ── Emergency ────────────────────────────────────────────────────────────

pub(crate) const MEDICAL_EMERGENCY_TERMS: &[&str] = &[
    "hospital",
    "ambulance",
    "emergency room",
    "doctor",
    "surgery",
    "accident",
    "injured",
    "heart attack",
    "stroke",
    "bleeding",
    "unconscious",
];

pub(crate) const DANGER_TERMS: &[&str] = &[
    "danger",
    "police",
    "fire department",
    "help me",
    "urgent",
    "trapped",
    "threatened",
    "break-in",
    "call 911",
];

pub(crate) const FAMILY_EMERGENCY_TERMS: &[&str] = &[
    "your mother",
    "your father",
    "your son",
    "your daughter",
    "your brother",
    "your sister",
    "your wife",
    "your husband",
    "grandma",
    "grandpa",
    "family emergency",
];

pub(crate) const WORK_EMERGENCY_TERMS: &[&str] = &[
    "your boss",
    "the office",
    "deadline",
    "production is down",
    "server is down",
    "shift",
    "on call",
];

/// Priority-ordered emergency sets: medical > danger > family > work.
pub(crate) fn emergency_sets() -> Vec<KeywordSet> {
    vec![
        KeywordSet::new("medical", 0.4, 1.0, MEDICAL_EMERGENCY_TERMS),
        KeywordSet::new("danger", 0.35, 0.9, DANGER_TERMS),
        KeywordSet::new("family", 0.25, 0.7, FAMILY_EMERGENCY_TERMS),
        KeywordSet::new("work", 0.2, 0.6, WORK_EMERGENCY_TERMS),
    ]
}

// ── Legitimacy indicators ────────────────────────────────────────────────

pub(crate) const MEDICAL_CONTEXT_TERMS: &[&str] = &[
    "appointment",
    "prescription",
    "pharmacy",
    "clinic",
    "test results",
    "refill",
];

pub(crate) const SCHOOL_TERMS: &[&str] = &[
    "school",
    "teacher",
    "principal",
    "classroom",
    "your child",
    "parent-teacher",
];

pub(crate) const OFFICIAL_ENTITY_TERMS: &[&str] = &[
    "court",
    "jury duty",
    "dmv",
    "city hall",
    "county clerk",
    "public library",
];

pub(crate) const BANK_VERIFICATION_TERMS: &[&str] = &[
    "fraud alert",
    "verify a recent transaction",
    "your card ending in",
    "unusual activity on your account",
];

pub(crate) const DELIVERY_TERMS: &[&str] = &[
    "package",
    "delivery",
    "courier",
    "out for delivery",
    "dropped off",
    "signature required",
    "front door",
];

pub(crate) const WORK_CONTEXT_TERMS: &[&str] = &[
    "meeting",
    "schedule",
    "project",
    "invoice",
    "conference call",
    "following up on",
];

pub(crate) const CONVERSATIONAL_TERMS: &[&str] = &[
    "hi, this is",
    "hey, it's",
    "it's me",
    "calling you back",
    "how are you",
    "got a minute",
    "sorry to bother you",
];

/// Priority-ordered legitimacy indicator sets. Order doubles as the reason
/// priority: medical and school outrank the generic conversational openers.
pub(crate) fn legitimacy_sets() -> Vec<KeywordSet> {
    vec![
        KeywordSet::new("medical", 0.3, 0.6, MEDICAL_CONTEXT_TERMS),
        KeywordSet::new("school", 0.3, 0.6, SCHOOL_TERMS),
        KeywordSet::new("official", 0.25, 0.5, OFFICIAL_ENTITY_TERMS),
        KeywordSet::new("bank verification", 0.25, 0.5, BANK_VERIFICATION_TERMS),
        KeywordSet::new("delivery", 0.25, 0.5, DELIVERY_TERMS),
        KeywordSet::new("work", 0.2, 0.4, WORK_CONTEXT_TERMS),
        KeywordSet::new("conversational", 0.2, 0.4, CONVERSATIONAL_TERMS),
    ]
}

// ── Spam categories ──────────────────────────────────────────────────────

pub(crate) const SPAM_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "telemarketing",
        &[
            "special offer",
            "limited time",
            "free trial",
            "discount",
            "promotion",
            "exclusive deal",
            "no obligation",
        ],
    ),
    (
        "surveys",
        &[
            "survey",
            "questionnaire",
            "your opinion",
            "a few questions",
            "feedback",
            "rate your experience",
        ],
    ),
    (
        "scam",
        &[
            "gift card",
            "wire transfer",
            "act now",
            "warrant",
            "irs",
            "social security number",
            "bitcoin",
            "final notice",
            "legal action",
            "account suspended",
        ],
    ),
    (
        "religious",
        &[
            "church",
            "ministry",
            "donation",
            "blessing",
            "congregation",
            "prayer",
        ],
    ),
    (
        "political",
        &[
            "campaign",
            "vote",
            "candidate",
            "election",
            "ballot",
            "poll",
        ],
    ),
    (
        "financial",
        &[
            "loan",
            "credit card debt",
            "refinance",
            "interest rate",
            "mortgage",
            "debt relief",
            "pre-approved",
        ],
    ),
    (
        "insurance",
        &[
            "insurance",
            "policy",
            "coverage",
            "premium",
            "auto warranty",
            "extended warranty",
        ],
    ),
    (
        "energy",
        &[
            "electricity bill",
            "energy provider",
            "solar panels",
            "utility company",
            "gas bill",
        ],
    ),
    (
        "telecom",
        &[
            "internet service",
            "phone plan",
            "data plan",
            "broadband",
            "cable package",
            "upgrade your device",
        ],
    ),
];

/// Generic sales phrasing that marks spam regardless of category.
pub(crate) const GENERIC_SALES_PHRASES: &[&str] = &[
    "are you the homeowner",
    "this is not a sales call",
    "you have been selected",
    "congratulations",
    "don't miss this opportunity",
    "today only",
    "absolutely free",
    "risk free",
];
