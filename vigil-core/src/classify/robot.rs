//! Text-pattern robot detection.
//!
//! Catches the robots the tone detector misses: IVR menus read by a clean
//! TTS voice, prerecorded announcements, and looped playback. Four
//! independent signals are OR-combined; any one of them is enough to call
//! the transcript machine-generated.

use std::collections::HashSet;

use regex::Regex;

use crate::classify::keywords::{CANNED_PHRASES, ROBOT_KEYWORDS};
use crate::error::{Result, VigilError};

/// Transcripts shorter than this (trimmed) carry too little signal to judge.
const MIN_TRANSCRIPT_CHARS: usize = 10;
/// Fraction of tokens that must be menu vocabulary to flag on density.
const KEYWORD_DENSITY_THRESHOLD: f64 = 0.15;
/// Unique-word ratio below which a long transcript reads as looped playback.
const REPETITION_RATIO: f64 = 0.5;
/// The repetition check only applies past this many words.
const REPETITION_MIN_WORDS: usize = 20;

const IVR_CONFIDENCE: f64 = 0.5;
const PHRASE_CONFIDENCE: f64 = 0.3;
const PHRASE_CONFIDENCE_CAP: f64 = 0.6;
const KEYWORD_CONFIDENCE: f64 = 0.2;
/// Keyword token count (with repeats) needed for the keyword bonus.
const KEYWORD_CONFIDENCE_MIN_TOKENS: usize = 3;

/// Outcome of a robot-text scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotVerdict {
    pub detected: bool,
    /// Confidence in [0.0, 1.0]. Can be 0.0 even when detected: the density
    /// and repetition signals flag without contributing confidence.
    pub confidence: f64,
    /// Regex snippets, canned phrases, and signal markers that fired.
    pub matched: Vec<String>,
}

impl RobotVerdict {
    fn negative() -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            matched: Vec::new(),
        }
    }
}

/// Scans transcripts for IVR menus, canned phrases, and playback loops.
pub struct RobotTextDetector {
    ivr_patterns: Vec<Regex>,
}

impl RobotTextDetector {
    pub fn new() -> Result<Self> {
        let sources = [
            // "pulse" covers Spanish-language menus ("pulse uno para ventas").
            r"\b(press|pulse|dial)\s+(the\s+)?(\d+|one|two|three|four|five|six|seven|eight|nine|zero|pound|star|uno|dos|tres|cuatro|cinco|seis|siete|ocho|nueve|cero)\b",
            r"\boption\s+(\d+|one|two|three|four|five|six|seven|eight|nine)\b",
            r"\bmain\s+menu\b",
        ];
        let ivr_patterns = sources
            .iter()
            .map(|src| {
                Regex::new(src)
                    .map_err(|err| VigilError::InvalidConfig(format!("bad IVR pattern: {err}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ivr_patterns })
    }

    pub fn detect(&self, transcript: &str) -> RobotVerdict {
        let trimmed = transcript.trim();
        if trimmed.chars().count() < MIN_TRANSCRIPT_CHARS {
            return RobotVerdict::negative();
        }
        let text = trimmed.to_lowercase();

        let mut matched = Vec::new();

        let mut ivr_hit = false;
        for pattern in &self.ivr_patterns {
            for found in pattern.find_iter(&text) {
                ivr_hit = true;
                let snippet = found.as_str().to_string();
                if !matched.contains(&snippet) {
                    matched.push(snippet);
                }
            }
        }

        let mut phrase_count = 0usize;
        for phrase in CANNED_PHRASES {
            if text.contains(phrase) {
                phrase_count += 1;
                matched.push((*phrase).to_string());
            }
        }

        let tokens: Vec<&str> = text
            .split_whitespace()
            .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|token| !token.is_empty())
            .collect();
        let keyword_tokens = tokens
            .iter()
            .filter(|token| ROBOT_KEYWORDS.contains(token))
            .count();

        let density_hit = !tokens.is_empty()
            && keyword_tokens as f64 / tokens.len() as f64 > KEYWORD_DENSITY_THRESHOLD;
        if density_hit {
            matched.push("keyword-density".to_string());
        }

        let unique: HashSet<&str> = tokens.iter().copied().collect();
        let repetition_hit = tokens.len() > REPETITION_MIN_WORDS
            && (unique.len() as f64 / tokens.len() as f64) < REPETITION_RATIO;
        if repetition_hit {
            matched.push("repetitive-content".to_string());
        }

        if !(ivr_hit || phrase_count > 0 || density_hit || repetition_hit) {
            return RobotVerdict::negative();
        }

        let mut confidence = 0.0;
        if ivr_hit {
            confidence += IVR_CONFIDENCE;
        }
        confidence += (PHRASE_CONFIDENCE * phrase_count as f64).min(PHRASE_CONFIDENCE_CAP);
        if keyword_tokens >= KEYWORD_CONFIDENCE_MIN_TOKENS {
            confidence += KEYWORD_CONFIDENCE;
        }

        RobotVerdict {
            detected: true,
            confidence: confidence.min(1.0),
            matched,
        }
    }
}
