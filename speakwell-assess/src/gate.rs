//! Audio Quality Gate
//!
//! Decides whether an assessment result is trustworthy enough to reward, or
//! whether the learner must record again.
//!
//! # Decision Order (first match wins)
//! 1. Text absent, the "unknown" sentinel, or under 3 characters → `not-understood`
//! 2. Duration under 2 seconds → `too-short`
//! 3. Pronunciation < 15 **and** accuracy < 20 → `poor-quality`
//! 4. More than 30% of characters outside `[A-Za-z0-9 .,!?'-]` → `gibberish`
//! 5. Otherwise pass
//!
//! The sentinel is matched against the whole trimmed text, ignoring case.
//! Text that merely contains the word "unknown" ("The unknown island") is a
//! real utterance and passes this rule, unlike a substring check.
//!
//! Thresholds come from the `[gate]` config section.
//!
//! Emptiness and duration run before the score heuristics so trivially empty
//! input never reports a misleading quality reason or divides by zero.
//!
//! Pure and deterministic: the same `(result, duration)` always yields the same verdict.

use crate::types::{AssessmentResult, RetryReason, RetrySignal};
use speakwell_common::config::GateSettings;

/// Recognizer sentinel for "nothing recognized"
const UNKNOWN_SENTINEL: &str = "unknown";

/// Gate thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateThresholds {
    /// Minimum trimmed text length in characters
    pub min_text_chars: usize,
    /// Minimum clip duration in seconds
    pub min_duration_seconds: f64,
    /// Pronunciation score below which (together with accuracy) audio is unusable
    pub poor_pronunciation_below: f64,
    /// Accuracy score below which (together with pronunciation) audio is unusable
    pub poor_accuracy_below: f64,
    /// Maximum share of disallowed characters before text counts as gibberish
    pub max_gibberish_ratio: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self::from_settings(&GateSettings::default())
    }
}

impl GateThresholds {
    pub fn from_settings(settings: &GateSettings) -> Self {
        Self {
            min_text_chars: settings.min_text_chars,
            min_duration_seconds: settings.min_duration_seconds,
            poor_pronunciation_below: settings.poor_pronunciation_below,
            poor_accuracy_below: settings.poor_accuracy_below,
            max_gibberish_ratio: settings.max_gibberish_ratio,
        }
    }
}

/// Audio Quality Gate
#[derive(Debug, Clone, Default)]
pub struct AudioQualityGate {
    thresholds: GateThresholds,
}

impl AudioQualityGate {
    /// Create gate with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create gate with custom thresholds
    pub fn with_thresholds(thresholds: GateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GateThresholds {
        &self.thresholds
    }

    /// Evaluate a result; `None` means it passes
    pub fn evaluate(&self, result: &AssessmentResult, duration_seconds: f64) -> Option<RetrySignal> {
        self.check(result, duration_seconds).map(RetrySignal::new)
    }

    /// Evaluate a result and return only the failing reason
    pub fn check(&self, result: &AssessmentResult, duration_seconds: f64) -> Option<RetryReason> {
        let t = &self.thresholds;
        let text = result.text.as_str();
        let trimmed = text.trim();

        if trimmed.eq_ignore_ascii_case(UNKNOWN_SENTINEL) || trimmed.chars().count() < t.min_text_chars {
            return Some(RetryReason::NotUnderstood);
        }

        if duration_seconds < t.min_duration_seconds {
            return Some(RetryReason::TooShort);
        }

        // Either score alone may be legitimately low for a struggling learner
        if result.pronunciation_score < t.poor_pronunciation_below
            && result.accuracy_score < t.poor_accuracy_below
        {
            return Some(RetryReason::PoorQuality);
        }

        if gibberish_ratio(text) > t.max_gibberish_ratio {
            return Some(RetryReason::Gibberish);
        }

        None
    }
}

/// Share of characters outside the plain-English allow list
fn gibberish_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let disallowed = text.chars().filter(|c| !is_allowed_char(*c)).count();
    disallowed as f64 / total as f64
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?' | '\'' | '-')
}

/// Evaluate with default thresholds
pub fn evaluate(result: &AssessmentResult, duration_seconds: f64) -> Option<RetrySignal> {
    AudioQualityGate::new().evaluate(result, duration_seconds)
}
