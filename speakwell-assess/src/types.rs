//! Core Types and Trait Definitions for speakwell-assess
//!
//! Defines the assessment data model and the two provider ports:
//! - **AssessmentProvider:** structured pronunciation assessment (primary)
//! - **TranscriptionProvider:** plain speech-to-text (secondary, recognition only)
//!
//! Concrete HTTP adapters live in `providers`; the orchestrator only sees the traits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Common Types
// ============================================================================

/// Learner proficiency band
///
/// Scales reward ranges inversely to skill and selects feedback register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevelBand {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl UserLevelBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevelBand::Beginner => "beginner",
            UserLevelBand::Intermediate => "intermediate",
            UserLevelBand::Advanced => "advanced",
        }
    }
}

/// Which provider path produced an assessment result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssessmentSource {
    /// Primary provider on the first attempt
    Primary,
    /// Transcript accepted without a scored re-check
    TranscriptionFallback,
    /// Primary provider re-run against the fallback transcript
    Hybrid,
    /// No provider produced a trustworthy assessment
    DegradedFallback,
}

impl AssessmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentSource::Primary => "primary",
            AssessmentSource::TranscriptionFallback => "transcription-fallback",
            AssessmentSource::Hybrid => "hybrid",
            AssessmentSource::DegradedFallback => "degraded-fallback",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AssessmentSource::DegradedFallback)
    }
}

/// Submitted audio clip
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Raw encoded audio
    pub bytes: Vec<u8>,
    /// Declared MIME type (e.g. "audio/webm")
    pub mime_type: String,
    /// Declared duration in seconds
    pub duration_seconds: f64,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            duration_seconds,
        }
    }

    /// Reject clips no provider could ever assess
    pub fn check(&self) -> Result<(), AssessmentError> {
        if self.bytes.is_empty() {
            return Err(AssessmentError::InvalidSubmission(
                "audio payload is empty".to_string(),
            ));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(AssessmentError::InvalidSubmission(format!(
                "duration must be a non-negative number of seconds, got {}",
                self.duration_seconds
            )));
        }
        Ok(())
    }
}

/// Learner progress snapshot owned by the caller
///
/// Read-only here; the caller persists `total_xp + reward.total_xp` afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgressState {
    pub total_xp: u64,
    pub streak_days: u32,
}

// ============================================================================
// Assessment Result
// ============================================================================

/// Per-word error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WordErrorKind {
    None,
    Mispronunciation,
    Omission,
    Insertion,
    UnexpectedBreak,
    MissingBreak,
}

impl WordErrorKind {
    /// Parse the provider's PascalCase error label ("Mispronunciation", "UnexpectedBreak", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "None" => Some(WordErrorKind::None),
            "Mispronunciation" => Some(WordErrorKind::Mispronunciation),
            "Omission" => Some(WordErrorKind::Omission),
            "Insertion" => Some(WordErrorKind::Insertion),
            "UnexpectedBreak" => Some(WordErrorKind::UnexpectedBreak),
            "MissingBreak" => Some(WordErrorKind::MissingBreak),
            _ => None,
        }
    }
}

/// Sub-syllable score within a word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyllableScore {
    pub syllable: String,
    pub accuracy_score: f64,
    /// Offset in 100ns ticks from the start of the clip
    pub offset: u64,
    /// Duration in 100ns ticks
    pub duration: u64,
}

/// Word-level assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordResult {
    pub word: String,
    pub accuracy_score: f64,
    pub error: Option<WordErrorKind>,
    pub syllables: Vec<SyllableScore>,
}

/// Alternative phoneme the recognizer considered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeCandidate {
    pub phoneme: String,
    pub score: f64,
}

/// Phoneme-level assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeResult {
    pub phoneme: String,
    pub accuracy_score: f64,
    /// Ranked best-first
    pub candidates: Vec<PhonemeCandidate>,
    /// Offset in 100ns ticks from the start of the clip
    pub offset: u64,
    /// Duration in 100ns ticks
    pub duration: u64,
}

/// Structured pronunciation assessment for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Recognized text
    pub text: String,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub completeness_score: f64,
    pub pronunciation_score: f64,
    pub prosody_score: Option<f64>,
    pub words: Vec<WordResult>,
    pub phonemes: Vec<PhonemeResult>,
    /// Free-text detail lines from the assessing path
    pub feedback: Vec<String>,
    /// Confidence (0.0-1.0)
    pub confidence: f64,
    pub source: AssessmentSource,
}

impl AssessmentResult {
    /// Recognized text length in characters
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Verify the result is well-formed
    ///
    /// Scores outside 0-100, non-finite numbers, or confidence outside 0-1
    /// mean an adapter is broken; that is reported, never coerced into a retry.
    pub fn check_shape(&self) -> Result<(), AssessmentError> {
        let scores = [
            ("accuracy", Some(self.accuracy_score)),
            ("fluency", Some(self.fluency_score)),
            ("completeness", Some(self.completeness_score)),
            ("pronunciation", Some(self.pronunciation_score)),
            ("prosody", self.prosody_score),
        ];

        for (name, score) in scores {
            if let Some(value) = score {
                if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                    return Err(AssessmentError::MalformedResult(format!(
                        "{} score {} outside 0-100",
                        name, value
                    )));
                }
            }
        }

        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(AssessmentError::MalformedResult(format!(
                "confidence {} outside 0-1",
                self.confidence
            )));
        }

        if let Some(word) = self
            .words
            .iter()
            .find(|w| !w.accuracy_score.is_finite() || !(0.0..=100.0).contains(&w.accuracy_score))
        {
            return Err(AssessmentError::MalformedResult(format!(
                "word '{}' accuracy {} outside 0-100",
                word.word, word.accuracy_score
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Retry Signal
// ============================================================================

/// Why a submission must be re-recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryReason {
    NotUnderstood,
    TooShort,
    PoorQuality,
    Gibberish,
    ProviderError,
}

impl RetryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryReason::NotUnderstood => "not-understood",
            RetryReason::TooShort => "too-short",
            RetryReason::PoorQuality => "poor-quality",
            RetryReason::Gibberish => "gibberish",
            RetryReason::ProviderError => "provider-error",
        }
    }
}

/// Terminal retry request for the current submission (awards 0 XP)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySignal {
    pub reason: RetryReason,
    /// User-facing guidance
    pub guidance: String,
}

impl RetrySignal {
    /// Retry signal with default (English, intermediate) guidance
    pub fn new(reason: RetryReason) -> Self {
        Self {
            reason,
            guidance: crate::feedback::default_retry_guidance(reason).to_string(),
        }
    }
}

// ============================================================================
// Provider Ports
// ============================================================================

/// Plain transcription result from the secondary provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// Confidence (0.0-1.0)
    pub confidence: f64,
}

/// Primary structured pronunciation-assessment provider
///
/// Expected to return word/phoneme scores when a reference text is supplied.
#[async_trait::async_trait]
pub trait AssessmentProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Assess the clip, optionally aligned against `reference_text`
    ///
    /// The returned `source` is overwritten by the orchestrator.
    async fn assess(
        &self,
        audio: &AudioClip,
        reference_text: Option<&str>,
    ) -> Result<AssessmentResult, ProviderError>;
}

/// Secondary transcription-only provider (recognition, never scoring)
#[async_trait::async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Transcribe the clip
    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcription, ProviderError>;
}

/// Provider failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Call exceeded its time budget
    #[error("{provider} timed out after {after_ms}ms")]
    Timeout { provider: &'static str, after_ms: u64 },

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Failed to parse the provider response
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Provider explicitly reported that no speech was recognized
    #[error("Speech not recognized: {0}")]
    NotRecognized(String),

    /// Provider explicitly reported a low-confidence result
    #[error("Low confidence: {0:.2}")]
    LowConfidence(f64),

    /// Provider is missing credentials or endpoint
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// True when the provider was reachable but could not recognize the speech
    pub fn is_recognition_failure(&self) -> bool {
        matches!(
            self,
            ProviderError::NotRecognized(_) | ProviderError::LowConfidence(_)
        )
    }
}

/// Assessment failure that is not an expected retry or degraded outcome
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// Provider adapter produced an impossible result
    #[error("Malformed assessment result: {0}")]
    MalformedResult(String),

    /// Submission cannot be assessed at all
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Caller cancelled the submission
    #[error("Assessment cancelled")]
    Cancelled,
}

// ============================================================================
// Tests
// ============================================================================
