//! Assessment Orchestrator
//!
//! Drives one submission through the provider stages to exactly one terminal
//! state:
//!
//! ```text
//! Primary ──ok──> gate ──pass──> Accepted(primary)
//!    │              └──fail──> Retry
//!    ├─low confidence──> Fallback (as a recognition failure)
//!    └─err──> Fallback ──text──> Hybrid ──ok──> gate ──pass──> Accepted(hybrid)
//!                │                  │             └──fail──> Retry
//!                │                  ├─not recognized──> Retry(not-understood)
//!                │                  └─transport err──> Degraded(transcript)
//!                ├─empty──> Retry(not-understood | provider-error)
//!                └─err──> Degraded(placeholder) or Retry(not-understood)
//! ```
//!
//! With the hybrid re-check disabled, a fallback transcript is accepted as a
//! `transcription-fallback` result, still gated.
//!
//! Every provider call is bounded by its own timeout and aborted when the
//! caller's cancellation token fires. No provider is called after a terminal
//! state is reached.

use crate::feedback::assessment_tips;
use crate::gate::AudioQualityGate;
use crate::types::{
    AssessmentError, AssessmentProvider, AssessmentResult, AssessmentSource, AudioClip,
    ProviderError, RetryReason, RetrySignal, Transcription, TranscriptionProvider,
};
use serde::{Deserialize, Serialize};
use speakwell_common::config::OrchestratorSettings;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEGRADED_CONFIDENCE: f64 = 0.1;
const PLACEHOLDER_TEXT: &str = "Audio practice session";

/// Scores (accuracy, fluency, completeness, pronunciation) for an unscored transcript
const TRANSCRIPT_SCORES: (f64, f64, f64, f64) = (65.0, 70.0, 68.0, 68.0);
/// Scores for a degraded result with no transcript at all
const PLACEHOLDER_SCORES: (f64, f64, f64, f64) = (60.0, 65.0, 62.0, 62.0);

/// Orchestrator tuning
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub primary_timeout: Duration,
    pub fallback_timeout: Duration,
    pub hybrid_timeout: Duration,
    /// Re-run the primary against the fallback transcript
    pub hybrid_enabled: bool,
    /// Primary results below this confidence are treated as not recognized
    pub min_confidence: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_settings(&OrchestratorSettings::default())
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &OrchestratorSettings) -> Self {
        Self {
            primary_timeout: Duration::from_millis(settings.primary_timeout_ms),
            fallback_timeout: Duration::from_millis(settings.fallback_timeout_ms),
            hybrid_timeout: Duration::from_millis(settings.hybrid_timeout_ms),
            hybrid_enabled: settings.hybrid_enabled,
            min_confidence: settings.min_confidence,
        }
    }
}

/// Terminal state of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentOutcome {
    /// Trustworthy result from the primary or hybrid path (or an unscored transcript)
    Accepted(AssessmentResult),
    /// Submission must be re-recorded; awards nothing
    Retry(RetrySignal),
    /// No provider produced a trustworthy result; low-confidence placeholder
    Degraded(AssessmentResult),
}

/// Outcome discriminant for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Accepted,
    Retry,
    Degraded,
}

impl AssessmentOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            AssessmentOutcome::Accepted(_) => OutcomeKind::Accepted,
            AssessmentOutcome::Retry(_) => OutcomeKind::Retry,
            AssessmentOutcome::Degraded(_) => OutcomeKind::Degraded,
        }
    }

    /// Result eligible for a reward, if any
    pub fn result(&self) -> Option<&AssessmentResult> {
        match self {
            AssessmentOutcome::Accepted(r) | AssessmentOutcome::Degraded(r) => Some(r),
            AssessmentOutcome::Retry(_) => None,
        }
    }
}

/// Result built from a transcript with fixed moderate scores
fn transcript_result(transcript: &Transcription, source: AssessmentSource) -> AssessmentResult {
    let (accuracy, fluency, completeness, pronunciation) = TRANSCRIPT_SCORES;
    let confidence = match source {
        AssessmentSource::DegradedFallback => DEGRADED_CONFIDENCE,
        _ => transcript.confidence.clamp(0.0, 1.0),
    };
    AssessmentResult {
        text: transcript.text.trim().to_string(),
        accuracy_score: accuracy,
        fluency_score: fluency,
        completeness_score: completeness,
        pronunciation_score: pronunciation,
        prosody_score: None,
        words: Vec::new(),
        phonemes: Vec::new(),
        feedback: assessment_tips(pronunciation, accuracy, fluency, None, &[]),
        confidence,
        source,
    }
}

/// Degraded result from the transcript if one exists, else a neutral placeholder
fn degraded_result(transcript: Option<&Transcription>) -> AssessmentResult {
    if let Some(t) = transcript {
        return transcript_result(t, AssessmentSource::DegradedFallback);
    }
    let (accuracy, fluency, completeness, pronunciation) = PLACEHOLDER_SCORES;
    AssessmentResult {
        text: PLACEHOLDER_TEXT.to_string(),
        accuracy_score: accuracy,
        fluency_score: fluency,
        completeness_score: completeness,
        pronunciation_score: pronunciation,
        prosody_score: None,
        words: Vec::new(),
        phonemes: Vec::new(),
        feedback: vec!["Practice recorded. Detailed scoring was unavailable this time.".to_string()],
        confidence: DEGRADED_CONFIDENCE,
        source: AssessmentSource::DegradedFallback,
    }
}

/// Assessment Orchestrator
pub struct AssessmentOrchestrator {
    primary: Arc<dyn AssessmentProvider>,
    secondary: Arc<dyn TranscriptionProvider>,
    gate: AudioQualityGate,
    config: OrchestratorConfig,
}

impl AssessmentOrchestrator {
    pub fn new(
        primary: Arc<dyn AssessmentProvider>,
        secondary: Arc<dyn TranscriptionProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            gate: AudioQualityGate::new(),
            config,
        }
    }

    /// Replace the default gate
    pub fn with_gate(mut self, gate: AudioQualityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one submission to its terminal state
    ///
    /// # Errors
    /// - `InvalidSubmission` when the clip is empty or its duration is not a
    ///   non-negative number (no provider is called)
    /// - `MalformedResult` when a provider returns out-of-range scores
    /// - `Cancelled` when `cancel` fires before a terminal state
    pub async fn assess(
        &self,
        audio: &AudioClip,
        reference_text: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        audio.check()?;
        if cancel.is_cancelled() {
            return Err(AssessmentError::Cancelled);
        }
        let duration = audio.duration_seconds;

        // Stage 1: primary
        debug!(stage = "primary", provider = self.primary.name(), "Calling primary provider");
        let primary_call = self.primary.assess(audio, reference_text);
        let primary_error = match self
            .bounded(self.primary.name(), self.config.primary_timeout, cancel, primary_call)
            .await?
        {
            Ok(result) if result.confidence < self.config.min_confidence => {
                result.check_shape()?;
                warn!(
                    stage = "primary",
                    provider = self.primary.name(),
                    confidence = result.confidence,
                    min_confidence = self.config.min_confidence,
                    "Primary confidence too low, trying fallback"
                );
                ProviderError::LowConfidence(result.confidence)
            }
            Ok(mut result) => {
                result.check_shape()?;
                result.source = AssessmentSource::Primary;
                return Ok(self.gate_outcome(result, duration, "primary"));
            }
            Err(e) => {
                warn!(
                    stage = "primary",
                    provider = self.primary.name(),
                    error = %e,
                    "Primary assessment failed, trying fallback"
                );
                e
            }
        };

        // Stage 2: fallback transcription
        debug!(stage = "fallback", provider = self.secondary.name(), "Calling fallback provider");
        let fallback_call = self.secondary.transcribe(audio);
        let transcript = match self
            .bounded(self.secondary.name(), self.config.fallback_timeout, cancel, fallback_call)
            .await?
        {
            Ok(t) if !t.text.trim().is_empty() => t,
            Ok(_) => {
                let reason = if primary_error.is_recognition_failure() {
                    RetryReason::NotUnderstood
                } else {
                    RetryReason::ProviderError
                };
                info!(stage = "fallback", reason = reason.as_str(), "Fallback returned no text");
                return Ok(AssessmentOutcome::Retry(RetrySignal::new(reason)));
            }
            Err(e) => {
                warn!(
                    stage = "fallback",
                    provider = self.secondary.name(),
                    error = %e,
                    "Fallback transcription failed"
                );
                if primary_error.is_recognition_failure() {
                    // Primary was reachable and heard nothing usable
                    info!(stage = "fallback", reason = "not-understood", "Submission needs retry");
                    return Ok(AssessmentOutcome::Retry(RetrySignal::new(RetryReason::NotUnderstood)));
                }
                return Ok(self.degraded(None));
            }
        };

        if !self.config.hybrid_enabled {
            let result = transcript_result(&transcript, AssessmentSource::TranscriptionFallback);
            return Ok(self.gate_outcome(result, duration, "transcription"));
        }

        // Stage 3: hybrid re-check against the transcript
        debug!(
            stage = "hybrid",
            provider = self.primary.name(),
            reference_chars = transcript.text.chars().count(),
            "Re-running primary with transcript as reference"
        );
        let hybrid_call = self.primary.assess(audio, Some(transcript.text.as_str()));
        match self
            .bounded(self.primary.name(), self.config.hybrid_timeout, cancel, hybrid_call)
            .await?
        {
            Ok(mut result) => {
                result.check_shape()?;
                result.source = AssessmentSource::Hybrid;
                Ok(self.gate_outcome(result, duration, "hybrid"))
            }
            Err(e) if e.is_recognition_failure() => {
                info!(stage = "hybrid", reason = "not-understood", error = %e, "Submission needs retry");
                Ok(AssessmentOutcome::Retry(RetrySignal::new(RetryReason::NotUnderstood)))
            }
            Err(e) => {
                warn!(
                    stage = "hybrid",
                    provider = self.primary.name(),
                    error = %e,
                    "Hybrid assessment failed"
                );
                Ok(self.degraded(Some(&transcript)))
            }
        }
    }

    /// Await a provider call under a time budget, aborting on cancellation
    async fn bounded<T, F>(
        &self,
        provider: &'static str,
        budget: Duration,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<Result<T, ProviderError>, AssessmentError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(provider, "Assessment cancelled by caller");
                Err(AssessmentError::Cancelled)
            }
            outcome = tokio::time::timeout(budget, call) => Ok(outcome.unwrap_or(Err(ProviderError::Timeout {
                provider,
                after_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            }))),
        }
    }

    fn gate_outcome(&self, result: AssessmentResult, duration: f64, stage: &'static str) -> AssessmentOutcome {
        match self.gate.evaluate(&result, duration) {
            Some(signal) => {
                // Input quality, not a failure
                info!(stage, reason = signal.reason.as_str(), "Submission needs retry");
                AssessmentOutcome::Retry(signal)
            }
            None => {
                info!(
                    stage,
                    source = result.source.as_str(),
                    accuracy = result.accuracy_score,
                    pronunciation = result.pronunciation_score,
                    "Assessment accepted"
                );
                AssessmentOutcome::Accepted(result)
            }
        }
    }

    fn degraded(&self, transcript: Option<&Transcription>) -> AssessmentOutcome {
        let result = degraded_result(transcript);
        warn!(
            source = result.source.as_str(),
            has_transcript = transcript.is_some(),
            "All providers failed, accepting degraded result"
        );
        AssessmentOutcome::Degraded(result)
    }
}
