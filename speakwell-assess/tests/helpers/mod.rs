//! Test Helper Utilities
//!
//! Scripted providers and fixtures shared by the speakwell-assess integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use speakwell_assess::types::{
    AssessmentProvider, AssessmentResult, AssessmentSource, AudioClip, ProviderError,
    Transcription, TranscriptionProvider,
};
use speakwell_assess::{build_coach, build_router, AppState};
use speakwell_common::config::TomlConfig;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Well-formed primary result
pub fn assessment(text: &str, accuracy: f64, pronunciation: f64) -> AssessmentResult {
    AssessmentResult {
        text: text.to_string(),
        accuracy_score: accuracy,
        fluency_score: 85.0,
        completeness_score: 95.0,
        pronunciation_score: pronunciation,
        prosody_score: Some(80.0),
        words: Vec::new(),
        phonemes: Vec::new(),
        feedback: Vec::new(),
        confidence: 0.9,
        source: AssessmentSource::Primary,
    }
}

pub fn transcription(text: &str) -> Transcription {
    Transcription {
        text: text.to_string(),
        confidence: 0.8,
    }
}

pub fn clip(duration_seconds: f64) -> AudioClip {
    AudioClip::new(vec![0u8; 256], "audio/webm", duration_seconds)
}

pub fn network_error() -> ProviderError {
    ProviderError::Network("connection refused".to_string())
}

/// Primary provider answering from a script
pub struct ScriptedAssessment {
    script: Mutex<VecDeque<Result<AssessmentResult, ProviderError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    references: Mutex<Vec<Option<String>>>,
}

impl ScriptedAssessment {
    pub fn new(script: Vec<Result<AssessmentResult, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            references: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(script: Vec<Result<AssessmentResult, ProviderError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            references: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn references(&self) -> Vec<Option<String>> {
        self.references.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssessmentProvider for ScriptedAssessment {
    fn name(&self) -> &'static str {
        "scripted-assessment"
    }

    async fn assess(
        &self,
        _audio: &AudioClip,
        reference_text: Option<&str>,
    ) -> Result<AssessmentResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.references
            .lock()
            .unwrap()
            .push(reference_text.map(str::to_string));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(network_error()))
    }
}

/// Secondary provider answering from a script
pub struct ScriptedTranscription {
    script: Mutex<VecDeque<Result<Transcription, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedTranscription {
    pub fn new(script: Vec<Result<Transcription, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionProvider for ScriptedTranscription {
    fn name(&self) -> &'static str {
        "scripted-transcription"
    }

    async fn transcribe(&self, _audio: &AudioClip) -> Result<Transcription, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(network_error()))
    }
}

/// Router wired to scripted providers with default configuration
pub fn test_app(
    primary: Arc<ScriptedAssessment>,
    secondary: Arc<ScriptedTranscription>,
) -> (axum::Router, AppState) {
    let coach = build_coach(&TomlConfig::default(), primary, secondary);
    let state = AppState::new(coach);
    (build_router(state.clone()), state)
}
