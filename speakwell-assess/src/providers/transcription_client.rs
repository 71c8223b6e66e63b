//! Transcription REST client
//!
//! Secondary provider: multipart upload to an `audio/transcriptions` endpoint
//! requesting `verbose_json`. Recognition only, no scoring.

use crate::types::{AudioClip, ProviderError, Transcription, TranscriptionProvider};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("speakwell/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Confidence reported when the response carries no segment data
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    no_speech_prob: Option<f64>,
}

/// Parse a `verbose_json` transcription body
pub(crate) fn parse_transcription(body: &str) -> Result<Transcription, ProviderError> {
    let response: VerboseTranscription = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let probs: Vec<f64> = response
        .segments
        .iter()
        .filter_map(|s| s.no_speech_prob)
        .filter(|p| p.is_finite())
        .collect();

    let confidence = if probs.is_empty() {
        DEFAULT_CONFIDENCE
    } else {
        let mean = probs.iter().sum::<f64>() / probs.len() as f64;
        (1.0 - mean).clamp(0.0, 1.0)
    };

    Ok(Transcription {
        text: response.text.trim().to_string(),
        confidence,
    })
}

/// File name and MIME type for the multipart upload
fn upload_file_for(mime_type: &str) -> (&'static str, &'static str) {
    let mime = mime_type.to_ascii_lowercase();
    if mime.contains("webm") {
        ("audio.webm", "audio/webm")
    } else if mime.contains("mp4") || mime.contains("m4a") {
        ("audio.mp4", "audio/mp4")
    } else if mime.contains("ogg") {
        ("audio.ogg", "audio/ogg")
    } else if mime.contains("mpeg") || mime.contains("mp3") {
        ("audio.mp3", "audio/mpeg")
    } else {
        ("audio.wav", "audio/wav")
    }
}

/// Two-letter language code from a locale ("en-US" → "en")
fn language_code(locale: &str) -> &str {
    locale.split(|c: char| c == '-' || c == '_').next().unwrap_or(locale)
}

/// Transcription REST client
pub struct TranscriptionClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    language: String,
}

impl TranscriptionClient {
    /// Create client; without an API key every call reports `NotConfigured`
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        model: String,
        locale: &str,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
            model,
            language: language_code(locale).to_string(),
        })
    }
}

#[async_trait::async_trait]
impl TranscriptionProvider for TranscriptionClient {
    fn name(&self) -> &'static str {
        "transcription"
    }

    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcription, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("transcription API key".to_string()))?;

        let (file_name, mime) = upload_file_for(&audio.mime_type);
        let file = Part::bytes(audio.bytes.clone())
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "verbose_json");

        tracing::debug!(bytes = audio.bytes.len(), file_name, "Calling transcription API");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let transcription = parse_transcription(&body)?;

        tracing::info!(
            chars = transcription.text.chars().count(),
            confidence = transcription.confidence,
            "Transcription successful"
        );

        Ok(transcription)
    }
}
