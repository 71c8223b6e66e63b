//! Speech assessment REST client
//!
//! Primary provider. Posts the raw clip to a region-scoped speech recognition
//! endpoint with a `Pronunciation-Assessment` header (base64 JSON) and parses
//! the detailed `NBest[0]` response into an `AssessmentResult`.

use crate::feedback::assessment_tips;
use crate::types::{
    AssessmentProvider, AssessmentResult, AssessmentSource, AudioClip, PhonemeCandidate,
    PhonemeResult, ProviderError, SyllableScore, WordErrorKind, WordResult,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("speakwell/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const N_BEST_PHONEME_COUNT: u32 = 5;
const SUCCESS_STATUS: &str = "Success";

/// Region-scoped recognition endpoint
pub fn region_endpoint(region: &str) -> String {
    format!(
        "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
        region
    )
}

/// Upload content type for a declared MIME type
pub fn content_type_for(mime_type: &str) -> &'static str {
    let mime = mime_type.to_ascii_lowercase();
    if mime.contains("webm") {
        "audio/webm; codecs=opus"
    } else if mime.contains("mp4") {
        "audio/mp4"
    } else if mime.contains("ogg") {
        "audio/ogg; codecs=opus"
    } else {
        "audio/wav"
    }
}

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AssessmentParams<'a> {
    reference_text: &'a str,
    grading_system: &'static str,
    granularity: &'static str,
    dimension: &'static str,
    phoneme_alphabet: &'static str,
    #[serde(rename = "NBestPhonemeCount")]
    n_best_phoneme_count: u32,
    enable_miscue: bool,
    enable_prosody_assessment: bool,
}

/// Base64 JSON value for the `Pronunciation-Assessment` header
fn assessment_header(reference_text: Option<&str>) -> Result<String, ProviderError> {
    let params = AssessmentParams {
        reference_text: reference_text.unwrap_or(""),
        grading_system: "HundredMark",
        granularity: "Phoneme",
        dimension: "Comprehensive",
        phoneme_alphabet: "IPA",
        n_best_phoneme_count: N_BEST_PHONEME_COUNT,
        // Miscue detection needs something to compare against
        enable_miscue: reference_text.is_some(),
        enable_prosody_assessment: true,
    };
    let json = serde_json::to_vec(&params)
        .map_err(|e| ProviderError::MalformedResponse(format!("encode assessment params: {}", e)))?;
    Ok(BASE64.encode(json))
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: Option<String>,
    #[serde(default, rename = "NBest")]
    n_best: Vec<NBestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NBestEntry {
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    lexical: String,
    #[serde(default)]
    display: String,
    #[serde(default)]
    pronunciation_assessment: Option<OverallScores>,
    #[serde(default)]
    words: Vec<WordEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OverallScores {
    accuracy_score: f64,
    fluency_score: f64,
    completeness_score: f64,
    pron_score: f64,
    #[serde(default)]
    prosody_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UnitScores {
    #[serde(default)]
    accuracy_score: f64,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default, rename = "NBestPhonemes")]
    n_best_phonemes: Vec<CandidateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WordEntry {
    word: String,
    #[serde(default)]
    pronunciation_assessment: UnitScores,
    #[serde(default)]
    syllables: Vec<SyllableEntry>,
    #[serde(default)]
    phonemes: Vec<PhonemeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SyllableEntry {
    syllable: String,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    pronunciation_assessment: UnitScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PhonemeEntry {
    phoneme: String,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    pronunciation_assessment: UnitScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CandidateEntry {
    phoneme: String,
    score: f64,
}

/// Parse a detailed recognition response body
pub(crate) fn parse_response(body: &str) -> Result<AssessmentResult, ProviderError> {
    let response: RecognitionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    if response.recognition_status != SUCCESS_STATUS {
        return Err(ProviderError::NotRecognized(response.recognition_status));
    }

    let best = response
        .n_best
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("NBest is empty".to_string()))?;

    let text = [response.display_text.as_deref(), Some(best.display.as_str()), Some(best.lexical.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::NotRecognized("empty transcript".to_string()))?;

    let scores = best
        .pronunciation_assessment
        .ok_or_else(|| ProviderError::MalformedResponse("missing pronunciation scores".to_string()))?;

    let mut words = Vec::with_capacity(best.words.len());
    let mut phonemes = Vec::new();
    for entry in best.words {
        phonemes.extend(entry.phonemes.into_iter().map(|p| PhonemeResult {
            phoneme: p.phoneme,
            accuracy_score: p.pronunciation_assessment.accuracy_score,
            candidates: p
                .pronunciation_assessment
                .n_best_phonemes
                .into_iter()
                .map(|c| PhonemeCandidate {
                    phoneme: c.phoneme,
                    score: c.score,
                })
                .collect(),
            offset: p.offset,
            duration: p.duration,
        }));

        words.push(WordResult {
            word: entry.word,
            accuracy_score: entry.pronunciation_assessment.accuracy_score,
            error: entry
                .pronunciation_assessment
                .error_type
                .as_deref()
                .and_then(WordErrorKind::from_label),
            syllables: entry
                .syllables
                .into_iter()
                .map(|s| SyllableScore {
                    syllable: s.syllable,
                    accuracy_score: s.pronunciation_assessment.accuracy_score,
                    offset: s.offset,
                    duration: s.duration,
                })
                .collect(),
        });
    }

    // Prosody of 0 means "not assessed" on this service
    let prosody_score = scores.prosody_score.filter(|p| *p > 0.0);
    let confidence = best
        .confidence
        .unwrap_or(scores.pron_score / 100.0)
        .clamp(0.0, 1.0);

    let feedback = assessment_tips(
        scores.pron_score,
        scores.accuracy_score,
        scores.fluency_score,
        prosody_score,
        &words,
    );

    Ok(AssessmentResult {
        text,
        accuracy_score: scores.accuracy_score,
        fluency_score: scores.fluency_score,
        completeness_score: scores.completeness_score,
        pronunciation_score: scores.pron_score,
        prosody_score,
        words,
        phonemes,
        feedback,
        confidence,
        source: AssessmentSource::Primary,
    })
}

// ============================================================================
// Client
// ============================================================================

/// Speech assessment REST client
pub struct SpeechAssessmentClient {
    http_client: reqwest::Client,
    endpoint: String,
    subscription_key: Option<String>,
    language: String,
}

impl SpeechAssessmentClient {
    /// Create client; without a subscription key every call reports `NotConfigured`
    pub fn new(
        endpoint: String,
        subscription_key: Option<String>,
        language: String,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            subscription_key,
            language,
        })
    }

    /// Create client for a service region
    pub fn for_region(
        region: &str,
        subscription_key: Option<String>,
        language: String,
    ) -> Result<Self, ProviderError> {
        Self::new(region_endpoint(region), subscription_key, language)
    }
}

#[async_trait::async_trait]
impl AssessmentProvider for SpeechAssessmentClient {
    fn name(&self) -> &'static str {
        "speech-assessment"
    }

    async fn assess(
        &self,
        audio: &AudioClip,
        reference_text: Option<&str>,
    ) -> Result<AssessmentResult, ProviderError> {
        let key = self
            .subscription_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("speech subscription key".to_string()))?;

        let content_type = content_type_for(&audio.mime_type);
        tracing::debug!(
            bytes = audio.bytes.len(),
            content_type,
            has_reference = reference_text.is_some(),
            "Calling speech assessment API"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("language", self.language.as_str()), ("format", "detailed")])
            .header("Ocp-Apim-Subscription-Key", key)
            .header("Pronunciation-Assessment", assessment_header(reference_text)?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::ACCEPT, "application/json")
            .body(audio.bytes.clone())
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
        let result = parse_response(&body)?;

        tracing::info!(
            accuracy = result.accuracy_score,
            pronunciation = result.pronunciation_score,
            words = result.words.len(),
            phonemes = result.phonemes.len(),
            "Speech assessment successful"
        );

        Ok(result)
    }
}
