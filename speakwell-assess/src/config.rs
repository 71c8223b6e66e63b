//! Provider credential resolution for speakwell-assess
//!
//! Secrets resolve ENV → TOML. Environment variables win so a deployment can
//! override a checked-in config file without editing it.

use speakwell_common::config::ProviderSettings;
use speakwell_common::{Error, Result};
use tracing::{info, warn};

pub const SPEECH_KEY_ENV: &str = "SPEAKWELL_SPEECH_KEY";
pub const SPEECH_REGION_ENV: &str = "SPEAKWELL_SPEECH_REGION";
pub const TRANSCRIPTION_KEY_ENV: &str = "SPEAKWELL_TRANSCRIPTION_API_KEY";

/// Resolved credentials for the speech assessment service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCredentials {
    pub region: String,
    pub subscription_key: String,
}

/// Validate a secret (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one secret from ENV, then TOML
fn resolve_secret(label: &str, env_var: &str, toml_value: Option<&String>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in multiple sources: environment, TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Some(value);
    }

    toml_value.map(|value| {
        info!("{} loaded from TOML config", label);
        value.clone()
    })
}

/// Resolve speech assessment credentials
pub fn resolve_speech_credentials(settings: &ProviderSettings) -> Result<SpeechCredentials> {
    let subscription_key = resolve_secret(
        "Speech subscription key",
        SPEECH_KEY_ENV,
        settings.speech_key.as_ref(),
    );
    let region = resolve_secret(
        "Speech region",
        SPEECH_REGION_ENV,
        settings.speech_region.as_ref(),
    );

    match (subscription_key, region) {
        (Some(subscription_key), Some(region)) => Ok(SpeechCredentials {
            region,
            subscription_key,
        }),
        (key, _) => Err(Error::Config(format!(
            "Speech assessment {} not configured. Configure using one of:\n\
             1. Environment: {}=... and {}=...\n\
             2. TOML config: [providers] speech_key = \"...\", speech_region = \"...\"",
            if key.is_none() { "subscription key" } else { "region" },
            SPEECH_KEY_ENV,
            SPEECH_REGION_ENV
        ))),
    }
}

/// Resolve the transcription service API key
pub fn resolve_transcription_api_key(settings: &ProviderSettings) -> Result<String> {
    resolve_secret(
        "Transcription API key",
        TRANSCRIPTION_KEY_ENV,
        settings.transcription_api_key.as_ref(),
    )
    .ok_or_else(|| {
        Error::Config(format!(
            "Transcription API key not configured. Configure using one of:\n\
             1. Environment: {}=...\n\
             2. TOML config: [providers] transcription_api_key = \"...\"",
            TRANSCRIPTION_KEY_ENV
        ))
    })
}
