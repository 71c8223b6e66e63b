//! Configuration loading and config-file resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `SPEAKWELL_CONFIG` environment variable
//! 3. `~/.config/speakwell/speakwell.toml` (if present)
//! 4. Compiled defaults (fallback)
//!
//! Every section has a `Default` impl so a partial TOML file only overrides
//! the keys it names.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SPEAKWELL_CONFIG";

/// Root TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub providers: ProviderSettings,
    pub orchestrator: OrchestratorSettings,
    pub gate: GateSettings,
    pub reward: RewardSettings,
    pub feedback: FeedbackSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Assessment and transcription provider settings
///
/// Secrets may also come from the environment; see `speakwell-assess` config resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Speech service region (e.g. "westeurope")
    pub speech_region: Option<String>,
    /// Speech service subscription key
    pub speech_key: Option<String>,
    /// Override for the speech recognition endpoint (tests, proxies)
    pub speech_endpoint: Option<String>,
    /// Recognition language
    pub language: String,
    /// Transcription API key
    pub transcription_api_key: Option<String>,
    /// Transcription endpoint
    pub transcription_endpoint: String,
    /// Transcription model name
    pub transcription_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            speech_region: None,
            speech_key: None,
            speech_endpoint: None,
            language: "en-US".to_string(),
            transcription_api_key: None,
            transcription_endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            transcription_model: "whisper-1".to_string(),
        }
    }
}

/// Orchestrator timeouts and path switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    pub primary_timeout_ms: u64,
    pub fallback_timeout_ms: u64,
    pub hybrid_timeout_ms: u64,
    /// Re-run the primary provider against the fallback transcript
    pub hybrid_enabled: bool,
    /// Primary results below this confidence go to the fallback provider
    pub min_confidence: f64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            primary_timeout_ms: 12_000,
            fallback_timeout_ms: 8_000,
            hybrid_timeout_ms: 12_000,
            hybrid_enabled: true,
            min_confidence: 0.3,
        }
    }
}

/// Audio quality gate thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub min_text_chars: usize,
    pub min_duration_seconds: f64,
    /// Poor quality needs both scores below their limits
    pub poor_pronunciation_below: f64,
    pub poor_accuracy_below: f64,
    pub max_gibberish_ratio: f64,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            min_text_chars: 3,
            min_duration_seconds: 2.0,
            poor_pronunciation_below: 15.0,
            poor_accuracy_below: 20.0,
            max_gibberish_ratio: 0.3,
        }
    }
}

/// XP range for one level band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpRangeSetting {
    pub min: u32,
    pub max: u32,
}

/// Reward tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSettings {
    pub beginner: XpRangeSetting,
    pub intermediate: XpRangeSetting,
    pub advanced: XpRangeSetting,
    /// Chance of a surprise achievement per accepted submission
    pub surprise_achievement_chance: f64,
    /// Chance of a variable-ratio bonus per accepted submission
    pub variable_bonus_chance: f64,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            beginner: XpRangeSetting { min: 8, max: 25 },
            intermediate: XpRangeSetting { min: 5, max: 20 },
            advanced: XpRangeSetting { min: 3, max: 15 },
            surprise_achievement_chance: 0.01,
            variable_bonus_chance: 0.15,
        }
    }
}

/// Secondary languages with beginner guidance templates
pub const SUPPORTED_SECONDARY_LANGUAGES: &[&str] = &["pt"];

/// Feedback text settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// Mix the secondary language into beginner retry guidance
    pub bilingual_beginner: bool,
    /// Secondary language tag, one of `SUPPORTED_SECONDARY_LANGUAGES`
    pub secondary_language: String,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            bilingual_beginner: true,
            secondary_language: "pt".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (band, range) in [
            ("beginner", self.reward.beginner),
            ("intermediate", self.reward.intermediate),
            ("advanced", self.reward.advanced),
        ] {
            // Accepted submissions must always earn something
            if range.min == 0 {
                return Err(Error::Config(format!("reward.{} range min must be at least 1", band)));
            }
            if range.min > range.max {
                return Err(Error::Config(format!(
                    "reward.{} range has min {} > max {}",
                    band, range.min, range.max
                )));
            }
        }

        for (name, chance) in [
            ("surprise_achievement_chance", self.reward.surprise_achievement_chance),
            ("variable_bonus_chance", self.reward.variable_bonus_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(Error::Config(format!(
                    "reward.{} must be within 0.0-1.0, got {}",
                    name, chance
                )));
            }
        }

        let orch = &self.orchestrator;
        if orch.primary_timeout_ms == 0 || orch.fallback_timeout_ms == 0 || orch.hybrid_timeout_ms == 0 {
            return Err(Error::Config(
                "orchestrator timeouts must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&orch.min_confidence) {
            return Err(Error::Config(format!(
                "orchestrator.min_confidence must be within 0.0-1.0, got {}",
                orch.min_confidence
            )));
        }

        let gate = &self.gate;
        if !(0.0..=1.0).contains(&gate.max_gibberish_ratio) {
            return Err(Error::Config(format!(
                "gate.max_gibberish_ratio must be within 0.0-1.0, got {}",
                gate.max_gibberish_ratio
            )));
        }
        if !gate.min_duration_seconds.is_finite() || gate.min_duration_seconds < 0.0 {
            return Err(Error::Config(format!(
                "gate.min_duration_seconds must be a non-negative number, got {}",
                gate.min_duration_seconds
            )));
        }

        let feedback = &self.feedback;
        if feedback.bilingual_beginner
            && !SUPPORTED_SECONDARY_LANGUAGES.contains(&feedback.secondary_language.as_str())
        {
            return Err(Error::Config(format!(
                "feedback.secondary_language \"{}\" has no guidance templates (supported: {})",
                feedback.secondary_language,
                SUPPORTED_SECONDARY_LANGUAGES.join(", ")
            )));
        }

        Ok(())
    }
}

/// Default per-user config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("speakwell").join("speakwell.toml"))
}

/// Resolve which config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file, only when it exists
    default_config_path().filter(|p| p.exists())
}

/// Load configuration following the resolution order
///
/// An explicitly named file (CLI or ENV) must exist; the implicit per-user
/// file is optional and defaults apply when it is absent.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Read config {} failed: {}", path.display(), e))
            })?;
            TomlConfig::from_toml_str(&content)
        }
        None => {
            debug!("No configuration file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}
