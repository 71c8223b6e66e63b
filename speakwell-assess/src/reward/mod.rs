//! Reward Engine
//!
//! Converts an accepted assessment into an XP reward.
//!
//! # Algorithm
//! 1. Band range `[min, max]` (beginner highest, advanced lowest)
//! 2. Factors, each floored/capped:
//!    - accuracy: `max(0.3, accuracy / 100)`
//!    - duration: `min(1.5, seconds / 20)`
//!    - length: `min(1.3, chars / 100)`
//! 3. `base = round(min + (max - min) * accuracy * duration * length)`
//! 4. `+10` when accuracy > 95
//! 5. Streak multiplier `1 + min(1.0, streak_days * 0.10)`, applied to base
//! 6. Achievements (see `achievements`)
//! 7. Variable-ratio bonus: with 15% probability, `round(streak_xp * u)`
//!    for `u` uniform in `[0.05, 0.50)`, paired with a celebratory message
//! 8. `total = round(base * multiplier) + achievement bonuses + variable bonus`
//! 9. Level-up reported only when the level after exceeds the level before
//!
//! # Reward Schedule
//! The variable bonus is an intermittent reinforcement schedule: it pays out
//! on a random subset of accepted attempts. This is intended behavior.
//!
//! All randomness comes from the caller's RNG, drawn in a fixed order:
//! surprise-achievement roll (+ template pick on hit), then variable-bonus
//! roll (+ fraction and message pick on hit). A seeded RNG therefore
//! reproduces the exact same reward.
//!
//! Rounding is half-up everywhere. There is no ceiling beyond the caps above.

pub mod achievements;

pub use achievements::{detect_achievements, Achievement, AchievementKind, Rarity};

use crate::feedback::FeedbackComposer;
use crate::types::{AssessmentResult, RetrySignal, UserLevelBand, UserProgressState};
use achievements::pick_index;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use speakwell_common::config::{RewardSettings, XpRangeSetting};
use speakwell_common::level_for_xp;
use tracing::debug;

const MIN_ACCURACY_FACTOR: f64 = 0.3;
const MAX_DURATION_FACTOR: f64 = 1.5;
const DURATION_FACTOR_SECONDS: f64 = 20.0;
const MAX_LENGTH_FACTOR: f64 = 1.3;
const LENGTH_FACTOR_CHARS: f64 = 100.0;
const NEAR_PERFECT_ACCURACY: f64 = 95.0;
const STREAK_STEP: f64 = 0.10;
const MAX_STREAK_BONUS: f64 = 1.0;
const VARIABLE_BONUS_MIN_FRACTION: f64 = 0.05;
const VARIABLE_BONUS_FRACTION_SPAN: f64 = 0.45;

const CELEBRATION_MESSAGES: [&str; 5] = [
    "Lucky streak! Bonus XP!",
    "Perfect timing! Extra points!",
    "Outstanding effort! Bonus!",
    "Exceptional practice! More XP!",
    "Great momentum! Keep going!",
];

/// XP range for a level band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRange {
    pub min: u64,
    pub max: u64,
}

impl From<XpRangeSetting> for XpRange {
    fn from(setting: XpRangeSetting) -> Self {
        Self {
            min: u64::from(setting.min),
            max: u64::from(setting.max),
        }
    }
}

/// Reward tuning
#[derive(Debug, Clone, PartialEq)]
pub struct RewardConfig {
    pub beginner: XpRange,
    pub intermediate: XpRange,
    pub advanced: XpRange,
    /// Flat bonus when accuracy exceeds 95
    pub near_perfect_bonus: u64,
    pub surprise_achievement_chance: f64,
    pub variable_bonus_chance: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self::from_settings(&RewardSettings::default())
    }
}

impl RewardConfig {
    pub fn from_settings(settings: &RewardSettings) -> Self {
        Self {
            beginner: settings.beginner.into(),
            intermediate: settings.intermediate.into(),
            advanced: settings.advanced.into(),
            near_perfect_bonus: 10,
            surprise_achievement_chance: settings.surprise_achievement_chance,
            variable_bonus_chance: settings.variable_bonus_chance,
        }
    }

    pub fn range(&self, band: UserLevelBand) -> XpRange {
        match band {
            UserLevelBand::Beginner => self.beginner,
            UserLevelBand::Intermediate => self.intermediate,
            UserLevelBand::Advanced => self.advanced,
        }
    }
}

/// Variable-ratio bonus paid on top of the regular reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurpriseBonus {
    pub amount: u64,
    pub message: String,
}

/// Level transition caused by a reward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
}

/// Reward for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardResult {
    /// Band-scaled XP including the near-perfect bonus, before the streak multiplier
    pub base_xp: u64,
    /// Streak multiplier applied to `base_xp` (1.0-2.0)
    pub streak_multiplier: f64,
    /// `round(base_xp * streak_multiplier)`
    pub streak_xp: u64,
    /// Achievement bonuses plus the variable bonus
    pub bonus_xp: u64,
    pub total_xp: u64,
    pub achievements: Vec<Achievement>,
    pub surprise_bonus: Option<SurpriseBonus>,
    pub level_up: Option<LevelUp>,
    pub feedback: String,
    pub should_retry: bool,
    pub retry_reason: Option<crate::types::RetryReason>,
}

impl RewardResult {
    /// Zero reward for a retry terminal state
    pub fn retry(signal: &RetrySignal) -> Self {
        Self {
            base_xp: 0,
            streak_multiplier: 1.0,
            streak_xp: 0,
            bonus_xp: 0,
            total_xp: 0,
            achievements: Vec::new(),
            surprise_bonus: None,
            level_up: None,
            feedback: signal.guidance.clone(),
            should_retry: true,
            retry_reason: Some(signal.reason),
        }
    }
}

/// `1 + min(1.0, streak_days * 0.10)`, always within 1.0-2.0
pub fn streak_multiplier(streak_days: u32) -> f64 {
    1.0 + (f64::from(streak_days) * STREAK_STEP).min(MAX_STREAK_BONUS)
}

/// Round half up; negatives clamp to zero
fn round_half_up(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value + 0.5).floor() as u64
}

/// Reward Engine
#[derive(Debug, Clone, Default)]
pub struct RewardEngine {
    config: RewardConfig,
    composer: FeedbackComposer,
}

impl RewardEngine {
    pub fn new(config: RewardConfig, composer: FeedbackComposer) -> Self {
        Self { config, composer }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Compute the reward for an accepted result, timestamped now
    pub fn compute<R: Rng + ?Sized>(
        &self,
        result: &AssessmentResult,
        duration_seconds: f64,
        band: UserLevelBand,
        progress: UserProgressState,
        rng: &mut R,
    ) -> RewardResult {
        self.compute_at(result, duration_seconds, band, progress, rng, Utc::now())
    }

    /// Compute the reward with an explicit achievement timestamp
    pub fn compute_at<R: Rng + ?Sized>(
        &self,
        result: &AssessmentResult,
        duration_seconds: f64,
        band: UserLevelBand,
        progress: UserProgressState,
        rng: &mut R,
        earned_at: DateTime<Utc>,
    ) -> RewardResult {
        let base_xp = self.base_xp(result, duration_seconds, band);
        let multiplier = streak_multiplier(progress.streak_days);
        let streak_xp = round_half_up(base_xp as f64 * multiplier);

        let achievements = detect_achievements(
            result,
            duration_seconds,
            progress.streak_days,
            self.config.surprise_achievement_chance,
            rng,
            earned_at,
        );
        let surprise_bonus = self.roll_variable_bonus(streak_xp, rng);

        let achievement_xp: u64 = achievements.iter().map(|a| a.xp_bonus).sum();
        let bonus_xp = achievement_xp + surprise_bonus.as_ref().map_or(0, |b| b.amount);
        let total_xp = streak_xp + bonus_xp;

        let old_level = level_for_xp(progress.total_xp);
        let new_level = level_for_xp(progress.total_xp.saturating_add(total_xp));
        let level_up = (new_level > old_level).then_some(LevelUp {
            old_level,
            new_level,
        });

        let feedback = self
            .composer
            .compose_reward(result, &achievements, surprise_bonus.as_ref(), band);

        debug!(
            band = band.as_str(),
            base_xp,
            streak_multiplier = multiplier,
            bonus_xp,
            total_xp,
            achievements = achievements.len(),
            surprise = surprise_bonus.is_some(),
            level_up = ?level_up,
            "Reward computed"
        );

        RewardResult {
            base_xp,
            streak_multiplier: multiplier,
            streak_xp,
            bonus_xp,
            total_xp,
            achievements,
            surprise_bonus,
            level_up,
            feedback,
            should_retry: false,
            retry_reason: None,
        }
    }

    /// Band-scaled XP plus the near-perfect bonus
    pub fn base_xp(&self, result: &AssessmentResult, duration_seconds: f64, band: UserLevelBand) -> u64 {
        let range = self.config.range(band);
        let accuracy_factor = (result.accuracy_score / 100.0).max(MIN_ACCURACY_FACTOR);
        let duration_factor = (duration_seconds.max(0.0) / DURATION_FACTOR_SECONDS).min(MAX_DURATION_FACTOR);
        let length_factor = (result.text_len() as f64 / LENGTH_FACTOR_CHARS).min(MAX_LENGTH_FACTOR);

        let span = range.max.saturating_sub(range.min) as f64;
        let mut base = round_half_up(
            range.min as f64 + span * accuracy_factor * duration_factor * length_factor,
        );
        // round_half_up floors non-finite input at zero; the band minimum still applies
        base = base.max(range.min);

        if result.accuracy_score > NEAR_PERFECT_ACCURACY {
            base += self.config.near_perfect_bonus;
        }
        base
    }

    fn roll_variable_bonus<R: Rng + ?Sized>(&self, streak_xp: u64, rng: &mut R) -> Option<SurpriseBonus> {
        if rng.gen::<f64>() >= self.config.variable_bonus_chance {
            return None;
        }
        let fraction = VARIABLE_BONUS_MIN_FRACTION + rng.gen::<f64>() * VARIABLE_BONUS_FRACTION_SPAN;
        let message = CELEBRATION_MESSAGES[pick_index(rng, CELEBRATION_MESSAGES.len())];
        Some(SurpriseBonus {
            amount: round_half_up(streak_xp as f64 * fraction),
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_rng {
    use rand::{Error, RngCore};
    use std::collections::VecDeque;

    /// Value returned once the script is exhausted; above every default chance
    const EXHAUSTED: f64 = 0.999;

    /// RNG replaying chosen uniform `f64` draws
    ///
    /// Each `next_u64` encodes the next scripted value so that
    /// `rng.gen::<f64>()` yields it back (to 2^-53 precision).
    pub struct ScriptedRng {
        values: VecDeque<f64>,
    }

    impl ScriptedRng {
        pub fn new(values: &[f64]) -> Self {
            Self {
                values: values.iter().copied().collect(),
            }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            let value = self.values.pop_front().unwrap_or(EXHAUSTED).clamp(0.0, 1.0 - f64::EPSILON);
            ((value * (1u64 << 53) as f64) as u64) << 11
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }
}
