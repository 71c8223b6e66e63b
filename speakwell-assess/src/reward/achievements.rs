//! Achievement detection
//!
//! Every rule is evaluated once against the same result, duration and streak;
//! rules are independent so evaluation order does not change the set earned.
//! Achievements are immutable records, created when their trigger is detected.

use crate::types::AssessmentResult;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const PERFECT_PRACTICE_ACCURACY: f64 = 95.0;
const ELOQUENT_MIN_CHARS: usize = 100;
const MARATHON_MIN_SECONDS: f64 = 30.0;
const GRAMMAR_MASTER_PRONUNCIATION: f64 = 90.0;
const STREAK_MILESTONE_EVERY: u32 = 5;
const EPIC_STREAK_DAYS: u32 = 20;

/// Achievement rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Achievement category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementKind {
    PerfectPractice,
    LongSentence,
    Marathon,
    GrammarMaster,
    StreakMilestone,
    LuckyStar,
    GoldenHour,
}

impl AchievementKind {
    pub fn slug(&self) -> &'static str {
        match self {
            AchievementKind::PerfectPractice => "perfect-practice",
            AchievementKind::LongSentence => "long-sentence",
            AchievementKind::Marathon => "marathon",
            AchievementKind::GrammarMaster => "grammar-master",
            AchievementKind::StreakMilestone => "streak-milestone",
            AchievementKind::LuckyStar => "lucky-star",
            AchievementKind::GoldenHour => "golden-hour",
        }
    }
}

/// Achievement earned by a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub xp_bonus: u64,
    pub rarity: Rarity,
    pub earned_at: DateTime<Utc>,
}

impl Achievement {
    fn timestamped(
        kind: AchievementKind,
        title: &str,
        description: &str,
        icon: &str,
        xp_bonus: u64,
        rarity: Rarity,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}-{}", kind.slug(), earned_at.timestamp_millis()),
            kind,
            title: title.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            xp_bonus,
            rarity,
            earned_at,
        }
    }
}

/// Surprise achievement template
struct SurpriseTemplate {
    kind: AchievementKind,
    title: &'static str,
    description: &'static str,
    icon: &'static str,
    xp_bonus: u64,
    rarity: Rarity,
}

const SURPRISE_ACHIEVEMENTS: [SurpriseTemplate; 2] = [
    SurpriseTemplate {
        kind: AchievementKind::LuckyStar,
        title: "Lucky Star!",
        description: "Fortune smiles upon you",
        icon: "star",
        xp_bonus: 20,
        rarity: Rarity::Legendary,
    },
    SurpriseTemplate {
        kind: AchievementKind::GoldenHour,
        title: "Golden Hour",
        description: "Perfect timing bonus",
        icon: "sunrise",
        xp_bonus: 15,
        rarity: Rarity::Epic,
    },
];

/// Detect the achievements a submission earns
///
/// Deterministic rules first, then the surprise roll. The surprise roll draws
/// one uniform value, plus a second to pick the template when it hits.
pub fn detect_achievements<R: Rng + ?Sized>(
    result: &AssessmentResult,
    duration_seconds: f64,
    streak_days: u32,
    surprise_chance: f64,
    rng: &mut R,
    earned_at: DateTime<Utc>,
) -> Vec<Achievement> {
    let mut achievements = Vec::new();

    if result.accuracy_score > PERFECT_PRACTICE_ACCURACY {
        achievements.push(Achievement::timestamped(
            AchievementKind::PerfectPractice,
            "Perfect Practice!",
            "Achieved 95%+ accuracy",
            "target",
            10,
            Rarity::Rare,
            earned_at,
        ));
    }

    if result.text_len() > ELOQUENT_MIN_CHARS {
        achievements.push(Achievement::timestamped(
            AchievementKind::LongSentence,
            "Eloquent Speaker",
            "Spoke a long, detailed sentence",
            "memo",
            5,
            Rarity::Common,
            earned_at,
        ));
    }

    if duration_seconds > MARATHON_MIN_SECONDS {
        achievements.push(Achievement::timestamped(
            AchievementKind::Marathon,
            "Marathon Speaker",
            "Spoke for over 30 seconds",
            "zap",
            8,
            Rarity::Common,
            earned_at,
        ));
    }

    if result.pronunciation_score > GRAMMAR_MASTER_PRONUNCIATION {
        achievements.push(Achievement::timestamped(
            AchievementKind::GrammarMaster,
            "Grammar Master",
            "Excellent pronunciation score",
            "books",
            12,
            Rarity::Rare,
            earned_at,
        ));
    }

    if streak_days > 0 && streak_days % STREAK_MILESTONE_EVERY == 0 {
        let rarity = if streak_days >= EPIC_STREAK_DAYS {
            Rarity::Epic
        } else {
            Rarity::Rare
        };
        achievements.push(Achievement {
            // One milestone per streak length, regardless of when it was hit
            id: format!("{}-{}", AchievementKind::StreakMilestone.slug(), streak_days),
            kind: AchievementKind::StreakMilestone,
            title: format!("{}-Day Streak!", streak_days),
            description: format!("Practiced for {} consecutive days", streak_days),
            icon: "fire".to_string(),
            xp_bonus: u64::from(streak_days),
            rarity,
            earned_at,
        });
    }

    if rng.gen::<f64>() < surprise_chance {
        let template = &SURPRISE_ACHIEVEMENTS[pick_index(rng, SURPRISE_ACHIEVEMENTS.len())];
        achievements.push(Achievement::timestamped(
            template.kind,
            template.title,
            template.description,
            template.icon,
            template.xp_bonus,
            template.rarity,
            earned_at,
        ));
    }

    achievements
}

/// Uniform index in `0..len` from a single float draw
///
/// Float scaling keeps every random decision on `gen::<f64>()`, so a scripted
/// RNG can steer each branch by supplying one value per draw.
pub(crate) fn pick_index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    let index = (rng.gen::<f64>() * len as f64) as usize;
    index.min(len.saturating_sub(1))
}
