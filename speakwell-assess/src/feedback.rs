//! Feedback Composer
//!
//! Builds the user-facing message for a submission:
//! - **Reward:** accuracy tier (≥90 / ≥75 / ≥60 / below), a detail clause for
//!   texts over 80 characters, an achievement-count clause, the surprise-bonus
//!   message verbatim, and a band-specific encouragement line.
//! - **Retry:** reason-specific guidance in the learner's register. Beginners
//!   get the secondary language mixed in when bilingual guidance is enabled.
//!
//! Also derives the per-assessment tip lines adapters attach to results.

use crate::reward::{Achievement, SurpriseBonus};
use crate::types::{AssessmentResult, RetryReason, UserLevelBand, WordResult};
use speakwell_common::config::FeedbackSettings;

/// Text length above which the learner is praised for detail
const DETAIL_CLAUSE_MIN_CHARS: usize = 80;

/// Secondary language with shipped templates
const PORTUGUESE: &str = "pt";

/// Standard English retry guidance
pub fn default_retry_guidance(reason: RetryReason) -> &'static str {
    match reason {
        RetryReason::NotUnderstood => {
            "I couldn't understand your audio clearly. Could you please try speaking slower and more clearly?"
        }
        RetryReason::TooShort => {
            "Your audio was too short! Please try speaking for at least 3-4 seconds so I can provide better feedback."
        }
        RetryReason::PoorQuality => {
            "The audio quality seems low. Please make sure you're in a quiet environment and speaking clearly into the microphone."
        }
        RetryReason::Gibberish => {
            "I had trouble recognizing the words. Please try speaking clearly with real English words."
        }
        RetryReason::ProviderError => {
            "Let's try again! Please speak clearly so I can provide you with better feedback."
        }
    }
}

/// Beginner guidance mixing Portuguese and English
fn beginner_guidance_pt(reason: RetryReason) -> &'static str {
    match reason {
        RetryReason::NotUnderstood => {
            "Desculpe, não consegui entender seu áudio. Pode tentar falar mais devagar e claramente? Try speaking slower and clearer!"
        }
        RetryReason::TooShort => {
            "Seu áudio foi muito curto! Try speaking for at least 3-4 seconds so I can help you better!"
        }
        RetryReason::PoorQuality => {
            "O áudio não ficou muito claro. Please check if you're in a quiet place and speak closer to the microphone!"
        }
        RetryReason::Gibberish => {
            "Não consegui reconhecer as palavras. Try speaking real English words slowly and clearly!"
        }
        RetryReason::ProviderError => {
            "Vamos tentar novamente? Please speak clearly so I can help you practice better!"
        }
    }
}

/// Beginner guidance in simple English
fn beginner_guidance_en(reason: RetryReason) -> &'static str {
    match reason {
        RetryReason::NotUnderstood => "Sorry, I couldn't understand you. Try speaking slower and clearer!",
        RetryReason::TooShort => "That was very short! Try speaking for at least 3-4 seconds.",
        RetryReason::PoorQuality => "The audio was not clear. Find a quiet place and speak closer to the microphone!",
        RetryReason::Gibberish => "I couldn't recognize the words. Try real English words, slowly and clearly!",
        RetryReason::ProviderError => "Let's try again! Please speak clearly so I can help you practice.",
    }
}

/// Advanced-band guidance, terser and more technical
fn advanced_guidance(reason: RetryReason) -> &'static str {
    match reason {
        RetryReason::NotUnderstood => {
            "The recognizer couldn't pick up your speech. Please record again with clear articulation."
        }
        RetryReason::TooShort => {
            "That clip was too short to assess. Aim for a full sentence of at least 3-4 seconds."
        }
        RetryReason::PoorQuality => {
            "Signal quality was too low to score reliably. Reduce background noise and move closer to the microphone."
        }
        RetryReason::Gibberish => {
            "The transcript didn't resolve to recognizable English. Please record the sentence again."
        }
        RetryReason::ProviderError => {
            "The assessment service couldn't process this attempt. Please record again."
        }
    }
}

/// Feedback Composer
#[derive(Debug, Clone)]
pub struct FeedbackComposer {
    bilingual_beginner: bool,
    secondary_language: String,
}

impl Default for FeedbackComposer {
    fn default() -> Self {
        Self::from_settings(&FeedbackSettings::default())
    }
}

impl FeedbackComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &FeedbackSettings) -> Self {
        Self {
            bilingual_beginner: settings.bilingual_beginner,
            secondary_language: settings.secondary_language.clone(),
        }
    }

    /// English-only composer
    pub fn monolingual() -> Self {
        Self {
            bilingual_beginner: false,
            secondary_language: String::new(),
        }
    }

    /// Guidance for a retry terminal state; never a reward message
    pub fn compose_retry(&self, reason: RetryReason, band: UserLevelBand) -> String {
        let text = match band {
            UserLevelBand::Beginner if self.bilingual_beginner && self.secondary_language == PORTUGUESE => {
                beginner_guidance_pt(reason)
            }
            UserLevelBand::Beginner => beginner_guidance_en(reason),
            UserLevelBand::Intermediate => default_retry_guidance(reason),
            UserLevelBand::Advanced => advanced_guidance(reason),
        };
        text.to_string()
    }

    /// Message for an accepted submission
    pub fn compose_reward(
        &self,
        result: &AssessmentResult,
        achievements: &[Achievement],
        surprise: Option<&SurpriseBonus>,
        band: UserLevelBand,
    ) -> String {
        let mut feedback = String::from(accuracy_tier_message(result.accuracy_score));

        if result.text_len() > DETAIL_CLAUSE_MIN_CHARS {
            feedback.push_str(" You spoke with great detail!");
        }

        if !achievements.is_empty() {
            let plural = if achievements.len() > 1 { "s" } else { "" };
            feedback.push_str(&format!(
                " You earned {} achievement{}!",
                achievements.len(),
                plural
            ));
        }

        if let Some(bonus) = surprise {
            feedback.push(' ');
            feedback.push_str(&bonus.message);
        }

        feedback.push(' ');
        feedback.push_str(band_encouragement(band));
        feedback
    }
}

fn accuracy_tier_message(accuracy: f64) -> &'static str {
    if accuracy >= 90.0 {
        "Excellent pronunciation! Your English is really improving!"
    } else if accuracy >= 75.0 {
        "Great job! Your pronunciation is getting better!"
    } else if accuracy >= 60.0 {
        "Good effort! Keep practicing to improve your pronunciation!"
    } else {
        "Nice try! Every practice session makes you better!"
    }
}

fn band_encouragement(band: UserLevelBand) -> &'static str {
    match band {
        UserLevelBand::Beginner => "You're making amazing progress as a beginner!",
        UserLevelBand::Intermediate => "Your intermediate skills are really developing!",
        UserLevelBand::Advanced => "Excellent advanced practice!",
    }
}

// ============================================================================
// Assessment tips
// ============================================================================

/// Words scoring below this are called out by name
const PROBLEM_WORD_BELOW: f64 = 60.0;
/// At most this many problem words are listed
const MAX_PROBLEM_WORDS: usize = 3;

/// Detail lines describing an assessment, for `AssessmentResult::feedback`
pub fn assessment_tips(
    pronunciation: f64,
    accuracy: f64,
    fluency: f64,
    prosody: Option<f64>,
    words: &[WordResult],
) -> Vec<String> {
    let mut tips = Vec::new();

    let overall = if pronunciation >= 90.0 {
        "Excellent pronunciation! You sound very natural."
    } else if pronunciation >= 80.0 {
        "Great job! Your pronunciation is very clear."
    } else if pronunciation >= 70.0 {
        "Good pronunciation! Keep practicing to improve further."
    } else if pronunciation >= 60.0 {
        "Your pronunciation is developing well. Keep it up!"
    } else {
        "Focus on clear pronunciation. Try speaking more slowly."
    };
    tips.push(overall.to_string());

    if accuracy < 70.0 {
        tips.push("Work on pronouncing each sound clearly and accurately.".to_string());
    }
    if fluency < 70.0 {
        tips.push("Practice speaking more smoothly with natural rhythm.".to_string());
    }
    if let Some(prosody) = prosody {
        if prosody > 0.0 && prosody < 70.0 {
            tips.push("Work on natural intonation and stress patterns.".to_string());
        }
    }

    let problem_words: Vec<&WordResult> = words
        .iter()
        .filter(|w| w.accuracy_score < PROBLEM_WORD_BELOW)
        .collect();
    // A long list is noise; only call out a handful
    if !problem_words.is_empty() && problem_words.len() <= MAX_PROBLEM_WORDS {
        let list = problem_words
            .iter()
            .map(|w| format!("\"{}\"", w.word))
            .collect::<Vec<_>>()
            .join(", ");
        tips.push(format!("Pay special attention to: {}", list));
    }

    tips
}
