//! End-to-end practice flow tests
//!
//! Drive the orchestrator, reward engine and coach through their public API
//! with scripted providers.

mod helpers;

use chrono::{TimeZone, Utc};
use helpers::{assessment, clip, network_error, transcription, ScriptedAssessment, ScriptedTranscription};
use rand::rngs::mock::StepRng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use speakwell_assess::coach::{PracticeCoach, PracticeSubmission};
use speakwell_assess::feedback::FeedbackComposer;
use speakwell_assess::gate;
use speakwell_assess::orchestrator::{AssessmentOrchestrator, OrchestratorConfig, OutcomeKind};
use speakwell_assess::reward::{AchievementKind, RewardEngine};
use speakwell_assess::types::{
    AssessmentSource, ProviderError, RetryReason, UserLevelBand, UserProgressState,
};
use speakwell_assess::build_coach;
use speakwell_common::config::TomlConfig;
use speakwell_common::level_for_xp;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SENTENCE: &str = "Yesterday I went to the market and bought fresh bread.";

/// RNG whose every uniform draw is just below 1.0: no surprise, no bonus
fn never_lucky() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

/// RNG whose every uniform draw is 0.0: every chance hits
fn always_lucky() -> StepRng {
    StepRng::new(0, 0)
}

fn coach(primary: Arc<ScriptedAssessment>, secondary: Arc<ScriptedTranscription>) -> PracticeCoach {
    PracticeCoach::new(
        AssessmentOrchestrator::new(primary, secondary, OrchestratorConfig::default()),
        RewardEngine::default(),
        FeedbackComposer::new(),
    )
}

fn submission(duration: f64, band: UserLevelBand, total_xp: u64, streak_days: u32) -> PracticeSubmission {
    PracticeSubmission {
        audio: clip(duration),
        reference_text: None,
        band,
        progress: UserProgressState {
            total_xp,
            streak_days,
        },
    }
}

// ============================================================================
// Gate scenarios
// ============================================================================

#[test]
fn test_empty_text_not_understood() {
    let signal = gate::evaluate(&assessment("", 80.0, 80.0), 5.0).unwrap();
    assert_eq!(signal.reason, RetryReason::NotUnderstood);
}

#[test]
fn test_low_scores_poor_quality() {
    let text = "Hello, my name is Ana and I work as a nurse downtown.";
    let signal = gate::evaluate(&assessment(text, 10.0, 12.0), 3.0).unwrap();
    assert_eq!(signal.reason, RetryReason::PoorQuality);
}

// ============================================================================
// Reward scenarios
// ============================================================================

#[test]
fn test_near_perfect_marathon_with_streak() {
    let engine = RewardEngine::default();
    let mut result = assessment(&"x".repeat(110), 96.0, 85.0);
    result.fluency_score = 90.0;
    result.completeness_score = 100.0;
    let progress = UserProgressState {
        total_xp: 0,
        streak_days: 10,
    };

    let reward = engine.compute(&result, 31.0, UserLevelBand::Intermediate, progress, &mut never_lucky());

    // 5 + 15 * 0.96 * 1.5 * 1.1 = 28.76 → 29, plus 10; no ceiling at the band max
    let band = engine.config().intermediate;
    assert!(reward.base_xp >= band.min + 10);
    assert_eq!(reward.base_xp, 39);
    assert_eq!(reward.streak_multiplier, 2.0);
    let kinds: Vec<AchievementKind> = reward.achievements.iter().map(|a| a.kind).collect();
    assert!(kinds.contains(&AchievementKind::PerfectPractice));
    assert!(kinds.contains(&AchievementKind::LongSentence));
    assert!(kinds.contains(&AchievementKind::Marathon));
    assert!(reward.surprise_bonus.is_none());
    assert!(!kinds.contains(&AchievementKind::LuckyStar));
}

#[test]
fn test_always_lucky_rng_hits_every_chance() {
    let engine = RewardEngine::default();
    let result = assessment(SENTENCE, 80.0, 80.0);
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

    let reward = engine.compute_at(
        &result,
        8.0,
        UserLevelBand::Beginner,
        UserProgressState::default(),
        &mut always_lucky(),
        at,
    );

    assert_eq!(reward.achievements.len(), 1);
    assert_eq!(reward.achievements[0].kind, AchievementKind::LuckyStar);
    let bonus = reward.surprise_bonus.as_ref().unwrap();
    // Smallest fraction of the bonus range
    assert_eq!(bonus.amount, ((reward.streak_xp as f64) * 0.05 + 0.5).floor() as u64);
    assert_eq!(reward.total_xp, reward.streak_xp + 20 + bonus.amount);
}

#[test]
fn test_seeded_rewards_reproducible() {
    let engine = RewardEngine::default();
    let result = assessment(SENTENCE, 88.0, 91.0);
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let progress = UserProgressState {
        total_xp: 1_000,
        streak_days: 4,
    };

    let run = |seed: u64| {
        engine.compute_at(
            &result,
            15.0,
            UserLevelBand::Advanced,
            progress,
            &mut ChaCha8Rng::seed_from_u64(seed),
            at,
        )
    };
    for seed in [0, 1, 42, 4242] {
        assert_eq!(run(seed), run(seed));
    }
}

#[test]
fn test_no_level_up_below_threshold() {
    assert_eq!(level_for_xp(1960), 7);
    assert_eq!(level_for_xp(1960 + 50), 7);
}

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test]
async fn test_recognition_failure_recovers_through_hybrid() {
    let primary = ScriptedAssessment::new(vec![
        Err(ProviderError::NotRecognized("NoMatch".to_string())),
        Ok(assessment(SENTENCE, 84.0, 81.0)),
    ]);
    let secondary = ScriptedTranscription::new(vec![Ok(transcription(SENTENCE))]);
    let coach = coach(primary.clone(), secondary.clone());

    let outcome = coach
        .process_with_rng(
            &submission(7.0, UserLevelBand::Intermediate, 0, 0),
            &CancellationToken::new(),
            &mut never_lucky(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.outcome, OutcomeKind::Accepted);
    assert_eq!(
        outcome.assessment.as_ref().map(|a| a.source),
        Some(AssessmentSource::Hybrid)
    );
    assert!(outcome.reward.total_xp > 0);
    assert_eq!(primary.references(), vec![None, Some(SENTENCE.to_string())]);
    assert_eq!(secondary.calls(), 1);
}

#[tokio::test]
async fn test_retry_iff_zero_xp() {
    let cases = vec![
        (ScriptedAssessment::new(vec![Ok(assessment(SENTENCE, 84.0, 81.0))]), 1.5, OutcomeKind::Retry),
        (ScriptedAssessment::new(vec![Ok(assessment("???", 84.0, 81.0))]), 5.0, OutcomeKind::Retry),
        (ScriptedAssessment::new(vec![Ok(assessment(SENTENCE, 84.0, 81.0))]), 5.0, OutcomeKind::Accepted),
        (ScriptedAssessment::new(vec![Err(network_error())]), 5.0, OutcomeKind::Degraded),
    ];

    for (primary, duration, expected) in cases {
        let secondary = ScriptedTranscription::new(vec![Err(network_error())]);
        let coach = coach(primary, secondary);
        let outcome = coach
            .process(
                &submission(duration, UserLevelBand::Beginner, 10, 1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.outcome, expected);
        assert_eq!(outcome.reward.total_xp == 0, expected == OutcomeKind::Retry);
        assert_eq!(outcome.reward.should_retry, expected == OutcomeKind::Retry);
        assert_eq!(outcome.progress.new_total_xp, 10 + outcome.reward.total_xp);
    }
}

#[tokio::test]
async fn test_degraded_is_tagged_distinctly() {
    let primary = ScriptedAssessment::new(vec![Err(network_error()), Err(network_error())]);
    let secondary = ScriptedTranscription::new(vec![Ok(transcription(SENTENCE))]);
    let coach = coach(primary, secondary);

    let outcome = coach
        .process(
            &submission(5.0, UserLevelBand::Advanced, 0, 0),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.outcome, OutcomeKind::Degraded);
    let assessment = outcome.assessment.unwrap();
    assert_eq!(assessment.source, AssessmentSource::DegradedFallback);
    assert_eq!(assessment.text, SENTENCE);
    assert!(assessment.confidence < 0.5);
}

#[tokio::test]
async fn test_cancellation_stops_in_flight_call() {
    let primary = ScriptedAssessment::slow(
        vec![Ok(assessment(SENTENCE, 84.0, 81.0))],
        Duration::from_secs(5),
    );
    let secondary = ScriptedTranscription::new(vec![]);
    let coach = coach(primary.clone(), secondary.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        trigger.cancel();
    });

    let err = coach
        .process(&submission(5.0, UserLevelBand::Advanced, 0, 0), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, speakwell_assess::types::AssessmentError::Cancelled));
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 0);
}

// ============================================================================
// Configured pipeline
// ============================================================================

#[tokio::test]
async fn test_gate_section_tightens_duration() {
    let config = TomlConfig::from_toml_str("[gate]\nmin_duration_seconds = 3.5\n").unwrap();
    let primary = ScriptedAssessment::new(vec![Ok(assessment(SENTENCE, 84.0, 81.0))]);
    let secondary = ScriptedTranscription::new(vec![]);
    let coach = build_coach(&config, primary, secondary.clone());

    let outcome = coach
        .process_with_rng(
            &submission(3.0, UserLevelBand::Intermediate, 0, 0),
            &CancellationToken::new(),
            &mut never_lucky(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.outcome, OutcomeKind::Retry);
    assert_eq!(outcome.retry.map(|r| r.reason), Some(RetryReason::TooShort));
    assert_eq!(outcome.reward.total_xp, 0);
    assert_eq!(secondary.calls(), 0);
}

#[tokio::test]
async fn test_low_confidence_primary_rechecked_against_transcript() {
    let mut weak = assessment(SENTENCE, 84.0, 81.0);
    weak.confidence = 0.1;
    let primary = ScriptedAssessment::new(vec![Ok(weak), Ok(assessment(SENTENCE, 80.0, 78.0))]);
    let secondary = ScriptedTranscription::new(vec![Ok(transcription(SENTENCE))]);
    let coach = build_coach(&TomlConfig::default(), primary.clone(), secondary.clone());

    let outcome = coach
        .process_with_rng(
            &submission(5.0, UserLevelBand::Intermediate, 0, 0),
            &CancellationToken::new(),
            &mut never_lucky(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.outcome, OutcomeKind::Accepted);
    assert_eq!(
        outcome.assessment.as_ref().map(|a| a.source),
        Some(AssessmentSource::Hybrid)
    );
    assert_eq!(primary.references(), vec![None, Some(SENTENCE.to_string())]);
    assert_eq!(secondary.calls(), 1);
}
