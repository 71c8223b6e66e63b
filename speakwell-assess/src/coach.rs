//! Practice Coach
//!
//! End-to-end pipeline for one practice submission:
//! orchestrator → reward engine → feedback composer.
//!
//! The learner's progress snapshot is read-only input. The returned
//! `submission_id` is fresh per call so the caller can apply each reward at
//! most once when persisting `progress.new_total_xp`.

use crate::feedback::FeedbackComposer;
use crate::orchestrator::{AssessmentOrchestrator, AssessmentOutcome, OutcomeKind};
use crate::reward::{RewardEngine, RewardResult};
use crate::types::{
    AssessmentError, AssessmentResult, AudioClip, RetrySignal, UserLevelBand, UserProgressState,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use speakwell_common::LevelProgress;
use tracing::{info, Instrument};
use uuid::Uuid;

/// One practice attempt
#[derive(Debug, Clone)]
pub struct PracticeSubmission {
    pub audio: AudioClip,
    /// Sentence the learner was asked to say, if any
    pub reference_text: Option<String>,
    pub band: UserLevelBand,
    pub progress: UserProgressState,
}

/// XP change produced by a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDelta {
    pub xp_gained: u64,
    pub new_total_xp: u64,
}

/// Everything the caller needs to present and persist one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeOutcome {
    pub submission_id: Uuid,
    pub outcome: OutcomeKind,
    pub assessment: Option<AssessmentResult>,
    pub retry: Option<RetrySignal>,
    pub reward: RewardResult,
    pub progress: ProgressDelta,
    /// Level standing after applying the reward
    pub level: LevelProgress,
}

/// Practice Coach
pub struct PracticeCoach {
    orchestrator: AssessmentOrchestrator,
    rewards: RewardEngine,
    composer: FeedbackComposer,
}

impl PracticeCoach {
    pub fn new(
        orchestrator: AssessmentOrchestrator,
        rewards: RewardEngine,
        composer: FeedbackComposer,
    ) -> Self {
        Self {
            orchestrator,
            rewards,
            composer,
        }
    }

    /// Assess and reward a submission using the thread-local RNG
    pub async fn process(
        &self,
        submission: &PracticeSubmission,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<PracticeOutcome, AssessmentError> {
        let submission_id = Uuid::new_v4();
        let outcome = self
            .assess(submission_id, submission, cancel)
            .await?;
        Ok(self.settle(submission_id, outcome, submission, &mut rand::thread_rng()))
    }

    /// Assess and reward a submission with a caller-supplied RNG
    pub async fn process_with_rng<R: Rng + Send + ?Sized>(
        &self,
        submission: &PracticeSubmission,
        cancel: &tokio_util::sync::CancellationToken,
        rng: &mut R,
    ) -> Result<PracticeOutcome, AssessmentError> {
        let submission_id = Uuid::new_v4();
        let outcome = self.assess(submission_id, submission, cancel).await?;
        Ok(self.settle(submission_id, outcome, submission, rng))
    }

    async fn assess(
        &self,
        submission_id: Uuid,
        submission: &PracticeSubmission,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        let span = tracing::info_span!(
            "submission",
            submission_id = %submission_id,
            band = submission.band.as_str(),
            duration_seconds = submission.audio.duration_seconds,
        );
        self.orchestrator
            .assess(
                &submission.audio,
                submission.reference_text.as_deref(),
                cancel,
            )
            .instrument(span)
            .await
    }

    /// Turn a terminal state into a reward and progress delta
    pub fn settle<R: Rng + ?Sized>(
        &self,
        submission_id: Uuid,
        outcome: AssessmentOutcome,
        submission: &PracticeSubmission,
        rng: &mut R,
    ) -> PracticeOutcome {
        let kind = outcome.kind();
        let prior = submission.progress.total_xp;

        let (assessment, retry, reward) = match outcome {
            AssessmentOutcome::Retry(signal) => {
                let signal = RetrySignal {
                    reason: signal.reason,
                    guidance: self.composer.compose_retry(signal.reason, submission.band),
                };
                let reward = RewardResult::retry(&signal);
                (None, Some(signal), reward)
            }
            AssessmentOutcome::Accepted(result) | AssessmentOutcome::Degraded(result) => {
                let reward = self.rewards.compute(
                    &result,
                    submission.audio.duration_seconds,
                    submission.band,
                    submission.progress,
                    rng,
                );
                (Some(result), None, reward)
            }
        };

        let new_total_xp = prior.saturating_add(reward.total_xp);
        info!(
            submission_id = %submission_id,
            outcome = ?kind,
            xp_gained = reward.total_xp,
            new_total_xp,
            level_up = reward.level_up.is_some(),
            "Submission settled"
        );

        PracticeOutcome {
            submission_id,
            outcome: kind,
            assessment,
            retry,
            reward,
            progress: ProgressDelta {
                xp_gained: new_total_xp - prior,
                new_total_xp,
            },
            level: LevelProgress::from_total_xp(new_total_xp),
        }
    }
}
