//! speakwell-assess library interface
//!
//! Pronunciation assessment gate and adaptive reward engine:
//! - **gate:** decides whether an assessment can be trusted or must be retried
//! - **orchestrator:** primary → fallback → hybrid provider pipeline
//! - **reward:** XP, streak multiplier, achievements, variable-ratio bonus
//! - **feedback:** level-aware user-facing text
//! - **coach:** end-to-end pipeline for one practice submission
//!
//! Exposes public APIs for integration testing.

pub mod api;
pub mod coach;
pub mod config;
pub mod error;
pub mod feedback;
pub mod gate;
pub mod orchestrator;
pub mod providers;
pub mod reward;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use speakwell_common::config::TomlConfig;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::coach::PracticeCoach;
use crate::feedback::FeedbackComposer;
use crate::gate::{AudioQualityGate, GateThresholds};
use crate::orchestrator::{AssessmentOrchestrator, OrchestratorConfig};
use crate::reward::{RewardConfig, RewardEngine};
use crate::types::{AssessmentProvider, TranscriptionProvider};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coach: Arc<PracticeCoach>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(coach: PracticeCoach) -> Self {
        Self {
            coach: Arc::new(coach),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Wire a practice coach from configuration and provider adapters
pub fn build_coach(
    config: &TomlConfig,
    primary: Arc<dyn AssessmentProvider>,
    secondary: Arc<dyn TranscriptionProvider>,
) -> PracticeCoach {
    let composer = FeedbackComposer::from_settings(&config.feedback);
    let orchestrator = AssessmentOrchestrator::new(
        primary,
        secondary,
        OrchestratorConfig::from_settings(&config.orchestrator),
    )
    .with_gate(AudioQualityGate::with_thresholds(GateThresholds::from_settings(&config.gate)));
    let rewards = RewardEngine::new(RewardConfig::from_settings(&config.reward), composer.clone());
    PracticeCoach::new(orchestrator, rewards, composer)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::assess_routes())
        .merge(api::level_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
