//! Practice submission endpoint

use axum::{extract::State, routing::post, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::coach::{PracticeOutcome, PracticeSubmission};
use crate::error::{ApiError, ApiResult};
use crate::types::{AssessmentError, AudioClip, UserLevelBand, UserProgressState};
use crate::AppState;

fn default_mime_type() -> String {
    "audio/webm".to_string()
}

/// POST /api/assess request body
#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    /// Base64-encoded audio bytes
    pub audio_base64: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    pub duration_seconds: f64,
    #[serde(default)]
    pub reference_text: Option<String>,
    #[serde(default)]
    pub level: UserLevelBand,
    #[serde(default)]
    pub total_xp: u64,
    #[serde(default)]
    pub streak_days: u32,
}

impl AssessRequest {
    fn into_submission(self) -> ApiResult<PracticeSubmission> {
        let bytes = BASE64
            .decode(self.audio_base64.trim())
            .map_err(|e| ApiError::BadRequest(format!("audio_base64 is not valid base64: {}", e)))?;

        // Blank reference text means free speech
        let reference_text = self.reference_text.filter(|t| !t.trim().is_empty());

        Ok(PracticeSubmission {
            audio: AudioClip::new(bytes, self.mime_type, self.duration_seconds),
            reference_text,
            band: self.level,
            progress: UserProgressState {
                total_xp: self.total_xp,
                streak_days: self.streak_days,
            },
        })
    }
}

/// POST /api/assess
///
/// Runs one submission end to end. If the client disconnects, axum drops this
/// future and the drop guard cancels any in-flight provider call.
pub async fn assess_submission(
    State(state): State<AppState>,
    Json(request): Json<AssessRequest>,
) -> ApiResult<Json<PracticeOutcome>> {
    let submission = request.into_submission()?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.coach.process(&submission, &cancel).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            if let AssessmentError::MalformedResult(_) = &e {
                warn!(error = %e, "Provider returned malformed result");
                *state.last_error.write().await = Some(e.to_string());
            }
            Err(e.into())
        }
    }
}

/// Build assessment routes
pub fn assess_routes() -> Router<AppState> {
    Router::new().route("/api/assess", post(assess_submission))
}
