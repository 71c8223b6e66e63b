//! Level lookup endpoint

use axum::{extract::Path, routing::get, Json, Router};
use speakwell_common::LevelProgress;

use crate::AppState;

/// GET /api/level/:total_xp
///
/// Level standing for a cumulative XP total, for progress-bar display.
pub async fn level_for_total(Path(total_xp): Path<u64>) -> Json<LevelProgress> {
    Json(LevelProgress::from_total_xp(total_xp))
}

/// Build level routes
pub fn level_routes() -> Router<AppState> {
    Router::new().route("/api/level/:total_xp", get(level_for_total))
}
