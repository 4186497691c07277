use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::models::theme::ThemeSummary;

/// GET /api/themes — list available poster themes.
pub async fn list_themes(State(state): State<AppState>) -> Json<Vec<ThemeSummary>> {
    Json(state.themes.list())
}
