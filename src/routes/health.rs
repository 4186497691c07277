use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub output_dir: ComponentHealth,
    pub themes: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: Option<String>,
}

/// GET /api/health — health check with local dependency status.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // The poster output directory must be creatable/writable.
    let output_check = match std::fs::create_dir_all(&state.config.posters_dir) {
        Ok(()) => ComponentHealth { status: "ok".to_string(), detail: None },
        Err(e) => ComponentHealth { status: "error".to_string(), detail: Some(e.to_string()) },
    };

    // At least one loadable theme asset should exist.
    let theme_count = state.themes.list().len();
    let themes_check = if theme_count > 0 {
        ComponentHealth { status: "ok".to_string(), detail: Some(format!("{theme_count} themes")) }
    } else {
        ComponentHealth {
            status: "degraded".to_string(),
            detail: Some("no theme assets, using built-in fallback".to_string()),
        }
    };

    let all_healthy = output_check.status == "ok" && themes_check.status == "ok";
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "ok".to_string() } else { "degraded".to_string() },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { output_dir: output_check, themes: themes_check },
    };

    (status_code, Json(response))
}
