use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::generate::{GenerateRequest, GenerateResponse};
use crate::models::geo::Coordinates;
use crate::models::job::{JobStatusView, PosterParams};

/// POST /api/generate — submit a poster generation job.
///
/// Invalid input is rejected here, before any job record exists. Downstream
/// failures never surface at this boundary; they show up in the status poll.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), (StatusCode, Json<serde_json::Value>)> {
    if let Err(report) = body.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": report.to_string() })),
        ));
    }

    let params = PosterParams {
        coords: Some(Coordinates { lat: body.lat, lon: body.lon }),
        theme: body.theme,
        distance: body.distance,
        city: body.city,
        country: body.country,
    };

    let job_id = state.jobs.submit(params).await;

    Ok((StatusCode::ACCEPTED, Json(GenerateResponse { job_id })))
}

/// GET /api/jobs/{job_id} — poll job status.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusView>, (StatusCode, Json<serde_json::Value>)> {
    match state.jobs.get_status(job_id).await {
        Some(view) => Ok(Json(view)),
        None => Err((StatusCode::NOT_FOUND, Json(json!({ "detail": "Job not found" })))),
    }
}
