//! Frame preparation handler

use super::{PrepareRequest, PrepareResponse};
use crate::api::AppState;
use crate::error::{Error, Result};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::info;

/// POST /prepare_vlm - Materialize frames for inference
///
/// Fetches every referenced frame into a new job directory, in request order,
/// and returns the job in the requested output mode.
#[utoipa::path(
    post,
    path = "/prepare_vlm",
    tag = "jobs",
    request_body = PrepareRequest,
    responses(
        (status = 200, description = "Job complete; JSON body, or the archive for mode archive_bytes", body = super::JobResponse),
        (status = 400, description = "Invalid request or missing local source", body = crate::error::ApiError),
        (status = 422, description = "Archive could not be unpacked or contained no images", body = crate::error::ApiError),
        (status = 500, description = "Storage or configuration error", body = crate::error::ApiError),
        (status = 502, description = "A frame could not be downloaded", body = crate::error::ApiError)
    )
)]
pub async fn prepare_vlm(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PrepareRequest>, JsonRejection>,
) -> Result<PrepareResponse> {
    let Json(payload) = payload.map_err(|e| Error::Validation(e.body_text()))?;
    let (request, mode) = payload.into_request()?;
    let mode = mode.unwrap_or(state.config.output.mode);
    state.projector.ensure_supported(mode)?;

    let mut job = state.coordinator.create_job(request).await?;
    let projection = state.project_or_abort(&mut job, mode).await?;

    info!(
        job_id = %job.id,
        total_files = job.frames.len(),
        %mode,
        "job prepared"
    );

    Ok(PrepareResponse::new(&job, projection))
}
