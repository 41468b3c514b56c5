//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Frame preparation
//! - [`system`] - Health and OpenAPI

use crate::error::{Error, Result};
use crate::types::{FrameRequest, Job, JobId, OutputMode, Projection};
use axum::{
    Json,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod jobs;
mod system;

pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /prepare_vlm
///
/// Exactly one of `frame_urls`, `frame_paths` or `archive_url` must be set.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PrepareRequest {
    /// Frame URLs, absolute or relative to the configured upstream base
    #[serde(default)]
    pub frame_urls: Option<Vec<String>>,

    /// Paths of frames that already exist on this machine
    #[serde(default)]
    pub frame_paths: Option<Vec<String>>,

    /// URL of a zip archive whose image entries become the frames
    #[serde(default)]
    pub archive_url: Option<String>,

    /// Output mode: "local_paths", "public_urls", "archive_url" or
    /// "archive_bytes" (default: configured `output.mode`)
    #[serde(default)]
    pub mode: Option<String>,
}

impl PrepareRequest {
    /// Validate the payload into a frame request and an optional mode override
    pub fn into_request(self) -> Result<(FrameRequest, Option<OutputMode>)> {
        let mode = self.mode.as_deref().map(str::parse::<OutputMode>).transpose()?;

        let request = match (self.frame_urls, self.frame_paths, self.archive_url) {
            (Some(urls), None, None) => FrameRequest::from_urls(&urls)?,
            (None, Some(paths), None) => FrameRequest::from_paths(&paths)?,
            (None, None, Some(url)) => FrameRequest::from_archive_url(&url)?,
            (None, None, None) => {
                return Err(Error::Validation(
                    "missing frame_urls, frame_paths or archive_url".into(),
                ));
            }
            _ => {
                return Err(Error::Validation(
                    "only one of frame_urls, frame_paths or archive_url may be set".into(),
                ));
            }
        };

        Ok((request, mode))
    }
}

/// Response for POST /prepare_vlm in the JSON output modes
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    /// Identifier of the created job
    pub job_id: JobId,

    /// Number of frames in the job
    pub total_files: usize,

    /// When the job was accepted
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,

    /// Frame paths or URLs in request order (`local_paths`, `public_urls`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_files: Option<Vec<String>>,

    /// Archive URL (`archive_url`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_file: Option<String>,
}

/// Response of POST /prepare_vlm: a JSON body or the raw archive
#[derive(Debug)]
pub enum PrepareResponse {
    /// `local_paths`, `public_urls` and `archive_url` modes
    Json(JobResponse),
    /// `archive_bytes` mode
    Archive {
        /// Zip file contents
        bytes: Vec<u8>,
        /// Suggested download name, `<job id>.zip`
        filename: String,
    },
}

impl PrepareResponse {
    /// Build the response for a projected job
    pub fn new(job: &Job, projection: Projection) -> Self {
        let (image_files, zip_file) = match projection {
            Projection::LocalPaths(paths) => (
                Some(paths.iter().map(|p| p.display().to_string()).collect()),
                None,
            ),
            Projection::PublicUrls(urls) => (Some(urls), None),
            Projection::ArchiveUrl(url) => (None, Some(url)),
            Projection::ArchiveBytes { bytes, filename } => {
                return PrepareResponse::Archive { bytes, filename };
            }
        };

        PrepareResponse::Json(JobResponse {
            job_id: job.id,
            total_files: job.frames.len(),
            created_at: job.created_at,
            image_files,
            zip_file,
        })
    }
}

impl IntoResponse for PrepareResponse {
    fn into_response(self) -> Response {
        match self {
            PrepareResponse::Json(body) => Json(body).into_response(),
            PrepareResponse::Archive { bytes, filename } => (
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                bytes,
            )
                .into_response(),
        }
    }
}
