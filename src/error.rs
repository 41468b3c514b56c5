//! Error types for frame-prep
//!
//! This module provides the error taxonomy for the frame pipeline:
//! - Domain errors for validation, fetching, persisting and archiving
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for frame-prep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for frame-prep
///
/// Every variant aborts the enclosing job. Variants raised while fetching carry
/// the offending source reference so callers can tell which frame failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or empty request; raised before any job is created
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced local file does not exist
    #[error("missing source: {reference} does not exist")]
    MissingSource {
        /// The local path exactly as supplied by the caller
        reference: String,
    },

    /// Network fetch returned a failure status or a transport error
    #[error("failed to fetch frame {reference}: {cause}")]
    DownloadFailed {
        /// The source reference as supplied by the caller
        reference: String,
        /// Human-readable cause (status code, timeout, connection error)
        cause: String,
    },

    /// Writing a fetched frame to local storage failed
    #[error("failed to persist {path}: {reason}")]
    PersistFailed {
        /// Destination path that could not be written
        path: PathBuf,
        /// The underlying I/O failure
        reason: String,
    },

    /// Results requested for a job that did not complete
    #[error("job {job_id} is {status}, results are only available for complete jobs")]
    JobNotComplete {
        /// The job whose results were requested
        job_id: String,
        /// The job's current status
        status: String,
    },

    /// Archive construction or unpacking failed
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Configuration is missing a value required by the requested operation
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "output.public_base_url")
        key: Option<String>,
    },

    /// I/O error outside of frame persistence (job directory creation, reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Archive-related errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Archive requested for a job that has not completed
    #[error("job {job_id} is {status}, archives can only be built for complete jobs")]
    NotComplete {
        /// The job the archive was requested for
        job_id: String,
        /// The job's current status
        status: String,
    },

    /// A frame file vanished between fetching and archiving
    #[error("frame {index} is missing at {path}")]
    MissingFrame {
        /// 1-based index of the missing frame
        index: usize,
        /// Where the frame was expected on disk
        path: PathBuf,
    },

    /// Writing the archive failed
    #[error("failed to write archive {path}: {reason}")]
    WriteFailed {
        /// The archive being written
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },

    /// Reading or unpacking a source archive failed
    #[error("failed to unpack {archive}: {reason}")]
    UnpackFailed {
        /// The source archive that could not be unpacked
        archive: PathBuf,
        /// The reason unpacking failed
        reason: String,
    },

    /// The source archive did not contain any frame images
    #[error("archive {archive} contains no frame images")]
    Empty {
        /// The source archive that held no usable entries
        archive: PathBuf,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "download_failed",
///     "message": "failed to fetch frame http://a/missing.jpg: HTTP 404 Not Found",
///     "details": {
///       "reference": "http://a/missing.jpg"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "download_failed", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context (offending reference, path, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - the caller sent something unusable
            Error::Validation(_) => 400,
            Error::MissingSource { .. } => 400,

            // 422 Unprocessable Entity - the request was fine, its content was not
            Error::JobNotComplete { .. } => 422,
            Error::Archive(ArchiveError::NotComplete { .. }) => 422,
            Error::Archive(ArchiveError::Empty { .. }) => 422,
            Error::Archive(ArchiveError::UnpackFailed { .. }) => 422,

            // 502 Bad Gateway - an upstream frame host failed
            Error::DownloadFailed { .. } => 502,

            // 500 Internal Server Error - local storage or setup issues
            Error::PersistFailed { .. } => 500,
            Error::Archive(ArchiveError::MissingFrame { .. }) => 500,
            Error::Archive(ArchiveError::WriteFailed { .. }) => 500,
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::MissingSource { .. } => "missing_source",
            Error::DownloadFailed { .. } => "download_failed",
            Error::PersistFailed { .. } => "persist_failed",
            Error::JobNotComplete { .. } => "job_not_complete",
            Error::Archive(e) => match e {
                ArchiveError::NotComplete { .. } => "archive_job_incomplete",
                ArchiveError::MissingFrame { .. } => "archive_missing_frame",
                ArchiveError::WriteFailed { .. } => "archive_write_failed",
                ArchiveError::UnpackFailed { .. } => "archive_unpack_failed",
                ArchiveError::Empty { .. } => "archive_empty",
            },
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::MissingSource { reference } => Some(serde_json::json!({
                "reference": reference,
            })),
            Error::DownloadFailed { reference, cause } => Some(serde_json::json!({
                "reference": reference,
                "cause": cause,
            })),
            Error::PersistFailed { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            Error::Archive(ArchiveError::MissingFrame { index, path }) => {
                Some(serde_json::json!({
                    "index": index,
                    "path": path,
                }))
            }
            Error::JobNotComplete { job_id, status }
            | Error::Archive(ArchiveError::NotComplete { job_id, status }) => {
                Some(serde_json::json!({
                    "job_id": job_id,
                    "status": status,
                }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
