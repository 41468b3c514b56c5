//! Core types for frame-prep

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, frames still being fetched
    Pending,
    /// Every frame fetched and persisted
    Complete,
    /// A frame failed; terminal
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a completed job is handed back to the caller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// On-disk paths of every frame
    #[default]
    LocalPaths,
    /// Public URLs of every frame
    PublicUrls,
    /// Public URL of the job archive
    ArchiveUrl,
    /// Raw bytes of the job archive
    ArchiveBytes,
}

impl OutputMode {
    /// Whether this mode hands out URLs under the public base address
    pub fn needs_public_url(&self) -> bool {
        matches!(self, OutputMode::PublicUrls | OutputMode::ArchiveUrl)
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputMode::LocalPaths => "local_paths",
            OutputMode::PublicUrls => "public_urls",
            OutputMode::ArchiveUrl => "archive_url",
            OutputMode::ArchiveBytes => "archive_bytes",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "local_paths" => Ok(OutputMode::LocalPaths),
            "public_urls" => Ok(OutputMode::PublicUrls),
            "archive_url" => Ok(OutputMode::ArchiveUrl),
            "archive_bytes" => Ok(OutputMode::ArchiveBytes),
            _ => Err(Error::Validation(format!("unknown output mode '{}'", s))),
        }
    }
}

/// Where a frame comes from, as supplied by the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceRef {
    /// Absolute http(s) URL
    Url(Url),
    /// Path on the configured upstream host, e.g. "/files/f.jpg"
    Relative(String),
    /// File that already exists on this machine
    Local(PathBuf),
}

impl SourceRef {
    /// Classify a network reference: absolute http(s) URLs stay as they are,
    /// anything without a scheme is relative to the upstream host
    pub fn parse_remote(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("frame reference is empty".into()));
        }

        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(SourceRef::Url(url)),
            Ok(url) => Err(Error::Validation(format!(
                "unsupported scheme '{}' in frame reference '{}'",
                url.scheme(),
                trimmed
            ))),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(SourceRef::Relative(trimmed.to_string()))
            }
            Err(e) => Err(Error::Validation(format!(
                "invalid frame reference '{}': {}",
                trimmed, e
            ))),
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceRef::Url(url) => f.write_str(url.as_str()),
            SourceRef::Relative(path) => f.write_str(path),
            SourceRef::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validated request handed to the job coordinator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameRequest {
    /// One reference per frame, in output order
    Frames(Vec<SourceRef>),
    /// A single archive whose image entries become the frames
    Archive(SourceRef),
}

impl FrameRequest {
    /// Build a request from remote URLs or upstream-relative paths
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Result<Self> {
        if urls.is_empty() {
            return Err(Error::Validation("frame_urls is empty".into()));
        }
        let refs = urls
            .iter()
            .map(|u| SourceRef::parse_remote(u.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(FrameRequest::Frames(refs))
    }

    /// Build a request from pre-downloaded local files
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        if paths.is_empty() {
            return Err(Error::Validation("frame_paths is empty".into()));
        }
        if paths.iter().any(|p| p.as_ref().as_os_str().is_empty()) {
            return Err(Error::Validation("frame path is empty".into()));
        }
        Ok(FrameRequest::Frames(
            paths
                .iter()
                .map(|p| SourceRef::Local(p.as_ref().to_path_buf()))
                .collect(),
        ))
    }

    /// Build a request that unpacks the frames of a remote archive
    pub fn from_archive_url(url: &str) -> Result<Self> {
        Ok(FrameRequest::Archive(SourceRef::parse_remote(url)?))
    }
}

/// One image within a job
#[derive(Clone, Debug)]
pub struct Frame {
    /// 1-based position in the original request
    pub index: usize,
    /// What the caller asked for
    pub source: SourceRef,
    /// What was actually read: the final URL or local path
    pub resolved: String,
    /// Where the frame lives now; only set once fully written
    pub local_path: PathBuf,
    /// Externally reachable address, when storage is exposed
    pub public_url: Option<String>,
}

impl Frame {
    /// Stored file name, e.g. "frame_001.jpg"
    pub fn file_name(&self) -> String {
        frame_file_name(self.index)
    }
}

/// Deterministic stored name for the frame at `index`
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:03}.jpg", index)
}

/// `<public base>/<job id>/<file>`, mirroring the layout under the storage root
pub fn public_file_url(base: &Url, job_id: &JobId, file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        base.as_str().trim_end_matches('/'),
        job_id,
        file_name
    )
}

/// One batch of frames sharing a storage subtree
#[derive(Clone, Debug)]
pub struct Job {
    /// Unique job identifier
    pub id: JobId,
    /// `<storage root>/<id>`, owned by this job alone
    pub directory: PathBuf,
    /// Frames in request order
    pub frames: Vec<Frame>,
    /// Set once the archive builder succeeded
    pub archive_path: Option<PathBuf>,
    /// Current status
    pub status: JobStatus,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create an empty pending job rooted at `directory`
    pub fn new(id: JobId, directory: PathBuf) -> Self {
        Self {
            id,
            directory,
            frames: Vec::new(),
            archive_path: None,
            status: JobStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Whether every frame has been persisted
    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }

    /// Suggested archive file name, e.g. "<id>.zip"
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.id)
    }

    /// On-disk paths of every frame, in index order
    pub fn local_paths(&self) -> Vec<PathBuf> {
        self.frames.iter().map(|f| f.local_path.clone()).collect()
    }
}

/// External representation of a completed job
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    /// Frame paths on this machine
    LocalPaths(Vec<PathBuf>),
    /// Public frame URLs
    PublicUrls(Vec<String>),
    /// Public URL of the archive
    ArchiveUrl(String),
    /// Archive content and a suggested download name
    ArchiveBytes {
        /// Raw zip bytes
        bytes: Vec<u8>,
        /// Suggested file name for Content-Disposition
        filename: String,
    },
}
