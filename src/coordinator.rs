//! Job coordination: allocate a job, fetch its frames in order, fail fast

use crate::archive::unpack_archive;
use crate::config::{Config, FailedJobPolicy};
use crate::error::{Error, Result};
use crate::fetcher::FrameFetcher;
use crate::types::{
    Frame, FrameRequest, Job, JobId, JobStatus, SourceRef, frame_file_name, public_file_url,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

/// File name used for a downloaded source archive inside the job directory
const SOURCE_ARCHIVE_NAME: &str = "source.zip.download";

/// Creates jobs under a storage root
///
/// Each job gets its own directory, so coordinators can be shared freely across
/// concurrent requests.
#[derive(Clone, Debug)]
pub struct JobCoordinator {
    root: PathBuf,
    fetcher: FrameFetcher,
    public_base_url: Option<Url>,
    failed_job_policy: FailedJobPolicy,
}

impl JobCoordinator {
    /// Build a coordinator from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            root: config.storage.root.clone(),
            fetcher: FrameFetcher::new(&config.fetch)?,
            public_base_url: config.output.public_base_url.clone(),
            failed_job_policy: config.storage.failed_job_policy,
        })
    }

    /// Run a request to completion
    ///
    /// Every reference is resolved before anything touches the disk, so
    /// malformed requests never create a job directory. Frames are then fetched
    /// strictly in request order; the first failure aborts the job and is
    /// returned as-is.
    pub async fn create_job(&self, request: FrameRequest) -> Result<Job> {
        match &request {
            FrameRequest::Frames(refs) => {
                if refs.is_empty() {
                    return Err(Error::Validation("no frame references supplied".into()));
                }
                for source in refs {
                    self.fetcher.resolve(source)?;
                }
            }
            FrameRequest::Archive(source) => {
                self.fetcher.resolve(source)?;
            }
        }

        let mut job = self.allocate().await?;
        info!(
            job_id = %job.id,
            directory = ?job.directory,
            created_at = %job.created_at,
            "job created"
        );

        let result = match &request {
            FrameRequest::Frames(refs) => self.fetch_frames(&mut job, refs).await,
            FrameRequest::Archive(source) => self.fetch_archive(&mut job, source).await,
        };

        match result {
            Ok(()) => {
                job.status = JobStatus::Complete;
                info!(job_id = %job.id, frames = job.frames.len(), "job complete");
                Ok(job)
            }
            Err(e) => {
                self.abort(&mut job, &e).await;
                Err(e)
            }
        }
    }

    /// Mark `job` failed and apply the failed-job policy to its directory
    ///
    /// Also used when a completed job cannot be projected. A kept directory
    /// never holds an archive.
    pub async fn abort(&self, job: &mut Job, error: &Error) {
        job.status = JobStatus::Failed;
        warn!(
            job_id = %job.id,
            frames_fetched = job.frames.len(),
            error = %error,
            "job failed"
        );

        match self.failed_job_policy {
            FailedJobPolicy::Keep => {
                if let Some(archive) = job.archive_path.take()
                    && let Err(e) = tokio::fs::remove_file(&archive).await
                {
                    warn!(job_id = %job.id, ?archive, error = %e, "failed to remove archive");
                }
                debug!(job_id = %job.id, directory = ?job.directory, "keeping failed job directory");
            }
            FailedJobPolicy::Delete => {
                if let Err(e) = tokio::fs::remove_dir_all(&job.directory).await {
                    warn!(
                        job_id = %job.id,
                        directory = ?job.directory,
                        error = %e,
                        "failed to delete failed job directory"
                    );
                }
            }
        }
    }

    async fn allocate(&self) -> Result<Job> {
        tokio::fs::create_dir_all(&self.root).await?;

        let id = JobId::new();
        let directory = self.root.join(id.to_string());
        // Fails if the directory already exists
        tokio::fs::create_dir(&directory).await?;

        Ok(Job::new(id, directory))
    }

    async fn fetch_frames(&self, job: &mut Job, refs: &[SourceRef]) -> Result<()> {
        for (i, source) in refs.iter().enumerate() {
            let index = i + 1;
            let destination = job.directory.join(frame_file_name(index));
            debug!(job_id = %job.id, index, reference = %source, "fetching frame");

            let location = self.fetcher.fetch(source, &destination).await?;

            let public_url = self.frame_url(&job.id, index);
            job.frames.push(Frame {
                index,
                source: source.clone(),
                resolved: location.to_string(),
                local_path: destination,
                public_url,
            });
        }
        Ok(())
    }

    async fn fetch_archive(&self, job: &mut Job, source: &SourceRef) -> Result<()> {
        let download = job.directory.join(SOURCE_ARCHIVE_NAME);
        let location = self.fetcher.fetch(source, &download).await?;

        let entries = unpack_archive(&download, &job.directory).await;

        // A job directory holds frames only
        if let Err(e) = tokio::fs::remove_file(&download).await {
            warn!(job_id = %job.id, error = %e, "failed to remove downloaded archive");
        }

        for (i, entry) in entries?.into_iter().enumerate() {
            let index = i + 1;
            job.frames.push(Frame {
                index,
                source: source.clone(),
                resolved: format!("{}#{}", location, entry.name),
                public_url: self.frame_url(&job.id, index),
                local_path: entry.path,
            });
        }
        Ok(())
    }

    fn frame_url(&self, job_id: &JobId, index: usize) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| public_file_url(base, job_id, &frame_file_name(index)))
    }
}
