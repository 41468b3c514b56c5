//! Mapping of completed jobs onto their external representations

use crate::archive::build_archive;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Job, OutputMode, Projection, public_file_url};
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Turns completed jobs into paths, URLs or archive bytes
#[derive(Clone, Debug, Default)]
pub struct ResultProjector {
    public_base_url: Option<Url>,
}

impl ResultProjector {
    /// Build a projector from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            public_base_url: config.output.public_base_url.clone(),
        }
    }

    /// Project `job` in `mode`
    ///
    /// Archive modes build the archive on first use. Apart from that and the
    /// archive read in `ArchiveBytes`, this is a pure mapping over state that is
    /// already on disk.
    pub async fn project(&self, job: &mut Job, mode: OutputMode) -> Result<Projection> {
        if !job.is_complete() {
            return Err(Error::JobNotComplete {
                job_id: job.id.to_string(),
                status: job.status.to_string(),
            });
        }
        debug!(job_id = %job.id, %mode, "projecting job");

        match mode {
            OutputMode::LocalPaths => Ok(Projection::LocalPaths(job.local_paths())),
            OutputMode::PublicUrls => {
                let base = self.require_base(mode)?;
                let urls = job
                    .frames
                    .iter()
                    .map(|f| match &f.public_url {
                        Some(url) => url.clone(),
                        None => public_file_url(base, &job.id, &f.file_name()),
                    })
                    .collect();
                Ok(Projection::PublicUrls(urls))
            }
            OutputMode::ArchiveUrl => {
                let base = self.require_base(mode)?;
                ensure_archive(job).await?;
                Ok(Projection::ArchiveUrl(public_file_url(
                    base,
                    &job.id,
                    &job.archive_file_name(),
                )))
            }
            OutputMode::ArchiveBytes => {
                let path = ensure_archive(job).await?;
                let bytes = tokio::fs::read(&path).await?;
                Ok(Projection::ArchiveBytes {
                    bytes,
                    filename: job.archive_file_name(),
                })
            }
        }
    }

    /// Check that `mode` can be served with the current configuration
    ///
    /// Lets callers reject a request before any frame is fetched.
    pub fn ensure_supported(&self, mode: OutputMode) -> Result<()> {
        if mode.needs_public_url() {
            self.require_base(mode)?;
        }
        Ok(())
    }

    fn require_base(&self, mode: OutputMode) -> Result<&Url> {
        self.public_base_url.as_ref().ok_or_else(|| Error::Config {
            message: format!(
                "output mode '{}' needs a public_base_url, storage is not exposed",
                mode
            ),
            key: Some("output.public_base_url".into()),
        })
    }
}

async fn ensure_archive(job: &mut Job) -> Result<PathBuf> {
    match &job.archive_path {
        Some(path) if path.is_file() => Ok(path.clone()),
        _ => build_archive(job).await,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Frame, JobId, JobStatus, SourceRef, frame_file_name};
    use std::io::Read;
    use tempfile::{TempDir, tempdir};

    fn complete_job(count: usize) -> (Job, TempDir) {
        let dir = tempdir().unwrap();
        let id = JobId::new();
        let job_dir = dir.path().join(id.to_string());
        std::fs::create_dir_all(&job_dir).unwrap();

        let mut job = Job::new(id, job_dir.clone());
        for index in 1..=count {
            let local_path = job_dir.join(frame_file_name(index));
            std::fs::write(&local_path, format!("frame {index}")).unwrap();
            job.frames.push(Frame {
                index,
                source: SourceRef::Relative(format!("/f/{index}.jpg")),
                resolved: format!("http://upstream/f/{index}.jpg"),
                local_path,
                public_url: None,
            });
        }
        job.status = JobStatus::Complete;
        (job, dir)
    }

    fn exposed() -> ResultProjector {
        ResultProjector {
            public_base_url: Some(Url::parse("https://cdn.example.com/files").unwrap()),
        }
    }

    #[tokio::test]
    async fn local_paths_follow_frame_order() {
        let (mut job, _dir) = complete_job(3);

        let projection = ResultProjector::default()
            .project(&mut job, OutputMode::LocalPaths)
            .await
            .unwrap();

        match projection {
            Projection::LocalPaths(paths) => {
                assert_eq!(paths.len(), 3);
                assert!(paths[0].ends_with("frame_001.jpg"));
                assert!(paths[2].ends_with("frame_003.jpg"));
            }
            other => panic!("expected local paths, got {other:?}"),
        }
        assert!(job.archive_path.is_none(), "local paths never build an archive");
    }

    #[tokio::test]
    async fn public_urls_use_base_job_id_and_file_name() {
        let (mut job, _dir) = complete_job(2);

        let projection = exposed().project(&mut job, OutputMode::PublicUrls).await.unwrap();

        assert_eq!(
            projection,
            Projection::PublicUrls(vec![
                format!("https://cdn.example.com/files/{}/frame_001.jpg", job.id),
                format!("https://cdn.example.com/files/{}/frame_002.jpg", job.id),
            ])
        );
    }

    #[tokio::test]
    async fn url_modes_without_base_are_config_errors() {
        let (mut job, _dir) = complete_job(1);
        let projector = ResultProjector::default();

        for mode in [OutputMode::PublicUrls, OutputMode::ArchiveUrl] {
            let err = projector.project(&mut job, mode).await.unwrap_err();
            assert!(matches!(err, Error::Config { .. }), "mode {mode}");
        }
        assert!(job.archive_path.is_none());
    }

    #[test]
    fn ensure_supported_only_rejects_url_modes() {
        let projector = ResultProjector::default();
        assert!(projector.ensure_supported(OutputMode::LocalPaths).is_ok());
        assert!(projector.ensure_supported(OutputMode::ArchiveBytes).is_ok());
        assert!(projector.ensure_supported(OutputMode::PublicUrls).is_err());
        assert!(projector.ensure_supported(OutputMode::ArchiveUrl).is_err());
        assert!(exposed().ensure_supported(OutputMode::ArchiveUrl).is_ok());
    }

    #[tokio::test]
    async fn archive_url_builds_archive_on_demand() {
        let (mut job, _dir) = complete_job(2);

        let projection = exposed().project(&mut job, OutputMode::ArchiveUrl).await.unwrap();

        assert_eq!(
            projection,
            Projection::ArchiveUrl(format!(
                "https://cdn.example.com/files/{}/{}.zip",
                job.id, job.id
            ))
        );
        assert!(job.archive_path.as_ref().unwrap().is_file());
    }

    #[tokio::test]
    async fn archive_bytes_contain_every_frame() {
        let (mut job, _dir) = complete_job(2);

        let projection = ResultProjector::default()
            .project(&mut job, OutputMode::ArchiveBytes)
            .await
            .unwrap();

        let Projection::ArchiveBytes { bytes, filename } = projection else {
            panic!("expected archive bytes");
        };
        assert_eq!(filename, format!("{}.zip", job.id));

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("frame_002.jpg")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "frame 2");
    }

    #[tokio::test]
    async fn failed_job_exposes_nothing() {
        let (mut job, _dir) = complete_job(2);
        job.status = JobStatus::Failed;

        for mode in [
            OutputMode::LocalPaths,
            OutputMode::PublicUrls,
            OutputMode::ArchiveUrl,
            OutputMode::ArchiveBytes,
        ] {
            let err = exposed().project(&mut job, mode).await.unwrap_err();
            assert!(matches!(err, Error::JobNotComplete { .. }), "mode {mode}");
        }
        assert!(job.archive_path.is_none());
    }
}
