//! Frame fetching: resolve one source reference and persist its bytes
//!
//! Remote frames are streamed chunk by chunk. Bytes land in a `.part` sibling
//! and are renamed into place after flush and sync; a failed fetch leaves no
//! destination file. Local paths are only read from under
//! `fetch.local_source_root`.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::types::SourceRef;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

/// Concrete place a frame is read from after resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    /// Network location
    Remote(Url),
    /// File on this machine
    Local(PathBuf),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Remote(url) => f.write_str(url.as_str()),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches single frames into caller-chosen destinations
#[derive(Clone, Debug)]
pub struct FrameFetcher {
    client: reqwest::Client,
    base_url: Option<Url>,
    local_root: Option<PathBuf>,
    timeout: Duration,
}

impl FrameFetcher {
    /// Build a fetcher with its own HTTP client
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            local_root: config.local_source_root.clone(),
            timeout: config.timeout,
        })
    }

    /// Turn a source reference into the location that will actually be read
    ///
    /// Relative references are appended to the configured base URL, keeping any
    /// path prefix the base carries: `"/files/f.jpg"` against `"http://upstream"`
    /// becomes `"http://upstream/files/f.jpg"`. Local paths are canonicalized
    /// and must stay inside the configured local source root.
    pub fn resolve(&self, source: &SourceRef) -> Result<Location> {
        match source {
            SourceRef::Url(url) => Ok(Location::Remote(url.clone())),
            SourceRef::Local(path) => self.resolve_local(source, path).map(Location::Local),
            SourceRef::Relative(rel) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    Error::Validation(format!(
                        "relative frame reference '{}' needs a configured base_url",
                        rel
                    ))
                })?;
                let joined = format!(
                    "{}/{}",
                    base.as_str().trim_end_matches('/'),
                    rel.trim_start_matches('/')
                );
                let url = Url::parse(&joined).map_err(|e| {
                    Error::Validation(format!(
                        "cannot resolve '{}' against '{}': {}",
                        rel, base, e
                    ))
                })?;
                Ok(Location::Remote(url))
            }
        }
    }

    fn resolve_local(&self, source: &SourceRef, path: &Path) -> Result<PathBuf> {
        let root = self.local_root.as_ref().ok_or_else(|| {
            Error::Validation(format!(
                "local frame path '{}' rejected: no local_source_root configured",
                path.display()
            ))
        })?;
        let root = std::fs::canonicalize(root).map_err(|e| Error::Config {
            message: format!("local_source_root '{}' is unusable: {}", root.display(), e),
            key: Some("fetch.local_source_root".into()),
        })?;

        let canonical = std::fs::canonicalize(path).map_err(|e| read_error(source, path, e))?;
        if !canonical.starts_with(&root) {
            return Err(Error::Validation(format!(
                "local frame path '{}' is outside local_source_root",
                path.display()
            )));
        }
        Ok(canonical)
    }

    /// Fetch `source` into `destination`
    ///
    /// Returns the resolved location on success. On failure the destination does
    /// not exist.
    pub async fn fetch(&self, source: &SourceRef, destination: &Path) -> Result<Location> {
        let location = self.resolve(source)?;
        debug!(reference = %source, resolved = %location, ?destination, "fetching frame");

        let part = part_path(destination);
        let result = match &location {
            Location::Remote(url) => self.download(source, url, &part).await,
            Location::Local(path) => copy_local(source, path, &part).await,
        };

        if let Err(e) = result {
            discard(&part).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&part, destination).await {
            discard(&part).await;
            return Err(Error::PersistFailed {
                path: destination.to_path_buf(),
                reason: format!("failed to move completed frame into place: {}", e),
            });
        }

        Ok(location)
    }

    async fn download(&self, source: &SourceRef, url: &Url, part: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(source, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadFailed {
                reference: source.to_string(),
                cause: format!("HTTP {}", status),
            });
        }

        let mut file = create_part(part).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.transport_error(source, e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| persist_error(part, e))?;
            written += chunk.len() as u64;
        }

        finish_part(file, part).await?;
        debug!(reference = %source, bytes = written, "frame downloaded");
        Ok(())
    }

    fn transport_error(&self, source: &SourceRef, e: reqwest::Error) -> Error {
        let cause = if e.is_timeout() {
            format!("timed out after {} seconds", self.timeout.as_secs())
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            e.to_string()
        };
        Error::DownloadFailed {
            reference: source.to_string(),
            cause,
        }
    }
}

async fn copy_local(source: &SourceRef, path: &Path, part: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| read_error(source, path, e))?;
    if !meta.is_file() {
        return Err(Error::MissingSource {
            reference: source.to_string(),
        });
    }

    let mut input = File::open(path)
        .await
        .map_err(|e| read_error(source, path, e))?;
    let mut file = create_part(part).await?;
    tokio::io::copy(&mut input, &mut file)
        .await
        .map_err(|e| persist_error(part, e))?;
    finish_part(file, part).await
}

async fn create_part(part: &Path) -> Result<File> {
    File::create(part).await.map_err(|e| persist_error(part, e))
}

async fn finish_part(mut file: File, part: &Path) -> Result<()> {
    file.flush().await.map_err(|e| persist_error(part, e))?;
    file.sync_all().await.map_err(|e| persist_error(part, e))?;
    Ok(())
}

async fn discard(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = ?part, error = %e, "failed to remove partial frame");
    }
}

/// `NotFound` becomes `MissingSource`; other errors keep their cause
fn read_error(source: &SourceRef, path: &Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        return Error::MissingSource {
            reference: source.to_string(),
        };
    }
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("cannot read local frame '{}': {}", path.display(), e),
    ))
}

fn persist_error(path: &Path, e: std::io::Error) -> Error {
    Error::PersistFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// `frame_001.jpg` -> `frame_001.jpg.part`
fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
