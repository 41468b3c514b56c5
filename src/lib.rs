//! # frame-prep
//!
//! Prepares batches of video frames for downstream vision-language model
//! inference.
//!
//! A caller submits an ordered list of frame references (remote URLs, paths
//! relative to an upstream base, or local files) or a single archive URL.
//! Every frame is materialized under a fresh job directory as
//! `frame_001.jpg`, `frame_002.jpg`, ... in request order. The completed job
//! is then projected as local paths, public URLs, an archive URL or the
//! archive bytes themselves.
//!
//! ## Quick Start
//!
//! ```no_run
//! use frame_prep::{Config, FrameRequest, JobCoordinator, OutputMode, ResultProjector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let coordinator = JobCoordinator::new(&config)?;
//!     let projector = ResultProjector::new(&config);
//!
//!     let request = FrameRequest::from_urls(&[
//!         "http://camera.local/frames/1.jpg",
//!         "http://camera.local/frames/2.jpg",
//!     ])?;
//!     let mut job = coordinator.create_job(request).await?;
//!
//!     let projection = projector.project(&mut job, OutputMode::LocalPaths).await?;
//!     println!("{:?}", projection);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Archive building and unpacking
pub mod archive;
/// Configuration types
pub mod config;
/// Job creation and frame materialization
pub mod coordinator;
/// Error types
pub mod error;
/// Frame retrieval from URLs and local paths
pub mod fetcher;
/// Output projections of completed jobs
pub mod projector;
/// Core domain types
pub mod types;

pub use config::{Config, FailedJobPolicy, FetchConfig, OutputConfig, ServerConfig, StorageConfig};
pub use coordinator::JobCoordinator;
pub use error::{ApiError, ArchiveError, Error, Result, ToHttpStatus};
pub use fetcher::{FrameFetcher, Location};
pub use projector::ResultProjector;
pub use types::{Frame, FrameRequest, Job, JobId, JobStatus, OutputMode, Projection, SourceRef};

/// Wait for Ctrl+C or, on unix, SIGTERM
///
/// Used as the graceful shutdown trigger for the API server; in-flight
/// requests are allowed to finish.
///
/// # Example
///
/// ```no_run
/// use frame_prep::{Config, api};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// api::start_api_server(config, frame_prep::shutdown_signal()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
