//! Application state for the API server

use crate::types::{Job, OutputMode, Projection};
use crate::{Config, JobCoordinator, ResultProjector, Result};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request. Jobs never share mutable state, so the coordinator and
/// projector are plain shared references.
#[derive(Clone)]
pub struct AppState {
    /// Creates jobs and materializes their frames
    pub coordinator: Arc<JobCoordinator>,

    /// Maps completed jobs onto the requested output
    pub projector: Arc<ResultProjector>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState from configuration
    pub fn new(config: Arc<Config>) -> Result<Self> {
        Ok(Self {
            coordinator: Arc::new(JobCoordinator::new(&config)?),
            projector: Arc::new(ResultProjector::new(&config)),
            config,
        })
    }

    /// Project `job` in `mode`, failing the job if that is impossible
    pub async fn project_or_abort(&self, job: &mut Job, mode: OutputMode) -> Result<Projection> {
        match self.projector.project(job, mode).await {
            Ok(projection) => Ok(projection),
            Err(e) => {
                self.coordinator.abort(job, &e).await;
                Err(e)
            }
        }
    }
}
