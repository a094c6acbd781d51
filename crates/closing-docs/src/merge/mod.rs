//! Bounded-concurrency merge pipeline: queued jobs, per-loan trackers and
//! completion events.

pub mod events;
pub mod job;
pub mod orchestrator;
pub mod queue;
pub mod render;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use events::{spawn_event_logger, MergeEvent, MergeEventBus};
pub use job::{JobId, MergeHandle, MergeJob, MergeStatus};
pub use orchestrator::MergeOrchestrator;
pub use queue::MergeQueue;
pub use render::{JsonRenderer, OutputRenderer, PlainTextRenderer, RenderError};
pub use tracker::{MergeFailure, Tracker, TrackerStatus};

/// Failure of a single merge, caught at the job boundary.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("rendering merged document failed: {0}")]
    Render(#[from] RenderError),
    #[error("merge panicked: {0}")]
    Panicked(String),
    #[error("merge slots are closed")]
    Closed,
    #[error("job was dropped before it completed")]
    Abandoned,
}
