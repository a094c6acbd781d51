use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use super::tracker::Tracker;
use super::MergeError;
use crate::template::{TemplateDocument, Value};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    fn next() -> Self {
        let id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("merge-{id:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    Pending,
    Complete,
    Error,
}

pub(crate) type Completion = Result<Vec<u8>, MergeError>;

/// One template merged against one data model.
///
/// Owned by the queue until drained, then by the single task that merges it.
#[derive(Debug)]
pub struct MergeJob {
    pub id: JobId,
    /// Key of the output in the tracker's result map.
    pub key: String,
    pub document: TemplateDocument,
    pub model: Arc<Value>,
    pub status: MergeStatus,
    pub(crate) tracker: Option<Arc<Tracker>>,
    pub(crate) completion: Option<oneshot::Sender<Completion>>,
}

impl MergeJob {
    pub fn new(key: impl Into<String>, document: TemplateDocument, model: Arc<Value>) -> Self {
        Self {
            id: JobId::next(),
            key: key.into(),
            document,
            model,
            status: MergeStatus::Pending,
            tracker: None,
            completion: None,
        }
    }

    /// Report this job's outcome to `tracker`.
    pub fn with_tracker(mut self, tracker: Arc<Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Future resolving with this job's output. A later call replaces the
    /// earlier handle, which then resolves as abandoned.
    pub fn handle(&mut self) -> MergeHandle {
        let (sender, receiver) = oneshot::channel();
        self.completion = Some(sender);
        MergeHandle {
            job_id: self.id.clone(),
            receiver,
        }
    }
}

#[derive(Debug)]
pub struct MergeHandle {
    job_id: JobId,
    receiver: oneshot::Receiver<Completion>,
}

impl MergeHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub async fn wait(self) -> Result<Vec<u8>, MergeError> {
        self.receiver.await.map_err(|_| MergeError::Abandoned)?
    }
}
