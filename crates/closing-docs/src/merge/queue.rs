use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::job::{JobId, MergeJob};

/// Pending merge jobs, shared between producers and the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct MergeQueue {
    jobs: Arc<Mutex<VecDeque<MergeJob>>>,
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, job: MergeJob) -> JobId {
        let id = job.id.clone();
        self.jobs
            .lock()
            .expect("merge queue mutex poisoned")
            .push_back(job);
        id
    }

    /// Take every pending job in arrival order.
    pub fn drain(&self) -> Vec<MergeJob> {
        self.jobs
            .lock()
            .expect("merge queue mutex poisoned")
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().expect("merge queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
