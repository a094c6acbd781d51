use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::job::JobId;

/// Outcome of one merge, fanned out to every subscriber.
#[derive(Debug, Clone)]
pub enum MergeEvent {
    Completed {
        job_id: JobId,
        key: String,
        output: Arc<[u8]>,
        at: DateTime<Utc>,
    },
    Failed {
        job_id: JobId,
        key: String,
        error: String,
        at: DateTime<Utc>,
    },
}

impl MergeEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            MergeEvent::Completed { job_id, .. } | MergeEvent::Failed { job_id, .. } => job_id,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            MergeEvent::Completed { key, .. } | MergeEvent::Failed { key, .. } => key,
        }
    }
}

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out of merge events over a broadcast channel.
///
/// Slow subscribers lose the oldest events and observe `RecvError::Lagged`.
#[derive(Debug)]
pub struct MergeEventBus {
    sender: broadcast::Sender<MergeEvent>,
}

impl MergeEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers; dropped when there are none.
    pub fn publish(&self, event: MergeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MergeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Log every merge outcome until the bus is dropped.
pub fn spawn_event_logger(bus: &MergeEventBus) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(MergeEvent::Completed {
                    job_id, key, output, ..
                }) => {
                    info!(job_id = %job_id, key = %key, bytes = output.len(), "document ready for delivery");
                }
                Ok(MergeEvent::Failed {
                    job_id, key, error, ..
                }) => {
                    warn!(job_id = %job_id, key = %key, error = %error, "document merge failed");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "merge event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

impl Default for MergeEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
