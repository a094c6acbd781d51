use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::{MergeEvent, MergeEventBus};
use super::job::{MergeJob, MergeStatus};
use super::queue::MergeQueue;
use super::render::{JsonRenderer, OutputRenderer};
use super::MergeError;
use crate::config::MergeConfig;
use crate::template::{TemplateDocument, TemplateProcessor, Value};

/// Shared by every job task of the orchestrator.
#[derive(Clone)]
struct Worker {
    processor: Arc<TemplateProcessor>,
    renderer: Arc<dyn OutputRenderer>,
    events: Arc<MergeEventBus>,
    slots: Arc<Semaphore>,
}

/// Polls the merge queue and runs drained jobs concurrently, at most
/// `max_concurrency` at a time.
pub struct MergeOrchestrator {
    queue: MergeQueue,
    worker: Worker,
    max_concurrency: usize,
    poll_interval: Duration,
}

impl MergeOrchestrator {
    pub fn new(queue: MergeQueue, events: Arc<MergeEventBus>, config: &MergeConfig) -> Self {
        let max_concurrency = config.max_concurrency.max(1);
        let processor = TemplateProcessor::new(config.root_name.clone())
            .with_max_extra_passes(config.max_extra_passes);
        Self {
            queue,
            worker: Worker {
                processor: Arc::new(processor),
                renderer: Arc::new(JsonRenderer),
                events,
                slots: Arc::new(Semaphore::new(max_concurrency)),
            },
            max_concurrency,
            poll_interval: config.poll_interval,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn OutputRenderer>) -> Self {
        self.worker.renderer = renderer;
        self
    }

    pub fn queue(&self) -> &MergeQueue {
        &self.queue
    }

    pub fn events(&self) -> &Arc<MergeEventBus> {
        &self.worker.events
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Poll until `cancel` fires, then run one last batch of whatever is
    /// still queued.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            max_concurrency = self.max_concurrency,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "merge orchestrator started"
        );

        loop {
            self.process_pending().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        let drained = self.process_pending().await;
        info!(drained, "merge orchestrator stopped");
    }

    /// Drain the queue and wait for the whole batch. Returns the number of
    /// jobs taken.
    pub async fn process_pending(&self) -> usize {
        let jobs = self.queue.drain();
        if jobs.is_empty() {
            return 0;
        }

        let count = jobs.len();
        debug!(jobs = count, "merge batch started");

        let mut batch = JoinSet::new();
        for job in jobs {
            batch.spawn(self.worker.clone().execute(job));
        }
        while let Some(joined) = batch.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "merge task did not finish");
            }
        }

        debug!(jobs = count, "merge batch finished");
        count
    }
}

impl Worker {
    async fn execute(self, mut job: MergeJob) {
        let document = std::mem::take(&mut job.document);
        let result = match self.slots.clone().acquire_owned().await {
            Ok(permit) => {
                let processor = Arc::clone(&self.processor);
                let renderer = Arc::clone(&self.renderer);
                let model = Arc::clone(&job.model);
                let merged = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    merge(&processor, renderer.as_ref(), document, &model)
                })
                .await;
                merged.unwrap_or_else(|err| Err(MergeError::Panicked(panic_message(err))))
            }
            Err(_) => Err(MergeError::Closed),
        };
        self.report(job, result);
    }

    fn report(&self, mut job: MergeJob, result: Result<Vec<u8>, MergeError>) {
        match &result {
            Ok(output) => {
                job.status = MergeStatus::Complete;
                info!(job_id = %job.id, key = %job.key, bytes = output.len(), "merge completed");
                if let Some(tracker) = &job.tracker {
                    tracker.record_success(job.key.clone(), output.clone());
                }
                self.events.publish(MergeEvent::Completed {
                    job_id: job.id.clone(),
                    key: job.key.clone(),
                    output: Arc::from(output.as_slice()),
                    at: Utc::now(),
                });
            }
            Err(err) => {
                job.status = MergeStatus::Error;
                error!(job_id = %job.id, key = %job.key, error = %err, "merge failed");
                if let Some(tracker) = &job.tracker {
                    tracker.record_failure(job.key.clone(), err.to_string());
                }
                self.events.publish(MergeEvent::Failed {
                    job_id: job.id.clone(),
                    key: job.key.clone(),
                    error: err.to_string(),
                    at: Utc::now(),
                });
            }
        }

        if let Some(completion) = job.completion.take() {
            if completion.send(result).is_err() {
                debug!(job_id = %job.id, "merge handle dropped before completion");
            }
        }
    }
}

fn merge(
    processor: &TemplateProcessor,
    renderer: &dyn OutputRenderer,
    mut document: TemplateDocument,
    model: &Value,
) -> Result<Vec<u8>, MergeError> {
    let report = processor.process_document(&mut document, model);
    if !report.is_clean() {
        warn!(document = %document.name, ?report, "merged with authoring defects");
    }
    Ok(renderer.render(&document)?)
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
