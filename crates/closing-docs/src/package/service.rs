use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::info;

use super::adapter::{AdapterError, DocumentAdapter};
use super::source::{SourceError, TemplateSource};
use crate::merge::{JobId, MergeFailure, MergeJob, MergeQueue, Tracker, TrackerStatus};
use crate::rules::{DocumentId, EvaluationContext, LoanType, RuleEvaluator};
use crate::template::Value;

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("no template stored for document '{0}'")]
    TemplateNotFound(DocumentId),
    #[error("no package dispatched for loan '{0}'")]
    UnknownLoan(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("template could not be read: {0}")]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Merge(#[from] MergeFailure),
}

/// Acknowledgement of a dispatched package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReceipt {
    pub loan_id: String,
    pub document_ids: Vec<DocumentId>,
    pub jobs: Vec<JobId>,
}

/// Turns a loan into queued merge jobs and tracks each loan's package.
pub struct ClosingPackageService<S, D> {
    source: Arc<S>,
    adapter: Arc<D>,
    queue: MergeQueue,
    evaluator: RuleEvaluator,
    trackers: Mutex<HashMap<String, Arc<Tracker>>>,
}

impl<S, D> ClosingPackageService<S, D>
where
    S: TemplateSource + 'static,
    D: DocumentAdapter + 'static,
{
    pub fn new(source: Arc<S>, adapter: Arc<D>, queue: MergeQueue) -> Self {
        Self {
            source,
            adapter,
            queue,
            evaluator: RuleEvaluator::new(),
            trackers: Mutex::new(HashMap::new()),
        }
    }

    /// Select documents for the loan and enqueue one merge per document.
    ///
    /// Every template is resolved before anything is enqueued, so a missing
    /// template leaves the queue untouched. Dispatching the same loan again
    /// replaces its tracker.
    pub fn dispatch(
        &self,
        loan_id: &str,
        loan_type: &LoanType,
        context: &EvaluationContext,
        model: Value,
    ) -> Result<DispatchReceipt, PackageError> {
        let selection = self.evaluator.evaluate(loan_type, context);

        let mut documents = Vec::with_capacity(selection.document_ids.len());
        for id in &selection.document_ids {
            let bytes = self
                .source
                .fetch(id)?
                .ok_or_else(|| PackageError::TemplateNotFound(id.clone()))?;
            let mut document = self.adapter.read(&bytes)?;
            if document.name.is_empty() {
                document.name = id.to_string();
            }
            documents.push((id, document));
        }

        let tracker = Arc::new(Tracker::new(documents.len()));
        let model = Arc::new(model);
        let jobs = documents
            .into_iter()
            .map(|(id, document)| {
                self.queue.enqueue(
                    MergeJob::new(id.as_str(), document, Arc::clone(&model))
                        .with_tracker(Arc::clone(&tracker)),
                )
            })
            .collect::<Vec<_>>();

        self.trackers
            .lock()
            .expect("tracker registry mutex poisoned")
            .insert(loan_id.to_string(), tracker);

        info!(
            loan_id,
            loan_type = %loan_type.name,
            documents = selection.document_ids.len(),
            "closing package dispatched"
        );

        Ok(DispatchReceipt {
            loan_id: loan_id.to_string(),
            document_ids: selection.document_ids,
            jobs,
        })
    }

    pub fn tracker(&self, loan_id: &str) -> Option<Arc<Tracker>> {
        self.trackers
            .lock()
            .expect("tracker registry mutex poisoned")
            .get(loan_id)
            .cloned()
    }

    pub fn status(&self, loan_id: &str) -> Result<TrackerStatus, PackageError> {
        self.tracker(loan_id)
            .map(|tracker| tracker.snapshot())
            .ok_or_else(|| PackageError::UnknownLoan(loan_id.to_string()))
    }

    /// Wait for every document of the loan's package.
    pub async fn results(&self, loan_id: &str) -> Result<BTreeMap<String, Vec<u8>>, PackageError> {
        let tracker = self
            .tracker(loan_id)
            .ok_or_else(|| PackageError::UnknownLoan(loan_id.to_string()))?;
        Ok(tracker.when_all_merged().await?)
    }
}
