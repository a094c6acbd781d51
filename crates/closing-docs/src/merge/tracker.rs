use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("merge of '{key}' failed: {reason}")]
pub struct MergeFailure {
    pub key: String,
    pub reason: String,
}

/// Point-in-time view of a tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackerStatus {
    Pending {
        expected: usize,
        remaining: usize,
    },
    /// Output size in bytes per job key.
    Complete { documents: BTreeMap<String, usize> },
    Failed { failure: MergeFailure },
}

#[derive(Debug, Clone)]
enum Outcome {
    Complete(BTreeMap<String, Vec<u8>>),
    Failed(MergeFailure),
}

#[derive(Debug)]
struct State {
    expected: usize,
    remaining: usize,
    results: BTreeMap<String, Vec<u8>>,
    outcome: Option<Outcome>,
}

/// Fans `expected` job outcomes into one result. The first failure wins;
/// anything recorded after the terminal transition is ignored.
#[derive(Debug)]
pub struct Tracker {
    state: Mutex<State>,
    resolved: watch::Sender<bool>,
}

impl Tracker {
    pub fn new(expected: usize) -> Self {
        let outcome = (expected == 0).then(|| Outcome::Complete(BTreeMap::new()));
        let (resolved, _) = watch::channel(outcome.is_some());
        Self {
            state: Mutex::new(State {
                expected,
                remaining: expected,
                results: BTreeMap::new(),
                outcome,
            }),
            resolved,
        }
    }

    pub fn expected(&self) -> usize {
        self.state.lock().expect("tracker mutex poisoned").expected
    }

    pub fn is_resolved(&self) -> bool {
        *self.resolved.borrow()
    }

    /// Record one successful merge. Returns `false` when ignored.
    pub fn record_success(&self, key: impl Into<String>, output: Vec<u8>) -> bool {
        let key = key.into();
        let mut state = self.state.lock().expect("tracker mutex poisoned");
        if state.outcome.is_some() {
            debug!(key = %key, "tracker already resolved; completion ignored");
            return false;
        }

        state.results.insert(key, output);
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            let results = std::mem::take(&mut state.results);
            state.outcome = Some(Outcome::Complete(results));
            self.resolved.send_replace(true);
        }
        true
    }

    /// Record a failed merge, resolving the tracker as failed. Returns `false`
    /// when ignored.
    pub fn record_failure(&self, key: impl Into<String>, reason: impl Into<String>) -> bool {
        let failure = MergeFailure {
            key: key.into(),
            reason: reason.into(),
        };
        let mut state = self.state.lock().expect("tracker mutex poisoned");
        if state.outcome.is_some() {
            debug!(key = %failure.key, "tracker already resolved; failure ignored");
            return false;
        }

        state.results.clear();
        state.outcome = Some(Outcome::Failed(failure));
        self.resolved.send_replace(true);
        true
    }

    /// Wait until every expected job completed, or any one failed.
    pub async fn when_all_merged(&self) -> Result<BTreeMap<String, Vec<u8>>, MergeFailure> {
        let mut resolved = self.resolved.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = resolved.wait_for(|done| *done).await;

        let state = self.state.lock().expect("tracker mutex poisoned");
        match &state.outcome {
            Some(Outcome::Complete(results)) => Ok(results.clone()),
            Some(Outcome::Failed(failure)) => Err(failure.clone()),
            None => Err(MergeFailure {
                key: String::new(),
                reason: "tracker resolved without an outcome".to_string(),
            }),
        }
    }

    pub fn snapshot(&self) -> TrackerStatus {
        let state = self.state.lock().expect("tracker mutex poisoned");
        match &state.outcome {
            None => TrackerStatus::Pending {
                expected: state.expected,
                remaining: state.remaining,
            },
            Some(Outcome::Complete(results)) => TrackerStatus::Complete {
                documents: results
                    .iter()
                    .map(|(key, output)| (key.clone(), output.len()))
                    .collect(),
            },
            Some(Outcome::Failed(failure)) => TrackerStatus::Failed {
                failure: failure.clone(),
            },
        }
    }
}
