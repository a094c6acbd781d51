use std::sync::Arc;

use crate::merge::{MergeFailure, Tracker, TrackerStatus};

#[tokio::test]
async fn any_failure_fails_the_whole_batch() {
    let tracker = Tracker::new(3);

    assert!(tracker.record_success("note", b"n".to_vec()));
    assert!(tracker.record_success("deed", b"d".to_vec()));
    assert!(tracker.record_failure("rider", "template exploded"));

    let outcome = tracker.when_all_merged().await;
    assert_eq!(
        outcome,
        Err(MergeFailure {
            key: "rider".to_string(),
            reason: "template exploded".to_string(),
        })
    );
}

#[tokio::test]
async fn completes_with_every_output() {
    let tracker = Tracker::new(2);
    assert_eq!(
        tracker.snapshot(),
        TrackerStatus::Pending {
            expected: 2,
            remaining: 2
        }
    );

    tracker.record_success("note", b"abc".to_vec());
    assert!(!tracker.is_resolved());
    tracker.record_success("deed", b"de".to_vec());

    let results = tracker.when_all_merged().await.expect("all merged");
    assert_eq!(results.len(), 2);
    assert_eq!(results["note"], b"abc".to_vec());
    match tracker.snapshot() {
        TrackerStatus::Complete { documents } => assert_eq!(documents["deed"], 2),
        other => panic!("unexpected status {other:?}"),
    }
}

#[tokio::test]
async fn empty_batch_resolves_immediately() {
    let tracker = Tracker::new(0);
    assert!(tracker.is_resolved());
    assert_eq!(tracker.when_all_merged().await, Ok(Default::default()));
}

#[tokio::test]
async fn records_after_resolution_are_ignored() {
    let tracker = Tracker::new(1);
    assert!(tracker.record_failure("note", "bad"));
    assert!(!tracker.record_success("note", b"late".to_vec()));
    assert!(!tracker.record_failure("note", "worse"));

    let failure = tracker.when_all_merged().await.expect_err("failed");
    assert_eq!(failure.reason, "bad");

    let done = Tracker::new(1);
    assert!(done.record_success("note", Vec::new()));
    assert!(!done.record_failure("note", "too late"));
    assert!(done.when_all_merged().await.is_ok());
}

#[tokio::test]
async fn waiters_wake_when_resolved_elsewhere() {
    let tracker = Arc::new(Tracker::new(2));
    let waiter = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.when_all_merged().await })
    };

    tokio::task::yield_now().await;
    tracker.record_success("a", vec![1]);
    tracker.record_success("b", vec![2]);

    let results = waiter.await.expect("join").expect("merged");
    assert_eq!(results.keys().collect::<Vec<_>>(), vec!["a", "b"]);
}
