use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::common::*;
use crate::merge::{MergeError, MergeEvent, MergeJob, PlainTextRenderer, Tracker};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_merges_never_exceed_the_limit() {
    let renderer = Arc::new(GaugedRenderer::default());
    let orchestrator = orchestrator(2).with_renderer(renderer.clone());
    let tracker = Arc::new(Tracker::new(5));

    for index in 0..5 {
        let name = format!("doc-{index}");
        orchestrator.queue().enqueue(
            MergeJob::new(name.clone(), document(&name, "x"), model())
                .with_tracker(Arc::clone(&tracker)),
        );
    }

    assert_eq!(orchestrator.process_pending().await, 5);

    assert_eq!(renderer.rendered.load(Ordering::SeqCst), 5);
    assert!(renderer.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(renderer.in_flight.load(Ordering::SeqCst), 0);
    let results = tracker.when_all_merged().await.expect("all merged");
    assert_eq!(results.len(), 5);
    assert_eq!(results["doc-3"], b"doc-3".to_vec());
}

#[tokio::test]
async fn merged_output_reaches_handle_and_subscribers() {
    let orchestrator = orchestrator(4).with_renderer(Arc::new(PlainTextRenderer));
    let mut events = orchestrator.events().subscribe();

    let mut job = MergeJob::new("letter", document("letter", "Dear {Loan.Borrower},"), model());
    let handle = job.handle();
    let job_id = orchestrator.queue().enqueue(job);

    orchestrator.process_pending().await;

    assert_eq!(handle.wait().await.expect("merged"), b"Dear Ada,".to_vec());
    let event = events.recv().await.expect("event");
    assert_eq!(event.job_id(), &job_id);
    match event {
        MergeEvent::Completed { key, output, .. } => {
            assert_eq!(key, "letter");
            assert_eq!(&*output, b"Dear Ada,");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn panicking_merge_fails_only_its_batch() {
    let orchestrator = orchestrator(2).with_renderer(Arc::new(FragileRenderer));
    let mut events = orchestrator.events().subscribe();
    let failing = Arc::new(Tracker::new(2));
    let healthy = Arc::new(Tracker::new(1));

    let mut boom = MergeJob::new("boom", document("boom", "x"), model())
        .with_tracker(Arc::clone(&failing));
    let boom_handle = boom.handle();
    orchestrator.queue().enqueue(boom);
    orchestrator.queue().enqueue(
        MergeJob::new("fine", document("fine", "x"), model()).with_tracker(Arc::clone(&failing)),
    );
    orchestrator.queue().enqueue(
        MergeJob::new("other", document("other", "x"), model())
            .with_tracker(Arc::clone(&healthy)),
    );

    orchestrator.process_pending().await;

    match boom_handle.wait().await {
        Err(MergeError::Panicked(message)) => assert!(message.contains("renderer exploded")),
        other => panic!("unexpected outcome {other:?}"),
    }
    let failure = failing.when_all_merged().await.expect_err("batch failed");
    assert_eq!(failure.key, "boom");
    assert!(healthy.when_all_merged().await.is_ok());

    let mut failed = 0;
    for _ in 0..3 {
        if let MergeEvent::Failed { .. } = events.recv().await.expect("event") {
            failed += 1;
        }
    }
    assert_eq!(failed, 1);
}

#[tokio::test]
async fn cancelled_loop_drains_queued_jobs() {
    let orchestrator = Arc::new(orchestrator(2));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut job = MergeJob::new("late", document("late", "x"), model());
    let handle = job.handle();
    orchestrator.queue().enqueue(job);

    orchestrator.run(cancel).await;

    assert!(handle.wait().await.is_ok());
    assert!(orchestrator.queue().is_empty());
}

#[tokio::test]
async fn running_loop_picks_up_new_jobs() {
    let orchestrator = Arc::new(orchestrator(2));
    let cancel = CancellationToken::new();
    let runner = {
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run(cancel).await })
    };

    let mut job = MergeJob::new("polled", document("polled", "x"), model());
    let handle = job.handle();
    orchestrator.queue().enqueue(job);

    assert!(handle.wait().await.is_ok());
    cancel.cancel();
    runner.await.expect("orchestrator loop");
}
