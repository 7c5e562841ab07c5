//! Barrier driven from tokio tasks

use allset::{create_barrier, BarrierBuilder, BarrierEvent, BufferingEventSink};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn test_timed_jobs_release_completion_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(Mutex::new(Vec::new()));

    let counter = calls.clone();
    let after = create_barrier(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let delays = [40u64, 5, 25, 15];
    let tasks = delays.iter().enumerate().map(|(n, &delay)| {
        let guard = after.guard().unwrap();
        let finished = finished.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            finished.lock().unwrap().push(n);
            guard.invoke().unwrap()
        })
    });
    let tasks: Vec<_> = tasks.collect();
    assert_eq!(after.pending(), 4);

    tokio::time::timeout(Duration::from_secs(2), after.completed())
        .await
        .expect("all jobs should finish");

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(outcomes.iter().filter(|o| o.is_completed()).count(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(finished.lock().unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_tasks_on_multi_thread_runtime() {
    let sink = BufferingEventSink::new();
    let after = BarrierBuilder::new()
        .label("fan-out")
        .hardened()
        .event_sink(Arc::new(sink.clone()))
        .build(|| Ok(()))
        .unwrap();

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let guard = after.guard().unwrap();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(i % 7)).await;
                guard.invoke().unwrap();
            })
        })
        .collect();

    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert!(after.is_done());
    let stats = after.stats();
    assert_eq!(stats.issued, 200);
    assert_eq!(stats.invoked, 200);
    assert_eq!(stats.fire_count, 1);

    let completions = sink
        .kinds()
        .into_iter()
        .filter(|e| matches!(e, BarrierEvent::Completed { .. }))
        .count();
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn test_waiter_registered_after_fire_still_resolves() {
    let after = create_barrier(|| Ok(()));
    after.guard().unwrap().invoke().unwrap();
    tokio::time::timeout(Duration::from_millis(100), after.completed())
        .await
        .expect("already-fired barrier should resolve immediately");
}

#[tokio::test]
async fn test_completed_resolves_after_completion_panic() {
    let after = BarrierBuilder::new()
        .hardened()
        .build(|| panic!("boom"))
        .unwrap();
    let g = after.guard().unwrap();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| g.invoke()));
    assert!(result.is_err());

    tokio::time::timeout(Duration::from_millis(200), after.completed())
        .await
        .expect("a panicking completion still counts as fired");
    assert_eq!(after.fire_count(), 1);
}
