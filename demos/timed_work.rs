use allset::{BarrierBuilder, LoggingEventSink};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// Each job sleeps a random amount and then reports through its guard.
async fn do_something(
    n: u32,
    mut done: impl FnMut() -> allset::Result<allset::GuardOutcome> + Send,
) {
    let delay = fastrand::u64(0..100);
    tokio::time::sleep(Duration::from_millis(delay)).await;
    info!("N {} (after {}ms)", n, delay);
    if let Err(e) = done() {
        tracing::error!("job {} could not signal the barrier: {}", n, e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let after = BarrierBuilder::new()
        .label("timed-work")
        .event_sink(Arc::new(LoggingEventSink))
        .build(|| {
            info!("done");
            Ok(())
        })?;

    let mut jobs = Vec::new();
    for n in 1..=4 {
        let guard = after.guard()?.into_callback();
        jobs.push(tokio::spawn(do_something(n, guard)));
    }

    after.completed().await;
    futures::future::join_all(jobs).await;

    println!("{}", serde_json::to_string_pretty(&after.stats())?);
    Ok(())
}
