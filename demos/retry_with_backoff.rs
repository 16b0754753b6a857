//! # Example: retry_with_backoff
//!
//! A flaky job that fails twice before succeeding, restarted with exponential
//! backoff and equal jitter. Lifecycle events are printed by [`LogWriter`].
//!
//! ## Flow
//! ```text
//! InstanceActor::run()
//!   ├─► RunStarting(attempt=1) → RunFailed("boom #1")
//!   ├─► NextRunScheduled{delay≈100ms, Failure}
//!   ├─► RunStarting(attempt=2) → RunFailed("boom #2")
//!   ├─► NextRunScheduled{delay≈200ms, Failure}
//!   ├─► RunStarting(attempt=3) → RunSucceeded
//!   └─► InstanceExhausted("completed") → InstanceStopped
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example retry_with_backoff --features logging
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use runvisor::{
    Backoff, Bus, Context, ExponentialBackoff, Instance, JitterPolicy, LogWriter, RunOption,
    RunnableFn, RunnableRef, Subscribe, SubscriberSet, TaskError,
};

static FAIL_COUNT: AtomicU64 = AtomicU64::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Event bus with a stdout subscriber
    let bus = Bus::new(100);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut set = SubscriberSet::new(subs, bus.clone());
    set.listen();

    // 2. A job that fails 2 times before succeeding
    let flaky: RunnableRef = RunnableFn::arc("flaky", |_ctx: Context| async move {
        let attempt = FAIL_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt <= 2 {
            Err(TaskError::fail(format!("boom #{attempt}")))
        } else {
            Ok(())
        }
    });

    // 3. Exponential backoff with equal jitter
    let backoff = Backoff::exponential(ExponentialBackoff {
        first: Duration::from_millis(100),
        max: Duration::from_secs(2),
        factor: 2.0,
        jitter: JitterPolicy::Equal,
    });

    // 4. Restart on failure, at most 5 consecutive failures
    let inst = Instance::with_options(
        flaky,
        [
            RunOption::ChanBuffer(8),
            RunOption::Restart(true),
            RunOption::RestartLimit(5, Some(backoff)),
        ],
    )
    .with_bus(bus);

    let errors = inst
        .start(&Context::background())
        .ok_or_else(|| anyhow::anyhow!("instance already started"))?
        .collect_all()
        .await;

    // 5. Let the subscriber drain before printing the summary
    tokio::time::sleep(Duration::from_millis(50)).await;
    set.shutdown().await;

    println!(
        "[main] done: {} errors, runs={}, failures={}",
        errors.len(),
        inst.runs(),
        inst.failures()
    );
    Ok(())
}
