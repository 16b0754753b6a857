//! # Example: recurring_job
//!
//! A job that runs every 200ms until it has succeeded five times, with a
//! per-execution timeout and a parent context that is cancelled from outside.
//!
//! ## Flow
//! ```text
//! Instance::start(ctx)
//!   ├─► run #1 → Ok  ─► wait period (200ms)
//!   ├─► run #2 → Ok  ─► wait period
//!   ├─► ...
//!   └─► run #5 → Ok  ─► run limit reached, stream closes
//!
//! (Ctrl-C cancels the parent context: the stream yields "context canceled" and closes.)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example recurring_job
//! ```

use std::time::Duration;

use runvisor::{Context, ContextError, Instance, Options, RunnableFn, RunnableRef, TaskError};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Parent context driven by an external token
    let shutdown = CancellationToken::new();
    let parent = Context::from_token(shutdown.clone()).with_value("job", "report");

    // 2. The unit of work: reads a scoped value and honours its context
    let report: RunnableRef = RunnableFn::arc("report", |ctx: Context| async move {
        let job = ctx.value::<&str>("job").copied().unwrap_or("?");
        tokio::select! {
            _ = ctx.cancelled() => Err(TaskError::from(ctx.err().unwrap_or(ContextError::Canceled))),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                println!("[{job}] generated");
                Ok(())
            }
        }
    });

    // 3. Recur every 200ms, five successful runs, 1s budget per run
    let opts = Options::builder()
        .with_recur(true)
        .with_period(Duration::from_millis(200))
        .with_run_limit(5)
        .with_timeout(Duration::from_secs(1))
        .build();

    let inst = Instance::new(report, opts);
    let mut outcomes = inst
        .start(&parent)
        .ok_or_else(|| anyhow::anyhow!("instance already started"))?;

    // 4. Ctrl-C style stop: cancel the parent after a while
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        shutdown.cancel();
    });

    while let Some(err) = outcomes.recv().await {
        println!("[main] error: {err} ({})", err.as_label());
    }

    println!("[main] done after {} runs, state={:?}", inst.runs(), inst.state());
    Ok(())
}
