//! Engine behaviour driven by a scripted runnable.
//!
//! Time is paused in every test, so delays are exact up to timer granularity.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{self, Instant};

use crate::{
    Backoff, BoxRunFuture, Bus, Context, EventKind, Instance, InstanceState, Options, ResetMode,
    RunOption, Runnable, RunnableRef, TaskError,
};

const TOLERANCE: Duration = Duration::from_millis(5);

enum Reply {
    Ok,
    Fail(u32),
    Panic(&'static str),
    PanicCode(u32),
}

struct Call {
    reply: Reply,
    wait: Duration,
}

impl Call {
    /// Simulated work before replying.
    fn after(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }
}

fn ok() -> Call {
    Call {
        reply: Reply::Ok,
        wait: Duration::ZERO,
    }
}

fn fail(n: u32) -> Call {
    Call {
        reply: Reply::Fail(n),
        wait: Duration::ZERO,
    }
}

fn panics(msg: &'static str) -> Call {
    Call {
        reply: Reply::Panic(msg),
        wait: Duration::ZERO,
    }
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    called_at: Instant,
    returned_at: Instant,
    deadline: Option<Instant>,
    tenant: Option<u32>,
}

#[derive(Default)]
struct ScriptState {
    pending: VecDeque<Call>,
    seen: Vec<Seen>,
}

/// Runnable replaying a fixed list of replies; an extra call panics.
#[derive(Clone)]
struct Script(Arc<Mutex<ScriptState>>);

impl Script {
    fn new(calls: impl IntoIterator<Item = Call>) -> Self {
        Script(Arc::new(Mutex::new(ScriptState {
            pending: calls.into_iter().collect(),
            seen: Vec::new(),
        })))
    }

    fn runnable(&self) -> RunnableRef {
        Arc::new(self.clone())
    }

    fn seen(&self) -> Vec<Seen> {
        self.0.lock().unwrap().seen.clone()
    }

    fn remaining(&self) -> usize {
        self.0.lock().unwrap().pending.len()
    }
}

impl Runnable for Script {
    fn name(&self) -> &str {
        "script"
    }

    fn spawn(&self, ctx: Context) -> BoxRunFuture {
        let state = Arc::clone(&self.0);
        Box::pin(async move {
            let called_at = Instant::now();
            let next = state.lock().unwrap().pending.pop_front();
            let call = next.expect("unexpected call");

            if !call.wait.is_zero() {
                time::sleep(call.wait).await;
            }
            state.lock().unwrap().seen.push(Seen {
                called_at,
                returned_at: Instant::now(),
                deadline: ctx.deadline(),
                tenant: ctx.value::<u32>("tenant").copied(),
            });

            match call.reply {
                Reply::Ok => Ok(()),
                Reply::Fail(n) => Err(TaskError::fail(format!("test error: {n}"))),
                Reply::Panic(msg) => panic!("{msg}"),
                Reply::PanicCode(code) => std::panic::panic_any(code),
            }
        })
    }
}

fn opts<const N: usize>(list: [RunOption; N]) -> Options {
    Options::from_iter(list)
}

fn test_errors(ns: &[u32]) -> Vec<String> {
    ns.iter().map(|n| format!("test error: {n}")).collect()
}

/// Starts an instance and drains its stream to the end.
async fn run_script(script: &Script, options: Options, parent: &Context) -> (Instance, Vec<String>) {
    let inst = Instance::new(script.runnable(), options);
    let out = inst.start(parent).expect("first start returns a stream");
    let errs = out
        .collect_all()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();
    (inst, errs)
}

fn assert_gap(from: Instant, to: Instant, expected: Duration) {
    let gap = to - from;
    assert!(
        gap >= expected && gap <= expected + TOLERANCE,
        "gap {gap:?}, expected {expected:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_default_runs_once() {
    let script = Script::new([ok()]);
    let (inst, errs) = run_script(&script, Options::default(), &Context::background()).await;

    assert!(errs.is_empty());
    assert_eq!(script.seen().len(), 1);
    assert_eq!(inst.state(), InstanceState::Terminated);
    assert_eq!(inst.runs(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_default_failure_runs_once() {
    let script = Script::new([fail(1)]);
    let (inst, errs) = run_script(&script, Options::default(), &Context::background()).await;

    assert_eq!(errs, test_errors(&[1]));
    assert_eq!(inst.runs(), 0);
    assert_eq!(inst.failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_returns_none() {
    let script = Script::new([ok()]);
    let inst = Instance::new(script.runnable(), Options::default());
    assert_eq!(inst.state(), InstanceState::NotStarted);

    let ctx = Context::background();
    let first = inst.start(&ctx).expect("first start");
    assert!(inst.start(&ctx).is_none());
    assert!(first.collect_all().await.is_empty());

    assert!(inst.start(&ctx).is_none());
    assert_eq!(script.seen().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_launches_once() {
    let script = Script::new([ok()]);
    let inst = Arc::new(Instance::new(script.runnable(), Options::default()));
    let ctx = Context::background();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let inst = Arc::clone(&inst);
            let ctx = ctx.clone();
            tokio::spawn(async move { inst.start(&ctx) })
        })
        .collect();

    let mut streams = Vec::new();
    for h in handles {
        if let Some(out) = h.await.unwrap() {
            streams.push(out);
        }
    }
    assert_eq!(streams.len(), 1);
    assert!(streams.pop().unwrap().collect_all().await.is_empty());
    assert_eq!(script.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recurring_without_error_runs_until_limit() {
    let script = Script::new((0..5).map(|_| ok()));
    let o = opts([RunOption::Recur(true), RunOption::RunLimit(5)]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert!(errs.is_empty());
    assert_eq!(script.seen().len(), 5);
    assert_eq!(inst.runs(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_recurring_stops_on_error() {
    let script = Script::new([ok(), ok(), fail(1)]);
    let o = opts([RunOption::Recur(true), RunOption::RunLimit(5)]);
    let (_, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, test_errors(&[1]));
    assert_eq!(script.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restartable_with_error_runs_until_limit() {
    let script = Script::new([fail(1), fail(2), fail(3)]);
    let o = opts([
        RunOption::Restart(true),
        RunOption::RestartLimit(3, Some(Backoff::constant(Duration::ZERO))),
    ]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, test_errors(&[1, 2, 3]));
    assert_eq!(inst.failures(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_restartable_stops_on_success() {
    let script = Script::new([ok()]);
    let o = opts([RunOption::Restart(true), RunOption::RestartLimit(3, None)]);
    let (_, errs) = run_script(&script, o, &Context::background()).await;

    assert!(errs.is_empty());
    assert_eq!(script.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recurring_restartable_runs_until_limit_successes() {
    let script = Script::new([ok(), fail(1), ok(), ok()]);
    let o = opts([
        RunOption::Recur(true),
        RunOption::RunLimit(3),
        RunOption::Restart(true),
        RunOption::RestartLimit(2, None),
    ]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, test_errors(&[1]));
    assert_eq!(script.remaining(), 0);
    assert_eq!(inst.runs(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failures_by_default() {
    let script = Script::new([
        ok(),
        fail(1),
        ok(),
        fail(2),
        ok(),
        fail(3),
        ok(),
        ok(),
    ]);
    let o = opts([
        RunOption::Recur(true),
        RunOption::RunLimit(5),
        RunOption::Restart(true),
        RunOption::RestartLimit(3, None),
        RunOption::ResetOnSuccess(true),
    ]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, test_errors(&[1, 2, 3]));
    assert_eq!(script.remaining(), 0);
    assert_eq!(inst.failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failures_even_without_flag() {
    let script = Script::new([ok(), fail(1), ok(), fail(2), ok()]);
    let o = opts([
        RunOption::Recur(true),
        RunOption::RunLimit(3),
        RunOption::Restart(true),
        RunOption::RestartLimit(2, None),
    ]);
    let (_, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, test_errors(&[1, 2]));
    assert_eq!(script.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_gated_reset_accumulates_failures() {
    let script = Script::new([ok(), fail(1), ok(), fail(2), ok()]);
    let o = opts([
        RunOption::Recur(true),
        RunOption::RunLimit(3),
        RunOption::Restart(true),
        RunOption::RestartLimit(2, None),
        RunOption::ResetMode(ResetMode::WhenConfigured),
    ]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, test_errors(&[1, 2]));
    assert_eq!(script.remaining(), 1, "second failure exhausts the restart budget");
    assert_eq!(inst.runs(), 2);
    assert_eq!(inst.failures(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_recoverable_does_not_panic() {
    let script = Script::new([panics("panic message")]);
    let o = opts([RunOption::Recover(true)]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, ["runnable panic: panic message"]);
    assert_eq!(inst.state(), InstanceState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_recurring_recoverable_stops_on_panic() {
    let script = Script::new([ok(), ok(), panics("panic message"), ok()]);
    let o = opts([
        RunOption::Recur(true),
        RunOption::Restart(true),
        RunOption::Recover(true),
    ]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, ["runnable panic: panic message"]);
    assert_eq!(script.remaining(), 1);
    assert_eq!(inst.runs(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_uncontained_panic_resurfaces_on_join() {
    let script = Script::new([ok(), panics("boom"), ok()]);
    let o = opts([RunOption::Recur(true)]);
    let (inst, errs) = run_script(&script, o, &Context::background()).await;

    assert!(errs.is_empty());
    assert_eq!(script.remaining(), 1);
    assert_eq!(inst.state(), InstanceState::Terminated);

    let payload = AssertUnwindSafe(inst.join())
        .catch_unwind()
        .await
        .expect_err("join re-raises the panic");
    assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("boom"));

    // The handle is consumed by the first join.
    inst.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_clean_exit_join_returns() {
    let script = Script::new([ok()]);
    let (inst, errs) = run_script(&script, Options::default(), &Context::background()).await;
    assert!(errs.is_empty());
    inst.join().await;

    let idle = Instance::new(script.runnable(), Options::default());
    idle.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_contained_panic_keeps_non_string_value() {
    let script = Script::new([Call {
        reply: Reply::PanicCode(42),
        wait: Duration::ZERO,
    }]);
    let (inst, errs) = run_script(&script, opts([RunOption::Recover(true)]), &Context::background()).await;

    assert_eq!(errs, ["runnable panic: 42"]);
    inst.join().await;
}

#[test]
fn test_start_outside_runtime_launches_nothing() {
    let script = Script::new([ok()]);
    let inst = Instance::new(script.runnable(), Options::default());

    assert!(inst.start(&Context::background()).is_none());
    assert_eq!(inst.state(), InstanceState::NotStarted);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let errs = rt.block_on(async {
        inst.start(&Context::background())
            .expect("start inside a runtime")
            .collect_all()
            .await
    });
    assert!(errs.is_empty());
    assert_eq!(script.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_nil_runnable() {
    let inst = Instance::new(None::<RunnableRef>, opts([RunOption::Recover(true)]));
    assert_eq!(inst.name(), "nil");
    let errs = inst
        .start(&Context::background())
        .unwrap()
        .collect_all()
        .await;
    assert_eq!(errs.len(), 1);
    assert!(errs[0].is_panic());
    assert_eq!(
        errs[0].to_string(),
        "runnable panic: attempted to run a nil Runnable"
    );

    let inst = Instance::new(None::<RunnableRef>, Options::default());
    let errs = inst
        .start(&Context::background())
        .unwrap()
        .collect_all()
        .await;
    assert!(errs.is_empty());
    assert_eq!(inst.state(), InstanceState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_runnable_context_contains_parent_values() {
    let script = Script::new([ok()]);
    let parent = Context::background().with_value("tenant", 42u32);
    let (_, errs) = run_script(&script, Options::default(), &parent).await;

    assert!(errs.is_empty());
    assert_eq!(script.seen()[0].tenant, Some(42));
}

#[tokio::test(start_paused = true)]
async fn test_runnable_context_with_timeout() {
    let script = Script::new([ok()]);
    let o = opts([RunOption::Timeout(Duration::from_secs(3))]);
    run_script(&script, o, &Context::background()).await;

    let seen = script.seen()[0];
    assert_eq!(seen.deadline, Some(seen.called_at + Duration::from_secs(3)));
}

#[tokio::test(start_paused = true)]
async fn test_runnable_context_without_timeout_has_no_deadline() {
    let script = Script::new([ok()]);
    run_script(&script, Options::default(), &Context::background()).await;

    assert_eq!(script.seen()[0].deadline, None);
}

#[tokio::test(start_paused = true)]
async fn test_parent_deadline_caps_execution_timeout() {
    let script = Script::new([ok()]);
    let (parent, _guard) = Context::background().with_timeout(Duration::from_secs(1));
    let o = opts([RunOption::Timeout(Duration::from_secs(3))]);
    run_script(&script, o, &parent).await;

    assert_eq!(script.seen()[0].deadline, parent.deadline());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_does_not_interrupt_runnable() {
    let script = Script::new([ok().after(Duration::from_millis(100))]);
    let bus = Bus::new(64);
    let mut events = bus.subscribe();

    let inst = Instance::with_options(
        script.runnable(),
        [RunOption::Timeout(Duration::from_millis(50))],
    )
    .with_bus(bus);
    let errs = inst
        .start(&Context::background())
        .unwrap()
        .collect_all()
        .await;

    assert!(errs.is_empty());
    let seen = script.seen()[0];
    assert_gap(seen.called_at, seen.returned_at, Duration::from_millis(100));

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::TimeoutHit));
    assert!(kinds.contains(&EventKind::RunSucceeded));
}

#[tokio::test(start_paused = true)]
async fn test_parent_deadline_exceeded_during_backoff() {
    let wait = Duration::from_millis(81);
    let script = Script::new([
        ok().after(wait),
        ok().after(wait),
        ok().after(wait),
        ok().after(wait),
        ok().after(wait),
        fail(1),
    ]);
    let o = opts([
        RunOption::Recur(true),
        RunOption::Restart(true),
        RunOption::RestartLimit(3, Some(Backoff::constant(Duration::from_millis(287)))),
    ]);
    let (parent, _guard) = Context::background().with_timeout(Duration::from_millis(500));
    let (inst, errs) = run_script(&script, o, &parent).await;

    assert_eq!(errs, ["test error: 1", "context deadline exceeded"]);
    assert_eq!(script.remaining(), 0);
    assert_eq!(inst.runs(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_recurring_waits_for_period() {
    let period = Duration::from_millis(114);
    let script = Script::new([ok(), ok(), ok()]);
    let o = opts([
        RunOption::Recur(true),
        RunOption::Period(period),
        RunOption::RunLimit(3),
    ]);
    run_script(&script, o, &Context::background()).await;

    let seen = script.seen();
    assert_eq!(seen.len(), 3);
    for pair in seen.windows(2) {
        assert_gap(pair[0].returned_at, pair[1].called_at, period);
    }
}

#[tokio::test(start_paused = true)]
async fn test_restartable_waits_for_backoff() {
    let step = Duration::from_millis(287);
    let script = Script::new([fail(1), fail(2), fail(3), fail(4)]);
    let o = opts([
        RunOption::Restart(true),
        RunOption::RestartLimit(4, Some(Backoff::linear(step))),
    ]);
    let (_, errs) = run_script(&script, o, &Context::background()).await;

    assert_eq!(errs, test_errors(&[1, 2, 3, 4]));
    let seen = script.seen();
    for (i, pair) in seen.windows(2).enumerate() {
        assert_gap(pair[0].returned_at, pair[1].called_at, step * (i as u32 + 1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_buffered_stream_does_not_block_until_full() {
    let script = Script::new([fail(1), fail(2), fail(3), fail(4)]);
    let inst = Instance::with_options(
        script.runnable(),
        [
            RunOption::ChanBuffer(2),
            RunOption::Restart(true),
            RunOption::RestartLimit(4, None),
        ],
    );
    let started = Instant::now();
    let out = inst.start(&Context::background()).unwrap();
    assert_eq!(out.buffer(), 2);

    time::sleep(Duration::from_millis(200)).await;
    let errs: Vec<String> = out
        .collect_all()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(errs, test_errors(&[1, 2, 3, 4]));
    let seen = script.seen();
    // Two errors fit the buffer; the third send blocks until the consumer reads.
    assert_eq!(seen[2].called_at, started);
    assert!(seen[3].called_at >= started + Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_unbuffered_stream_waits_for_consumer() {
    let script = Script::new([fail(1), fail(2)]);
    let o = opts([RunOption::Restart(true), RunOption::RestartLimit(2, None)]);
    let inst = Instance::new(script.runnable(), o);
    let started = Instant::now();
    let mut out = inst.start(&Context::background()).unwrap();

    time::sleep(Duration::from_millis(100)).await;
    assert_eq!(script.seen().len(), 1);
    assert_eq!(out.recv().await.unwrap().to_string(), "test error: 1");
    assert_eq!(out.recv().await.unwrap().to_string(), "test error: 2");
    assert!(out.recv().await.is_none());

    assert!(script.seen()[1].called_at >= started + Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_during_wait() {
    let script = Script::new([ok(), ok(), ok()]);
    let o = opts([RunOption::Recur(true), RunOption::Period(Duration::from_secs(1))]);
    let (parent, guard) = Context::background().with_cancel();

    tokio::spawn(async move {
        time::sleep(Duration::from_millis(1500)).await;
        guard.cancel();
    });
    let (inst, errs) = run_script(&script, o, &parent).await;

    assert_eq!(errs, ["context canceled"]);
    assert_eq!(script.seen().len(), 2);
    assert_eq!(script.remaining(), 1);
    assert_eq!(inst.runs(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_parent_prevents_first_execution() {
    let script = Script::new([ok()]);
    let (parent, guard) = Context::background().with_cancel();
    guard.cancel();

    let (inst, errs) = run_script(&script, Options::default(), &parent).await;
    assert_eq!(errs, ["context canceled"]);
    assert_eq!(script.remaining(), 1);
    assert_eq!(inst.state(), InstanceState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events() {
    let script = Script::new([fail(1), ok()]);
    let bus = Bus::new(64);
    let mut events = bus.subscribe();
    let inst = Instance::with_options(
        script.runnable(),
        [
            RunOption::Restart(true),
            RunOption::RestartLimit(0, Some(Backoff::linear(Duration::from_millis(10)))),
        ],
    )
    .with_bus(bus);

    let errs = inst
        .start(&Context::background())
        .unwrap()
        .collect_all()
        .await;
    assert_eq!(errs.len(), 1);

    let mut got = Vec::new();
    while let Ok(ev) = events.try_recv() {
        got.push(ev);
    }
    let kinds: Vec<EventKind> = got.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            EventKind::InstanceStarted,
            EventKind::RunStarting,
            EventKind::RunFailed,
            EventKind::NextRunScheduled,
            EventKind::RunStarting,
            EventKind::RunSucceeded,
            EventKind::InstanceExhausted,
            EventKind::InstanceStopped,
        ]
    );
    assert!(got.iter().all(|e| e.task.as_deref() == Some("script")));
    assert_eq!(got[2].reason.as_deref(), Some("test error: 1"));
    assert_eq!(got[3].delay_ms, Some(10));
    assert_eq!(got[4].attempt, Some(2));
    assert_eq!(got[6].reason.as_deref(), Some("completed"));
}
