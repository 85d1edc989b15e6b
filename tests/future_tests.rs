//! Integration tests for `Future<E, A>`.
//!
//! Tests cover:
//! - Construction, forking, and the independent-execution guarantee
//! - Functor/monad/applicative combinators and both-channel transforms
//! - Parallel `apply` with host-thread delays, including rejection ordering
//! - Panic containment at the fork boundary
//! - `race` first-settle-wins behavior
//! - `tail_rec` stack safety in synchronous and asynchronous loops
//! - `cache` resolve, reject, and pending cases

use futurity::future::{Future, Panic, Step};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// =============================================================================
// Helpers
// =============================================================================

/// Forks the future and blocks until it settles.
fn outcome<E, A>(future: &Future<E, A>) -> Result<A, E>
where
    E: From<Panic> + Send + 'static,
    A: Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let reject_sender = sender.clone();
    future.fork(
        move |error| reject_sender.send(Err(error)).unwrap(),
        move |value| sender.send(Ok(value)).unwrap(),
    );
    receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("future should settle")
}

/// A future that resolves with `value` from a host thread after `delay`.
fn delay_value<A>(delay: Duration, value: A) -> Future<String, A>
where
    A: Clone + Send + Sync + 'static,
{
    Future::new(move |_reject, resolve| {
        let value = value.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            resolve(value);
        });
    })
}

/// A future that rejects with `error` from a host thread after `delay`.
fn delay_error<A>(delay: Duration, error: &str) -> Future<String, A>
where
    A: Send + 'static,
{
    let error = error.to_string();
    Future::new(move |reject, _resolve| {
        let error = error.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            reject(error);
        });
    })
}

/// A transform that panics on its second invocation, for at-most-once checks.
fn panic_if_called_twice<A>() -> impl Fn(A) -> A + Send + Sync + 'static {
    let calls = AtomicUsize::new(0);
    move |value| {
        if calls.fetch_add(1, Ordering::SeqCst) >= 1 {
            panic!("Was called twice");
        }
        value
    }
}

// =============================================================================
// Construction and Forking
// =============================================================================

#[rstest]
fn pure_futures_with_the_same_value_settle_identically() {
    let first: Future<String, i32> = Future::pure(2);
    let second: Future<String, i32> = Future::pure(2);
    assert_eq!(outcome(&first), outcome(&second));
}

#[rstest]
fn rejected_settles_synchronously_with_the_given_error() {
    let future: Future<String, i32> = Future::rejected("foo".to_string());
    let forked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&forked);
    future.fork(
        move |error| {
            assert_eq!(error, "foo");
            flag.store(true, Ordering::SeqCst);
        },
        |_value| {},
    );
    assert!(forked.load(Ordering::SeqCst));
}

#[rstest]
fn forking_twice_re_executes_the_computation() {
    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);
    let future: Future<String, i32> = Future::new(move |_reject, resolve| {
        counter.fetch_add(1, Ordering::SeqCst);
        resolve(1);
    });

    assert_eq!(outcome(&future), Ok(1));
    assert_eq!(outcome(&future), Ok(1));
    assert_eq!(executions.load(Ordering::SeqCst), 2);
}

#[rstest]
fn a_misbehaving_run_function_settles_only_once() {
    let future: Future<String, i32> = Future::new(|reject, resolve| {
        resolve(1);
        reject("late rejection".to_string());
    });

    let settlements = Arc::new(AtomicUsize::new(0));
    let reject_counter = Arc::clone(&settlements);
    let resolve_counter = Arc::clone(&settlements);
    future.fork(
        move |_error| {
            reject_counter.fetch_add(1, Ordering::SeqCst);
        },
        move |_value| {
            resolve_counter.fetch_add(1, Ordering::SeqCst);
        },
    );
    assert_eq!(settlements.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Functor and Monad Combinators
// =============================================================================

#[rstest]
fn map_increments_a_resolved_value() {
    let future: Future<String, i32> = Future::pure(1).map(|n| n + 1);
    assert_eq!(outcome(&future), Ok(2));
}

#[rstest]
fn flat_map_sequences_a_dependent_future() {
    let increment_in_the_future = |value: i32| Future::pure(value + 1);
    let future: Future<String, i32> = Future::pure(1).flat_map(increment_in_the_future);
    assert_eq!(outcome(&future), Ok(2));
}

#[rstest]
fn and_then_is_flat_map() {
    let future: Future<String, i32> = Future::pure(20).and_then(|n| Future::pure(n + 22));
    assert_eq!(outcome(&future), Ok(42));
}

/// A rejection payload carrying either a code or a captured message.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TestError {
    Code(i32),
    Message(String),
}

impl From<Panic> for TestError {
    fn from(panic: Panic) -> Self {
        Self::Message(panic.message().to_string())
    }
}

#[rstest]
fn or_else_chains_off_the_reject_case() {
    let future: Future<TestError, i32> = Future::rejected(TestError::Code(2)).or_else(|error| {
        match error {
            TestError::Code(code) => Future::pure(code + 3),
            other => Future::rejected(other),
        }
    });
    assert_eq!(outcome(&future), Ok(5));
}

#[rstest]
fn bimap_maps_the_first_function_over_the_rejected_value() {
    let future: Future<String, i32> = Future::<String, i32>::rejected("err".to_string())
        .bimap(|error| format!("map over {error}"), |value| value);
    assert_eq!(outcome(&future), Err("map over err".to_string()));
}

#[rstest]
fn bimap_maps_the_second_function_over_the_resolved_value() {
    let future: Future<String, i32> =
        Future::<String, i32>::pure(1).bimap(|error| error, |value| value + 1);
    assert_eq!(outcome(&future), Ok(2));
}

// =============================================================================
// apply
// =============================================================================

#[rstest]
fn apply_applies_its_function_to_the_passed_in_future() {
    let function: Future<String, _> = Future::pure(1).map(|a| move |b: i32| a + b);
    assert_eq!(outcome(&function.apply(Future::pure(2))), Ok(3));
}

#[rstest]
fn apply_runs_both_sides_in_parallel() {
    let first = delay_value(Duration::from_millis(15), 1);
    let second = delay_value(Duration::from_millis(15), 2);
    let combined = first.map(|a| move |b: i32| a + b).apply(second);
    assert_eq!(outcome(&combined), Ok(3));
}

#[rstest]
fn apply_handles_itself_being_resolved_first() {
    let first = delay_value(Duration::from_millis(1), 1);
    let second = delay_value(Duration::from_millis(15), 2);
    let combined = first.map(|a| move |b: i32| a + b).apply(second);
    assert_eq!(outcome(&combined), Ok(3));
}

#[rstest]
fn apply_handles_the_input_future_being_resolved_first() {
    let first = delay_value(Duration::from_millis(15), 1);
    let second = delay_value(Duration::from_millis(1), 2);
    let combined = first.map(|a| move |b: i32| a + b).apply(second);
    assert_eq!(outcome(&combined), Ok(3));
}

#[rstest]
fn apply_is_rejected_with_the_first_error_to_occur() {
    let first: Future<String, i32> = delay_error(Duration::from_millis(10), "firstError");
    let second: Future<String, i32> = delay_error(Duration::from_millis(20), "secondError");
    let combined = first.map(|a| move |b: i32| a + b).apply(second);
    assert_eq!(outcome(&combined), Err("firstError".to_string()));
}

#[rstest]
fn apply_is_rejected_with_the_first_error_to_occur_when_orders_swap() {
    let first: Future<String, i32> = delay_error(Duration::from_millis(20), "firstError");
    let second: Future<String, i32> = delay_error(Duration::from_millis(10), "secondError");
    let combined = first.map(|a| move |b: i32| a + b).apply(second);
    assert_eq!(outcome(&combined), Err("secondError".to_string()));
}

// =============================================================================
// Panic Containment
// =============================================================================

#[rstest]
fn a_panicking_resolve_callback_creates_a_rejection() {
    let future: Future<String, i32> = Future::pure(1);
    let (sender, receiver) = mpsc::channel();
    future.fork(
        move |error| sender.send(error).unwrap(),
        |_value| panic!("Some error message"),
    );
    assert_eq!(receiver.recv().unwrap(), "Some error message");
}

#[rstest]
fn a_panicking_map_function_rejects_the_future() {
    let future: Future<String, i32> = Future::pure(1).map(|_| panic!("Some error message"));
    assert_eq!(outcome(&future), Err("Some error message".to_string()));
}

#[rstest]
fn a_panicking_flat_map_function_rejects_the_future() {
    let future: Future<String, i32> =
        Future::pure(1).flat_map(|_| -> Future<String, i32> { panic!("Some error message") });
    assert_eq!(outcome(&future), Err("Some error message".to_string()));
}

#[rstest]
fn a_panicking_applied_function_rejects_the_future() {
    let function: Future<String, fn(i32) -> i32> =
        Future::pure(|_| panic!("Some error message"));
    let future = function.apply(Future::pure(1));
    assert_eq!(outcome(&future), Err("Some error message".to_string()));
}

#[rstest]
fn rejections_skip_the_jail_and_the_success_path() {
    let future: Future<String, i32> =
        Future::rejected("original".to_string()).map(|_: i32| panic!("never runs"));
    assert_eq!(outcome(&future), Err("original".to_string()));
}

// =============================================================================
// race
// =============================================================================

#[rstest]
fn race_settles_with_the_earlier_resolution() {
    let fast = delay_value(Duration::from_millis(5), "fast");
    let slow = delay_value(Duration::from_millis(50), "slow");
    assert_eq!(outcome(&fast.race(slow)), Ok("fast"));
}

#[rstest]
fn race_settles_with_the_earlier_rejection() {
    let winner: Future<String, &str> = delay_error(Duration::from_millis(5), "lost");
    let loser = delay_value(Duration::from_millis(50), "slow");
    assert_eq!(outcome(&winner.race(loser)), Err("lost".to_string()));
}

#[rstest]
fn race_ignores_the_later_settlement() {
    let fast = delay_value(Duration::from_millis(5), 1);
    let slow: Future<String, i32> = delay_error(Duration::from_millis(30), "late");

    let settlements = Arc::new(AtomicUsize::new(0));
    let reject_counter = Arc::clone(&settlements);
    let resolve_counter = Arc::clone(&settlements);
    fast.race(slow).fork(
        move |_error| {
            reject_counter.fetch_add(1, Ordering::SeqCst);
        },
        move |_value| {
            resolve_counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    // Wait until well past the loser's settlement.
    thread::sleep(Duration::from_millis(80));
    assert_eq!(settlements.load(Ordering::SeqCst), 1);
}

// =============================================================================
// tail_rec
// =============================================================================

#[rstest]
fn tail_rec_survives_one_hundred_thousand_synchronous_steps() {
    let future: Future<String, &str> = Future::tail_rec(100_000_u32, |n| {
        if n == 0 {
            Future::pure(Step::Done("DONE"))
        } else {
            Future::pure(Step::Next(n - 1))
        }
    });
    assert_eq!(outcome(&future), Ok("DONE"));
}

#[rstest]
fn tail_rec_rejects_immediately_when_every_step_rejects() {
    let future: Future<String, i32> =
        Future::tail_rec(100_000_u32, |_| Future::rejected("failed".to_string()));
    assert_eq!(outcome(&future), Err("failed".to_string()));
}

#[rstest]
fn tail_rec_rejects_once_the_countdown_reaches_zero() {
    let future: Future<String, i32> = Future::tail_rec(100_u32, |n| {
        if n == 0 {
            Future::rejected("reached zero".to_string())
        } else {
            Future::pure(Step::Next(n - 1))
        }
    });
    assert_eq!(outcome(&future), Err("reached zero".to_string()));
}

#[rstest]
fn tail_rec_resumes_after_asynchronous_steps() {
    let future: Future<String, &str> = Future::tail_rec(3_u32, |n| {
        if n == 0 {
            delay_value(Duration::from_millis(1), Step::Done("DONE"))
        } else {
            delay_value(Duration::from_millis(1), Step::Next(n - 1))
        }
    });
    assert_eq!(outcome(&future), Ok("DONE"));
}

#[rstest]
fn tail_rec_interleaves_synchronous_and_asynchronous_steps() {
    let future: Future<String, u32> = Future::tail_rec(6_u32, |n| {
        if n == 0 {
            Future::pure(Step::Done(0))
        } else if n % 2 == 0 {
            delay_value(Duration::from_millis(1), Step::Next(n - 1))
        } else {
            Future::pure(Step::Next(n - 1))
        }
    });
    assert_eq!(outcome(&future), Ok(0));
}

// =============================================================================
// cache
// =============================================================================

#[rstest]
fn cache_can_be_forked_with_a_resolved_value() {
    let cached: Future<String, i32> = Future::pure(1).map(panic_if_called_twice()).cache();
    assert_eq!(outcome(&cached), Ok(1));
}

#[rstest]
fn cache_passes_the_same_value_to_every_fork() {
    let cached: Future<String, i32> = Future::pure(1).map(panic_if_called_twice()).cache();
    assert_eq!(outcome(&cached), Ok(1));
    assert_eq!(outcome(&cached), Ok(1));
}

#[rstest]
fn cache_can_be_forked_with_a_rejected_value() {
    let cached: Future<String, i32> = Future::pure(1)
        .map(panic_if_called_twice())
        .map(|_| panic!("SomeError"))
        .cache();
    assert_eq!(outcome(&cached), Err("SomeError".to_string()));
}

#[rstest]
fn cache_does_not_run_the_underlying_computation_twice_on_rejection() {
    let cached: Future<String, i32> = Future::pure(1)
        .map(panic_if_called_twice())
        .map(|_| panic!("SomeError"))
        .cache();
    assert_eq!(outcome(&cached), Err("SomeError".to_string()));
    assert_eq!(outcome(&cached), Err("SomeError".to_string()));
}

#[rstest]
fn cache_resolves_every_pending_fork_at_settlement() {
    let cached = delay_value(Duration::from_millis(30), "resolvedValue")
        .map(panic_if_called_twice())
        .cache();

    let (sender, receiver) = mpsc::channel();
    for _ in 0..2 {
        let sender = sender.clone();
        cached.fork(
            |_error| {},
            move |value| sender.send(value).unwrap(),
        );
    }

    let timeout = Duration::from_secs(5);
    assert_eq!(receiver.recv_timeout(timeout).unwrap(), "resolvedValue");
    assert_eq!(receiver.recv_timeout(timeout).unwrap(), "resolvedValue");
}

#[rstest]
fn cache_rejects_every_pending_fork_at_settlement() {
    let cached: Future<String, i32> = delay_error(Duration::from_millis(30), "rejectedValue")
        .bimap(panic_if_called_twice(), |value| value)
        .cache();

    let (sender, receiver) = mpsc::channel();
    for _ in 0..2 {
        let sender = sender.clone();
        cached.fork(
            move |error| sender.send(error).unwrap(),
            |_value| {},
        );
    }

    let timeout = Duration::from_secs(5);
    assert_eq!(receiver.recv_timeout(timeout).unwrap(), "rejectedValue");
    assert_eq!(receiver.recv_timeout(timeout).unwrap(), "rejectedValue");
}

#[rstest]
fn cache_coalesces_concurrent_forks_onto_one_execution() {
    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);
    let cached: Future<String, i32> = Future::new(move |_reject, resolve| {
        let counter = Arc::clone(&counter);
        thread::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            resolve(7);
        });
    })
    .cache();

    let (sender, receiver) = mpsc::channel();
    let mut forkers = Vec::new();
    for _ in 0..4 {
        let cached = cached.clone();
        let sender = sender.clone();
        forkers.push(thread::spawn(move || {
            cached.fork(|_error| {}, move |value| sender.send(value).unwrap());
        }));
    }
    for forker in forkers {
        forker.join().unwrap();
    }

    let timeout = Duration::from_secs(5);
    for _ in 0..4 {
        assert_eq!(receiver.recv_timeout(timeout).unwrap(), 7);
    }
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}
