//! Stack-safe recursive loops over deferred computations.
//!
//! Rust does not guarantee tail call optimization, and a recursive loop built
//! from plain [`flat_map`](super::Future::flat_map) grows the call stack by
//! one composed continuation per iteration when every step settles
//! synchronously. [`Future::tail_rec`] drives such a loop iteratively
//! instead: it forks one step at a time and observes whether the step's
//! continuation fired before the fork returned. Synchronous settlements
//! continue the loop in the same stack frame; an asynchronous settlement
//! re-enters the driver from the continuation, which is safe because it runs
//! on a fresh stack.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::mpsc;
//! use futurity::future::{Future, Step};
//!
//! let countdown: Future<String, &str> = Future::tail_rec(100_000_u32, |n| {
//!     if n == 0 {
//!         Future::pure(Step::Done("DONE"))
//!     } else {
//!         Future::pure(Step::Next(n - 1))
//!     }
//! });
//!
//! let (sender, receiver) = mpsc::channel();
//! countdown.fork(|_error| {}, move |value| sender.send(value).unwrap());
//! assert_eq!(receiver.recv().unwrap(), "DONE");
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

use super::core::Future;
use super::panic::{Panic, contained};
use super::settle::Settlement;

/// The outcome of one `tail_rec` iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<S, A> {
    /// Continue the loop with a new state.
    Next(S),
    /// Finish the loop with the final result.
    Done(A),
}

/// What the driver loop has learned about the step it just forked.
enum Observation<S, A> {
    /// The fork has not returned and the continuation has not fired.
    Pending,
    /// The continuation fired before the fork returned.
    Settled(Step<S, A>),
    /// The fork returned first; the continuation owns the loop now.
    Suspended,
}

impl<E, A> Future<E, A>
where
    E: Send + From<Panic> + 'static,
    A: Send + 'static,
{
    /// Expresses a recursive loop in bounded stack space.
    ///
    /// `step` maps the current state to a `Future` settling with either
    /// [`Step::Next`] (loop again with new state) or [`Step::Done`] (finish).
    /// Any rejection aborts the loop immediately and settles the composed
    /// `Future` with that error; a panic inside `step` does the same through
    /// the jail. Each fork of the returned `Future` restarts the loop from a
    /// clone of `initial`.
    ///
    /// A step that keeps settling `Next` synchronously forever never settles
    /// the composed `Future`; that is a caller error, not a fault of the
    /// driver.
    pub fn tail_rec<S, F>(initial: S, step: F) -> Self
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S) -> Future<E, Step<S, A>> + Send + Sync + 'static,
    {
        let step = Arc::new(step);
        Future::new(move |reject, resolve| {
            let settlement = Settlement::new(reject, resolve);
            drive(&step, &settlement, initial.clone());
        })
    }
}

/// Runs the loop from `start` until it finishes, rejects, or goes
/// asynchronous.
fn drive<E, A, S, F>(step: &Arc<F>, settlement: &Arc<Settlement<E, A>>, start: S)
where
    E: Send + From<Panic> + 'static,
    A: Send + 'static,
    S: Clone + Send + 'static,
    F: Fn(S) -> Future<E, Step<S, A>> + Send + Sync + 'static,
{
    let mut state = start;
    loop {
        let step_future = {
            let step = Arc::clone(step);
            let current = state;
            match contained(move || (*step)(current)) {
                Ok(future) => future,
                Err(panic) => {
                    settlement.reject(E::from(panic));
                    return;
                }
            }
        };

        let observation = Arc::new(Mutex::new(Observation::Pending));

        let continuation_observation = Arc::clone(&observation);
        let continuation_step = Arc::clone(step);
        let continuation_settlement = Arc::clone(settlement);
        let reject_settlement = Arc::clone(settlement);
        step_future.fork(
            move |error| reject_settlement.reject(error),
            move |outcome| {
                let mut guard = continuation_observation.lock();
                if matches!(&*guard, Observation::Pending) {
                    *guard = Observation::Settled(outcome);
                    return;
                }
                drop(guard);
                // Asynchronous settlement: the driver loop has already
                // returned, so re-entering it here starts on a fresh stack.
                match outcome {
                    Step::Next(next) => drive(&continuation_step, &continuation_settlement, next),
                    Step::Done(value) => continuation_settlement.resolve(value),
                }
            },
        );

        let settled = std::mem::replace(&mut *observation.lock(), Observation::Suspended);
        match settled {
            Observation::Settled(Step::Next(next)) => state = next,
            Observation::Settled(Step::Done(value)) => {
                settlement.resolve(value);
                return;
            }
            // Still pending: the step went asynchronous (or rejected), and
            // its continuation carries the loop from here.
            _ => return,
        }
    }
}
