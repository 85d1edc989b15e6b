//! A deferred two-outcome computation and its combinators.
//!
//! A [`Future`] represents a computation that has not yet run. It is built
//! from a run function following the two-continuation calling convention —
//! `run(reject, resolve)` — and performs no work until [`Future::fork`]
//! supplies those continuations. Composition (`map`, `flat_map`, `apply`,
//! `race`, …) builds new run functions without executing anything.
//!
//! Three guarantees hold throughout:
//!
//! - **Exactly-once settlement**: per fork, exactly one continuation runs,
//!   exactly once. Combinators that start several computations (`apply`,
//!   `race`) discard every settlement after the first.
//! - **Panic containment**: a panic in a success-path callback is caught at
//!   the fork boundary and converted into a rejection (see [`Panic`]);
//!   reject-side callbacks are never jailed.
//! - **Independent executions**: each fork re-executes the run function, with
//!   no sharing of effects between forks — unless the `Future` is wrapped
//!   with [`Future::cache`], which runs it at most once and replays the
//!   outcome to every subscriber.
//!
//! Recursive asynchronous loops are expressed with [`Future::tail_rec`] and
//! [`Step`], which keep the stack bounded no matter how many iterations
//! settle synchronously.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::mpsc;
//! use futurity::future::Future;
//!
//! let future: Future<String, i32> = Future::pure(40)
//!     .map(|n| n + 1)
//!     .flat_map(|n| Future::pure(n + 1));
//!
//! let (sender, receiver) = mpsc::channel();
//! future.fork(|_error| {}, move |value| sender.send(value).unwrap());
//! assert_eq!(receiver.recv().unwrap(), 42);
//! ```

mod cache;
mod core;
mod panic;
mod settle;
mod tail_rec;

pub use self::core::Future;
pub use self::panic::Panic;
pub use self::settle::{RejectFn, ResolveFn};
pub use self::tail_rec::Step;
