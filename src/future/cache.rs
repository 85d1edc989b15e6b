//! Memoized execution of a deferred computation.
//!
//! By design a [`Future`](super::Future) re-executes its run function on
//! every fork. [`Future::cache`] opts out of that: the wrapped computation
//! runs at most once, and every forker — earlier, concurrent, or later —
//! observes the same outcome. Forks that arrive while the computation is
//! still pending are queued and drained exactly once at settlement;
//! forks that arrive after settlement replay the recorded outcome
//! immediately. Rejections are as permanent as resolutions.

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;

use super::core::Future;
use super::panic::Panic;
use super::settle::{RejectFn, ResolveFn};

/// Inline capacity of the pending-listener queue.
const LISTENER_INLINE_CAPACITY: usize = 4;

type Listeners<E, A> = SmallVec<[(RejectFn<E>, ResolveFn<A>); LISTENER_INLINE_CAPACITY]>;

/// Lifecycle of one cached computation.
///
/// Transitions are monotonic: `Idle` to `Pending` on the first fork, then
/// `Pending` to exactly one of `Resolved` or `Rejected` at settlement. The
/// recorded value never changes afterwards.
enum CacheState<E, A> {
    /// No fork has arrived yet.
    Idle,
    /// The computation is running; these forks await its settlement.
    Pending(Listeners<E, A>),
    /// The computation resolved with this value.
    Resolved(A),
    /// The computation rejected with this error.
    Rejected(E),
}

impl<E, A> Future<E, A>
where
    E: Clone + Send + From<Panic> + 'static,
    A: Clone + Send + 'static,
{
    /// Wraps this `Future` so its computation executes at most once.
    ///
    /// The first fork starts the wrapped computation. Forks that arrive while
    /// it is pending are queued without re-executing anything; when the
    /// computation settles, the first fork's continuation is invoked and the
    /// queue is drained in arrival order, each listener receiving a clone of
    /// the outcome. Forks after settlement replay the recorded outcome
    /// immediately.
    ///
    /// State transitions and the queue drain are guarded by a mutex, and user
    /// continuations are always invoked with the lock released, so a listener
    /// may fork the cached `Future` again from inside its own callback.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    /// use futurity::future::Future;
    ///
    /// let executions = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&executions);
    /// let cached: Future<String, i32> = Future::new(move |_reject, resolve| {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    ///     resolve(1)
    /// })
    /// .cache();
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// for _ in 0..2 {
    ///     let sender = sender.clone();
    ///     cached.fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// }
    /// assert_eq!(receiver.recv().unwrap(), 1);
    /// assert_eq!(receiver.recv().unwrap(), 1);
    /// assert_eq!(executions.load(Ordering::SeqCst), 1);
    /// ```
    pub fn cache(self) -> Self {
        let state = Arc::new(Mutex::new(CacheState::Idle));
        Future::new(move |reject, resolve| {
            let mut guard = state.lock();
            match &mut *guard {
                CacheState::Idle => {
                    *guard = CacheState::Pending(Listeners::new());
                    drop(guard);

                    let reject_state = Arc::clone(&state);
                    let resolve_state = Arc::clone(&state);
                    self.fork(
                        move |error: E| {
                            let listeners = {
                                let mut guard = reject_state.lock();
                                match std::mem::replace(
                                    &mut *guard,
                                    CacheState::Rejected(error.clone()),
                                ) {
                                    CacheState::Pending(listeners) => listeners,
                                    previous => {
                                        *guard = previous;
                                        return;
                                    }
                                }
                            };
                            reject(error.clone());
                            for (listener_reject, _) in listeners {
                                listener_reject(error.clone());
                            }
                        },
                        move |value: A| {
                            let listeners = {
                                let mut guard = resolve_state.lock();
                                match std::mem::replace(
                                    &mut *guard,
                                    CacheState::Resolved(value.clone()),
                                ) {
                                    CacheState::Pending(listeners) => listeners,
                                    previous => {
                                        *guard = previous;
                                        return;
                                    }
                                }
                            };
                            resolve(value.clone());
                            for (_, listener_resolve) in listeners {
                                listener_resolve(value.clone());
                            }
                        },
                    );
                }
                CacheState::Pending(listeners) => listeners.push((reject, resolve)),
                CacheState::Resolved(value) => {
                    let value = value.clone();
                    drop(guard);
                    resolve(value);
                }
                CacheState::Rejected(error) => {
                    let error = error.clone();
                    drop(guard);
                    reject(error);
                }
            }
        })
    }
}
