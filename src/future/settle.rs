//! The two-continuation calling convention and the exactly-once settlement cell.
//!
//! Every [`Future`](super::Future) is built from a run function that receives
//! a `(reject, resolve)` pair of continuations. Settlement is final: exactly
//! one of the pair may run, exactly once, per fork. [`Settlement`] enforces
//! that invariant structurally by holding both continuations in one slot that
//! can be taken only once; whichever settlement attempt arrives second finds
//! the slot empty and is discarded.

use parking_lot::Mutex;
use std::sync::Arc;

/// The failure continuation of a fork: consumes the rejection payload.
pub type RejectFn<E> = Box<dyn FnOnce(E) + Send>;

/// The success continuation of a fork: consumes the resolved value.
pub type ResolveFn<A> = Box<dyn FnOnce(A) + Send>;

/// A single-use holder for one fork's continuation pair.
///
/// Shared between the racing sources of a combinator (the two sides of
/// `apply` and `race`, the reject and resolve paths of `flat_map`, the loop
/// and the asynchronous continuation of `tail_rec`). The first caller of
/// [`take`](Self::take) consumes both continuations atomically; later callers
/// observe `None` and must treat their settlement as lost.
pub(crate) struct Settlement<E, A> {
    continuations: Mutex<Option<(RejectFn<E>, ResolveFn<A>)>>,
}

impl<E, A> Settlement<E, A> {
    /// Wraps a continuation pair in a shared settlement cell.
    pub(crate) fn new(reject: RejectFn<E>, resolve: ResolveFn<A>) -> Arc<Self> {
        Arc::new(Self {
            continuations: Mutex::new(Some((reject, resolve))),
        })
    }

    /// Takes the continuation pair, leaving the cell empty.
    ///
    /// Callers must invoke the continuations only after the lock has been
    /// released, which `take` guarantees by returning owned values.
    pub(crate) fn take(&self) -> Option<(RejectFn<E>, ResolveFn<A>)> {
        self.continuations.lock().take()
    }

    /// Settles with a rejection, unless already settled.
    pub(crate) fn reject(&self, error: E) {
        if let Some((reject, _)) = self.take() {
            reject(error);
        }
    }

    /// Settles with a resolution, unless already settled.
    pub(crate) fn resolve(&self, value: A) {
        if let Some((_, resolve)) = self.take() {
            resolve(value);
        }
    }
}
