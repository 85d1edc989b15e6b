//! # futurity
//!
//! A continuation-based future library for Rust.
//!
//! ## Overview
//!
//! The central type is [`future::Future`]: a value representing a two-outcome
//! computation that has not yet run. Everything is built on the
//! two-continuation execution protocol — a run function receives a `reject`
//! and a `resolve` continuation and invokes exactly one of them, exactly
//! once. On top of that protocol the crate provides:
//!
//! - **Composition**: functor/applicative/monad operations (`map`,
//!   `flat_map`, `apply`, `map2`, `product`) plus both-channel transforms
//!   (`bimap`, `or_else`)
//! - **Racing**: `race`, settling with the first of two computations
//! - **Stack-safe recursion**: `tail_rec`, a trampoline for recursive
//!   asynchronous loops
//! - **Memoized caching**: `cache`, coalescing all forks onto at most one
//!   underlying execution
//! - **Panic containment**: panics in success-path callbacks become
//!   rejections at the fork boundary
//!
//! ## Example
//!
//! ```rust
//! use std::sync::mpsc;
//! use futurity::prelude::*;
//!
//! let future: Future<String, i32> = Future::pure(20).map(|n| n * 2);
//!
//! let (sender, receiver) = mpsc::channel();
//! future.fork(|_error| {}, move |value| sender.send(value).unwrap());
//! assert_eq!(receiver.recv().unwrap(), 40);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use futurity::prelude::*;
/// ```
pub mod prelude {
    pub use crate::future::{Future, Panic, RejectFn, ResolveFn, Step};
}

pub mod future;
