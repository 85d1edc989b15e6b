//! Panic containment at the resolve-side boundary ("the jail").
//!
//! A callback supplied on the success path of a fork — a `map` or `flat_map`
//! function, an applied function in `apply`, or the resolve continuation
//! itself — may panic. The jail catches that panic and converts it into a
//! rejection instead of letting it unwind through the host, so a failing
//! transform behaves exactly like an explicit `reject`.
//!
//! The conversion boundary is explicit in the type system: a rejection
//! channel participates in the jail by implementing `From<Panic>`. Reject-side
//! callbacks are never jailed; a panic raised while handling a rejection is a
//! defect in caller code and propagates to the host's panic mechanism.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// A panic captured at the jail boundary.
///
/// Carries the panic message extracted from the payload (`&str` or `String`
/// payloads are preserved verbatim; anything else becomes a fixed fallback).
/// The raw payload itself is not retained: it is neither cloneable nor
/// inspectable, and cached rejections must be replayable.
///
/// # Examples
///
/// ```rust
/// use std::sync::mpsc;
/// use futurity::future::Future;
///
/// let future: Future<String, i32> = Future::pure(1).map(|_| panic!("boom"));
///
/// let (sender, receiver) = mpsc::channel();
/// future.fork(move |error| sender.send(error).unwrap(), |_| {});
/// assert_eq!(receiver.recv().unwrap(), "boom");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panic {
    message: String,
}

impl Panic {
    /// Extracts the message from a caught panic payload.
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(string) = payload.downcast_ref::<&str>() {
            (*string).to_string()
        } else if let Some(string) = payload.downcast_ref::<String>() {
            string.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self { message }
    }

    /// The captured panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Panic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "captured panic: {}", self.message)
    }
}

impl std::error::Error for Panic {}

impl From<Panic> for String {
    fn from(panic: Panic) -> Self {
        panic.message
    }
}

/// Runs an operation inside the jail, converting a panic into a [`Panic`].
pub(crate) fn contained<T, F>(operation: F) -> Result<T, Panic>
where
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(operation)).map_err(Panic::from_payload)
}
