//! The deferred computation type and its primitive combinators.
//!
//! A [`Future`] wraps a run function that performs no work until
//! [`fork`](Future::fork) hands it a `(reject, resolve)` continuation pair.
//! Combinators compose run functions without executing them; each fork is an
//! independent execution of the whole composed pipeline.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::panic::{Panic, contained};
use super::settle::{RejectFn, ResolveFn, Settlement};

/// A deferred two-outcome computation.
///
/// `Future<E, A>` describes a computation that, once forked, settles exactly
/// once: either with a rejection of type `E` or a resolution of type `A`.
/// Nothing runs at construction or composition time; side effects happen only
/// inside [`fork`](Future::fork), and forking the same `Future` twice executes
/// the underlying computation twice (wrap with [`cache`](Future::cache) to
/// share one execution).
///
/// The handle is cheap to [`Clone`]: clones share the run function, not any
/// execution state.
///
/// # Type Parameters
///
/// * `E` - The rejection payload. Opaque to the core; implements
///   `From<Panic>` wherever a jail boundary exists.
/// * `A` - The resolution payload.
///
/// # Laws
///
/// `Future` forms a functor, applicative, and monad over its resolution
/// channel, and a semigroup under [`race`](Future::race):
///
/// - **Functor identity**: `f.map(|x| x)` settles identically to `f`
/// - **Functor composition**: `f.map(h).map(g)` settles identically to
///   `f.map(|x| g(h(x)))`
/// - **Applicative homomorphism**: `pure(f).apply(pure(x))` settles
///   identically to `pure(f(x))`
/// - **Monad associativity**: `f.flat_map(g).flat_map(h)` settles identically
///   to `f.flat_map(|x| g(x).flat_map(h))`
/// - **Race associativity**: `(a.race(b)).race(c)` settles identically to
///   `a.race(b.race(c))`
///
/// # Examples
///
/// ```rust
/// use std::sync::mpsc;
/// use futurity::future::Future;
///
/// let future: Future<String, i32> = Future::pure(20).map(|n| n + 1);
///
/// let (sender, receiver) = mpsc::channel();
/// future.fork(|_error| {}, move |value| sender.send(value).unwrap());
/// assert_eq!(receiver.recv().unwrap(), 21);
/// ```
pub struct Future<E, A> {
    run: Arc<dyn Fn(RejectFn<E>, ResolveFn<A>) + Send + Sync>,
}

impl<E, A> Clone for Future<E, A> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<E, A> fmt::Debug for Future<E, A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Future").field(&"<run>").finish()
    }
}

impl<E, A> Future<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Wraps a two-continuation run function.
    ///
    /// The run function receives a reject and a resolve continuation and must
    /// invoke exactly one of them, exactly once, per execution. It may hand
    /// the continuations to another thread and return before settlement; the
    /// computation is then asynchronous from the forker's point of view.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let future: Future<String, i32> = Future::new(|_reject, resolve| resolve(21));
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// future.fork(|_error| {}, move |value| sender.send(value * 2).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), 42);
    /// ```
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(RejectFn<E>, ResolveFn<A>) + Send + Sync + 'static,
    {
        Self { run: Arc::new(run) }
    }

    /// Lifts a value into a `Future` that resolves synchronously with it.
    ///
    /// Each fork resolves with its own clone of the value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let future: Future<String, i32> = Future::pure(42);
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// future.fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), 42);
    /// ```
    pub fn pure(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::new(move |_reject, resolve| resolve(value.clone()))
    }

    /// Creates a `Future` that rejects synchronously with the given error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let future: Future<String, i32> = Future::rejected("nope".to_string());
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// future.fork(move |error| sender.send(error).unwrap(), |_value| {});
    /// assert_eq!(receiver.recv().unwrap(), "nope");
    /// ```
    pub fn rejected(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::new(move |reject, _resolve| reject(error.clone()))
    }

    /// Executes the computation, delivering its outcome to the continuations.
    ///
    /// This is the only way effects happen. `on_resolve` runs inside the
    /// jail: a panic raised by it is caught, converted via `E::from`, and
    /// routed to `on_reject` instead of unwinding. `on_reject` is not jailed;
    /// a panic while handling a rejection is a defect in caller code and
    /// propagates.
    ///
    /// At most one continuation runs, at most once, even if the underlying
    /// run function misbehaves and attempts several settlements.
    pub fn fork<R, S>(&self, on_reject: R, on_resolve: S)
    where
        R: FnOnce(E) + Send + 'static,
        S: FnOnce(A) + Send + 'static,
        E: From<Panic>,
    {
        let settlement = Settlement::new(Box::new(on_reject), Box::new(on_resolve));
        let reject_side = Arc::clone(&settlement);
        (self.run)(
            Box::new(move |error| reject_side.reject(error)),
            Box::new(move |value| {
                if let Some((reject, resolve)) = settlement.take() {
                    if let Err(panic) = contained(move || resolve(value)) {
                        reject(E::from(panic));
                    }
                }
            }),
        );
    }

    /// Transforms the resolved value; rejections pass through unchanged.
    ///
    /// Semantically `flat_map(|a| Future::pure(f(a)))`. A panic in the
    /// function becomes a rejection via the jail.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let future: Future<String, i32> = Future::pure(1).map(|n| n + 1);
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// future.fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), 2);
    /// ```
    pub fn map<B, F>(self, function: F) -> Future<E, B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
        E: From<Panic>,
    {
        let function = Arc::new(function);
        Future::new(move |reject, resolve| {
            let function = Arc::clone(&function);
            self.fork(reject, move |value| resolve((*function)(value)));
        })
    }

    /// Sequences a dependent computation after this one resolves.
    ///
    /// On resolution, `function` produces the next `Future`, which is forked
    /// with the original continuations. Rejections are forwarded directly and
    /// `function` never runs for them. `function` is invoked inside the jail,
    /// so a panic in it rejects the composed `Future`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let future: Future<String, i32> =
    ///     Future::pure(1).flat_map(|n| Future::pure(n + 1));
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// future.fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), 2);
    /// ```
    pub fn flat_map<B, F>(self, function: F) -> Future<E, B>
    where
        F: Fn(A) -> Future<E, B> + Send + Sync + 'static,
        B: Send + 'static,
        E: From<Panic>,
    {
        let function = Arc::new(function);
        Future::new(move |reject, resolve| {
            let function = Arc::clone(&function);
            let settlement = Settlement::new(reject, resolve);
            let reject_side = Arc::clone(&settlement);
            self.fork(
                move |error| reject_side.reject(error),
                move |value| {
                    if let Some((reject, resolve)) = settlement.take() {
                        match contained(move || (*function)(value)) {
                            Ok(next) => next.fork(reject, resolve),
                            Err(panic) => reject(E::from(panic)),
                        }
                    }
                },
            );
        })
    }

    /// Alias for `flat_map`.
    #[inline]
    pub fn and_then<B, F>(self, function: F) -> Future<E, B>
    where
        F: Fn(A) -> Future<E, B> + Send + Sync + 'static,
        B: Send + 'static,
        E: From<Panic>,
    {
        self.flat_map(function)
    }

    /// Sequences a recovery computation after this one rejects.
    ///
    /// The mirror image of [`flat_map`](Future::flat_map): on rejection,
    /// `function` produces the next `Future`; a resolution passes through
    /// unchanged. The rejection type may change. `function` is invoked inside
    /// the jail.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let recovered: Future<String, i32> = Future::<String, i32>::rejected("two".to_string())
    ///     .or_else(|error| Future::pure(error.len() as i32));
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// recovered.fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), 3);
    /// ```
    pub fn or_else<E2, F>(self, function: F) -> Future<E2, A>
    where
        F: Fn(E) -> Future<E2, A> + Send + Sync + 'static,
        E2: Send + From<Panic> + 'static,
        E: From<Panic>,
    {
        let function = Arc::new(function);
        Future::new(move |reject, resolve| {
            let function = Arc::clone(&function);
            let settlement = Settlement::new(reject, resolve);
            let resolve_side = Arc::clone(&settlement);
            self.fork(
                move |error| {
                    if let Some((reject, resolve)) = settlement.take() {
                        match contained(move || (*function)(error)) {
                            Ok(next) => next.fork(reject, resolve),
                            Err(panic) => reject(E2::from(panic)),
                        }
                    }
                },
                move |value| resolve_side.resolve(value),
            );
        })
    }

    /// Transforms both channels at once.
    ///
    /// A rejection `e` becomes `on_reject(e)` and a value `a` becomes
    /// `on_resolve(a)`. Both transformer invocations are jailed: a panic in
    /// either rejects with the converted payload.
    pub fn bimap<E2, B, R, S>(self, on_reject: R, on_resolve: S) -> Future<E2, B>
    where
        R: Fn(E) -> E2 + Send + Sync + 'static,
        S: Fn(A) -> B + Send + Sync + 'static,
        E2: Send + From<Panic> + 'static,
        B: Send + 'static,
        E: From<Panic>,
    {
        let on_reject = Arc::new(on_reject);
        let on_resolve = Arc::new(on_resolve);
        Future::new(move |reject, resolve| {
            let on_reject = Arc::clone(&on_reject);
            let on_resolve = Arc::clone(&on_resolve);
            let settlement = Settlement::new(reject, resolve);
            let resolve_side = Arc::clone(&settlement);
            self.fork(
                move |error| {
                    if let Some((reject, _)) = settlement.take() {
                        match contained(move || (*on_reject)(error)) {
                            Ok(mapped) => reject(mapped),
                            Err(panic) => reject(E2::from(panic)),
                        }
                    }
                },
                move |value| {
                    if let Some((reject, resolve)) = resolve_side.take() {
                        match contained(move || (*on_resolve)(value)) {
                            Ok(mapped) => resolve(mapped),
                            Err(panic) => reject(E2::from(panic)),
                        }
                    }
                },
            );
        })
    }

    /// Races two computations; the first settlement wins.
    ///
    /// Both sides are forked immediately. Whichever settles first — with a
    /// rejection or a resolution — determines the outcome; the loser's
    /// settlement is discarded without re-invoking any continuation. The
    /// losing computation itself is not aborted, only its outcome is ignored.
    ///
    /// This is an associative semigroup operation: racing
    /// `(a.race(b)).race(c)` is equivalent to racing all three for first
    /// settlement. When both sides settle synchronously, `self` wins because
    /// it is forked first; that ordering is an implementation detail, not a
    /// contract.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let fast: Future<String, &str> = Future::pure("fast");
    /// let slow: Future<String, &str> = Future::pure("slow");
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// fast.race(slow)
    ///     .fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), "fast");
    /// ```
    pub fn race(self, other: Self) -> Self
    where
        E: From<Panic>,
    {
        Future::new(move |reject, resolve| {
            let settlement = Settlement::new(reject, resolve);
            let first_reject = Arc::clone(&settlement);
            let first_resolve = Arc::clone(&settlement);
            let second_reject = Arc::clone(&settlement);
            let second_resolve = settlement;
            self.fork(
                move |error| first_reject.reject(error),
                move |value| first_resolve.resolve(value),
            );
            other.fork(
                move |error| second_reject.reject(error),
                move |value| second_resolve.resolve(value),
            );
        })
    }

    /// Combines two computations running in parallel with a function.
    ///
    /// Both sides are forked immediately; the function runs once both have
    /// resolved. The first rejection from either side wins.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let first: Future<String, i32> = Future::pure(20);
    /// let second: Future<String, i32> = Future::pure(22);
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// first
    ///     .map2(second, |a, b| a + b)
    ///     .fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), 42);
    /// ```
    pub fn map2<B, C, F>(self, other: Future<E, B>, function: F) -> Future<E, C>
    where
        F: Fn(A, B) -> C + Send + Sync + 'static,
        B: Send + 'static,
        C: Send + 'static,
        E: From<Panic>,
    {
        let function = Arc::new(function);
        self.map(move |first| {
            let function = Arc::clone(&function);
            move |second| (*function)(first, second)
        })
        .apply(other)
    }

    /// Combines three computations running in parallel with a function.
    pub fn map3<B, C, D, F>(
        self,
        second: Future<E, B>,
        third: Future<E, C>,
        function: F,
    ) -> Future<E, D>
    where
        F: Fn(A, B, C) -> D + Send + Sync + 'static,
        B: Send + 'static,
        C: Send + 'static,
        D: Send + 'static,
        E: From<Panic>,
    {
        let function = Arc::new(function);
        self.map2(second, |first, second| (first, second))
            .map2(third, move |(first, second), third| {
                (*function)(first, second, third)
            })
    }

    /// Combines two parallel computations into a tuple.
    pub fn product<B>(self, other: Future<E, B>) -> Future<E, (A, B)>
    where
        B: Send + 'static,
        E: From<Panic>,
    {
        self.map2(other, |first, second| (first, second))
    }
}

impl<E, F> Future<E, F>
where
    E: Send + 'static,
    F: Send + 'static,
{
    /// Applies a function produced by this `Future` to another's value.
    ///
    /// Both sides are forked without waiting for either to finish first; the
    /// application happens when the second of the two resolves, inside the
    /// jail. The first rejection from either side wins and any later
    /// settlement is ignored. No priority is given to `self` over `other`:
    /// settlement order is whatever order the continuations actually run.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::mpsc;
    /// use futurity::future::Future;
    ///
    /// let function: Future<String, fn(i32) -> i32> = Future::pure(|n| n + 3);
    /// let value: Future<String, i32> = Future::pure(46);
    ///
    /// let (sender, receiver) = mpsc::channel();
    /// function
    ///     .apply(value)
    ///     .fork(|_error| {}, move |value| sender.send(value).unwrap());
    /// assert_eq!(receiver.recv().unwrap(), 49);
    /// ```
    pub fn apply<A, B>(self, other: Future<E, A>) -> Future<E, B>
    where
        F: FnOnce(A) -> B,
        A: Send + 'static,
        B: Send + 'static,
        E: From<Panic>,
    {
        Future::new(move |reject, resolve| {
            let settlement = Settlement::new(reject, resolve);
            let slots = Arc::new(Mutex::new(ApplySlots::<F, A>::empty()));

            let function_settlement = Arc::clone(&settlement);
            let function_reject = Arc::clone(&settlement);
            let function_slots = Arc::clone(&slots);
            self.fork(
                move |error| function_reject.reject(error),
                move |function| {
                    let ready = {
                        let mut slots = function_slots.lock();
                        slots.function = Some(function);
                        slots.take_if_ready()
                    };
                    if let Some((function, value)) = ready {
                        settle_application(&function_settlement, function, value);
                    }
                },
            );

            let value_reject = Arc::clone(&settlement);
            other.fork(
                move |error| value_reject.reject(error),
                move |value| {
                    let ready = {
                        let mut slots = slots.lock();
                        slots.value = Some(value);
                        slots.take_if_ready()
                    };
                    if let Some((function, value)) = ready {
                        settle_application(&settlement, function, value);
                    }
                },
            );
        })
    }
}

/// The two arrival slots of an in-flight `apply`.
///
/// Whichever side resolves second observes both slots filled and takes the
/// pair; until then each resolution parks its payload here.
struct ApplySlots<F, A> {
    function: Option<F>,
    value: Option<A>,
}

impl<F, A> ApplySlots<F, A> {
    const fn empty() -> Self {
        Self {
            function: None,
            value: None,
        }
    }

    fn take_if_ready(&mut self) -> Option<(F, A)> {
        match (self.function.take(), self.value.take()) {
            (Some(function), Some(value)) => Some((function, value)),
            (function, value) => {
                self.function = function;
                self.value = value;
                None
            }
        }
    }
}

fn settle_application<E, F, A, B>(settlement: &Arc<Settlement<E, B>>, function: F, value: A)
where
    F: FnOnce(A) -> B,
    E: From<Panic>,
{
    if let Some((reject, resolve)) = settlement.take() {
        match contained(move || function(value)) {
            Ok(result) => resolve(result),
            Err(panic) => reject(E::from(panic)),
        }
    }
}

static_assertions::assert_impl_all!(Future<String, i32>: Send, Sync, Clone);
