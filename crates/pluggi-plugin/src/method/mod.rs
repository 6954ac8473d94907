//! Phase methods and the async normalizer.
//!
//! Plugins implement a phase as one of three [`Method`] shapes. At
//! registration time each method is wrapped exactly once into a
//! [`PhaseMethod`], a callable that always returns a future, so the
//! dispatcher never has to know how a plugin wrote its code.

pub mod coroutine;

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tracing::warn;

use pluggi_core::result::AppResult;

use crate::dispatcher::{Next, PhaseCall};

pub use coroutine::{Awaitable, Coroutine, CoroutineStep, Driver, Resume};

/// Future returned by every wrapped phase method.
pub type PhaseFuture = BoxFuture<'static, AppResult<()>>;

/// Uniform callable form of a phase implementation.
pub type PhaseMethod = Arc<dyn Fn(PhaseCall, Next) -> PhaseFuture + Send + Sync>;

/// Synchronous phase implementation.
pub type SyncMethod = Arc<dyn Fn(PhaseCall, Next) -> AppResult<Flow> + Send + Sync>;

/// Phase implementation written as a suspend/resume routine.
pub type CoroutineMethod = Arc<dyn Fn(PhaseCall, Next) -> Box<dyn Coroutine> + Send + Sync>;

/// What a synchronous method hands back to the dispatcher.
pub enum Flow {
    /// The plugin's turn is over.
    Done,
    /// The plugin's turn settles when this future settles, usually the
    /// continuation's own future.
    Await(PhaseFuture),
}

impl Flow {
    /// Passes control down the chain and settles with the rest of it.
    pub fn next(next: Next) -> Self {
        Self::Await(next.run())
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => f.write_str("Done"),
            Self::Await(_) => f.write_str("Await(<future>)"),
        }
    }
}

/// A phase implementation as written by the plugin author.
#[derive(Clone)]
pub enum Method {
    /// Runs to completion on the caller's stack; errors are returned directly.
    Sync(SyncMethod),
    /// Already returns a future.
    Async(PhaseMethod),
    /// A generator-style routine driven by [`Driver`].
    Coroutine(CoroutineMethod),
}

impl Method {
    /// Creates a synchronous method.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(PhaseCall, Next) -> AppResult<Flow> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Creates a method from an async closure.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(PhaseCall, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self::Async(Arc::new(move |call: PhaseCall, next: Next| {
            f(call, next).boxed()
        }))
    }

    /// Creates a method whose body is a suspend/resume routine.
    pub fn coroutine<F, C>(f: F) -> Self
    where
        F: Fn(PhaseCall, Next) -> C + Send + Sync + 'static,
        C: Coroutine + 'static,
    {
        Self::Coroutine(Arc::new(
            move |call: PhaseCall, next: Next| -> Box<dyn Coroutine> { Box::new(f(call, next)) },
        ))
    }

    /// Returns the shape name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Async(_) => "async",
            Self::Coroutine(_) => "coroutine",
        }
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Method::{}", self.kind())
    }
}

/// Wraps a method into its future-returning callable form.
///
/// - `Sync`: an `Err` becomes a rejected future with the same error value,
///   indistinguishable from an async rejection.
/// - `Async`: returned as-is, so wrapping never stacks a second layer.
/// - `Coroutine`: driven by [`Driver`] when `coroutines` is set. Otherwise
///   the routine is built but never resumed and the call settles at once.
pub fn wrap(method: &Method, coroutines: bool) -> PhaseMethod {
    match method {
        Method::Sync(f) => {
            let f = Arc::clone(f);
            Arc::new(move |call: PhaseCall, next: Next| match f(call, next) {
                Ok(Flow::Done) => future::ok(()).boxed(),
                Ok(Flow::Await(fut)) => fut,
                Err(err) => future::err(err).boxed(),
            })
        }
        Method::Async(f) => Arc::clone(f),
        Method::Coroutine(f) if coroutines => {
            let f = Arc::clone(f);
            Arc::new(move |call: PhaseCall, next: Next| {
                Driver::new(f(call, next)).map(|r| r.map(|_| ())).boxed()
            })
        }
        Method::Coroutine(f) => {
            let f = Arc::clone(f);
            Arc::new(move |call: PhaseCall, next: Next| {
                warn!(
                    plugin = %call.plugin(),
                    phase = %call.phase(),
                    "Coroutine method not driven because coroutines are disabled for this plugin"
                );
                let _routine = f(call, next);
                future::ok(()).boxed()
            })
        }
    }
}

/// A registered phase implementation: the original method and the callable
/// built from it once at registration.
#[derive(Clone)]
pub struct MethodSlot {
    original: Method,
    callable: PhaseMethod,
}

impl MethodSlot {
    /// Wraps `method` and keeps both forms.
    pub fn new(method: Method, coroutines: bool) -> Self {
        let callable = wrap(&method, coroutines);
        Self {
            original: method,
            callable,
        }
    }

    /// The method as the plugin declared it.
    pub fn original(&self) -> &Method {
        &self.original
    }

    /// The callable form used for dispatch.
    pub fn callable(&self) -> &PhaseMethod {
        &self.callable
    }
}

impl std::fmt::Debug for MethodSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodSlot")
            .field("original", &self.original)
            .finish()
    }
}
