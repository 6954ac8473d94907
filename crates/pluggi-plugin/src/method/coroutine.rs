//! Suspend/resume routines and the driver that runs them as futures.
//!
//! A routine is resumed step by step. Each step either yields an
//! [`Awaitable`] (the driver awaits it and resumes the routine with the
//! settled value or error), completes with a final value, or fails.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::trace;

use pluggi_core::error::AppError;
use pluggi_core::result::AppResult;

/// A value a routine yields to the driver to be awaited.
pub type Awaitable = BoxFuture<'static, AppResult<Value>>;

/// Input passed to a routine when it is resumed.
#[derive(Debug)]
pub enum Resume {
    /// First resumption; the routine starts running its body.
    Start,
    /// The last yielded awaitable resolved with this value.
    Value(Value),
    /// The last yielded awaitable rejected with this error.
    Error(AppError),
}

/// Outcome of resuming a routine once.
pub enum CoroutineStep {
    /// Suspend until the awaitable settles.
    Yield(Awaitable),
    /// The routine returned.
    Complete(Value),
    /// The routine failed.
    Fail(AppError),
}

impl std::fmt::Debug for CoroutineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yield(_) => f.write_str("Yield(<awaitable>)"),
            Self::Complete(value) => f.debug_tuple("Complete").field(value).finish(),
            Self::Fail(err) => f.debug_tuple("Fail").field(err).finish(),
        }
    }
}

/// A routine that can be suspended and resumed.
///
/// Any `FnMut(Resume) -> CoroutineStep` closure is a coroutine, which is the
/// usual way to write one: keep the routine's progress in captured state and
/// match on it in the closure body.
pub trait Coroutine: Send {
    /// Runs the routine until its next suspension point.
    fn resume(&mut self, input: Resume) -> CoroutineStep;
}

impl<F> Coroutine for F
where
    F: FnMut(Resume) -> CoroutineStep + Send,
{
    fn resume(&mut self, input: Resume) -> CoroutineStep {
        self(input)
    }
}

enum DriverState {
    /// The routine is about to be resumed with this input.
    Resuming(Resume),
    /// The routine is waiting for a yielded awaitable.
    Suspended(Awaitable),
    /// The routine completed or failed; the result has been returned.
    Finished,
}

/// Future that drives a [`Coroutine`] to completion.
///
/// Resolves with the routine's final value, or rejects with the error the
/// routine failed with. An error thrown into the routine that the routine
/// does not handle surfaces as its failure.
pub struct Driver {
    routine: Box<dyn Coroutine>,
    state: DriverState,
    steps: usize,
}

impl Driver {
    /// Creates a driver; the routine is not resumed until first polled.
    pub fn new(routine: Box<dyn Coroutine>) -> Self {
        Self {
            routine,
            state: DriverState::Resuming(Resume::Start),
            steps: 0,
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            DriverState::Resuming(_) => "resuming",
            DriverState::Suspended(_) => "suspended",
            DriverState::Finished => "finished",
        };
        f.debug_struct("Driver")
            .field("state", &state)
            .field("steps", &self.steps)
            .finish()
    }
}

impl Future for Driver {
    type Output = AppResult<Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match std::mem::replace(&mut this.state, DriverState::Finished) {
                DriverState::Resuming(input) => {
                    this.steps += 1;
                    trace!(step = this.steps, "Resuming coroutine");
                    match this.routine.resume(input) {
                        CoroutineStep::Yield(awaitable) => {
                            this.state = DriverState::Suspended(awaitable);
                        }
                        CoroutineStep::Complete(value) => return Poll::Ready(Ok(value)),
                        CoroutineStep::Fail(err) => return Poll::Ready(Err(err)),
                    }
                }
                DriverState::Suspended(mut awaitable) => match awaitable.as_mut().poll(cx) {
                    Poll::Pending => {
                        this.state = DriverState::Suspended(awaitable);
                        return Poll::Pending;
                    }
                    Poll::Ready(Ok(value)) => {
                        this.state = DriverState::Resuming(Resume::Value(value));
                    }
                    Poll::Ready(Err(err)) => {
                        this.state = DriverState::Resuming(Resume::Error(err));
                    }
                },
                DriverState::Finished => {
                    return Poll::Ready(Err(AppError::internal(
                        "coroutine driver polled after completion",
                    )));
                }
            }
        }
    }
}
