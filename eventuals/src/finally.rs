//! Component J: `Finally`, which folds a terminal signal — value, error or
//! stop — into a single ordinary value, so nothing downstream of it can ever
//! observe `fail`/`stop` again.

use std::convert::Infallible;
use std::marker::PhantomData;

use eventuals_core::{Continuation, Interrupt};

use crate::eventual::Eventual;

/// The three ways an upstream pipeline can end, collapsed into one value for
/// [`finally`] to inspect.
#[derive(Debug)]
pub enum Finished<Error> {
    Failed(Error),
    Stopped,
}

impl<Error> Finished<Error> {
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Finished::Stopped)
    }
}

pub struct Finally<F> {
    f: F,
}

/// Builds the terminal stage: whatever `upstream` ends with — `start(value)`,
/// `fail(error)` or `stop()` — is handed to `f` as `Ok(value)` or
/// `Err(Finished::{Failed,Stopped})`, and `f`'s return value is started
/// downstream unconditionally. Downstream of `finally` therefore never fails
/// or stops (`Error = Infallible`).
pub fn finally<F>(f: F) -> Finally<F> {
    Finally { f }
}

pub struct FinallyContinuation<K, F, Value, Error> {
    downstream: K,
    f: F,
    _marker: PhantomData<fn(Value, Error)>,
}

impl<Value, Error, K, F, NewValue> Continuation<Value> for FinallyContinuation<K, F, Value, Error>
where
    K: Continuation<NewValue, Error = Infallible>,
    F: FnOnce(Result<Value, Finished<Error>>) -> NewValue + Send,
    Error: Send,
{
    type Error = Error;

    fn start(self, value: Value) {
        self.downstream.start((self.f)(Ok(value)));
    }

    fn fail(self, error: Error) {
        self.downstream.start((self.f)(Err(Finished::Failed(error))));
    }

    fn stop(self) {
        self.downstream.start((self.f)(Err(Finished::Stopped)));
    }

    fn register(&mut self, interrupt: &Interrupt) {
        self.downstream.register(interrupt);
    }
}

impl<Value, Error, F, NewValue> Eventual<Value> for Finally<F>
where
    F: FnOnce(Result<Value, Finished<Error>>) -> NewValue + Send,
    Error: Send,
{
    type Value = NewValue;
    type Error = Error;
    type DownstreamError = Infallible;
    type Continuation<K>
        = FinallyContinuation<K, F, Value, Error>
    where
        K: Continuation<NewValue, Error = Infallible>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<NewValue, Error = Infallible>,
    {
        FinallyContinuation {
            downstream,
            f: self.f,
            _marker: PhantomData,
        }
    }
}
