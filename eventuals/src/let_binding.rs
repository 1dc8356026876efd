//! `let_in`: binds a value and keeps it alive for the lifetime of the inner
//! eventual built from a reference to it (named `let_in` rather than `let`,
//! since `let` is a Rust keyword).
//!
//! Useful when a sub-pipeline needs to borrow from something that must
//! outlive every stage in it, rather than move a clone into each closure.

use eventuals_core::{Continuation, Interrupt};

use crate::eventual::Eventual;

pub struct Let<T, F> {
    value: T,
    f: F,
}

pub fn let_in<T, F, E>(value: T, f: F) -> Let<T, F>
where
    F: FnOnce(&mut T) -> E,
{
    Let { value, f }
}

pub struct LetContinuation<T, F, K> {
    value: T,
    f: F,
    downstream: K,
    interrupt: Option<Interrupt>,
}

impl<Arg, T, F, E, K> Continuation<Arg> for LetContinuation<T, F, K>
where
    F: FnOnce(&mut T) -> E,
    E: Eventual<Arg>,
    K: Continuation<E::Value, Error = E::DownstreamError>,
{
    type Error = E::DownstreamError;

    fn start(self, arg: Arg) {
        let LetContinuation {
            mut value,
            f,
            downstream,
            interrupt,
        } = self;
        let inner = f(&mut value);
        let mut continuation = inner.k(downstream);
        if let Some(interrupt) = &interrupt {
            continuation.register(interrupt);
        }
        continuation.start(arg);
    }

    fn fail(self, error: Self::Error) {
        self.downstream.fail(error);
    }

    fn stop(self) {
        self.downstream.stop();
    }

    fn register(&mut self, interrupt: &Interrupt) {
        self.interrupt = Some(interrupt.clone());
    }
}

impl<Arg, T, F, E> Eventual<Arg> for Let<T, F>
where
    F: FnOnce(&mut T) -> E,
    E: Eventual<Arg>,
{
    type Value = E::Value;
    type Error = E::DownstreamError;
    type DownstreamError = E::DownstreamError;
    type Continuation<K>
        = LetContinuation<T, F, K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>,
    {
        LetContinuation {
            value: self.value,
            f: self.f,
            downstream,
            interrupt: None,
        }
    }
}
