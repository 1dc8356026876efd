//! `Preempt`: runs the wrapped eventual under a fresh, named default-scheduler
//! context, then hands control back to whatever context called it. Gives a
//! sub-pipeline its own named point of reference (visible in logs and in
//! `Context::current().name()`) without moving it to another thread.

use std::marker::PhantomData;

use eventuals_core::{default_scheduler, Context, Continuation, Interrupt};

use crate::eventual::Eventual;
use crate::reschedule::reschedule;

pub struct Preempt<E> {
    name: String,
    inner: E,
}

pub fn preempt<E>(name: impl Into<String>, inner: E) -> Preempt<E> {
    Preempt {
        name: name.into(),
        inner,
    }
}

pub struct PreemptContinuation<K, E, Arg> {
    name: String,
    inner: E,
    downstream: K,
    interrupt: Option<Interrupt>,
    _marker: PhantomData<Arg>,
}

impl<Arg, K, E> Continuation<Arg> for PreemptContinuation<K, E, Arg>
where
    Arg: Send + 'static,
    E: Eventual<Arg> + Send + 'static,
    E::Value: Send + 'static,
    K: Continuation<E::Value, Error = E::DownstreamError> + Send + 'static,
{
    type Error = E::DownstreamError;

    fn start(self, arg: Arg) {
        let previous = Context::current();
        let context = Context::new(self.name, default_scheduler());
        let PreemptContinuation {
            inner,
            downstream,
            interrupt,
            ..
        } = self;
        context.continue_with(move || {
            let mut adapted = inner.k(reschedule(previous).k(downstream));
            if let Some(interrupt) = &interrupt {
                adapted.register(interrupt);
            }
            adapted.start(arg);
        });
    }

    fn fail(self, error: E::DownstreamError) {
        self.downstream.fail(error);
    }

    fn stop(self) {
        self.downstream.stop();
    }

    fn register(&mut self, interrupt: &Interrupt) {
        self.interrupt = Some(interrupt.clone());
    }
}

impl<Arg, E> Eventual<Arg> for Preempt<E>
where
    Arg: Send + 'static,
    E: Eventual<Arg> + Send + 'static,
    E::Value: Send + 'static,
{
    type Value = E::Value;
    type Error = E::DownstreamError;
    type DownstreamError = E::DownstreamError;
    type Continuation<K>
        = PreemptContinuation<K, E, Arg>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>,
    {
        PreemptContinuation {
            name: self.name,
            inner: self.inner,
            downstream,
            interrupt: None,
            _marker: PhantomData,
        }
    }
}
