//! Component F: `Reschedule`, the stage that hands control to a specific
//! [`Context`], running inline if already continuable there and otherwise
//! submitting through its scheduler.

use std::marker::PhantomData;
use std::sync::Arc;

use eventuals_core::{Context, Continuation, Interrupt};

use crate::eventual::Eventual;

pub struct Reschedule<Arg, Error> {
    context: Arc<Context>,
    _marker: PhantomData<fn(Arg) -> Error>,
}

/// Hands the upstream value to `context`, resuming there before continuing
/// downstream. Used directly to land on a particular context, and as the
/// building block for [`reschedule_after`] and `Promisify`'s initial hop onto
/// its own private context.
pub fn reschedule<Arg, Error>(context: Arc<Context>) -> Reschedule<Arg, Error>
where
    Error: Send,
{
    Reschedule {
        context,
        _marker: PhantomData,
    }
}

pub struct RescheduleContinuation<K, Arg> {
    downstream: K,
    context: Arc<Context>,
    _marker: PhantomData<Arg>,
}

impl<Arg, K> Continuation<Arg> for RescheduleContinuation<K, Arg>
where
    Arg: Send + 'static,
    K: Continuation<Arg> + Send + 'static,
{
    type Error = K::Error;

    fn start(self, arg: Arg) {
        let RescheduleContinuation {
            downstream, context, ..
        } = self;
        context.continue_with(move || downstream.start(arg));
    }

    fn fail(self, error: K::Error) {
        let RescheduleContinuation {
            downstream, context, ..
        } = self;
        context.continue_with(move || downstream.fail(error));
    }

    fn stop(self) {
        let RescheduleContinuation {
            downstream, context, ..
        } = self;
        context.continue_with(move || downstream.stop());
    }

    fn register(&mut self, interrupt: &Interrupt) {
        self.downstream.register(interrupt);
    }
}

impl<Arg, Error> Eventual<Arg> for Reschedule<Arg, Error>
where
    Arg: Send + 'static,
    Error: Send,
{
    type Value = Arg;
    type Error = Error;
    type DownstreamError = Error;
    type Continuation<K>
        = RescheduleContinuation<K, Arg>
    where
        K: Continuation<Arg, Error = Error>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Arg, Error = Error>,
    {
        RescheduleContinuation {
            downstream,
            context: self.context,
            _marker: PhantomData,
        }
    }
}

/// Wraps `inner` so that, once it completes, control is handed back to
/// whatever context was current when `inner` started: useful for running a
/// sub-pipeline on another scheduler without leaving the caller stranded
/// there afterwards.
pub fn reschedule_after<Arg, E>(
    inner: E,
) -> crate::leaf::Closure<impl FnOnce() -> crate::eventual::Compose<E, Reschedule<E::Value, E::DownstreamError>>>
where
    E: Eventual<Arg>,
    E::Value: Send + 'static,
{
    crate::leaf::closure(move || {
        let previous = Context::current();
        inner.then_eventual(reschedule(previous))
    })
}
