//! `Schedule`: runs the wrapped eventual on a [`StaticThreadPool`], pinned to
//! a specific CPU if `requirements` asks for one, then reschedules back onto
//! the calling context once it completes.

use std::marker::PhantomData;
use std::sync::Arc;

use eventuals_core::{Context, Continuation, Interrupt, Requirements, StaticThreadPool};

use crate::eventual::Eventual;
use crate::reschedule::reschedule;

pub struct Schedule<E> {
    pool: Arc<StaticThreadPool>,
    requirements: Requirements,
    inner: E,
}

pub fn schedule<E>(pool: Arc<StaticThreadPool>, requirements: Requirements, inner: E) -> Schedule<E> {
    Schedule {
        pool,
        requirements,
        inner,
    }
}

pub struct ScheduleContinuation<K, E, Arg> {
    pool: Arc<StaticThreadPool>,
    requirements: Requirements,
    inner: E,
    downstream: K,
    interrupt: Option<Interrupt>,
    _marker: PhantomData<Arg>,
}

impl<Arg, K, E> ScheduleContinuation<K, E, Arg> {
    fn context(&self) -> Arc<Context> {
        let scheduler = self.pool.clone() as Arc<dyn eventuals_core::Scheduler>;
        match self.requirements.pinned {
            Some(cpu) => Context::with_pinned(self.requirements.name.clone(), scheduler, cpu),
            None => Context::new(self.requirements.name.clone(), scheduler),
        }
    }
}

impl<Arg, K, E> Continuation<Arg> for ScheduleContinuation<K, E, Arg>
where
    Arg: Send + 'static,
    E: Eventual<Arg> + Send + 'static,
    E::Value: Send + 'static,
    K: Continuation<E::Value, Error = E::DownstreamError> + Send + 'static,
{
    type Error = E::DownstreamError;

    fn start(self, arg: Arg) {
        let previous = Context::current();
        let context = self.context();
        let ScheduleContinuation {
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

impl<Arg, E> Eventual<Arg> for Schedule<E>
where
    Arg: Send + 'static,
    E: Eventual<Arg> + Send + 'static,
    E::Value: Send + 'static,
{
    type Value = E::Value;
    type Error = E::DownstreamError;
    type DownstreamError = E::DownstreamError;
    type Continuation<K>
        = ScheduleContinuation<K, E, Arg>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>,
    {
        ScheduleContinuation {
            pool: self.pool,
            requirements: self.requirements,
            inner: self.inner,
            downstream,
            interrupt: None,
            _marker: PhantomData,
        }
    }
}
