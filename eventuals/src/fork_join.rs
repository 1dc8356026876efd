//! `ForkJoin`: `fork_join(name, n, f)`.
//!
//! Spawns `n` forks, each built by `f(index, &arg)` and run under its own
//! child [`Context`] (so each can be pinned to a different core via a
//! [`Schedule`](crate::schedule::Schedule) stage inside `f`), then joins:
//! every fork's outcome is recorded in a slot, and once the last one lands the
//! whole thing resolves by scanning slots in ascending index order — any
//! `stop` dominates regardless of position, else the first `fail` (by index)
//! wins, else every value is collected into a `Vec`.
//!
//! `f` always takes `(index, &arg)`, passing `&()` for the `Arg = ()` case —
//! one calling convention rather than an overload per arity (see
//! `DESIGN.md`).

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use eventuals_core::{Context, Continuation, Interrupt};

use crate::eventual::Eventual;
use crate::reschedule::reschedule;

/// Why a fork didn't produce a value.
enum JoinFailure<Error> {
    Failed(Error),
    Stopped,
}

struct ForkJoinState<Value, Error> {
    slots: Mutex<Vec<Option<Result<Value, JoinFailure<Error>>>>>,
    remaining: AtomicUsize,
}

pub struct ForkJoin<F> {
    name: String,
    forks: usize,
    f: F,
}

/// Runs `forks` copies of `f(index, &arg)` concurrently and joins their
/// results into a `Vec` ordered by fork index.
pub fn fork_join<F>(name: impl Into<String>, forks: usize, f: F) -> ForkJoin<F> {
    ForkJoin {
        name: name.into(),
        forks,
        f,
    }
}

pub struct ForkJoinContinuation<K, F, Arg> {
    name: String,
    forks: usize,
    f: F,
    downstream: K,
    interrupt: Option<Interrupt>,
    _marker: PhantomData<Arg>,
}

/// Per-fork sink: records this fork's outcome and, if it's the last one in,
/// scans every slot and resolves the join.
struct ForkJoinSlot<Value, Error, K> {
    index: usize,
    state: Arc<ForkJoinState<Value, Error>>,
    downstream: Arc<Mutex<Option<K>>>,
    interrupter: Arc<dyn Fn() + Send + Sync>,
}

impl<Value, Error, K> Continuation<Value> for ForkJoinSlot<Value, Error, K>
where
    Value: Send + 'static,
    Error: Send + 'static,
    K: Continuation<Vec<Value>, Error = Error> + Send + 'static,
{
    type Error = Error;

    fn start(self, value: Value) {
        self.complete(Ok(value));
    }

    fn fail(self, error: Error) {
        self.complete(Err(JoinFailure::Failed(error)));
    }

    fn stop(self) {
        self.complete(Err(JoinFailure::Stopped));
    }

    fn register(&mut self, _interrupt: &Interrupt) {
        // Each fork's own interrupt is installed by the parent directly on the
        // continuation it built from `f(index, &arg)`; this slot is the sink,
        // nothing further downstream needs it.
    }
}

impl<Value, Error, K> ForkJoinSlot<Value, Error, K>
where
    Value: Send + 'static,
    Error: Send + 'static,
    K: Continuation<Vec<Value>, Error = Error> + Send + 'static,
{
    fn complete(self, result: Result<Value, JoinFailure<Error>>) {
        let failed_or_stopped = result.is_err();
        {
            let mut slots = self.state.slots.lock().expect("fork/join slots poisoned");
            slots[self.index] = Some(result);
        }

        let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let downstream = self
                .downstream
                .lock()
                .expect("fork/join downstream poisoned")
                .take()
                .expect("fork/join downstream consumed twice");
            let slots = std::mem::take(
                &mut *self.state.slots.lock().expect("fork/join slots poisoned"),
            );
            Self::finish(downstream, slots);
        } else if failed_or_stopped {
            (self.interrupter)();
        }
    }

    fn finish(downstream: K, slots: Vec<Option<Result<Value, JoinFailure<Error>>>>) {
        let any_stopped = slots
            .iter()
            .any(|slot| matches!(slot, Some(Err(JoinFailure::Stopped))));
        if any_stopped {
            downstream.stop();
            return;
        }

        let mut values = Vec::with_capacity(slots.len());
        let mut first_error = None;
        for slot in slots {
            match slot.expect("fork/join slot never written") {
                Ok(value) => values.push(value),
                Err(JoinFailure::Failed(error)) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
                Err(JoinFailure::Stopped) => unreachable!("handled by any_stopped above"),
            }
        }

        match first_error {
            Some(error) => downstream.fail(error),
            None => downstream.start(values),
        }
    }
}

impl<Arg, K, F, E> Continuation<Arg> for ForkJoinContinuation<K, F, Arg>
where
    Arg: Send + Sync + 'static,
    F: Fn(usize, &Arg) -> E + Send + Sync + 'static,
    E: Eventual<()> + Send + 'static,
    E::Value: Send + 'static,
    E::DownstreamError: Send + 'static,
    K: Continuation<Vec<E::Value>, Error = E::DownstreamError> + Send + 'static,
{
    type Error = E::DownstreamError;

    fn start(self, arg: Arg) {
        let ForkJoinContinuation {
            name,
            forks,
            f,
            downstream,
            interrupt,
            ..
        } = self;

        if let Some(outer) = &interrupt {
            if outer.is_triggered() {
                downstream.stop();
                return;
            }
        }

        let arg = Arc::new(arg);
        let parent_context = Context::current();
        let state = Arc::new(ForkJoinState {
            slots: Mutex::new((0..forks).map(|_| None).collect::<Vec<_>>()),
            remaining: AtomicUsize::new(forks),
        });
        let downstream = Arc::new(Mutex::new(Some(downstream)));

        let child_interrupts: Vec<Interrupt> = (0..forks).map(|_| Interrupt::new()).collect();
        let interrupts_to_trigger = child_interrupts.clone();
        let interrupter: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            for child_interrupt in &interrupts_to_trigger {
                child_interrupt.trigger();
            }
        });

        if let Some(outer) = &interrupt {
            let interrupter = interrupter.clone();
            if !outer.install(move || interrupter()) {
                // Already triggered between our early check and installing —
                // we're responsible for honoring it ourselves.
                interrupter();
            }
        }

        for index in 0..forks {
            let child_eventual = f(index, &arg);
            let state = state.clone();
            let downstream = downstream.clone();
            let interrupter = interrupter.clone();
            let child_interrupt = child_interrupts[index].clone();
            let child_context = parent_context.child(format!("{} [ForkJoin {} - {}]", parent_context.name(), name, index));
            let reentry = reschedule(parent_context.clone()).k(ForkJoinSlot {
                index,
                state,
                downstream,
                interrupter,
            });

            let mut continuation = child_eventual.k(reentry);
            continuation.register(&child_interrupt);

            child_context.continue_with(move || continuation.start(()));
        }
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

impl<Arg, F, E> Eventual<Arg> for ForkJoin<F>
where
    Arg: Send + Sync + 'static,
    F: Fn(usize, &Arg) -> E + Send + Sync + 'static,
    E: Eventual<()> + Send + 'static,
    E::Value: Send + 'static,
    E::DownstreamError: Send + 'static,
{
    type Value = Vec<E::Value>;
    type Error = E::DownstreamError;
    type DownstreamError = E::DownstreamError;
    type Continuation<K>
        = ForkJoinContinuation<K, F, Arg>
    where
        K: Continuation<Vec<E::Value>, Error = E::DownstreamError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Vec<E::Value>, Error = E::DownstreamError>,
    {
        ForkJoinContinuation {
            name: self.name,
            forks: self.forks,
            f: self.f,
            downstream,
            interrupt: None,
            _marker: PhantomData,
        }
    }
}
