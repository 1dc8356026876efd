//! `Terminal`, the concrete sink that ends a pipeline and turns it into an
//! ordinary [`Future`], plus the blocking `block_on` built on it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll, Waker};

use eventuals_core::{default_scheduler, Context, Continuation, Interrupt, StoppedError};

use crate::eventual::Eventual;
use crate::reschedule::reschedule;

/// The error a [`promisify`]d future resolves with when the pipeline didn't
/// produce a value: either the pipeline's own error type, or
/// [`StoppedError`] if it stopped.
#[derive(Debug, thiserror::Error)]
pub enum PromiseError<Error> {
    #[error(transparent)]
    Failed(Error),
    #[error(transparent)]
    Stopped(#[from] StoppedError),
}

enum SharedState<Value, Error> {
    Pending(Option<Waker>),
    Ready(Result<Value, PromiseError<Error>>),
    Taken,
}

struct Shared<Value, Error> {
    state: Mutex<SharedState<Value, Error>>,
}

fn resolve<Value, Error>(shared: &Shared<Value, Error>, result: Result<Value, PromiseError<Error>>) {
    let waker = {
        let mut state = shared.state.lock().expect("promisify state poisoned");
        match std::mem::replace(&mut *state, SharedState::Ready(result)) {
            SharedState::Pending(waker) => waker,
            SharedState::Ready(_) | SharedState::Taken => {
                panic!("eventuals Terminal resolved more than once")
            }
        }
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}

/// The [`Future`] produced by [`promisify`].
pub struct EventualFuture<Value, Error> {
    shared: Arc<Shared<Value, Error>>,
}

impl<Value, Error> Future for EventualFuture<Value, Error> {
    type Output = Result<Value, PromiseError<Error>>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock().expect("promisify state poisoned");
        match std::mem::replace(&mut *state, SharedState::Taken) {
            SharedState::Ready(result) => Poll::Ready(result),
            SharedState::Pending(_) => {
                *state = SharedState::Pending(Some(cx.waker().clone()));
                Poll::Pending
            }
            SharedState::Taken => panic!("eventuals EventualFuture polled after completion"),
        }
    }
}

/// The [`Continuation`] sink that resolves an [`EventualFuture`].
pub struct Terminal<Value, Error> {
    shared: Arc<Shared<Value, Error>>,
}

impl<Value, Error> Continuation<Value> for Terminal<Value, Error>
where
    Value: Send,
    Error: Send,
{
    type Error = Error;

    fn start(self, value: Value) {
        resolve(&self.shared, Ok(value));
    }

    fn fail(self, error: Error) {
        resolve(&self.shared, Err(PromiseError::Failed(error)));
    }

    fn stop(self) {
        resolve(&self.shared, Err(PromiseError::Stopped(StoppedError)));
    }

    fn register(&mut self, _interrupt: &Interrupt) {}
}

/// Turns `e` into a `(Future, Continuation)` pair: driving the returned
/// continuation with `e`'s upstream argument starts the pipeline, which runs
/// on its own named [`Context`] (rescheduling there first, exactly like
/// [`crate::preempt::preempt`]) and resolves the future on completion.
pub fn promisify<Arg, E>(
    name: impl Into<String>,
    e: E,
) -> (
    EventualFuture<E::Value, E::Error>,
    impl Continuation<Arg, Error = E::Error>,
)
where
    Arg: Send + 'static,
    E: Eventual<Arg> + Send + 'static,
    E::Value: Send + 'static,
    E::Error: Send + 'static,
{
    let shared = Arc::new(Shared {
        state: Mutex::new(SharedState::Pending(None)),
    });
    let future = EventualFuture {
        shared: shared.clone(),
    };
    let terminal = Terminal { shared };

    let context = Context::new(name, default_scheduler());
    let head = reschedule::<Arg, E::Error>(context).then_eventual(e);
    let head = head.k(terminal);

    (future, head)
}

/// Starts `e` with `()` and blocks the calling thread until it resolves.
/// A free function rather than an overloaded operator, since Rust has no
/// blocking-unwrap operator to hang this off of meaningfully.
pub fn block_on<E>(e: E) -> Result<E::Value, PromiseError<E::Error>>
where
    E: Eventual<()> + Send + 'static,
    E::Value: Send + 'static,
    E::Error: Send + 'static,
{
    let (future, head) = promisify(
        format!("[thread {:?} blocking on dereference]", std::thread::current().id()),
        e,
    );
    head.start(());
    futures_lite::future::block_on(future)
}

/// Method-call spelling of [`block_on`].
pub trait RunBlocking: Eventual<()> + Sized + Send + 'static {
    fn run_blocking(self) -> Result<Self::Value, PromiseError<Self::Error>>
    where
        Self::Value: Send + 'static,
        Self::Error: Send + 'static,
    {
        block_on(self)
    }
}

impl<E> RunBlocking for E where E: Eventual<()> + Send + 'static {}
