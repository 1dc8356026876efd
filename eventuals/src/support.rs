//! Shared machinery behind the simple value-transforming stages (`then`,
//! `eventual`, `just`, `iterate`, `foreach`, …): a single [`Continuation`] impl,
//! [`Apply`], parameterized by a [`Transform`] that decides what signal to
//! forward downstream, with `fail`/`stop` passed through unchanged — which is
//! what most stages do.

use eventuals_core::{Continuation, Interrupt};

/// What a [`Transform`] decided to do with the value it received.
pub enum Outcome<Value, Error> {
    Start(Value),
    Fail(Error),
    Stop,
}

/// A one-shot decision: given an upstream value, produce this stage's
/// [`Outcome`]. Exists because stable Rust can't implement `FnOnce` for
/// arbitrary structs, so every simple stage gets its own small `Transform`
/// impl instead of storing a boxed closure.
pub trait Transform<Arg> {
    type Value;
    type Error: Send;

    fn apply(self, arg: Arg) -> Outcome<Self::Value, Self::Error>;
}

/// The continuation shared by every `Transform`-based stage.
pub struct Apply<K, T> {
    pub(crate) downstream: K,
    pub(crate) transform: T,
}

impl<Arg, K, T> Continuation<Arg> for Apply<K, T>
where
    T: Transform<Arg> + Send,
    K: Continuation<T::Value, Error = T::Error>,
{
    type Error = T::Error;

    fn start(self, arg: Arg) {
        match self.transform.apply(arg) {
            Outcome::Start(value) => self.downstream.start(value),
            Outcome::Fail(error) => self.downstream.fail(error),
            Outcome::Stop => self.downstream.stop(),
        }
    }

    fn fail(self, error: Self::Error) {
        self.downstream.fail(error);
    }

    fn stop(self) {
        self.downstream.stop();
    }

    fn register(&mut self, interrupt: &Interrupt) {
        self.downstream.register(interrupt);
    }
}
