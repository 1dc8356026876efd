//! Leaf builders: the primitives every pipeline starts from — `eventual(...)`,
//! `just(...)` and `head()` — plus `closure` and `lazy`, which defer building
//! the inner eventual rather than transforming a value.

use std::marker::PhantomData;

use eventuals_core::Continuation;

use crate::eventual::Eventual;
use crate::support::{Apply, Outcome, Transform};

/// Builds a leaf from a single closure that decides, given the upstream
/// value, whether to start, fail or stop downstream.
///
/// This folds a three-closure `eventual(start_fn, fail_fn, stop_fn)`
/// constructor into one: since `fail`/`stop` almost always pass through
/// unchanged for a value-producing leaf, `f`'s return type, [`Outcome`], is
/// the only place a leaf needs to deviate from that default.
/// A leaf that must react specially to upstream `fail`/`stop` (rather than
/// just deciding its own outcome from `start`) should implement [`Eventual`]
/// directly instead.
pub struct FromFn<F, Arg> {
    f: F,
    _marker: PhantomData<fn(Arg)>,
}

pub fn eventual<Arg, Value, Error, F>(f: F) -> FromFn<F, Arg>
where
    F: FnOnce(Arg) -> Outcome<Value, Error> + Send,
    Error: Send,
{
    FromFn {
        f,
        _marker: PhantomData,
    }
}

struct ApplyOutcome<F> {
    f: F,
}

impl<Arg, F, Value, Error> Transform<Arg> for ApplyOutcome<F>
where
    F: FnOnce(Arg) -> Outcome<Value, Error>,
    Error: Send,
{
    type Value = Value;
    type Error = Error;

    fn apply(self, arg: Arg) -> Outcome<Value, Error> {
        (self.f)(arg)
    }
}

impl<Arg, F, Value, Error> Eventual<Arg> for FromFn<F, Arg>
where
    F: FnOnce(Arg) -> Outcome<Value, Error> + Send,
    Error: Send,
{
    type Value = Value;
    type Error = Error;
    type DownstreamError = Error;
    type Continuation<K>
        = Apply<K, ApplyOutcome<F>>
    where
        K: Continuation<Value, Error = Error>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Value, Error = Error>,
    {
        Apply {
            downstream,
            transform: ApplyOutcome { f: self.f },
        }
    }
}

/// A leaf that immediately starts downstream with a fixed `value`, ignoring
/// whatever argument it's driven with.
pub struct Just<Value, Error> {
    value: Value,
    _marker: PhantomData<fn() -> Error>,
}

pub fn just<Value, Error>(value: Value) -> Just<Value, Error>
where
    Value: Send,
    Error: Send,
{
    Just {
        value,
        _marker: PhantomData,
    }
}

/// A leaf equivalent to `just(())`: the trivial head of a pipeline whose
/// first real stage doesn't care about an upstream argument.
pub fn head<Error>() -> Just<(), Error>
where
    Error: Send,
{
    just(())
}

struct ConstValue<Value, Error> {
    value: Value,
    _marker: PhantomData<fn() -> Error>,
}

impl<Arg, Value, Error> Transform<Arg> for ConstValue<Value, Error>
where
    Error: Send,
{
    type Value = Value;
    type Error = Error;

    fn apply(self, _arg: Arg) -> Outcome<Value, Error> {
        Outcome::Start(self.value)
    }
}

impl<Arg, Value, Error> Eventual<Arg> for Just<Value, Error>
where
    Value: Send,
    Error: Send,
{
    type Value = Value;
    type Error = Error;
    type DownstreamError = Error;
    type Continuation<K>
        = Apply<K, ConstValue<Value, Error>>
    where
        K: Continuation<Value, Error = Error>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Value, Error = Error>,
    {
        Apply {
            downstream,
            transform: ConstValue {
                value: self.value,
                _marker: PhantomData,
            },
        }
    }
}

/// Defers *building* the inner eventual until [`Eventual::k`] runs, not just
/// starting it. Useful when the inner eventual depends on state only
/// available at composition time.
pub struct Closure<F> {
    f: F,
}

pub fn closure<F, E>(f: F) -> Closure<F>
where
    F: FnOnce() -> E,
{
    Closure { f }
}

impl<Arg, F, E> Eventual<Arg> for Closure<F>
where
    F: FnOnce() -> E,
    E: Eventual<Arg>,
{
    type Value = E::Value;
    type Error = E::Error;
    type DownstreamError = E::DownstreamError;
    type Continuation<K>
        = E::Continuation<K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>,
    {
        (self.f)().k(downstream)
    }
}

/// Defers building the inner eventual even further than [`Closure`]: all the
/// way until the continuation's `start`/`fail`/`stop` actually runs, rather
/// than at `k()` time. Needed for pipelines that would otherwise recurse
/// while still being *built*.
pub struct Lazy<F> {
    f: F,
}

pub fn lazy<F, E>(f: F) -> Lazy<F>
where
    F: FnOnce() -> E,
{
    Lazy { f }
}

pub struct LazyContinuation<F, K> {
    f: F,
    downstream: K,
    interrupt: Option<eventuals_core::Interrupt>,
}

impl<Arg, F, E, K> Continuation<Arg> for LazyContinuation<F, K>
where
    F: FnOnce() -> E,
    E: Eventual<Arg>,
    K: Continuation<E::Value, Error = E::DownstreamError>,
{
    type Error = E::Error;

    fn start(self, arg: Arg) {
        let mut inner = (self.f)().k(self.downstream);
        if let Some(interrupt) = &self.interrupt {
            inner.register(interrupt);
        }
        inner.start(arg);
    }

    fn fail(self, error: Self::Error) {
        (self.f)().k(self.downstream).fail(error);
    }

    fn stop(self) {
        (self.f)().k(self.downstream).stop();
    }

    fn register(&mut self, interrupt: &eventuals_core::Interrupt) {
        self.interrupt = Some(interrupt.clone());
    }
}

impl<Arg, F, E> Eventual<Arg> for Lazy<F>
where
    F: FnOnce() -> E,
    E: Eventual<Arg>,
{
    type Value = E::Value;
    type Error = E::Error;
    type DownstreamError = E::DownstreamError;
    type Continuation<K>
        = LazyContinuation<F, K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<E::Value, Error = E::DownstreamError>,
    {
        LazyContinuation {
            f: self.f,
            downstream,
            interrupt: None,
        }
    }
}
