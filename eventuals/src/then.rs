//! `then`, the value-transforming stage, plus its fallible sibling `try_then`.

use std::marker::PhantomData;

use eventuals_core::Continuation;

use crate::eventual::Eventual;
use crate::support::{Apply, Outcome, Transform};

/// Applies `f` to the upstream value and starts downstream with the result.
pub struct Then<F, Arg, Error> {
    f: F,
    _marker: PhantomData<fn(Arg) -> Error>,
}

pub fn then<Arg, F, Value, Error>(f: F) -> Then<F, Arg, Error>
where
    F: FnOnce(Arg) -> Value + Send,
    Error: Send,
{
    Then {
        f,
        _marker: PhantomData,
    }
}

struct MapValue<F, Error> {
    f: F,
    _marker: PhantomData<fn() -> Error>,
}

impl<Arg, F, Value, Error> Transform<Arg> for MapValue<F, Error>
where
    F: FnOnce(Arg) -> Value,
    Error: Send,
{
    type Value = Value;
    type Error = Error;

    fn apply(self, arg: Arg) -> Outcome<Value, Error> {
        Outcome::Start((self.f)(arg))
    }
}

impl<Arg, F, Value, Error> Eventual<Arg> for Then<F, Arg, Error>
where
    F: FnOnce(Arg) -> Value + Send,
    Error: Send,
{
    type Value = Value;
    type Error = Error;
    type DownstreamError = Error;
    type Continuation<K>
        = Apply<K, MapValue<F, Error>>
    where
        K: Continuation<Value, Error = Error>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Value, Error = Error>,
    {
        Apply {
            downstream,
            transform: MapValue {
                f: self.f,
                _marker: PhantomData,
            },
        }
    }
}

/// Like [`then`], but `f` can itself fail: `Ok` starts downstream, `Err` fails
/// it.
pub struct TryThen<F, Arg> {
    f: F,
    _marker: PhantomData<fn(Arg)>,
}

pub fn try_then<Arg, F, Value, Error>(f: F) -> TryThen<F, Arg>
where
    F: FnOnce(Arg) -> Result<Value, Error> + Send,
    Error: Send,
{
    TryThen {
        f,
        _marker: PhantomData,
    }
}

struct MapResult<F> {
    f: F,
}

impl<Arg, F, Value, Error> Transform<Arg> for MapResult<F>
where
    F: FnOnce(Arg) -> Result<Value, Error>,
    Error: Send,
{
    type Value = Value;
    type Error = Error;

    fn apply(self, arg: Arg) -> Outcome<Value, Error> {
        match (self.f)(arg) {
            Ok(value) => Outcome::Start(value),
            Err(error) => Outcome::Fail(error),
        }
    }
}

impl<Arg, F, Value, Error> Eventual<Arg> for TryThen<F, Arg>
where
    F: FnOnce(Arg) -> Result<Value, Error> + Send,
    Error: Send,
{
    type Value = Value;
    type Error = Error;
    type DownstreamError = Error;
    type Continuation<K>
        = Apply<K, MapResult<F>>
    where
        K: Continuation<Value, Error = Error>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Value, Error = Error>,
    {
        Apply {
            downstream,
            transform: MapResult { f: self.f },
        }
    }
}

/// Adapts a two-argument closure so it can be passed to [`then`] or
/// [`try_then`] over a `(A, B)` upstream value, e.g.
/// `then(unpack(|i, s| format(i, s)))`.
pub fn unpack<A, B, F, R>(f: F) -> impl FnOnce((A, B)) -> R
where
    F: FnOnce(A, B) -> R,
{
    move |(a, b)| f(a, b)
}
