//! `iterate` and `foreach`: leaves over anything [`IntoIterator`].
//! `Sequence`-generic variants live in `eventuals-extra` to keep this crate
//! free of that dependency.
//!
//! Element-at-a-time streaming through per-element signals would let a
//! downstream stage react without buffering, but this crate collects eagerly
//! into a `Vec` instead — simpler, and sufficient for a one-shot pipeline;
//! see `DESIGN.md` for the trade.

use std::marker::PhantomData;

use eventuals_core::Continuation;

use crate::eventual::Eventual;
use crate::support::{Apply, Outcome, Transform};

pub struct Iterate<I, Error> {
    source: I,
    _marker: PhantomData<fn() -> Error>,
}

/// Collects `source` into a `Vec` and starts downstream with it.
pub fn iterate<I, Error>(source: I) -> Iterate<I, Error>
where
    I: IntoIterator,
    Error: Send,
{
    Iterate {
        source,
        _marker: PhantomData,
    }
}

struct CollectAll<I, Error> {
    source: I,
    _marker: PhantomData<fn() -> Error>,
}

impl<I, Error> Transform<()> for CollectAll<I, Error>
where
    I: IntoIterator,
    Error: Send,
{
    type Value = Vec<I::Item>;
    type Error = Error;

    fn apply(self, _arg: ()) -> Outcome<Vec<I::Item>, Error> {
        Outcome::Start(self.source.into_iter().collect())
    }
}

impl<I, Error> Eventual<()> for Iterate<I, Error>
where
    I: IntoIterator,
    I::Item: Send + 'static,
    Error: Send,
{
    type Value = Vec<I::Item>;
    type Error = Error;
    type DownstreamError = Error;
    type Continuation<K>
        = Apply<K, CollectAll<I, Error>>
    where
        K: Continuation<Vec<I::Item>, Error = Error>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Vec<I::Item>, Error = Error>,
    {
        Apply {
            downstream,
            transform: CollectAll {
                source: self.source,
                _marker: PhantomData,
            },
        }
    }
}

pub struct Foreach<I, F, Error> {
    source: I,
    f: F,
    _marker: PhantomData<fn() -> Error>,
}

/// Runs `f` over every element of `source`, then starts downstream with `()`.
pub fn foreach<I, F, Error>(source: I, f: F) -> Foreach<I, F, Error>
where
    I: IntoIterator,
    F: FnMut(I::Item),
    Error: Send,
{
    Foreach {
        source,
        f,
        _marker: PhantomData,
    }
}

struct ForeachTransform<I, F, Error> {
    source: I,
    f: F,
    _marker: PhantomData<fn() -> Error>,
}

impl<I, F, Error> Transform<()> for ForeachTransform<I, F, Error>
where
    I: IntoIterator,
    F: FnMut(I::Item),
    Error: Send,
{
    type Value = ();
    type Error = Error;

    fn apply(mut self, _arg: ()) -> Outcome<(), Error> {
        for item in self.source {
            (self.f)(item);
        }
        Outcome::Start(())
    }
}

impl<I, F, Error> Eventual<()> for Foreach<I, F, Error>
where
    I: IntoIterator,
    F: FnMut(I::Item) + Send,
    Error: Send,
{
    type Value = ();
    type Error = Error;
    type DownstreamError = Error;
    type Continuation<K>
        = Apply<K, ForeachTransform<I, F, Error>>
    where
        K: Continuation<(), Error = Error>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<(), Error = Error>,
    {
        Apply {
            downstream,
            transform: ForeachTransform {
                source: self.source,
                f: self.f,
                _marker: PhantomData,
            },
        }
    }
}
