//! The `Eventual` builder trait and left-to-right composition.
//!
//! An [`Eventual<Arg>`] is a deferred description of a pipeline stage. It owns
//! nothing runtime-observable until [`Eventual::k`] consumes it and produces a
//! concrete [`Continuation<Arg>`]; that's why `k` takes `self` by value — a
//! builder is one-shot, and the borrow checker rejects using it twice for
//! free.

use eventuals_core::Continuation;

/// A cold, lazily-started computation description.
///
/// `Arg` is the type this stage expects from upstream (typically `()` for a
/// leaf). `Value` and `Error` are this stage's outputs once composed, made
/// concrete rather than generic-over-`Arg` because each concrete `Eventual`
/// impl here already commits to one particular upstream `Arg`.
pub trait Eventual<Arg = ()>: Sized {
    /// What this stage produces on success.
    type Value;

    /// What this stage's own [`Continuation::fail`] accepts — the error type
    /// flowing in from *upstream*.
    type Error: Send;

    /// What this stage requires its *downstream* continuation's `fail` to
    /// accept. For almost every stage this is just [`Eventual::Error`] again
    /// (the error type passes through unchanged); [`crate::finally::Finally`]
    /// is the one stage where it differs, since it absorbs every upstream
    /// fail/stop into a plain value and so requires nothing of downstream but
    /// `Infallible`.
    type DownstreamError: Send;

    /// The concrete continuation type produced by [`Eventual::k`], generic over
    /// whichever downstream continuation it was handed.
    type Continuation<K>: Continuation<Arg, Error = Self::Error>
    where
        K: Continuation<Self::Value, Error = Self::DownstreamError>;

    /// Consumes this builder and `downstream`, producing this stage's
    /// continuation. `downstream` becomes this continuation's sole owned
    /// successor — a continuation holds exclusive ownership of its
    /// downstream continuation.
    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<Self::Value, Error = Self::DownstreamError>;

    /// Composes `self` ahead of `next`: `self.then_eventual(next)` runs `self`,
    /// feeds its value into `next`, and yields whatever `next` yields.
    ///
    /// This is the method-call spelling of [`compose`], for use where a
    /// chain reads more naturally left-to-right than as a free function.
    fn then_eventual<R>(self, next: R) -> Compose<Self, R>
    where
        R: Eventual<Self::Value, Error = Self::DownstreamError>,
    {
        Compose { left: self, right: next }
    }
}

/// The result of composing two builders left-to-right: `L ∘ R`.
///
/// `L.k(R.k(final))` — `L`'s continuation wraps `R`'s, which wraps whatever
/// `final` was handed to the whole chain's `k`.
pub struct Compose<L, R> {
    pub(crate) left: L,
    pub(crate) right: R,
}

impl<Arg, L, R> Eventual<Arg> for Compose<L, R>
where
    L: Eventual<Arg>,
    R: Eventual<L::Value, Error = L::DownstreamError>,
{
    type Value = R::Value;
    type Error = L::Error;
    type DownstreamError = R::DownstreamError;
    type Continuation<K>
        = L::Continuation<R::Continuation<K>>
    where
        K: Continuation<R::Value, Error = R::DownstreamError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<R::Value, Error = R::DownstreamError>,
    {
        self.left.k(self.right.k(downstream))
    }
}

/// Composes `left` ahead of `right`: `L ∘ R`.
///
/// A blanket `impl BitOr for every Eventual` to spell this `left | right`
/// would need Rust to treat `L` as a local type for every possible `R`, which
/// the orphan rules forbid, so this free function is the composition entry
/// point instead. See `DESIGN.md`.
pub fn compose<Arg, L, R>(left: L, right: R) -> Compose<L, R>
where
    L: Eventual<Arg>,
    R: Eventual<L::Value, Error = L::DownstreamError>,
{
    left.then_eventual(right)
}
