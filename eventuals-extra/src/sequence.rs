//! The `Sequence` trait: a non-consuming view over a collection of items, so
//! `Vec<T>`, slices and ranges are all usable as `iterate`/`foreach` sources
//! *by reference*, leaving the source collection unchanged.
//!
//! `eventuals::iterate`/`foreach` already accept any `IntoIterator` by value;
//! this trait exists purely for the read-only, borrow-don't-consume case.

use std::ops::Range;

/// A read-only view over a sequence of `Item`s that can be snapshotted into a
/// `Vec` without consuming `self`.
pub trait Sequence {
    type Item;

    /// Copies every item into a fresh `Vec`, in order.
    fn to_vec(&self) -> Vec<Self::Item>;
}

impl<T: Clone> Sequence for [T] {
    type Item = T;

    fn to_vec(&self) -> Vec<T> {
        self.to_owned()
    }
}

impl<T: Clone> Sequence for Vec<T> {
    type Item = T;

    fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_owned()
    }
}

impl Sequence for Range<usize> {
    type Item = usize;

    fn to_vec(&self) -> Vec<usize> {
        self.clone().collect()
    }
}

/// Builds an eventual that snapshots `source` into a `Vec` and starts
/// downstream with it, without consuming `source` — compare
/// `eventuals::iterate`, which takes ownership of an `IntoIterator`.
pub fn iterate_seq<S, Error>(source: &S) -> eventuals::Iterate<Vec<S::Item>, Error>
where
    S: Sequence + ?Sized,
    S::Item: Send + 'static,
    Error: Send,
{
    eventuals::iterate(source.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventuals::RunBlocking;

    #[test]
    fn vec_sequence_round_trips_without_consuming_source() {
        let source = vec!["Hello".to_string(), "World".to_string()];
        let collected = iterate_seq::<_, std::convert::Infallible>(&source)
            .run_blocking()
            .unwrap();
        assert_eq!(collected, source);
        // `source` is still owned here: `iterate_seq` took it by reference.
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn range_sequence_collects_in_order() {
        let collected = iterate_seq::<_, std::convert::Infallible>(&(0..5))
            .run_blocking()
            .unwrap();
        assert_eq!(collected, vec![0, 1, 2, 3, 4]);
    }
}
