//! Extra combinators that sit alongside the core `eventuals` crate: pieces
//! that round out the library for real callers without belonging in the
//! core computation model itself.
//!
//! - [`Sequence`] / [`iterate_seq`]: borrow a collection as an `iterate`
//!   source instead of consuming it.
//! - [`do_all2`] / [`do_all3`]: join a fixed tuple of differently-typed
//!   builders, boxing every child's error so the caller doesn't have to
//!   unify error types across the tuple by hand.

mod do_all;
mod sequence;

pub use do_all::{do_all2, do_all3, DoAll2, DoAll2Continuation, DoAll3, DoAll3Continuation};
pub use sequence::{iterate_seq, Sequence};
