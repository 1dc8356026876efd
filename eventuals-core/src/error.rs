//! Error types shared across the signal protocol, the scheduler and the `eventuals`
//! crate's `Finally`/`Promisify` boundary.

use std::error::Error;

/// The well-known error observed at a `Promisify`/`Finally` boundary when a pipeline
/// produced `stop()` rather than a value or a typed [`fail`](crate::signal::Continuation::fail).
///
/// `Stopped` is a distinct signal from a value error; this type exists
/// only to give that signal a concrete shape where a single concrete error type is
/// required, e.g. the future returned by `promisify`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("eventual stopped")]
pub struct StoppedError;

/// A type-erased error, used only where heterogeneous upstream errors meet a sink
/// that needs one concrete error type but the caller never unified the upstream
/// error types through `From` (see `DESIGN.md` for why composition otherwise
/// requires `From`-convertibility rather than an open-ended union type).
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;
