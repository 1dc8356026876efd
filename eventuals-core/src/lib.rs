//! Low-level types backing the `eventuals` crate: the four-method signal protocol
//! (component A), the scheduler/context machinery (component E), the static thread
//! pool (component G), one-shot interrupts (component I) and the notification latch
//! (component K).
//!
//! Everything in this crate is synchronous and allocation-conscious; the
//! continuation-composition machinery that actually builds pipelines lives one
//! layer up, in `eventuals`.

#![warn(clippy::pedantic)]
#![warn(unreachable_pub)]

pub mod context;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod notification;
pub mod pool;
pub mod signal;

pub use context::{
    default_scheduler, Callback, Context, ContextGuard, InlineScheduler, Requirements, Scheduler,
};
pub use error::{BoxError, StoppedError};
pub use interrupt::Interrupt;
pub use logging::init_logging;
pub use notification::Notification;
pub use pool::StaticThreadPool;
pub use signal::Continuation;
