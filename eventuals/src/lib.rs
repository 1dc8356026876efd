//! Composable, lazily-started asynchronous pipelines built from
//! continuation-passing eventuals.
//!
//! An [`Eventual`] is a cold description of a computation stage; composing
//! them left-to-right with [`Eventual::then_eventual`]/[`compose`] builds a
//! pipeline, and driving the head with [`Eventual::k`] plus a terminal sink
//! (see [`promisify`]/[`block_on`]) runs it. See `eventuals_core` for the
//! lower-level signal protocol, scheduler and context machinery this crate
//! builds on.

#![warn(clippy::pedantic)]
#![warn(unreachable_pub)]

mod eventual;
mod finally;
mod fork_join;
mod iterate;
mod leaf;
mod let_binding;
mod preempt;
mod reschedule;
mod schedule;
mod support;
mod terminal;
mod then;

pub use eventual::{compose, Compose, Eventual};
pub use finally::{finally, Finally, FinallyContinuation, Finished};
pub use fork_join::{fork_join, ForkJoin, ForkJoinContinuation};
pub use iterate::{foreach, iterate, Foreach, Iterate};
pub use leaf::{closure, eventual, head, just, lazy, Closure, FromFn, Just, Lazy, LazyContinuation};
pub use let_binding::{let_in, Let, LetContinuation};
pub use preempt::{preempt, Preempt, PreemptContinuation};
pub use reschedule::{reschedule, reschedule_after, Reschedule, RescheduleContinuation};
pub use schedule::{schedule, Schedule, ScheduleContinuation};
pub use support::Outcome;
pub use terminal::{block_on, promisify, EventualFuture, PromiseError, RunBlocking, Terminal};
pub use then::{then, try_then, unpack, Then, TryThen};

pub use eventuals_core::{
    init_logging, default_scheduler, BoxError, Context, ContextGuard, Continuation, InlineScheduler,
    Interrupt, Notification, Requirements, Scheduler, StaticThreadPool, StoppedError,
};
