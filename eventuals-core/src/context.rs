//! Component E: the scheduler trait and the thread-local "current context"
//! machinery every composable stage reads and writes.
//!
//! A [`Context`] is a named handle for *where* work runs. Every thread owns a
//! default context (backed by the [`InlineScheduler`]) from the moment it first
//! touches this module; stages that need to run elsewhere (the static thread
//! pool, fork/join's per-child contexts) construct their own and switch into
//! them via [`Context::enter`].

use std::{
    cell::RefCell,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use parking_lot::Mutex;

/// A boxed, one-shot unit of work crossing a [`Scheduler::submit`] boundary.
pub type Callback = Box<dyn FnOnce() + Send>;

/// What a caller wants from the [`StaticThreadPool`](crate::pool::StaticThreadPool):
/// a name (for logging) and, optionally, a specific CPU to pin to.
///
/// Mirrors the source's `StaticThreadPool::Requirements` plus `Pinned`, folded
/// into one struct since this crate has exactly one kind of scheduler-private
/// data (see `DESIGN.md`).
#[derive(Debug, Clone)]
pub struct Requirements {
    pub name: String,
    pub pinned: Option<usize>,
}

impl Requirements {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pinned: None,
        }
    }

    #[must_use]
    pub fn pinned_to(name: impl Into<String>, cpu: usize) -> Self {
        Self {
            name: name.into(),
            pinned: Some(cpu),
        }
    }
}

/// Decides where [`Scheduler::submit`] actually runs a callback.
///
/// Every [`Context`] is backed by exactly one scheduler for its whole lifetime.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Would running code *right now*, on the calling thread, satisfy `context`'s
    /// requirements? The default scheduler is always continuable (it runs
    /// everywhere); a static-pool context is continuable only on the worker
    /// thread pinned to its CPU.
    fn continuable(&self, context: &Context) -> bool;

    /// Enqueues `callback` to run inside `context`, possibly on another thread.
    fn submit(&self, callback: Callback, context: &Arc<Context>);

    /// Copies whatever scheduler-private data `parent` carries onto a freshly
    /// created `child` context (used by fork/join so children inherit pinning).
    fn clone_requirements(&self, parent: &Context, child: &Context);
}

/// A named handle identifying where work runs: which [`Scheduler`], and (for the
/// static pool) which CPU.
pub struct Context {
    name: String,
    scheduler: Arc<dyn Scheduler>,
    pinned: Mutex<Option<usize>>,
    blocked: AtomicBool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("pinned", &self.pinned())
            .field("blocked", &self.blocked())
            .finish()
    }
}

thread_local! {
    static CURRENT: RefCell<Arc<Context>> = RefCell::new(Context::new(
        format!("[thread {:?} default context]", std::thread::current().id()),
        default_scheduler(),
    ));
}

/// The process-wide default (non-deferring, in-place) scheduler singleton.
#[must_use]
pub fn default_scheduler() -> Arc<dyn Scheduler> {
    static DEFAULT: OnceLock<Arc<InlineScheduler>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(InlineScheduler)).clone()
}

impl Context {
    /// Creates a fresh, unpinned, unblocked context backed by `scheduler`.
    #[must_use]
    pub fn new(name: impl Into<String>, scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            scheduler,
            pinned: Mutex::new(None),
            blocked: AtomicBool::new(false),
        })
    }

    /// Creates a fresh context already pinned to `cpu`.
    #[must_use]
    pub fn with_pinned(name: impl Into<String>, scheduler: Arc<dyn Scheduler>, cpu: usize) -> Arc<Self> {
        let context = Self::new(name, scheduler);
        context.set_pinned(cpu);
        context
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    #[must_use]
    pub fn pinned(&self) -> Option<usize> {
        *self.pinned.lock()
    }

    pub fn set_pinned(&self, cpu: usize) {
        *self.pinned.lock() = Some(cpu);
    }

    #[must_use]
    pub fn blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Marks this context as "blocked", i.e. awaiting delivery of a submitted
    /// callback. Re-entrant submission while blocked is a programming error
    /// (see [`Scheduler::submit`] implementations).
    pub(crate) fn block(&self) {
        let was_blocked = self.blocked.swap(true, Ordering::AcqRel);
        assert!(!was_blocked, "'{}' submitted while already blocked", self.name);
    }

    pub(crate) fn unblock(&self) {
        self.blocked.store(false, Ordering::Release);
    }

    /// Returns the context currently installed on the calling thread.
    #[must_use]
    pub fn current() -> Arc<Context> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Installs `context` as current on the calling thread, returning whatever
    /// was current before. The caller must eventually restore it — prefer
    /// [`Context::enter`], which does so on drop.
    pub fn switch(context: Arc<Context>) -> Arc<Context> {
        CURRENT.with(|current| current.replace(context))
    }

    /// Switches to `self` and returns a guard that restores the previous
    /// context when dropped, including on unwind.
    #[must_use]
    pub fn enter(self: &Arc<Self>) -> ContextGuard {
        ContextGuard {
            previous: Some(Context::switch(self.clone())),
        }
    }

    /// Would invoking code right now satisfy this context's requirements?
    #[must_use]
    pub fn continuable(self: &Arc<Self>) -> bool {
        self.scheduler.continuable(self)
    }

    /// The standard reschedule optimization: if already continuable,
    /// switch in place and run `f` synchronously; otherwise submit `f` to the
    /// scheduler to run later, possibly on another thread.
    pub fn continue_with<F>(self: &Arc<Self>, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.continuable() {
            let _guard = self.enter();
            f();
        } else {
            tracing::trace!(context = %self.name, "submitting to scheduler");
            self.scheduler.submit(Box::new(f), self);
        }
    }

    /// Derives a child context for `name`, inheriting the parent's
    /// scheduler-private data (e.g. CPU pin) via [`Scheduler::clone_requirements`].
    /// Used by fork/join to give each fork its own context.
    #[must_use]
    pub fn child(self: &Arc<Self>, name: impl Into<String>) -> Arc<Context> {
        let child = Context::new(name, self.scheduler.clone());
        self.scheduler.clone_requirements(self, &child);
        child
    }
}

/// RAII guard returned by [`Context::enter`]; restores the previous thread-local
/// context on drop so nested stage invocations can never forget to switch back.
pub struct ContextGuard {
    previous: Option<Arc<Context>>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            Context::switch(previous);
        }
    }
}

/// The default scheduler: runs everything in place, on whatever thread calls
/// `submit`, switching the thread-local context around the call. Never defers
/// because, unlike the static pool, it has nowhere else to defer to.
#[derive(Debug, Default)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn continuable(&self, _context: &Context) -> bool {
        true
    }

    fn submit(&self, callback: Callback, context: &Arc<Context>) {
        let previous = Context::switch(context.clone());
        tracing::trace!(context = %context.name(), previous = %previous.name(), "preempting");
        callback();
        let restored = Context::switch(previous);
        debug_assert!(Arc::ptr_eq(&restored, context), "context was not restored correctly");
    }

    fn clone_requirements(&self, _parent: &Context, _child: &Context) {
        // The default scheduler carries no private data to inherit.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_is_continuable_inline() {
        let context = Context::current();
        assert!(context.continuable());
    }

    #[test]
    fn enter_restores_previous_on_drop() {
        let before = Context::current();
        let other = Context::new("test context", default_scheduler());
        {
            let _guard = other.enter();
            assert!(Arc::ptr_eq(&Context::current(), &other));
        }
        assert!(Arc::ptr_eq(&Context::current(), &before));
    }

    #[test]
    fn child_inherits_pin() {
        let parent = Context::with_pinned("parent", default_scheduler(), 3);
        let child = parent.child("parent [child]");
        // InlineScheduler's clone_requirements is a no-op, matching the source's
        // `DefaultScheduler::Clone`.
        assert_eq!(child.pinned(), None);
    }
}
