//! Component G: the static thread pool.
//!
//! One worker thread per CPU (by default `std::thread::available_parallelism`),
//! each pinned to its core where the OS supports it. Submitting pushes a waiter
//! onto that core's queue and wakes the worker.
//!
//! The source drains its per-worker waiter stack lock-free (CAS on an atomic
//! head pointer) and walks to the tail on each pop to approximate FIFO fairness
//! while keeping push `O(1)`. This implementation gets the same *observable*
//! ordering — oldest submission to a core runs first — from a mutex-guarded
//! `VecDeque` instead of hand-rolled atomic pointer chasing; see `DESIGN.md` for
//! why that trade was made.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use parking_lot::{Condvar, Mutex};

use crate::context::{Callback, Context, Scheduler};

struct Waiter {
    context: Arc<Context>,
    callback: Callback,
}

#[derive(Default)]
struct WorkerQueue {
    waiters: Mutex<VecDeque<Waiter>>,
    condvar: Condvar,
}

struct Worker {
    queue: Arc<WorkerQueue>,
    thread: Option<JoinHandle<()>>,
}

thread_local! {
    /// `Some(cpu)` if the calling thread is a pool worker pinned to `cpu`.
    static MEMBERSHIP: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

/// A fixed-size set of worker threads, one per CPU, each draining its own
/// submission queue. Submission requires the target [`Context`] to already
/// carry a pinned CPU (callers that don't care get core `0` — see `DESIGN.md`
/// for why this crate pins to core 0 by default rather than implementing
/// least-loaded selection).
pub struct StaticThreadPool {
    concurrency: usize,
    workers: Mutex<Vec<Worker>>,
    shutdown: AtomicBool,
}

impl std::fmt::Debug for StaticThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticThreadPool")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl StaticThreadPool {
    /// Spawns `concurrency` worker threads (default:
    /// [`std::thread::available_parallelism`], falling back to `1`).
    #[must_use]
    pub fn new(concurrency: Option<usize>) -> Arc<Self> {
        let concurrency = concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        });

        let pool = Arc::new(Self {
            concurrency,
            workers: Mutex::new(Vec::with_capacity(concurrency)),
            shutdown: AtomicBool::new(false),
        });

        let core_ids = core_affinity::get_core_ids();

        let mut workers = Vec::with_capacity(concurrency);
        for cpu in 0..concurrency {
            let queue = Arc::new(WorkerQueue::default());
            let pool = pool.clone();
            let queue_for_thread = queue.clone();
            let core_id = core_ids.as_ref().and_then(|ids| ids.get(cpu).copied());
            let thread = std::thread::Builder::new()
                .name(format!("eventuals-pool-{cpu}"))
                .spawn(move || worker_loop(pool, cpu, queue_for_thread, core_id))
                .expect("failed to spawn static thread pool worker");
            workers.push(Worker {
                queue,
                thread: Some(thread),
            });
        }

        *pool.workers.lock() = workers;
        pool
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Is the calling thread a pool member pinned to `cpu`?
    #[must_use]
    pub fn is_member_of(cpu: usize) -> bool {
        MEMBERSHIP.with(|membership| membership.get() == Some(cpu))
    }

    /// Flips the shutdown flag, wakes every worker, and joins them. All
    /// in-flight waiters must have been drained beforehand by their workers.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let mut workers = self.workers.lock();
        for worker in workers.iter() {
            worker.queue.condvar.notify_all();
        }
        for worker in workers.iter_mut() {
            if let Some(thread) = worker.thread.take() {
                thread.join().expect("static thread pool worker panicked");
            }
        }
    }
}

impl Drop for StaticThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    pool: Arc<StaticThreadPool>,
    cpu: usize,
    queue: Arc<WorkerQueue>,
    core_id: Option<core_affinity::CoreId>,
) {
    MEMBERSHIP.with(|membership| membership.set(Some(cpu)));

    if let Some(core_id) = core_id {
        // Best-effort: not every OS/container supports affinity.
        core_affinity::set_for_current(core_id);
    }

    tracing::trace!(cpu, "static thread pool worker running");

    loop {
        let waiter = {
            let mut waiters = queue.waiters.lock();
            loop {
                if let Some(waiter) = waiters.pop_front() {
                    break Some(waiter);
                }
                if pool.shutdown.load(Ordering::Acquire) {
                    break None;
                }
                queue.condvar.wait(&mut waiters);
            }
        };

        let Some(waiter) = waiter else {
            break;
        };

        waiter.context.unblock();

        let previous = Context::switch(waiter.context.clone());
        tracing::trace!(context = %waiter.context.name(), "resuming");
        (waiter.callback)();
        let restored = Context::switch(previous);
        debug_assert!(
            Arc::ptr_eq(&restored, &waiter.context),
            "context was not restored correctly"
        );
    }
}

impl Scheduler for StaticThreadPool {
    fn continuable(&self, context: &Context) -> bool {
        let cpu = context
            .pinned()
            .expect("static thread pool context has no pinned core");
        StaticThreadPool::is_member_of(cpu)
    }

    fn submit(&self, callback: Callback, context: &Arc<Context>) {
        assert!(!context.blocked(), "'{}' submitted while already blocked", context.name());

        // TODO: pick the least loaded core instead of defaulting to 0 when
        // the caller didn't request a pin.
        let cpu = context.pinned().unwrap_or_else(|| {
            context.set_pinned(0);
            0
        });

        assert!(
            cpu < self.concurrency,
            "'{}' requires core {cpu} but the pool only has {} cores",
            context.name(),
            self.concurrency
        );

        context.block();

        let workers = self.workers.lock();
        let queue = workers[cpu].queue.clone();
        drop(workers);

        queue
            .waiters
            .lock()
            .push_back(Waiter {
                context: context.clone(),
                callback,
            });
        queue.condvar.notify_one();
    }

    fn clone_requirements(&self, parent: &Context, child: &Context) {
        if let Some(cpu) = parent.pinned() {
            child.set_pinned(cpu);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn submit_runs_once_on_pinned_core() {
        let pool = StaticThreadPool::new(Some(2));
        let ran = Arc::new(AtomicUsize::new(0));

        let context = Context::with_pinned("test", pool.clone() as Arc<dyn Scheduler>, 0);
        let ran_clone = ran.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        pool.submit(
            Box::new(move || {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                assert!(StaticThreadPool::is_member_of(0));
                tx.send(()).unwrap();
            }),
            &context,
        );
        rx.recv_timeout(std::time::Duration::from_secs(5))
            .expect("submitted callback never ran");
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        pool.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent_and_joins() {
        let pool = StaticThreadPool::new(Some(1));
        pool.shutdown();
        pool.shutdown();
    }
}
