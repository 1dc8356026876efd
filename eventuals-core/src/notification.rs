//! Component K: a one-shot, multi-waiter latch.

use std::sync::atomic::{AtomicBool, Ordering};

use event_listener::{Event, Listener};

/// A single-set latch with lock-based wakeup, built on [`event_listener::Event`]
/// (the same crate `isoprenoid`'s dependency tree already carries for exactly this
/// kind of notify/listen synchronisation).
///
/// `notified` is monotonic: it flips from `false` to `true` at most once.
pub struct Notification {
    notified: AtomicBool,
    event: Event,
}

impl Default for Notification {
    fn default() -> Self {
        Self::new()
    }
}

impl Notification {
    /// Creates a fresh, not-yet-notified latch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            notified: AtomicBool::new(false),
            event: Event::new(),
        }
    }

    /// Atomically flips `notified` to `true` and wakes every current and future
    /// waiter.
    ///
    /// # Panics
    ///
    /// Panics if called a second time: `notify()` twice is a programming error,
    /// not a recoverable race.
    pub fn notify(&self) {
        if self.notified.swap(true, Ordering::AcqRel) {
            panic!("Notification::notify called twice");
        }
        tracing::trace!("notification latch set");
        self.event.notify(usize::MAX);
    }

    /// Blocks the calling thread until [`notify`](Notification::notify) has been
    /// called.
    ///
    /// Returns immediately, without blocking, if `notify()` already ran — any
    /// number of subsequent calls are then no-ops (testable property #5).
    pub fn wait_for_notification(&self) {
        loop {
            if self.notified.load(Ordering::Acquire) {
                return;
            }
            let listener = self.event.listen();
            // Re-check after registering the listener to close the race between the
            // initial load above and `notify()` firing in between.
            if self.notified.load(Ordering::Acquire) {
                return;
            }
            listener.wait();
        }
    }

    /// Returns whether [`notify`](Notification::notify) has already run.
    #[must_use]
    pub fn is_notified(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::Notification;

    #[test]
    fn idempotent_notify_wait() {
        let notification = Arc::new(Notification::new());
        notification.notify();
        // Property #5: any number of waits after notify return immediately.
        notification.wait_for_notification();
        notification.wait_for_notification();
        assert!(notification.is_notified());
    }

    #[test]
    #[should_panic(expected = "called twice")]
    fn double_notify_panics() {
        let notification = Notification::new();
        notification.notify();
        notification.notify();
    }

    #[test]
    fn wakes_blocked_waiters() {
        let notification = Arc::new(Notification::new());
        let waiter = {
            let notification = Arc::clone(&notification);
            thread::spawn(move || notification.wait_for_notification())
        };
        thread::sleep(Duration::from_millis(20));
        notification.notify();
        waiter.join().expect("waiter thread panicked");
    }
}
