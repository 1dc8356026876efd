//! Component I: one-shot cooperative cancellation.

use std::sync::Arc;

use parking_lot::Mutex;

type Handler = Box<dyn FnOnce() + Send>;

enum State {
    Empty,
    Installed(Handler),
    Triggered,
}

/// A one-shot cancellation token with at most one installed handler.
///
/// `trigger()` races against `install()`: whichever observes the other's effect
/// first is responsible for running the handler exactly once.
#[derive(Clone)]
pub struct Interrupt(Arc<Mutex<State>>);

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    /// Creates a fresh, untriggered interrupt with no installed handler.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(State::Empty)))
    }

    /// Installs `handler`, to be run at most once when this interrupt is triggered.
    ///
    /// Returns `true` if installation succeeded. Returns `false` if this interrupt
    /// was already triggered — in that case `handler` is dropped *uncalled* and the
    /// caller, which already knows cancellation happened, is responsible for
    /// honoring it directly rather than relying on the handler running.
    ///
    /// # Panics
    ///
    /// Panics if a handler is already installed and not yet triggered: at most one
    /// handler may be installed per interrupt, so installing a second one
    /// is a programming error, not a recoverable race.
    pub fn install(&self, handler: impl FnOnce() + Send + 'static) -> bool {
        let mut state = self.0.lock();
        match &*state {
            State::Triggered => false,
            State::Empty => {
                *state = State::Installed(Box::new(handler));
                true
            }
            State::Installed(_) => {
                panic!("Interrupt::install called twice before the interrupt was triggered")
            }
        }
    }

    /// Idempotently triggers this interrupt, running the installed handler (if any)
    /// exactly once.
    ///
    /// Calling `trigger` more than once is a no-op after the first call.
    pub fn trigger(&self) {
        let handler = {
            let mut state = self.0.lock();
            match std::mem::replace(&mut *state, State::Triggered) {
                State::Installed(handler) => Some(handler),
                State::Empty | State::Triggered => None,
            }
        };
        if let Some(handler) = handler {
            tracing::trace!("interrupt triggered, running installed handler");
            handler();
        } else {
            tracing::trace!("interrupt triggered with no handler installed (yet)");
        }
    }

    /// Returns whether this interrupt has already been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        matches!(&*self.0.lock(), State::Triggered)
    }
}
