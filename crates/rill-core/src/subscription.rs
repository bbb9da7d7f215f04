//! Subscription handles
//!
//! A `Subscription` is the cancellation token returned by every subscribe
//! call. Its teardown runs at most once no matter how many clones call
//! `unsubscribe`, and calling it after the resource is gone is a no-op.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Teardown = Box<dyn FnOnce()>;

/// Cancellation handle for one activation
#[derive(Clone)]
pub struct Subscription {
    teardown: Rc<RefCell<Option<Teardown>>>,
}

impl Subscription {
    /// Subscription that releases a resource via `teardown`
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Subscription {
            teardown: Rc::new(RefCell::new(Some(Box::new(teardown)))),
        }
    }

    /// Subscription with nothing to release (already closed)
    pub fn empty() -> Self {
        Subscription {
            teardown: Rc::new(RefCell::new(None)),
        }
    }

    /// Release the underlying resource. Idempotent.
    pub fn unsubscribe(&self) {
        // Borrow must end before the teardown runs: it may re-enter.
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Has the teardown already run (or was there none)?
    pub fn is_closed(&self) -> bool {
        self.teardown.borrow().is_none()
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct SerialState {
    closed: bool,
    epoch: u64,
    current: Option<Subscription>,
}

/// Slot holding the single live upstream subscription of an activation
///
/// Used wherever the upstream handle is only known after a subscribe call
/// returns, or where upstreams are replaced one after another (`concat`,
/// `retry`). Each upstream activation reserves an epoch with `begin` before
/// subscribing and hands its handle back with `assign`:
/// - assigning into a closed slot releases the handle immediately
/// - assigning a stale epoch (a newer activation already began) releases it
/// - otherwise the handle becomes current and the previous one is released
#[derive(Clone)]
pub struct SerialSubscription {
    state: Rc<RefCell<SerialState>>,
}

impl SerialSubscription {
    pub fn new() -> Self {
        SerialSubscription {
            state: Rc::new(RefCell::new(SerialState {
                closed: false,
                epoch: 0,
                current: None,
            })),
        }
    }

    /// Reserve the epoch for the next upstream activation
    pub fn begin(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.epoch += 1;
        state.epoch
    }

    /// Hand back the handle of the activation started at `epoch`
    pub fn assign(&self, epoch: u64, subscription: Subscription) {
        let release = {
            let mut state = self.state.borrow_mut();
            if state.closed || epoch < state.epoch {
                Some(subscription)
            } else {
                state.current.replace(subscription)
            }
        };
        if let Some(subscription) = release {
            subscription.unsubscribe();
        }
    }

    /// Close the slot and release the current upstream. Idempotent.
    pub fn unsubscribe(&self) {
        let current = {
            let mut state = self.state.borrow_mut();
            state.closed = true;
            state.current.take()
        };
        if let Some(subscription) = current {
            subscription.unsubscribe();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Current epoch (number of activations begun)
    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }
}

impl Default for SerialSubscription {
    fn default() -> Self {
        Self::new()
    }
}

impl From<SerialSubscription> for Subscription {
    fn from(serial: SerialSubscription) -> Self {
        Subscription::new(move || serial.unsubscribe())
    }
}
