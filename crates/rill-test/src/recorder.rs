//! Recording observer

use std::cell::RefCell;
use std::rc::Rc;

use rill_core::{Observer, StreamError};

/// One notification as seen by an observer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

impl<T> Notification<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }
}

/// Observer that records every notification it receives
///
/// Clones share the same log, so one clone can be handed to `subscribe`
/// while the test keeps another for assertions.
pub struct Recorder<T> {
    log: Rc<RefCell<Vec<Notification<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Recorder {
            log: Rc::clone(&self.log),
        }
    }
}

impl<T> Recorder<T> {
    pub fn new() -> Self {
        Recorder {
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Number of `error`/`complete` notifications received
    pub fn terminal_count(&self) -> usize {
        self.log.borrow().iter().filter(|n| n.is_terminal()).count()
    }

    pub fn is_completed(&self) -> bool {
        self.log
            .borrow()
            .iter()
            .any(|n| matches!(n, Notification::Complete))
    }

    /// First error received, if any
    pub fn error(&self) -> Option<StreamError> {
        self.log.borrow().iter().find_map(|n| match n {
            Notification::Error(err) => Some(err.clone()),
            _ => None,
        })
    }
}

impl<T: Clone> Recorder<T> {
    pub fn notifications(&self) -> Vec<Notification<T>> {
        self.log.borrow().clone()
    }

    /// Values delivered through `next`, in order
    pub fn values(&self) -> Vec<T> {
        self.log
            .borrow()
            .iter()
            .filter_map(|n| match n {
                Notification::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Observer<T> for Recorder<T> {
    fn next(&mut self, value: T) {
        self.log.borrow_mut().push(Notification::Next(value));
    }

    fn error(&mut self, err: StreamError) {
        self.log.borrow_mut().push(Notification::Error(err));
    }

    fn complete(&mut self) {
        self.log.borrow_mut().push(Notification::Complete);
    }
}
