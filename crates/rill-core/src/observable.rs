//! Observable core
//!
//! An `Observable` is an immutable wrapper around a producer function.
//! Construction never runs the producer; every `subscribe` runs it again
//! with a fresh `Subscriber` (cold, unicast). All running state lives in
//! the activation, never in the observable itself.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::{Observer, StreamError, Subscription};

enum Terminal {
    Error(StreamError),
    Complete,
}

impl Terminal {
    fn deliver<T>(self, observer: &mut dyn Observer<T>) {
        match self {
            Terminal::Error(err) => observer.error(err),
            Terminal::Complete => observer.complete(),
        }
    }
}

struct Gate<T> {
    /// Set on the first terminal notification or on unsubscribe
    closed: Cell<bool>,
    /// Consumer's observer; detached once the gate closes
    observer: RefCell<Option<Box<dyn Observer<T>>>>,
    /// Values delivered while `next` was still running on this gate
    queued: RefCell<VecDeque<T>>,
    /// Terminal raised while `next` was still running on this gate
    deferred: RefCell<Option<Terminal>>,
}

/// Producer-side handle to one activation's observer
///
/// Every notification passes through a gate enforcing the observer
/// protocol: after `error` or `complete`, or after the activation was
/// unsubscribed, further notifications are dropped silently. Notifications
/// raised from inside the observer's own `next` are queued and delivered,
/// in order, once that call returns.
pub struct Subscriber<T> {
    gate: Rc<Gate<T>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            gate: Rc::clone(&self.gate),
        }
    }
}

impl<T> Subscriber<T> {
    /// Wrap an observer in a fresh gate
    pub fn new(observer: impl Observer<T> + 'static) -> Self {
        Subscriber {
            gate: Rc::new(Gate {
                closed: Cell::new(false),
                observer: RefCell::new(Some(Box::new(observer))),
                queued: RefCell::new(VecDeque::new()),
                deferred: RefCell::new(None),
            }),
        }
    }

    /// Deliver a value
    pub fn next(&self, mut value: T) {
        if self.gate.closed.get() {
            tracing::trace!("next after close dropped");
            return;
        }
        let Ok(mut slot) = self.gate.observer.try_borrow_mut() else {
            // `next` is on the stack; it drains the queue before returning
            tracing::trace!("re-entrant next queued");
            self.gate.queued.borrow_mut().push_back(value);
            return;
        };
        loop {
            if let Some(observer) = slot.as_mut() {
                observer.next(value);
            }
            let queued = self.gate.queued.borrow_mut().pop_front();
            match queued {
                Some(queued) => value = queued,
                None => break,
            }
        }
        if !self.gate.closed.get() {
            return;
        }
        // Closed from inside the callback: detach, then flush any terminal
        let detached = slot.take();
        drop(slot);
        let deferred = self.gate.deferred.borrow_mut().take();
        if let (Some(mut observer), Some(terminal)) = (detached, deferred) {
            terminal.deliver(observer.as_mut());
        }
    }

    /// Deliver a failure (terminal)
    pub fn error(&self, err: StreamError) {
        self.terminate(Terminal::Error(err));
    }

    /// Deliver completion (terminal)
    pub fn complete(&self) {
        self.terminate(Terminal::Complete);
    }

    /// Has this activation terminated or been unsubscribed?
    pub fn is_closed(&self) -> bool {
        self.gate.closed.get()
    }

    /// Stop delivering notifications and release the observer
    pub(crate) fn close(&self) {
        self.gate.closed.set(true);
        let queued = std::mem::take(&mut *self.gate.queued.borrow_mut());
        let deferred = self.gate.deferred.borrow_mut().take();
        drop((queued, deferred));
        let detached = self
            .gate
            .observer
            .try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.take());
        drop(detached);
    }

    fn terminate(&self, terminal: Terminal) {
        if self.gate.closed.replace(true) {
            tracing::trace!("terminal after close dropped");
            return;
        }
        let observer = match self.gate.observer.try_borrow_mut() {
            Ok(mut slot) => slot.take(),
            Err(_) => {
                // `next` is on the stack; it delivers this when it returns
                *self.gate.deferred.borrow_mut() = Some(terminal);
                return;
            }
        };
        if let Some(mut observer) = observer {
            terminal.deliver(observer.as_mut());
        }
    }
}

impl<T> Observer<T> for Subscriber<T> {
    fn next(&mut self, value: T) {
        Subscriber::next(self, value)
    }

    fn error(&mut self, err: StreamError) {
        Subscriber::error(self, err)
    }

    fn complete(&mut self) {
        Subscriber::complete(self)
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("closed", &self.is_closed())
            .finish()
    }
}

type Producer<T> = dyn Fn(Subscriber<T>) -> Subscription;

/// Lazy, cold description of a producer of notifications
pub struct Observable<T> {
    producer: Rc<Producer<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Observable {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: 'static> Observable<T> {
    /// Store a producer without running it
    pub fn new(producer: impl Fn(Subscriber<T>) -> Subscription + 'static) -> Self {
        Observable {
            producer: Rc::new(producer),
        }
    }

    /// Start one activation: run the producer against `observer`
    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        let subscriber = Subscriber::new(observer);
        tracing::trace!("subscribe");
        let upstream = (self.producer)(subscriber.clone());
        Subscription::new(move || {
            tracing::trace!("unsubscribe");
            subscriber.close();
            upstream.unsubscribe();
        })
    }

    /// Emit each value synchronously, then complete
    pub fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Clone,
    {
        let values: Rc<[T]> = values.into_iter().collect();
        Observable::new(move |subscriber| {
            for value in values.iter() {
                if subscriber.is_closed() {
                    break;
                }
                subscriber.next(value.clone());
            }
            subscriber.complete();
            Subscription::empty()
        })
    }

    /// Complete immediately without emitting
    pub fn empty() -> Self {
        Observable::new(|subscriber| {
            subscriber.complete();
            Subscription::empty()
        })
    }

    /// Fail immediately with `err`
    pub fn fail(err: StreamError) -> Self {
        Observable::new(move |subscriber| {
            subscriber.error(err.clone());
            Subscription::empty()
        })
    }

    /// Never emit and never terminate
    pub fn never() -> Self {
        Observable::new(|_| Subscription::empty())
    }
}
