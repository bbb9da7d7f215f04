//! Sequencing and recovery combinators: concat and retry
//!
//! Each activation owns its state exclusively: `concat` copies the source
//! list into a private cursor, `retry` keeps its own attempt budget. At most
//! one upstream activation is live at a time, tracked by a
//! `SerialSubscription` that the returned handle cancels.
//!
//! A source that terminates synchronously asks for its successor from
//! inside its own `subscribe` call. Both combinators trampoline that
//! request: the running `advance`/`attempt` loop picks it up once the
//! inner subscribe returns, so the stack stays flat however many sources
//! or attempts run back to back.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::{Observable, Observer, SerialSubscription, StreamError, Subscriber, Subscription};

/// Per-activation state of `concat`
struct ConcatActivation<T> {
    /// Sources not yet reached, consumed left to right
    remaining: RefCell<VecDeque<Observable<T>>>,
    current: SerialSubscription,
    downstream: Subscriber<T>,
    /// An `advance` loop is running
    draining: Cell<bool>,
    /// A source completed while the loop was subscribing it
    pending: Cell<bool>,
}

impl<T: 'static> ConcatActivation<T> {
    fn advance(this: &Rc<Self>) {
        if this.draining.get() {
            this.pending.set(true);
            return;
        }
        this.draining.set(true);
        loop {
            this.pending.set(false);
            if this.current.is_closed() {
                break;
            }
            let next = this.remaining.borrow_mut().pop_front();
            let Some(source) = next else {
                this.downstream.complete();
                break;
            };
            tracing::debug!(
                remaining = this.remaining.borrow().len(),
                "concat subscribing next source"
            );
            let epoch = this.current.begin();
            let subscription = source.subscribe(ConcatObserver {
                activation: Rc::clone(this),
            });
            this.current.assign(epoch, subscription);
            if !this.pending.get() {
                break;
            }
        }
        this.draining.set(false);
    }
}

struct ConcatObserver<T> {
    activation: Rc<ConcatActivation<T>>,
}

impl<T: 'static> Observer<T> for ConcatObserver<T> {
    fn next(&mut self, value: T) {
        self.activation.downstream.next(value);
    }

    fn error(&mut self, err: StreamError) {
        self.activation.remaining.borrow_mut().clear();
        self.activation.downstream.error(err);
        self.activation.current.unsubscribe();
    }

    fn complete(&mut self) {
        ConcatActivation::advance(&self.activation);
    }
}

/// Retry state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RetryState {
    /// Subscribed; this many resubscriptions left
    Attempting(usize),
    Failed,
    Completed,
}

/// Per-activation state of `retry`
struct RetryActivation<T> {
    source: Observable<T>,
    state: Cell<RetryState>,
    current: SerialSubscription,
    downstream: Subscriber<T>,
    /// An `attempt` loop is running
    subscribing: Cell<bool>,
    /// An attempt failed and asked for a retry while being subscribed
    pending: Cell<bool>,
}

impl<T: 'static> RetryActivation<T> {
    fn attempt(this: &Rc<Self>) {
        if this.subscribing.get() {
            this.pending.set(true);
            return;
        }
        this.subscribing.set(true);
        loop {
            this.pending.set(false);
            if this.current.is_closed() {
                break;
            }
            let epoch = this.current.begin();
            let subscription = this.source.subscribe(RetryObserver {
                activation: Rc::clone(this),
            });
            this.current.assign(epoch, subscription);
            if !this.pending.get() {
                break;
            }
        }
        this.subscribing.set(false);
    }
}

struct RetryObserver<T> {
    activation: Rc<RetryActivation<T>>,
}

impl<T: 'static> Observer<T> for RetryObserver<T> {
    fn next(&mut self, value: T) {
        self.activation.downstream.next(value);
    }

    fn error(&mut self, err: StreamError) {
        let activation = &self.activation;
        match activation.state.get() {
            RetryState::Attempting(0) => {
                activation.state.set(RetryState::Failed);
                activation.downstream.error(err);
            }
            RetryState::Attempting(left) => {
                tracing::debug!(error = %err, remaining = left - 1, "retry resubscribing");
                activation.state.set(RetryState::Attempting(left - 1));
                RetryActivation::attempt(activation);
            }
            RetryState::Failed | RetryState::Completed => {}
        }
    }

    fn complete(&mut self) {
        self.activation.state.set(RetryState::Completed);
        self.activation.downstream.complete();
    }
}

impl<T: 'static> Observable<T> {
    /// Run `sources` one after another, completing after the last one
    ///
    /// The first error stops the sequence; later sources are never
    /// subscribed. Each subscription walks its own copy of the list.
    pub fn concat<I>(sources: I) -> Observable<T>
    where
        I: IntoIterator<Item = Observable<T>>,
    {
        let sources: Rc<[Observable<T>]> = sources.into_iter().collect();
        Observable::new(move |downstream| {
            let activation = Rc::new(ConcatActivation {
                remaining: RefCell::new(sources.iter().cloned().collect()),
                current: SerialSubscription::new(),
                downstream,
                draining: Cell::new(false),
                pending: Cell::new(false),
            });
            ConcatActivation::advance(&activation);
            Subscription::from(activation.current.clone())
        })
    }

    /// Resubscribe to this observable on error, up to `max_attempts` times
    ///
    /// The source is subscribed at most `max_attempts + 1` times; the error
    /// of the last attempt is forwarded downstream.
    pub fn retry(&self, max_attempts: usize) -> Observable<T> {
        let source = self.clone();
        Observable::new(move |downstream| {
            let activation = Rc::new(RetryActivation {
                source: source.clone(),
                state: Cell::new(RetryState::Attempting(max_attempts)),
                current: SerialSubscription::new(),
                downstream,
                subscribing: Cell::new(false),
                pending: Cell::new(false),
            });
            RetryActivation::attempt(&activation);
            Subscription::from(activation.current.clone())
        })
    }
}
