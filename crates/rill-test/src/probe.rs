//! Scripted probe sources
//!
//! A `Probe` replays a fixed script of notifications on every
//! subscription, either synchronously or one step per timer tick, and
//! counts how many activations were started and torn down.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use rill_core::{Observable, Scheduler, StreamError, Subscriber, Subscription, TimerId};

/// One scripted notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

impl<T> Step<T> {
    fn apply(self, subscriber: &Subscriber<T>) {
        match self {
            Step::Next(value) => subscriber.next(value),
            Step::Error(err) => subscriber.error(err),
            Step::Complete => subscriber.complete(),
        }
    }
}

#[derive(Default)]
struct ProbeStats {
    subscriptions: Cell<usize>,
    unsubscriptions: Cell<usize>,
}

struct Pacing {
    scheduler: Rc<dyn Scheduler>,
    interval: Duration,
}

/// Cold test source replaying a script
pub struct Probe<T> {
    script: Rc<[Step<T>]>,
    pacing: Option<Rc<Pacing>>,
    stats: Rc<ProbeStats>,
}

impl<T> Clone for Probe<T> {
    fn clone(&self) -> Self {
        Probe {
            script: Rc::clone(&self.script),
            pacing: self.pacing.clone(),
            stats: Rc::clone(&self.stats),
        }
    }
}

impl<T: Clone + 'static> Probe<T> {
    /// Replay `script` synchronously inside `subscribe`
    pub fn new(script: impl IntoIterator<Item = Step<T>>) -> Self {
        Probe {
            script: script.into_iter().collect(),
            pacing: None,
            stats: Rc::default(),
        }
    }

    /// Emit `values`, then complete
    pub fn emitting(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(values.into_iter().map(Step::Next).chain([Step::Complete]))
    }

    /// Emit `values`, then fail with `err`
    pub fn failing(values: impl IntoIterator<Item = T>, err: StreamError) -> Self {
        Self::new(values.into_iter().map(Step::Next).chain([Step::Error(err)]))
    }

    /// Replay one step per `interval` on `scheduler` instead
    pub fn paced(mut self, scheduler: Rc<dyn Scheduler>, interval: Duration) -> Self {
        self.pacing = Some(Rc::new(Pacing {
            scheduler,
            interval,
        }));
        self
    }

    /// Number of activations started
    pub fn subscriptions(&self) -> usize {
        self.stats.subscriptions.get()
    }

    /// Number of activations torn down through `unsubscribe`
    pub fn unsubscriptions(&self) -> usize {
        self.stats.unsubscriptions.get()
    }

    pub fn observable(&self) -> Observable<T> {
        let probe = self.clone();
        Observable::new(move |subscriber| {
            let stats = &probe.stats;
            stats.subscriptions.set(stats.subscriptions.get() + 1);

            let paced = match &probe.pacing {
                None => {
                    for step in probe.script.iter() {
                        step.clone().apply(&subscriber);
                    }
                    None
                }
                Some(pacing) => {
                    let run = Rc::new(PacedRun {
                        steps: RefCell::new(probe.script.iter().cloned().collect()),
                        timer: Cell::new(None),
                        pacing: Rc::clone(pacing),
                        subscriber,
                    });
                    PacedRun::schedule(&run);
                    Some(run)
                }
            };

            let stats = Rc::clone(&probe.stats);
            Subscription::new(move || {
                stats.unsubscriptions.set(stats.unsubscriptions.get() + 1);
                if let Some(run) = &paced {
                    run.cancel();
                }
            })
        })
    }
}

/// Per-activation state of a paced probe
struct PacedRun<T> {
    steps: RefCell<VecDeque<Step<T>>>,
    timer: Cell<Option<TimerId>>,
    pacing: Rc<Pacing>,
    subscriber: Subscriber<T>,
}

impl<T: 'static> PacedRun<T> {
    fn schedule(this: &Rc<Self>) {
        if this.steps.borrow().is_empty() || this.subscriber.is_closed() {
            return;
        }
        let run = Rc::clone(this);
        let scheduled = this.pacing.scheduler.schedule_once(
            this.pacing.interval,
            Box::new(move || {
                run.timer.set(None);
                let step = run.steps.borrow_mut().pop_front();
                if let Some(step) = step {
                    step.apply(&run.subscriber);
                }
                PacedRun::schedule(&run);
            }),
        );
        match scheduled {
            Ok(id) => this.timer.set(Some(id)),
            Err(err) => this.subscriber.error(err),
        }
    }

    fn cancel(&self) {
        self.steps.borrow_mut().clear();
        if let Some(id) = self.timer.take() {
            self.pacing.scheduler.cancel(id);
        }
    }
}
