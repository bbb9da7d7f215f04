//! Timer collaborator and the `timeout` factory

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::{Observable, StreamResult, Subscription, TimerId};

/// Host facility that runs a task once after a delay
///
/// Implementations run tasks later, never from inside `schedule_once`.
/// `cancel` on an unknown, fired, or already cancelled id is a no-op.
pub trait Scheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> StreamResult<TimerId>;

    fn cancel(&self, id: TimerId);
}

impl Observable<()> {
    /// Signal once after `duration`: `next(())` then `complete()`
    ///
    /// Unsubscribing before the timer fires cancels it; afterwards it is a
    /// no-op. A scheduler that refuses the timer yields an `error`.
    pub fn timeout(duration: Duration, scheduler: Rc<dyn Scheduler>) -> Observable<()> {
        Observable::new(move |subscriber| {
            let fired = Rc::new(Cell::new(false));
            let task = {
                let subscriber = subscriber.clone();
                let fired = Rc::clone(&fired);
                Box::new(move || {
                    fired.set(true);
                    subscriber.next(());
                    subscriber.complete();
                })
            };
            match scheduler.schedule_once(duration, task) {
                Ok(id) => {
                    tracing::trace!(timer = %id, ?duration, "timeout scheduled");
                    let scheduler = Rc::clone(&scheduler);
                    Subscription::new(move || {
                        if !fired.get() {
                            scheduler.cancel(id);
                        }
                    })
                }
                Err(err) => {
                    subscriber.error(err);
                    Subscription::empty()
                }
            }
        })
    }
}
