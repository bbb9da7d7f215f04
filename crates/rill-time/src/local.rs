//! Tokio-backed scheduler
//!
//! Timers are tasks spawned on a `LocalSet` owned by the scheduler, so
//! scheduled callbacks stay on the thread that drives it. Nothing fires
//! unless the set is driven through `run_until` or `run_until_idle`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use rill_core::{Scheduler, StreamResult, TimerId};
use tokio::sync::Notify;
use tokio::task::{JoinHandle, LocalSet};

/// Scheduler running timers on a tokio `LocalSet`
pub struct TokioScheduler {
    local: LocalSet,
    timers: Rc<RefCell<HashMap<TimerId, JoinHandle<()>>>>,
    next_id: Cell<TimerId>,
    /// Signalled whenever a timer fires or is cancelled
    settled: Rc<Notify>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        TokioScheduler {
            local: LocalSet::new(),
            timers: Rc::new(RefCell::new(HashMap::new())),
            next_id: Cell::new(TimerId::ZERO),
            settled: Rc::new(Notify::new()),
        }
    }

    /// Number of timers waiting to fire
    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Drive scheduled timers while `future` runs
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.local.run_until(future).await
    }

    /// Drive scheduled timers until none are pending
    pub async fn run_until_idle(&self) {
        self.local
            .run_until(async {
                while self.pending() > 0 {
                    self.settled.notified().await;
                }
            })
            .await
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> StreamResult<TimerId> {
        let id = self.next_id.get();
        self.next_id.set(id.next());

        let timers = Rc::clone(&self.timers);
        let settled = Rc::clone(&self.settled);
        // Not polled before the set is driven, so the insert below wins
        let handle = self.local.spawn_local(async move {
            tokio::time::sleep(delay).await;
            timers.borrow_mut().remove(&id);
            task();
            settled.notify_one();
        });
        self.timers.borrow_mut().insert(id, handle);
        Ok(id)
    }

    fn cancel(&self, id: TimerId) {
        let handle = self.timers.borrow_mut().remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            self.settled.notify_one();
        }
    }
}
