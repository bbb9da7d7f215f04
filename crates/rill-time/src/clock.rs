//! Virtual clock scheduler
//!
//! Deterministic timer host: time only moves when `advance` or
//! `run_until_idle` is called. Tasks run in due-time order, ties broken by
//! scheduling order.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use rill_core::{Scheduler, StreamError, StreamResult, TimerId};

/// Virtual scheduler configuration
#[derive(Clone, Debug)]
pub struct VirtualSchedulerConfig {
    /// Initial virtual time
    pub start: Duration,
    /// Maximum tasks run by a single `advance`/`run_until_idle` call
    /// (guards against timers that keep rescheduling themselves)
    pub max_tasks_per_run: usize,
}

impl Default for VirtualSchedulerConfig {
    fn default() -> Self {
        VirtualSchedulerConfig {
            start: Duration::ZERO,
            max_tasks_per_run: 100_000,
        }
    }
}

impl VirtualSchedulerConfig {
    /// Configuration for unit tests: small runaway guard
    pub fn strict() -> Self {
        VirtualSchedulerConfig {
            start: Duration::ZERO,
            max_tasks_per_run: 1_000,
        }
    }
}

type Task = Box<dyn FnOnce()>;

struct Queue {
    /// Pending tasks keyed by (due time, id)
    tasks: BTreeMap<(Duration, TimerId), Task>,
    /// Due time of each pending id
    due: HashMap<TimerId, Duration>,
    next_id: TimerId,
    closed: bool,
}

/// Scheduler driven by a manually advanced virtual clock
pub struct VirtualScheduler {
    now: Cell<Duration>,
    queue: RefCell<Queue>,
    config: VirtualSchedulerConfig,
}

impl VirtualScheduler {
    /// Create a new scheduler with default configuration
    pub fn new() -> Self {
        Self::with_config(VirtualSchedulerConfig::default())
    }

    /// Create a new scheduler with custom configuration
    pub fn with_config(config: VirtualSchedulerConfig) -> Self {
        VirtualScheduler {
            now: Cell::new(config.start),
            queue: RefCell::new(Queue {
                tasks: BTreeMap::new(),
                due: HashMap::new(),
                next_id: TimerId::ZERO,
                closed: false,
            }),
            config,
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of timers waiting to fire
    pub fn pending(&self) -> usize {
        self.queue.borrow().tasks.len()
    }

    /// Move the clock forward by `by`, running every task due on the way
    /// Returns the number of tasks run
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get().saturating_add(by);
        let ran = self.run(Some(target));
        if self.now.get() < target {
            self.now.set(target);
        }
        ran
    }

    /// Run tasks until none are pending, jumping the clock to each due time
    /// Returns the number of tasks run
    pub fn run_until_idle(&self) -> usize {
        self.run(None)
    }

    /// Refuse new timers and drop the pending ones
    /// Returns the number of timers dropped
    pub fn shutdown(&self) -> usize {
        let dropped = {
            let mut queue = self.queue.borrow_mut();
            queue.closed = true;
            queue.due.clear();
            std::mem::take(&mut queue.tasks)
        };
        // Tasks may own observers; drop them outside the borrow
        let count = dropped.len();
        drop(dropped);
        count
    }

    pub fn is_shutdown(&self) -> bool {
        self.queue.borrow().closed
    }

    fn run(&self, until: Option<Duration>) -> usize {
        let mut ran = 0;
        loop {
            if ran >= self.config.max_tasks_per_run {
                tracing::warn!(
                    ran,
                    pending = self.pending(),
                    "virtual scheduler run limit reached"
                );
                break;
            }
            let next = {
                let mut queue = self.queue.borrow_mut();
                let due_key = match queue.tasks.keys().next() {
                    Some(&key) if until.map_or(true, |limit| key.0 <= limit) => key,
                    _ => break,
                };
                queue.due.remove(&due_key.1);
                queue.tasks.remove(&due_key).map(|task| (due_key.0, task))
            };
            let Some((due, task)) = next else { break };
            if due > self.now.get() {
                self.now.set(due);
            }
            // Borrow released: the task may schedule or cancel timers
            task();
            ran += 1;
        }
        ran
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> StreamResult<TimerId> {
        let mut queue = self.queue.borrow_mut();
        if queue.closed {
            return Err(StreamError::SchedulerClosed);
        }
        let id = queue.next_id;
        queue.next_id = id.next();
        let due = self.now.get().saturating_add(delay);
        queue.tasks.insert((due, id), task);
        queue.due.insert(id, due);
        Ok(id)
    }

    fn cancel(&self, id: TimerId) {
        let removed = {
            let mut queue = self.queue.borrow_mut();
            match queue.due.remove(&id) {
                Some(due) => queue.tasks.remove(&(due, id)),
                None => None,
            }
        };
        drop(removed);
    }
}
