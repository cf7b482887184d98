//! Realm: the cooperative execution context
//!
//! Holds the microtask queue that promise reactions run on and the interrupt
//! flag that loop bodies poll. Execution is single-threaded: the realm never
//! preempts anything, it only runs jobs that were enqueued while interpreted
//! code ran to its next suspension point.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::warn;

use crate::interpreter::control::Signal;

/// A queued microtask.
pub type Job = Box<dyn FnOnce(&Realm)>;

/// Realm configuration.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    /// Upper bound on jobs executed by one `run_jobs` call, as a brake on
    /// runaway reaction loops. `None` means unbounded.
    pub job_limit: Option<usize>,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self { job_limit: None }
    }
}

pub struct Realm {
    jobs: RefCell<VecDeque<Job>>,
    interrupted: Cell<bool>,
    pub config: RealmConfig,
}

impl Realm {
    pub fn new() -> Realm {
        Realm::with_config(RealmConfig::default())
    }

    pub fn with_config(config: RealmConfig) -> Realm {
        Realm {
            jobs: RefCell::new(VecDeque::new()),
            interrupted: Cell::new(false),
            config,
        }
    }

    /// Register a microtask. Jobs run strictly in registration order.
    pub fn enqueue(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }

    /// Drain the microtask queue, including jobs enqueued by jobs.
    /// Returns how many jobs ran.
    pub fn run_jobs(&self) -> usize {
        let mut ran = 0;
        loop {
            if let Some(limit) = self.config.job_limit {
                if ran >= limit {
                    warn!(ran, limit, "job limit reached, leaving queue unfinished");
                    return ran;
                }
            }
            let job = self.jobs.borrow_mut().pop_front();
            match job {
                Some(job) => {
                    job(self);
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.borrow().len()
    }

    /// Request cooperative cancellation. The next interrupt check inside any
    /// running loop surfaces a fatal, non-catchable condition.
    pub fn interrupt(&self) {
        self.interrupted.set(true);
    }

    pub fn clear_interrupt(&self) {
        self.interrupted.set(false);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.get()
    }

    /// Slow-path check performed once per loop iteration.
    pub fn check_interrupt(&self) -> Result<(), Signal> {
        if self.interrupted.get() {
            Err(Signal::Interrupt)
        } else {
            Ok(())
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Realm::new()
    }
}
