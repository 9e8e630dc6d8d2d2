//! # Scheduler
//!
//! Dispatch logic for the four scheduling policies. The scheduler owns the
//! task registry together with the policy, the round-robin cursor and the
//! task index tracked by the preemption path.
//!
//! ## Scheduling Algorithm
//!
//! A task is *eligible* when it is not terminated and at least
//! `interval_ms` has elapsed since its last run. Each call to
//! [`Scheduler::tick`] makes at most one dispatch decision:
//!
//! | Policy       | Per-tick behavior                                         |
//! |--------------|-----------------------------------------------------------|
//! | `RoundRobin` | Examine only the task at the cursor; run it if eligible.  |
//! |              | The cursor advances on every tick, run or not.            |
//! | `Fcfs`       | Run the first eligible task in registration order.        |
//! | `Priority`   | Run the eligible task with the smallest priority value.   |
//! | `Preemptive` | Nothing. Dispatch happens in the timer interrupt.         |
//!
//! ## Preemption
//!
//! Under `Preemptive` the periodic interrupt calls
//! [`Scheduler::on_preempt_interrupt`], which reruns the priority selection
//! and switches to the winner when it differs from the tracked current task.
//!
//! ## Concurrency
//!
//! All scheduler state sits behind a `critical_section::Mutex`, so the main
//! context and the interrupt handler never observe a half-updated task.
//! The task callback itself runs *outside* the critical section so that
//! other interrupts, including the millisecond clock, keep firing while it
//! executes.

use core::cell::RefCell;

use critical_section::Mutex;
use log::{debug, warn};

use crate::config::{MAX_TASKS, PREEMPT_PERIOD_MS};
use crate::error::SchedError;
use crate::sync;
use crate::task::{Task, TaskFn, TaskRegistry};
use crate::timer::PreemptTimer;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Scheduling discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Rotate through tasks one slot per tick.
    #[default]
    RoundRobin,
    /// First eligible task in registration order.
    Fcfs,
    /// Highest-priority (smallest value) eligible task.
    Priority,
    /// Priority selection driven by the periodic timer interrupt.
    Preemptive,
}

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// State guarded by the scheduler's critical section.
struct Inner<'a, const N: usize> {
    registry: TaskRegistry<'a, N>,
    policy: Policy,
    /// Round-robin cursor. Persists across ticks.
    rr_cursor: usize,
    /// Task last switched to by the preemption handler.
    current_task: Option<usize>,
}

impl<'a, const N: usize> Inner<'a, N> {
    /// Pick the task to run under the cooperative policies.
    fn select(&mut self, now_ms: u64) -> Option<usize> {
        match self.policy {
            Policy::RoundRobin => {
                let count = self.registry.count();
                if count == 0 {
                    return None;
                }
                let idx = self.rr_cursor % count;
                self.rr_cursor = (idx + 1) % count;
                self.registry
                    .get(idx)
                    .filter(|task| task.is_eligible(now_ms))
                    .map(|_| idx)
            }
            Policy::Fcfs => self.registry.first_eligible(now_ms),
            Policy::Priority => self.registry.highest_priority_eligible(now_ms),
            Policy::Preemptive => None,
        }
    }
}

/// Owned scheduler context.
///
/// Multiple independent schedulers can coexist; firmware uses the global
/// instance in [`kernel`](crate::kernel).
pub struct Scheduler<'a, const N: usize = MAX_TASKS> {
    inner: Mutex<RefCell<Inner<'a, N>>>,
}

impl<'a, const N: usize> Scheduler<'a, N> {
    /// Create a scheduler with an empty registry and the round-robin policy.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                registry: TaskRegistry::new(),
                policy: Policy::RoundRobin,
                rr_cursor: 0,
                current_task: None,
            })),
        }
    }

    /// Register a periodic task and return its index.
    ///
    /// # Errors
    /// `SchedError::CapacityExceeded` when the registry is full. A warning
    /// is logged and no task is created.
    pub fn add_task(
        &self,
        callback: TaskFn<'a>,
        interval_ms: u32,
        priority: i32,
    ) -> Result<usize, SchedError> {
        let result = sync::critical_section(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .registry
                .add(callback, interval_ms, priority)
        });

        if let Err(err) = result {
            warn!("scheduler: {}, task rejected (capacity {})", err, N);
        }
        result
    }

    /// Terminate the task at `index`. Out-of-range indices are ignored.
    pub fn remove_task(&self, index: usize) {
        let removed =
            sync::critical_section(|cs| self.inner.borrow_ref_mut(cs).registry.remove(index));
        if removed {
            debug!("scheduler: task {} terminated", index);
        }
    }

    /// Switch to `policy` and arm or disarm the preemption timer to match.
    ///
    /// The timer is armed with [`PREEMPT_PERIOD_MS`] when switching to
    /// `Preemptive` and disarmed for every other policy.
    pub fn configure<T: PreemptTimer>(&self, policy: Policy, timer: &mut T) {
        sync::critical_section(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.policy = policy;
            inner.current_task = None;
        });

        match policy {
            Policy::Preemptive => timer.arm(PREEMPT_PERIOD_MS),
            _ => timer.disarm(),
        }
        debug!("scheduler: policy {:?}", policy);
    }

    /// Make one dispatch decision at time `now_ms`.
    ///
    /// Runs at most one task and returns its index. Under `Preemptive`
    /// this never dispatches.
    pub fn tick(&self, now_ms: u64) -> Option<usize> {
        let (idx, callback) = sync::critical_section(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let idx = inner.select(now_ms)?;
            inner.registry.begin_run(idx).map(|cb| (idx, cb))
        })?;

        debug!("scheduler: tick -> task {}", idx);
        self.invoke(idx, callback, now_ms);
        Some(idx)
    }

    /// Preemption pass, called from the periodic timer interrupt.
    ///
    /// Selects the highest-priority eligible task. If it differs from the
    /// tracked current task, the current task is demoted to `Ready` and the
    /// winner is run synchronously in the calling (interrupt) context.
    /// The timer is always acknowledged before returning. Under any other
    /// policy nothing runs and a warning is logged.
    ///
    /// Returns the index of the task that ran, if any.
    pub fn on_preempt_interrupt<T: PreemptTimer>(
        &self,
        now_ms: u64,
        timer: &mut T,
    ) -> Option<usize> {
        let mut wrong_policy = false;
        let switched = sync::critical_section(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.policy != Policy::Preemptive {
                wrong_policy = true;
                return None;
            }

            let winner = inner.registry.highest_priority_eligible(now_ms)?;
            if inner.current_task == Some(winner) {
                return None;
            }

            if let Some(prev) = inner.current_task {
                inner.registry.demote(prev);
            }
            inner.current_task = Some(winner);
            inner.registry.begin_run(winner).map(|cb| (winner, cb))
        });

        if wrong_policy {
            warn!("scheduler: preempt interrupt outside preemptive policy");
        }

        if let Some((idx, callback)) = switched {
            debug!("scheduler: preempt -> task {}", idx);
            self.invoke(idx, callback, now_ms);
        }

        timer.acknowledge();
        switched.map(|(idx, _)| idx)
    }

    /// Run a task already moved to `Running` and close out its bookkeeping.
    fn invoke(&self, idx: usize, callback: TaskFn<'a>, now_ms: u64) {
        callback();
        sync::critical_section(|cs| {
            self.inner.borrow_ref_mut(cs).registry.finish_run(idx, now_ms);
        });
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn policy(&self) -> Policy {
        sync::critical_section(|cs| self.inner.borrow_ref(cs).policy)
    }

    /// Number of tasks ever registered, including terminated ones.
    pub fn task_count(&self) -> usize {
        sync::critical_section(|cs| self.inner.borrow_ref(cs).registry.count())
    }

    /// Snapshot of the task at `index`.
    pub fn task(&self, index: usize) -> Option<Task<'a>> {
        sync::critical_section(|cs| self.inner.borrow_ref(cs).registry.get(index).copied())
    }

    /// Task most recently switched to by the preemption handler.
    pub fn current_task(&self) -> Option<usize> {
        sync::critical_section(|cs| self.inner.borrow_ref(cs).current_task)
    }
}

impl<const N: usize> Default for Scheduler<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
