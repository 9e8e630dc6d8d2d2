//! # Kernel
//!
//! Global scheduler instance and the entry points used by firmware: the
//! driver loop in `main` and the preemption interrupt in the arch layer.
//!
//! Library users that want several schedulers, or that run on the host,
//! construct their own [`Scheduler`] instead.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► arch::cortex_m4::init_logger()
//!         ├─► arch::cortex_m4::configure_systick()  ← 1 kHz clock
//!         ├─► kernel::add_task()                   ← register tasks (×N)
//!         ├─► kernel::configure(policy, timer)     ← arms PendSV divider
//!         └─► loop { kernel::run_once(clock); delay }
//! ```

use crate::error::SchedError;
use crate::scheduler::{Policy, Scheduler};
use crate::task::TaskFn;
use crate::timer::{Clock, PreemptTimer};

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Global scheduler. Safe to share with interrupt handlers: every access
/// goes through the scheduler's critical section.
static SCHEDULER: Scheduler<'static> = Scheduler::new();

/// The global scheduler.
#[inline]
pub fn scheduler() -> &'static Scheduler<'static> {
    &SCHEDULER
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Register a task with the global scheduler.
///
/// # Returns
/// - `Ok(task_id)`: the task's index in the registry.
/// - `Err(SchedError::CapacityExceeded)`: the registry is full. The task is
///   not added and a warning has been logged.
///
/// # Example
/// ```ignore
/// fn blink() { /* ... */ }
/// kernel::add_task(&blink, 500, 1)?;
/// ```
pub fn add_task(
    task: TaskFn<'static>,
    interval_ms: u32,
    priority: i32,
) -> Result<usize, SchedError> {
    SCHEDULER.add_task(task, interval_ms, priority)
}

/// Terminate a task. Its slot is not reclaimed.
pub fn remove_task(index: usize) {
    SCHEDULER.remove_task(index);
}

/// Select the scheduling policy, arming the preemption timer if needed.
pub fn configure<T: PreemptTimer>(policy: Policy, timer: &mut T) {
    SCHEDULER.configure(policy, timer);
}

/// One iteration of the driver loop: read the clock and tick once.
pub fn run_once<C: Clock>(clock: &C) -> Option<usize> {
    SCHEDULER.tick(clock.now_ms())
}

/// Body of the periodic preemption interrupt.
///
/// Called by the arch layer's interrupt handler; the timer is acknowledged
/// before this returns.
pub fn preempt_handler<C: Clock, T: PreemptTimer>(clock: &C, timer: &mut T) -> Option<usize> {
    SCHEDULER.on_preempt_interrupt(clock.now_ms(), timer)
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::task::TaskState;

    struct FixedClock(Cell<u64>);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct CountingTimer {
        armed: bool,
        acks: u32,
    }

    impl PreemptTimer for CountingTimer {
        fn arm(&mut self, _period_ms: u32) {
            self.armed = true;
        }

        fn disarm(&mut self) {
            self.armed = false;
        }

        fn acknowledge(&mut self) {
            self.acks += 1;
        }
    }

    static RUNS: AtomicU32 = AtomicU32::new(0);

    fn count_run() {
        RUNS.fetch_add(1, Ordering::Relaxed);
    }

    // The global instance is shared, so everything lives in one test.
    #[test]
    fn test_global_driver_loop_and_preemption() {
        let clock = FixedClock(Cell::new(0));
        let mut timer = CountingTimer::default();

        configure(Policy::Fcfs, &mut timer);
        assert!(!timer.armed);

        let idx = add_task(&count_run, 100, 0).unwrap();
        assert_eq!(run_once(&clock), None);

        clock.0.set(100);
        assert_eq!(run_once(&clock), Some(idx));
        assert_eq!(RUNS.load(Ordering::Relaxed), 1);

        // Interrupt outside the preemptive policy: acknowledged, nothing runs.
        clock.0.set(200);
        assert_eq!(preempt_handler(&clock, &mut timer), None);
        assert_eq!(timer.acks, 1);

        configure(Policy::Preemptive, &mut timer);
        assert!(timer.armed);
        assert_eq!(run_once(&clock), None);
        assert_eq!(preempt_handler(&clock, &mut timer), Some(idx));
        assert_eq!(RUNS.load(Ordering::Relaxed), 2);
        assert_eq!(timer.acks, 2);

        remove_task(idx);
        assert_eq!(scheduler().task(idx).unwrap().state(), TaskState::Terminated);
    }
}
