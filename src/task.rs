//! # Task Registry
//!
//! Defines the periodic task model and the fixed-capacity registry that
//! holds it. A task is a callable plus its timing and priority; it runs to
//! completion on every dispatch, there is no per-task stack.
//!
//! The registry is append-only. Removing a task marks it `Terminated` but
//! never frees its slot, so every `remove` permanently reduces the number of
//! tasks the registry can still schedule. Indices returned by `add` stay
//! valid for the registry's lifetime, which lets the scheduler and the
//! preemption interrupt refer to tasks by index.

use core::fmt;

use crate::config::MAX_TASKS;
use crate::error::SchedError;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Lifecycle state of a task.
///
/// ```text
///   ┌──────────┐    dispatch     ┌─────────┐
///   │  Ready   │ ──────────────► │ Running │
///   └──────────┘                 └─────────┘
///     ▲   │       returns / demote    │
///     │   │ ◄─────────────────────────┘
///     │   │
///     │   │ remove()            ┌────────────┐
///     │   └───────────────────► │ Terminated │  (final)
///     │                         └────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for its interval to elapse or for the scheduler to pick it.
    Ready,
    /// Callback is executing right now.
    Running,
    /// Removed. Never scheduled again; the slot is not reused.
    Terminated,
}

/// Task body. The closure captures whatever parameter it needs.
///
/// `Sync` is required because under the preemptive policy the callback is
/// invoked from interrupt context while the registry is reachable from the
/// main context.
pub type TaskFn<'a> = &'a (dyn Fn() + Sync);

// ---------------------------------------------------------------------------
// Task record
// ---------------------------------------------------------------------------

/// One periodic unit of work.
///
/// Fields are read-only outside the crate; state changes only happen
/// through the registry and the scheduler.
///
/// ```compile_fail
/// use eqsched::{Task, TaskState};
/// fn noop() {}
/// let mut task = Task::new(&noop, 100, 0);
/// task.state = TaskState::Terminated;
/// ```
#[derive(Clone, Copy)]
pub struct Task<'a> {
    callback: TaskFn<'a>,
    interval_ms: u32,
    last_run: u64,
    state: TaskState,
    priority: i32,
}

impl<'a> Task<'a> {
    /// Create a `Ready` task that has never run.
    pub fn new(callback: TaskFn<'a>, interval_ms: u32, priority: i32) -> Self {
        Self {
            callback,
            interval_ms,
            last_run: 0,
            state: TaskState::Ready,
            priority,
        }
    }

    /// The task's callable.
    #[inline]
    pub fn callback(&self) -> TaskFn<'a> {
        self.callback
    }

    /// Minimum milliseconds between successive invocations.
    #[inline]
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Timestamp of the last invocation in milliseconds. `0` until first run.
    #[inline]
    pub fn last_run(&self) -> u64 {
        self.last_run
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Smaller value = higher priority. Not required to be unique.
    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// A task is eligible when it is not terminated and at least
    /// `interval_ms` has elapsed since `last_run`.
    ///
    /// The elapsed time uses wrapping subtraction, so a clock that reads
    /// earlier than `last_run` makes the task due immediately.
    #[inline]
    pub fn is_eligible(&self, now_ms: u64) -> bool {
        self.state != TaskState::Terminated
            && now_ms.wrapping_sub(self.last_run) >= u64::from(self.interval_ms)
    }
}

impl fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("interval_ms", &self.interval_ms)
            .field("last_run", &self.last_run)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Append-only, fixed-capacity sequence of tasks in registration order.
///
/// The registry does no locking of its own; the [`Scheduler`] wraps it in a
/// critical section. Run transitions are crate-internal, so outside code
/// can only add and remove tasks:
///
/// ```compile_fail
/// use eqsched::{TaskRegistry, TaskState};
/// fn noop() {}
/// let mut reg: TaskRegistry = TaskRegistry::new();
/// reg.add(&noop, 0, 0).unwrap();
/// reg.remove(0);
/// reg.get_mut(0).unwrap().state = TaskState::Ready;
/// ```
///
/// [`Scheduler`]: crate::scheduler::Scheduler
pub struct TaskRegistry<'a, const N: usize = MAX_TASKS> {
    tasks: [Option<Task<'a>>; N],
    count: usize,
}

impl<'a, const N: usize> TaskRegistry<'a, N> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            tasks: [None; N],
            count: 0,
        }
    }

    /// Append a new `Ready` task and return its index.
    ///
    /// # Errors
    /// `SchedError::CapacityExceeded` if `N` tasks have already been added.
    /// Terminated tasks still count. The registry is left unchanged.
    pub fn add(
        &mut self,
        callback: TaskFn<'a>,
        interval_ms: u32,
        priority: i32,
    ) -> Result<usize, SchedError> {
        if self.count >= N {
            return Err(SchedError::CapacityExceeded);
        }

        let idx = self.count;
        self.tasks[idx] = Some(Task::new(callback, interval_ms, priority));
        self.count += 1;
        Ok(idx)
    }

    /// Mark the task at `index` as `Terminated`. Out-of-range indices are
    /// ignored. Returns whether a task was terminated.
    pub fn remove(&mut self, index: usize) -> bool {
        match self.get_mut(index) {
            Some(task) => {
                task.state = TaskState::Terminated;
                true
            }
            None => false,
        }
    }

    /// Number of tasks ever added, including terminated ones.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    pub fn get(&self, index: usize) -> Option<&Task<'a>> {
        self.tasks.get(index)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Task<'a>> {
        self.tasks.get_mut(index)?.as_mut()
    }

    /// Registered tasks with their indices, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Task<'a>)> {
        self.tasks[..self.count]
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (i, t)))
    }

    /// Index of the first eligible task in registration order.
    pub fn first_eligible(&self, now_ms: u64) -> Option<usize> {
        self.iter()
            .find(|(_, task)| task.is_eligible(now_ms))
            .map(|(i, _)| i)
    }

    /// Index of the eligible task with the numerically smallest priority.
    ///
    /// Ties go to the earliest registered task: a later task only wins with
    /// a strictly smaller priority.
    pub fn highest_priority_eligible(&self, now_ms: u64) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;

        for (i, task) in self.iter() {
            if !task.is_eligible(now_ms) {
                continue;
            }
            if best.map_or(true, |(_, prio)| task.priority < prio) {
                best = Some((i, task.priority));
            }
        }

        best.map(|(i, _)| i)
    }

    /// Transition a task into `Running` and hand back its callback.
    ///
    /// Returns `None` for an unknown or terminated task. The caller invokes
    /// the callback and then calls [`finish_run`](Self::finish_run).
    pub(crate) fn begin_run(&mut self, index: usize) -> Option<TaskFn<'a>> {
        let task = self.get_mut(index)?;
        if task.state == TaskState::Terminated {
            return None;
        }
        task.state = TaskState::Running;
        Some(task.callback)
    }

    /// Record `now_ms` as the last run and return the task to `Ready`.
    ///
    /// A task removed while its callback was running stays `Terminated`.
    pub(crate) fn finish_run(&mut self, index: usize, now_ms: u64) {
        if let Some(task) = self.get_mut(index) {
            task.last_run = now_ms;
            if task.state == TaskState::Running {
                task.state = TaskState::Ready;
            }
        }
    }

    /// Put a `Running` task back to `Ready` without touching `last_run`.
    pub(crate) fn demote(&mut self, index: usize) {
        if let Some(task) = self.get_mut(index) {
            if task.state == TaskState::Running {
                task.state = TaskState::Ready;
            }
        }
    }
}

impl<const N: usize> Default for TaskRegistry<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() {}

    #[test]
    fn test_add_starts_ready() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        let idx = reg.add(&noop, 1000, 2).unwrap();

        assert_eq!(idx, 0);
        assert_eq!(reg.count(), 1);
        let task = reg.get(0).unwrap();
        assert_eq!(task.state(), TaskState::Ready);
        assert_eq!(task.last_run(), 0);
        assert_eq!(task.interval_ms(), 1000);
        assert_eq!(task.priority(), 2);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        for i in 0..MAX_TASKS {
            assert_eq!(reg.add(&noop, 100, i as i32), Ok(i));
        }

        assert_eq!(reg.add(&noop, 100, 0), Err(SchedError::CapacityExceeded));
        assert_eq!(reg.count(), MAX_TASKS);
        assert!(reg.get(MAX_TASKS).is_none());
    }

    #[test]
    fn test_remove_is_permanent_and_keeps_slot() {
        let mut reg = TaskRegistry::<3>::new();
        reg.add(&noop, 0, 1).unwrap();
        reg.add(&noop, 0, 1).unwrap();
        reg.add(&noop, 0, 1).unwrap();

        assert!(reg.remove(1));
        assert_eq!(reg.get(1).unwrap().state(), TaskState::Terminated);
        assert_eq!(reg.count(), 3);

        // No slot came back.
        assert_eq!(reg.add(&noop, 0, 1), Err(SchedError::CapacityExceeded));

        // A terminated task cannot be started again.
        assert!(reg.begin_run(1).is_none());
        assert_eq!(reg.get(1).unwrap().state(), TaskState::Terminated);
    }

    #[test]
    fn test_remove_out_of_range_ignored() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        reg.add(&noop, 0, 1).unwrap();

        assert!(!reg.remove(1));
        assert!(!reg.remove(usize::MAX));
        assert_eq!(reg.get(0).unwrap().state(), TaskState::Ready);
    }

    #[test]
    fn test_eligibility() {
        let mut task = Task::new(&noop, 1000, 0);
        assert!(!task.is_eligible(999));
        assert!(task.is_eligible(1000));

        task.last_run = 1000;
        assert!(!task.is_eligible(1500));
        assert!(task.is_eligible(2000));

        task.state = TaskState::Terminated;
        assert!(!task.is_eligible(10_000));
    }

    #[test]
    fn test_highest_priority_first_occurrence_wins() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        reg.add(&noop, 0, 3).unwrap();
        reg.add(&noop, 0, 1).unwrap();
        reg.add(&noop, 0, 1).unwrap();
        reg.add(&noop, 0, 2).unwrap();

        assert_eq!(reg.highest_priority_eligible(0), Some(1));

        reg.remove(1);
        assert_eq!(reg.highest_priority_eligible(0), Some(2));
    }

    #[test]
    fn test_highest_priority_skips_tasks_not_due() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        reg.add(&noop, 5000, 0).unwrap();
        reg.add(&noop, 100, 7).unwrap();

        assert_eq!(reg.highest_priority_eligible(200), Some(1));
        assert_eq!(reg.highest_priority_eligible(50), None);
        // Very large priorities are still selectable.
        reg.add(&noop, 0, i32::MAX).unwrap();
        assert_eq!(reg.highest_priority_eligible(50), Some(2));
    }

    #[test]
    fn test_run_transitions() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        reg.add(&noop, 10, 0).unwrap();

        assert!(reg.begin_run(0).is_some());
        assert_eq!(reg.get(0).unwrap().state(), TaskState::Running);

        reg.finish_run(0, 42);
        let task = reg.get(0).unwrap();
        assert_eq!(task.state(), TaskState::Ready);
        assert_eq!(task.last_run(), 42);
    }

    #[test]
    fn test_removed_while_running_stays_terminated() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        reg.add(&noop, 10, 0).unwrap();

        reg.begin_run(0).unwrap();
        reg.remove(0);
        reg.finish_run(0, 5);
        reg.demote(0);

        assert_eq!(reg.get(0).unwrap().state(), TaskState::Terminated);
    }

    #[test]
    fn test_terminated_task_invisible_to_selection() {
        let mut reg: TaskRegistry = TaskRegistry::new();
        reg.add(&noop, 0, 0).unwrap();
        reg.remove(0);

        // Only `remove` mutates lifecycle state from outside the crate, and
        // repeating it changes nothing.
        reg.remove(0);
        let task = *reg.get(0).unwrap();
        assert_eq!(task.state(), TaskState::Terminated);
        assert!(!task.is_eligible(u64::MAX));
        assert_eq!(reg.first_eligible(0), None);
        assert_eq!(reg.highest_priority_eligible(0), None);
    }
}
