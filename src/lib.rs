//! # eqsched — periodic task scheduler for single-core Cortex-M
//!
//! A small scheduler that runs a fixed set of periodic tasks under one of
//! four interchangeable policies, plus the primitives those tasks use to
//! talk to each other.
//!
//! ## Overview
//!
//! Tasks are plain callables with an interval and a priority. They run to
//! completion on every dispatch; there are no per-task stacks and no
//! context switches. The driver loop calls [`Scheduler::tick`] with the
//! current time, and each tick makes at most one dispatch decision.
//!
//! | Policy       | Dispatch                                                  |
//! |--------------|-----------------------------------------------------------|
//! | `RoundRobin` | Rotating cursor, one slot per tick                        |
//! | `Fcfs`       | First eligible task in registration order                 |
//! | `Priority`   | Smallest priority value among eligible tasks              |
//! | `Preemptive` | Priority selection from a periodic timer interrupt        |
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │     add_task() · configure() · run_once() · preempt     │
//! ├───────────────────────────┬────────────────────────────┤
//! │  Scheduler                │  Sync Primitives           │
//! │  scheduler.rs             │  sync.rs · queue.rs        │
//! │  ─ tick()                 │  ─ EventFlag · Semaphore   │
//! │  ─ on_preempt_interrupt() │  ─ SpinMutex · BoundedQueue│
//! ├───────────────────────────┴────────────────────────────┤
//! │          Task Registry (task.rs) · Time (timer.rs)      │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │      SysTick clock · PendSV preemption · ITM log        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: registry and queue storage are fixed-size arrays
//! - **Fixed capacity**: `MAX_TASKS` tasks, removed tasks keep their slot
//! - **Critical sections**: scheduler state is shared with the preemption
//!   interrupt through `critical_section::Mutex`

#![no_std]

pub mod config;
pub mod error;
pub mod task;
pub mod scheduler;
pub mod timer;
pub mod queue;
pub mod sync;
pub mod arch;
pub mod kernel;

pub use error::SchedError;
pub use queue::BoundedQueue;
pub use scheduler::{Policy, Scheduler};
pub use sync::{EventFlag, Semaphore, SpinMutex};
pub use task::{Task, TaskFn, TaskRegistry, TaskState};
pub use timer::{Clock, PeriodDivider, PreemptTimer};
