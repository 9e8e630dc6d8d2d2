//! # eqsched Configuration
//!
//! Compile-time constants governing the scheduler and the demo firmware.
//! All limits are fixed at compile time. The registry and queue also take
//! their capacity as a const generic defaulting to the values below.

/// Maximum number of tasks a registry can hold. Removed tasks keep their
/// slot, so this also bounds the number of `add` calls over the lifetime
/// of a scheduler.
pub const MAX_TASKS: usize = 5;

/// Capacity of the inter-task `BoundedQueue`.
pub const QUEUE_CAPACITY: usize = 10;

/// Period of the preemption interrupt in milliseconds.
pub const PREEMPT_PERIOD_MS: u32 = 1000;

/// SysTick frequency in Hz. One tick is one millisecond of the
/// monotonic clock.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
