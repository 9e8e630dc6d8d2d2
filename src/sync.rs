//! # Synchronization Primitives
//!
//! Inter-task primitives offered to task bodies, plus the critical-section
//! helper the kernel uses for shared state.
//!
//! | Primitive    | Model                                                  |
//! |--------------|--------------------------------------------------------|
//! | `EventFlag`  | Single binary condition, no waiter queue               |
//! | `Semaphore`  | Unbounded non-negative permit count, spin on `wait`    |
//! | `SpinMutex`  | Test-and-set lock, no owner tracking, no recursion     |
//!
//! Waits are busy-spins. Under the preemptive policy task bodies run inside
//! the timer interrupt, where there is nothing to suspend to, so a blocking
//! wait would not be any better. A wait that can never be satisfied spins
//! forever; there are no timeouts.
//!
//! Misuse is the caller's responsibility. An unmatched `signal` simply adds
//! a permit and unlocking an unlocked mutex is a no-op; neither is detected.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub use critical_section::CriticalSection;

/// Execute a closure within a critical section (interrupts disabled).
///
/// On Cortex-M this is provided by `cortex-m`'s single-core
/// implementation; host tests use the `std` implementation.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

// ---------------------------------------------------------------------------
// Event flag
// ---------------------------------------------------------------------------

/// Binary condition shared between tasks. Setting or clearing twice is the
/// same as doing it once.
pub struct EventFlag {
    flag: AtomicBool,
}

impl EventFlag {
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }

    #[inline]
    pub fn check(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for EventFlag {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Counting semaphore
// ---------------------------------------------------------------------------

/// Counting semaphore with no upper bound on the permit count.
///
/// Taking a permit is a single compare-exchange that only succeeds on a
/// positive count, so two contexts racing on the last permit cannot both
/// win and the count can never go negative. A plain load followed by a
/// separate decrement would allow exactly that under preemption.
pub struct Semaphore {
    count: AtomicU32,
}

impl Semaphore {
    /// Create a semaphore holding `initial` permits.
    pub const fn new(initial: u32) -> Self {
        Self {
            count: AtomicU32::new(initial),
        }
    }

    /// Spin until a permit is available, then take it.
    pub fn wait(&self) {
        while !self.try_wait() {
            spin_loop();
        }
    }

    /// Take a permit if one is available.
    pub fn try_wait(&self) -> bool {
        let mut cur = self.count.load(Ordering::Relaxed);
        loop {
            if cur == 0 {
                return false;
            }
            match self.count.compare_exchange_weak(
                cur,
                cur - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    /// Return a permit. Always increments, even past the initial count.
    #[inline]
    pub fn signal(&self) {
        self.count.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Spin mutex
// ---------------------------------------------------------------------------

/// Test-and-set spin lock.
///
/// There is no guard and no owner: any context may `unlock`, whoever
/// locked it. Locking twice from the same context deadlocks.
pub struct SpinMutex {
    locked: AtomicBool,
}

impl SpinMutex {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Spin until the lock is acquired.
    pub fn lock(&self) {
        while self.locked.swap(true, Ordering::Acquire) {
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    /// Acquire the lock if it is free. Never spins.
    #[inline]
    pub fn try_lock(&self) -> bool {
        !self.locked.swap(true, Ordering::Acquire)
    }

    #[inline]
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl Default for SpinMutex {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
