//! # eqsched Example Firmware
//!
//! Demonstrates the scheduler and the inter-task primitives with 4 tasks:
//!
//! | Task | Interval | Priority | Behavior |
//! |------|----------|----------|----------|
//! | `producer_task` | 1000 ms | 2 | Pushes a counter into the queue, sets the event flag |
//! | `consumer_task` | 1500 ms | 1 | Pops from the queue when the flag is set, clears it |
//! | `critical_task` | 2000 ms | 3 | Holds the spin mutex for 500 ms |
//! | `semaphore_task` | 2500 ms | 4 | Holds the semaphore's only permit for 500 ms |
//!
//! Switch `POLICY` to any other [`Policy`] to compare dispatch orders.
//! Under `Preemptive` the main loop keeps ticking but all dispatch happens
//! in PendSV once per `PREEMPT_PERIOD_MS`.

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use critical_section::Mutex;
use log::{info, LevelFilter};
use panic_halt as _;

use eqsched::arch::cortex_m4::{self, SysTickClock, SysTickPreemptTimer};
use eqsched::{kernel, BoundedQueue, EventFlag, Policy, Semaphore, SpinMutex};

const POLICY: Policy = Policy::Priority;

/// Pause between driver loop iterations.
const LOOP_DELAY_MS: u32 = 100;

/// How long the mutex and semaphore demos hold their resource.
const HOLD_MS: u32 = 500;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

static QUEUE: Mutex<RefCell<BoundedQueue<u32>>> = Mutex::new(RefCell::new(BoundedQueue::new()));
static DATA_READY: EventFlag = EventFlag::new();
static RESOURCE: Semaphore = Semaphore::new(1);
static CRITICAL: SpinMutex = SpinMutex::new();
static NEXT_ITEM: AtomicU32 = AtomicU32::new(0);

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn producer_task() {
    let data = NEXT_ITEM.fetch_add(1, Ordering::Relaxed);
    critical_section::with(|cs| QUEUE.borrow_ref_mut(cs).push(data));
    info!("Produced: {}", data);
    DATA_READY.set();
}

fn consumer_task() {
    if !DATA_READY.check() {
        return;
    }
    if let Some(data) = critical_section::with(|cs| QUEUE.borrow_ref_mut(cs).pop()) {
        info!("Consumed: {}", data);
    }
    DATA_READY.clear();
}

fn critical_task() {
    CRITICAL.lock();
    info!("In critical section");
    cortex_m4::delay_ms(HOLD_MS);
    CRITICAL.unlock();
}

fn semaphore_task() {
    RESOURCE.wait();
    info!("Accessing shared resource");
    cortex_m4::delay_ms(HOLD_MS);
    RESOURCE.signal();
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

#[entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().unwrap();

    cortex_m4::init_logger(LevelFilter::Info);
    cortex_m4::set_interrupt_priorities();
    cortex_m4::configure_systick(&mut cp.SYST);

    info!("Task scheduler example");

    kernel::add_task(&producer_task, 1000, 2).expect("Failed to create producer_task");
    kernel::add_task(&consumer_task, 1500, 1).expect("Failed to create consumer_task");
    kernel::add_task(&critical_task, 2000, 3).expect("Failed to create critical_task");
    kernel::add_task(&semaphore_task, 2500, 4).expect("Failed to create semaphore_task");

    kernel::configure(POLICY, &mut SysTickPreemptTimer);

    info!("Starting scheduler");

    loop {
        kernel::run_once(&SysTickClock);
        cortex_m4::delay_ms(LOOP_DELAY_MS);
    }
}
