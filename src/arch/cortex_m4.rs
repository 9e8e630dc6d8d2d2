//! # Cortex-M4 Port Layer
//!
//! Hardware-specific collaborators for the ARM Cortex-M4 (Thumb-2):
//! the millisecond clock, the preemption interrupt source and the log sink.
//!
//! ## Time Base
//!
//! SysTick fires at `TICK_HZ` (1 kHz) and advances a 64-bit millisecond
//! counter, which backs [`SysTickClock`].
//!
//! ## Preemption Interrupt
//!
//! [`SysTickPreemptTimer`] feeds every SysTick into a [`PeriodDivider`],
//! which auto-reloads like a hardware alarm timer and pends PendSV once per
//! period. The PendSV handler runs the scheduler's preemption pass and
//! acknowledges the timer, which only re-enables delivery: the period keeps
//! running while a task executes, and an expiry that lands before the
//! acknowledge is dropped rather than queued.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: priority 0x00 (highest) so the clock keeps running while
//!   a task body executes inside PendSV
//! - PendSV: priority 0xFF (lowest) so it never preempts other handlers

use core::cell::Cell;
use core::fmt::Write as _;

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{itm, ITM, SCB};
use critical_section::Mutex;
use log::{LevelFilter, Log, Metadata, Record};

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::kernel;
use crate::sync;
use crate::timer::{Clock, PeriodDivider, PreemptTimer};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Milliseconds since `configure_systick`. There is no 64-bit atomic on
/// ARMv7E-M, so it lives behind a critical section.
static MILLIS: Mutex<Cell<u64>> = Mutex::new(Cell::new(0));

/// Preemption period divider, advanced from SysTick.
static PREEMPT: PeriodDivider = PeriodDivider::new();

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure SysTick as the 1 kHz time base.
///
/// # Parameters
/// - `syst`: Mutable reference to the SysTick peripheral
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Set SysTick to the highest and PendSV to the lowest priority.
pub fn set_interrupt_priorities() {
    unsafe {
        // System Handler Priority Register 3 (SHPR3): 0xE000_ED20
        // Bits [23:16] = PendSV priority
        // Bits [31:24] = SysTick priority
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        let val = (val & 0x0000_FFFF) | (0xFF << 16);
        core::ptr::write_volatile(shpr3, val);
    }
}

/// Busy-wait for roughly `ms` milliseconds at `SYSTEM_CLOCK_HZ`.
#[inline]
pub fn delay_ms(ms: u32) {
    cortex_m::asm::delay((SYSTEM_CLOCK_HZ / 1000).saturating_mul(ms));
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic millisecond clock driven by SysTick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTickClock;

impl Clock for SysTickClock {
    fn now_ms(&self) -> u64 {
        sync::critical_section(|cs| MILLIS.borrow(cs).get())
    }
}

// ---------------------------------------------------------------------------
// Preemption timer
// ---------------------------------------------------------------------------

/// Periodic preemption interrupt delivered through PendSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTickPreemptTimer;

impl PreemptTimer for SysTickPreemptTimer {
    fn arm(&mut self, period_ms: u32) {
        PREEMPT.arm(period_ms);
    }

    fn disarm(&mut self) {
        PREEMPT.disarm();
        SCB::clear_pendsv();
    }

    fn acknowledge(&mut self) {
        PREEMPT.acknowledge();
    }
}

// ---------------------------------------------------------------------------
// Exception handlers
// ---------------------------------------------------------------------------

/// SysTick exception handler: advance the clock and run the preemption
/// divider.
#[no_mangle]
pub extern "C" fn SysTick() {
    sync::critical_section(|cs| {
        let millis = MILLIS.borrow(cs);
        millis.set(millis.get().wrapping_add(1));
    });

    if PREEMPT.on_tick() {
        SCB::set_pendsv();
    }
}

/// PendSV exception handler: the preemption interrupt.
#[no_mangle]
pub extern "C" fn PendSV() {
    kernel::preempt_handler(&SysTickClock, &mut SysTickPreemptTimer);
}

// ---------------------------------------------------------------------------
// ITM log sink
// ---------------------------------------------------------------------------

struct ItmLogger;

static LOGGER: ItmLogger = ItmLogger;

impl Log for ItmLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        sync::critical_section(|_cs| {
            // Safety: stimulus port 0 is only written here, with
            // interrupts disabled.
            let stim = unsafe { &mut (*(ITM::PTR as *mut itm::RegisterBlock)).stim[0] };
            let mut port = StimWriter(stim);
            let _ = writeln!(port, "[{}] {}", record.level(), record.args());
        });
    }

    fn flush(&self) {}
}

/// `fmt::Write` adapter over an ITM stimulus port.
struct StimWriter<'a>(&'a mut itm::Stim);

impl core::fmt::Write for StimWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        cortex_m::itm::write_str(self.0, s);
        Ok(())
    }
}

/// Route `log` output to ITM stimulus port 0.
///
/// Records above `level` are discarded. Calling this twice keeps the
/// first logger.
pub fn init_logger(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
