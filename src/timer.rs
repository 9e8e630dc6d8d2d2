//! # Time Sources
//!
//! Hardware-abstract interfaces to the two time collaborators the scheduler
//! consumes: a monotonic millisecond clock and a periodic interrupt source
//! that drives the preemptive policy. The Cortex-M4 implementations live in
//! `arch::cortex_m4`; tests drive the scheduler with plain timestamps.
//!
//! [`PeriodDivider`] turns a 1 ms tick into the periodic preemption
//! interrupt. It is hardware-independent so the arch layer only has to
//! feed it ticks and raise the interrupt it asks for.

use core::cell::Cell;

use critical_section::Mutex;

use crate::sync;

/// Monotonic clock returning elapsed milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Periodic hardware-interrupt source used by the preemptive policy.
///
/// The source keeps a fixed period regardless of how long the handler runs.
/// After firing it does not raise another interrupt until the handler calls
/// [`acknowledge`](PreemptTimer::acknowledge); an expiry that arrives before
/// then is dropped rather than queued.
pub trait PreemptTimer {
    /// Start firing every `period_ms` milliseconds.
    fn arm(&mut self, period_ms: u32);

    /// Stop firing. Disarming an idle timer is a no-op.
    fn disarm(&mut self);

    /// Clear the current interrupt and re-enable delivery of the next one.
    fn acknowledge(&mut self);
}

// ---------------------------------------------------------------------------
// Tick divider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct DividerState {
    /// `0` = disarmed.
    period_ms: u32,
    /// Ticks until the next expiry. Reloaded on expiry, not on acknowledge.
    countdown: u32,
    /// An expiry was delivered and the handler has not acknowledged it yet.
    awaiting_ack: bool,
}

impl DividerState {
    const DISARMED: Self = Self {
        period_ms: 0,
        countdown: 0,
        awaiting_ack: false,
    };
}

/// Auto-reloading millisecond divider behind a periodic interrupt.
///
/// The countdown restarts the moment it expires, so expiries stay exactly
/// `period_ms` ticks apart however late the handler acknowledges. While an
/// expiry is unacknowledged, later ones are dropped.
pub struct PeriodDivider {
    state: Mutex<Cell<DividerState>>,
}

impl PeriodDivider {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(DividerState::DISARMED)),
        }
    }

    /// Start a new period from the current tick. `0` disarms.
    pub fn arm(&self, period_ms: u32) {
        let next = if period_ms == 0 {
            DividerState::DISARMED
        } else {
            DividerState {
                period_ms,
                countdown: period_ms,
                awaiting_ack: false,
            }
        };
        sync::critical_section(|cs| self.state.borrow(cs).set(next));
    }

    pub fn disarm(&self) {
        sync::critical_section(|cs| self.state.borrow(cs).set(DividerState::DISARMED));
    }

    /// Re-enable delivery. Does not touch the countdown.
    pub fn acknowledge(&self) {
        sync::critical_section(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.awaiting_ack = false;
            cell.set(state);
        });
    }

    /// Advance by one tick. Returns `true` when the interrupt should be
    /// raised.
    pub fn on_tick(&self) -> bool {
        sync::critical_section(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            if state.period_ms == 0 {
                return false;
            }

            state.countdown -= 1;
            let mut fire = false;
            if state.countdown == 0 {
                state.countdown = state.period_ms;
                fire = !state.awaiting_ack;
                state.awaiting_ack = true;
            }
            cell.set(state);
            fire
        })
    }

    pub fn is_armed(&self) -> bool {
        sync::critical_section(|cs| self.state.borrow(cs).get().period_ms != 0)
    }
}

impl Default for PeriodDivider {
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

    /// Ticks `1..=ticks`, acknowledging `ack_delay` ticks after each expiry.
    /// Returns the ticks at which the interrupt was raised.
    fn expiries(divider: &PeriodDivider, ticks: u32, ack_delay: u32, out: &mut [u32]) -> usize {
        let mut fired = 0;
        let mut ack_at = None;
        for t in 1..=ticks {
            if ack_at == Some(t) {
                divider.acknowledge();
                ack_at = None;
            }
            if divider.on_tick() {
                out[fired] = t;
                fired += 1;
                ack_at = Some(t + ack_delay);
            }
        }
        fired
    }

    #[test]
    fn test_spacing_independent_of_ack_latency() {
        for ack_delay in [1, 2, 3] {
            let divider = PeriodDivider::new();
            divider.arm(4);

            let mut out = [0u32; 8];
            let fired = expiries(&divider, 16, ack_delay, &mut out);
            assert_eq!(&out[..fired], &[4, 8, 12, 16]);
        }
    }

    #[test]
    fn test_unacknowledged_expiries_are_dropped_not_queued() {
        let divider = PeriodDivider::new();
        divider.arm(3);

        let mut fired = [false; 10];
        for t in 1..=9 {
            if t == 7 {
                divider.acknowledge();
            }
            fired[t] = divider.on_tick();
        }

        // Fires at 3, drops 6 while unacknowledged, fires again at 9 on the
        // original phase.
        let at: [usize; 2] = [3, 9];
        for t in 1..=9 {
            assert_eq!(fired[t], at.contains(&t), "tick {}", t);
        }
    }

    #[test]
    fn test_disarmed_never_fires() {
        let divider = PeriodDivider::new();
        assert!(!divider.is_armed());
        assert!((0..10).all(|_| !divider.on_tick()));

        divider.arm(2);
        assert!(divider.is_armed());
        assert!(!divider.on_tick());
        assert!(divider.on_tick());

        divider.disarm();
        assert!(!divider.is_armed());
        assert!((0..10).all(|_| !divider.on_tick()));

        divider.arm(0);
        assert!(!divider.is_armed());
    }

    #[test]
    fn test_rearm_restarts_phase() {
        let divider = PeriodDivider::new();
        divider.arm(5);
        divider.on_tick();
        divider.on_tick();

        divider.arm(3);
        assert!(!divider.on_tick());
        assert!(!divider.on_tick());
        assert!(divider.on_tick());
    }
}
