//! Haste-adjusted waste accounting.
//!
//! Idle time inside a window is scaled by the player's haste at the moment it
//! is measured: with 25% haste a second of idling costs 1.25 seconds of gated
//! cooldown. Haste can change mid-window (procs, trinkets), so the rate is
//! read from the provider every time waste is flushed.

/// Source of the instantaneous rate (haste fraction, 0.25 = 25%).
pub trait RateProvider {
    fn current(&self) -> f64;
}

impl RateProvider for f64 {
    fn current(&self) -> f64 {
        *self
    }
}

impl<F: Fn() -> f64> RateProvider for F {
    fn current(&self) -> f64 {
        self()
    }
}

/// `(t1 - t0) * (1 + rate)`. Out-of-order timestamps count as zero elapsed.
pub fn haste_adjusted_elapsed(t0_ms: u64, t1_ms: u64, rate: f64) -> f64 {
    t1_ms.saturating_sub(t0_ms) as f64 * (1.0 + rate)
}
