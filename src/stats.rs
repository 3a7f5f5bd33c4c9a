//! # Packet Statistics
//!
//! Running totals and a once-per-second receive rate for decoded packets.
//!
//! `increment` runs on the byte-arrival path and `total_received` /
//! `rate_per_second` on the caller's polling path, so everything here is an
//! atomic snapshot. The rate is a pure function of two `(time, total)`
//! samples; the counter owns no timer, it only expects someone to call
//! `tick` about once per [`RATE_TICK_INTERVAL`].

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cadence at which the owning session drives [`PacketCounter::tick`].
pub const RATE_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Tick intervals shorter than this publish a rate of zero rather than
/// dividing by a near-zero elapsed time.
const MIN_MEASURABLE_SECS: f64 = 1e-3;

/// Packet counter with a rolling per-second rate.
///
/// # Examples
///
/// ```
/// use xbimu_logger::stats::PacketCounter;
///
/// let counter = PacketCounter::new();
/// counter.increment();
/// counter.increment();
/// assert_eq!(counter.total_received(), 2);
/// ```
#[derive(Debug)]
pub struct PacketCounter {
    total: AtomicU64,
    rate: AtomicU32,
    /// Fixed reference point so the tick baseline fits in an atomic.
    epoch: Instant,
    baseline_at_micros: AtomicU64,
    baseline_total: AtomicU64,
}

impl Default for PacketCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketCounter {
    /// Create a counter with zeroed totals and a fresh rate baseline.
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            rate: AtomicU32::new(0),
            epoch: Instant::now(),
            baseline_at_micros: AtomicU64::new(0),
            baseline_total: AtomicU64::new(0),
        }
    }

    /// Record one received packet, of any kind.
    pub fn increment(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the running total, the published rate, and the rate baseline.
    ///
    /// Called on every successful (re)connection.
    pub fn reset(&self) {
        self.reset_at(Instant::now());
    }

    fn reset_at(&self, now: Instant) {
        self.total.store(0, Ordering::Relaxed);
        self.rate.store(0, Ordering::Relaxed);
        self.baseline_total.store(0, Ordering::Relaxed);
        self.baseline_at_micros
            .store(self.offset_micros(now), Ordering::Relaxed);
    }

    /// Total packets received since construction or the last `reset`.
    pub fn total_received(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Packets per second as of the most recent `tick`, truncated.
    pub fn rate_per_second(&self) -> u32 {
        self.rate.load(Ordering::Relaxed)
    }

    /// Recompute the rate from the delta since the previous tick.
    pub fn tick(&self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&self, now: Instant) {
        let now_micros = self.offset_micros(now);
        let prev_micros = self.baseline_at_micros.swap(now_micros, Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        let prev_total = self.baseline_total.swap(total, Ordering::Relaxed);

        // total can sit below the baseline briefly after a racing reset;
        // saturate instead of wrapping into a huge delta.
        let delta = total.saturating_sub(prev_total);
        let elapsed_secs = now_micros.saturating_sub(prev_micros) as f64 / 1e6;

        let rate = if elapsed_secs < MIN_MEASURABLE_SECS {
            0
        } else {
            (delta as f64 / elapsed_secs) as u32
        };
        self.rate.store(rate, Ordering::Relaxed);
    }

    fn offset_micros(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let counter = PacketCounter::new();
        assert_eq!(counter.total_received(), 0);
        assert_eq!(counter.rate_per_second(), 0);
    }

    #[test]
    fn test_increment_accumulates() {
        let counter = PacketCounter::new();
        for _ in 0..250 {
            counter.increment();
        }
        assert_eq!(counter.total_received(), 250);
    }

    #[test]
    fn test_total_unaffected_by_tick_timing() {
        let counter = PacketCounter::new();
        for _ in 0..5 {
            counter.increment();
        }
        counter.tick();
        for _ in 0..5 {
            counter.increment();
        }
        counter.tick();
        assert_eq!(counter.total_received(), 10);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let counter = PacketCounter::new();
        let t0 = Instant::now();
        counter.reset_at(t0);
        for _ in 0..100 {
            counter.increment();
        }
        counter.tick_at(t0 + Duration::from_secs(1));
        assert_eq!(counter.rate_per_second(), 100);

        counter.reset();
        assert_eq!(counter.total_received(), 0);
        assert_eq!(counter.rate_per_second(), 0);
    }

    #[test]
    fn test_rate_over_one_second() {
        let counter = PacketCounter::new();
        let t0 = Instant::now();
        counter.reset_at(t0);
        for _ in 0..128 {
            counter.increment();
        }
        counter.tick_at(t0 + Duration::from_secs(1));
        assert_eq!(counter.rate_per_second(), 128);
    }

    #[test]
    fn test_rate_truncates_toward_zero() {
        let counter = PacketCounter::new();
        let t0 = Instant::now();
        counter.reset_at(t0);
        for _ in 0..3 {
            counter.increment();
        }
        counter.tick_at(t0 + Duration::from_secs(2));
        assert_eq!(counter.rate_per_second(), 1);
    }

    #[test]
    fn test_rate_uses_delta_since_previous_tick() {
        let counter = PacketCounter::new();
        let t0 = Instant::now();
        counter.reset_at(t0);
        for _ in 0..10 {
            counter.increment();
        }
        counter.tick_at(t0 + Duration::from_secs(1));
        assert_eq!(counter.rate_per_second(), 10);

        for _ in 0..4 {
            counter.increment();
        }
        counter.tick_at(t0 + Duration::from_secs(2));
        assert_eq!(counter.rate_per_second(), 4);
    }

    #[test]
    fn test_zero_elapsed_interval_yields_zero_rate() {
        let counter = PacketCounter::new();
        let t0 = Instant::now();
        counter.reset_at(t0);
        counter.increment();
        counter.tick_at(t0);
        assert_eq!(counter.rate_per_second(), 0);
    }
}
