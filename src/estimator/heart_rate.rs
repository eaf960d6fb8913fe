//! Heart-rate estimation from an infrared pulse (PPG) amplitude stream.
//!
//! Each sample is smoothed, tested for a beat peak, and every beat turns the
//! interval since the previous one into an instantaneous BPM. Readings outside
//! the physiological range are dropped as noise; the reported value is the
//! rounded mean of the most recent accepted readings.

use std::collections::VecDeque;

use log::trace;

use super::clock::{Clock, SystemClock};
use crate::config::{HeartRateConfig, PeakMode};
use crate::signal::{is_heartbeat_peak, SignalSmoother};

/// Lowest instantaneous BPM accepted into the history.
pub const MIN_BPM: f64 = 40.0;
/// Highest instantaneous BPM accepted into the history.
pub const MAX_BPM: f64 = 220.0;
/// Number of accepted BPM readings averaged.
pub const HISTORY_CAPACITY: usize = 100;

const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone)]
pub struct HeartRateEstimator<C: Clock = SystemClock> {
    config: HeartRateConfig,
    clock: C,
    smoother: SignalSmoother,
    // smoothed value two samples back, neighbour for the delayed peak test
    before_previous: f64,
    last_beat_ms: Option<u64>,
    history: VecDeque<f64>,
    bpm: f64,
}

impl<C: Clock> HeartRateEstimator<C> {
    pub fn new(config: &HeartRateConfig, clock: C) -> Self {
        Self {
            config: config.clone(),
            clock,
            smoother: SignalSmoother::new(config.smoothing_alpha),
            before_previous: 0.0,
            last_beat_ms: None,
            history: VecDeque::with_capacity(config.history_capacity + 1),
            bpm: 0.0,
        }
    }

    /// Feed one raw infrared sample and return the current rounded BPM.
    ///
    /// Returns 0 until the first accepted beat interval.
    pub fn update(&mut self, ir: f64) -> u32 {
        let previous = self.smoother.value();
        let smoothed = self.smoother.smooth(ir);

        let threshold = self.config.peak_threshold;
        let peak = match self.config.peak_mode {
            PeakMode::RawNeighbor => is_heartbeat_peak(smoothed, previous, ir, threshold),
            PeakMode::DelayedLocalMax => {
                is_heartbeat_peak(previous, self.before_previous, smoothed, threshold)
            }
        };
        self.before_previous = previous;

        if peak {
            let now = self.clock.now_ms();
            self.record_beat(now);
        }

        self.bpm()
    }

    fn record_beat(&mut self, now_ms: u64) {
        if let Some(last_beat_ms) = self.last_beat_ms {
            // a clock that did not move (or moved backwards) gives no interval
            let interval_ms = now_ms.saturating_sub(last_beat_ms);
            if interval_ms > 0 {
                let instant_bpm = MS_PER_MINUTE / interval_ms as f64;
                if instant_bpm >= self.config.min_bpm && instant_bpm <= self.config.max_bpm {
                    self.history.push_back(instant_bpm);
                    while self.history.len() > self.config.history_capacity {
                        self.history.pop_front();
                    }
                    self.bpm = self.history.iter().sum::<f64>() / self.history.len() as f64;
                } else {
                    trace!("Discarding out-of-range beat: {:.1} bpm over {}ms", instant_bpm, interval_ms);
                }
            }
        }
        self.last_beat_ms = Some(now_ms);
    }

    /// Rounded rolling average.
    pub fn bpm(&self) -> u32 {
        self.bpm.round() as u32
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[cfg(test)]
    pub fn last_beat_ms(&self) -> Option<u64> {
        self.last_beat_ms
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
        self.before_previous = 0.0;
        self.last_beat_ms = None;
        self.history.clear();
        self.bpm = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::ManualClock;

    const SAMPLE_MS: u64 = 20;
    const SPIKE: f64 = 1000.0;

    fn estimator(clock: &ManualClock) -> HeartRateEstimator<ManualClock> {
        HeartRateEstimator::new(&HeartRateConfig::default(), clock.clone())
    }

    /// Feed a zero baseline with single-sample spikes at the given times,
    /// one sample every 20ms up to `end_ms`. Returns the last BPM reported.
    fn feed_spikes(
        hr: &mut HeartRateEstimator<ManualClock>,
        clock: &ManualClock,
        spikes_ms: &[u64],
        end_ms: u64,
    ) -> u32 {
        let mut bpm = 0;
        let mut t = clock.now_ms();
        while t <= end_ms {
            clock.set(t);
            let ir = if spikes_ms.contains(&t) { SPIKE } else { 0.0 };
            bpm = hr.update(ir);
            t += SAMPLE_MS;
        }
        bpm
    }

    #[test]
    fn flat_signal_below_threshold_never_beats() {
        let clock = ManualClock::new(0);
        let mut hr = estimator(&clock);
        for _ in 0..500 {
            clock.advance(SAMPLE_MS);
            assert_eq!(hr.update(30.0), 0);
        }
        assert_eq!(hr.last_beat_ms(), None);
        assert_eq!(hr.history_len(), 0);
    }

    #[test]
    fn first_beat_only_sets_baseline() {
        let clock = ManualClock::new(0);
        let mut hr = estimator(&clock);
        let bpm = feed_spikes(&mut hr, &clock, &[100], 400);
        assert_eq!(bpm, 0);
        // detected one sample after the spike
        assert_eq!(hr.last_beat_ms(), Some(120));
        assert_eq!(hr.history_len(), 0);
    }

    #[test]
    fn regular_spikes_give_expected_rate() {
        let clock = ManualClock::new(0);
        let mut hr = estimator(&clock);
        let spikes: Vec<u64> = (0..8).map(|i| 100 + i * 760).collect();
        let bpm = feed_spikes(&mut hr, &clock, &spikes, 6_000);
        // 60000 / 760
        assert_eq!(bpm, 79);
        assert_eq!(hr.history_len(), 7);
    }

    #[test]
    fn implausible_interval_is_excluded_from_average() {
        let clock = ManualClock::new(0);
        let mut hr = estimator(&clock);
        // 200ms gap implies 300 bpm
        let spikes = [100, 900, 1700, 1900, 2700];
        let bpm = feed_spikes(&mut hr, &clock, &spikes, 3_000);
        assert_eq!(bpm, 75);
        assert_eq!(hr.history_len(), 3);
    }

    #[test]
    fn too_slow_interval_is_excluded() {
        let clock = ManualClock::new(0);
        let mut hr = estimator(&clock);
        // 2000ms gap implies 30 bpm, below range
        let spikes = [100, 2100, 2900];
        let bpm = feed_spikes(&mut hr, &clock, &spikes, 3_200);
        assert_eq!(bpm, 75);
        assert_eq!(hr.history_len(), 1);
    }

    #[test]
    fn zero_interval_does_not_divide() {
        let clock = ManualClock::new(5_000);
        let mut hr = estimator(&clock);
        // clock frozen: every beat lands on the same millisecond
        for _ in 0..10 {
            hr.update(SPIKE);
            for _ in 0..40 {
                hr.update(0.0);
            }
        }
        assert!(hr.last_beat_ms().is_some());
        assert_eq!(hr.bpm(), 0);
        assert_eq!(hr.history_len(), 0);
    }

    #[test]
    fn history_is_bounded() {
        let clock = ManualClock::new(0);
        let mut hr = estimator(&clock);
        let spikes: Vec<u64> = (0..150).map(|i| 100 + i * 600).collect();
        let end = *spikes.last().unwrap() + 200;
        let bpm = feed_spikes(&mut hr, &clock, &spikes, end);
        assert_eq!(hr.history_len(), HISTORY_CAPACITY);
        assert_eq!(bpm, 100);
    }

    #[test]
    fn raw_neighbor_mode_matches_reference_comparison() {
        // the smoothed value always lies between the previous smoothed value and
        // the raw sample, so this comparison cannot report a local maximum
        let clock = ManualClock::new(0);
        let config = HeartRateConfig {
            peak_mode: PeakMode::RawNeighbor,
            ..HeartRateConfig::default()
        };
        let mut hr = HeartRateEstimator::new(&config, clock.clone());
        let spikes: Vec<u64> = (0..8).map(|i| 100 + i * 760).collect();
        feed_spikes(&mut hr, &clock, &spikes, 6_000);
        assert_eq!(hr.last_beat_ms(), None);
        assert_eq!(hr.bpm(), 0);
    }

    #[test]
    fn reset_clears_history_and_baseline() {
        let clock = ManualClock::new(0);
        let mut hr = estimator(&clock);
        let spikes = [100, 900, 1700];
        feed_spikes(&mut hr, &clock, &spikes, 2_000);
        assert_eq!(hr.bpm(), 75);

        hr.reset();
        assert_eq!(hr.bpm(), 0);
        assert_eq!(hr.history_len(), 0);
        assert_eq!(hr.last_beat_ms(), None);
    }
}
