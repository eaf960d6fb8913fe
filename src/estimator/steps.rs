//! Step counting from a 3-axis accelerometer.
//!
//! The acceleration magnitude is averaged over a short window; a step is the
//! rising edge of that average crossing the threshold, debounced by a minimum
//! interval between steps. The count only grows until `reset()`.

use log::{debug, trace};

use super::clock::{Clock, SystemClock};
use crate::config::StepConfig;
use crate::signal::{RisingEdgeDetector, SlidingWindowAverager};

/// Minimum time between two counted steps.
pub const MIN_STEP_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct StepEstimator<C: Clock = SystemClock> {
    config: StepConfig,
    clock: C,
    window: SlidingWindowAverager,
    detector: RisingEdgeDetector,
    was_peak: bool,
    last_step_ms: u64,
    step_count: u64,
}

impl<C: Clock> StepEstimator<C> {
    pub fn new(config: &StepConfig, clock: C) -> Self {
        let last_step_ms = clock.now_ms();
        Self {
            config: config.clone(),
            clock,
            window: SlidingWindowAverager::new(config.window_size),
            detector: RisingEdgeDetector::new(config.threshold),
            was_peak: false,
            last_step_ms,
            step_count: 0,
        }
    }

    /// Feed one acceleration sample and return the cumulative step count.
    pub fn update(&mut self, x: f64, y: f64, z: f64) -> u64 {
        let magnitude = (x * x + y * y + z * z).sqrt();
        let smoothed = self.window.push(magnitude);
        let is_peak = self.detector.is_peak(smoothed);

        let now = self.clock.now_ms();
        if now < self.last_step_ms {
            // time went backwards (device reboot), restart the debounce from here
            debug!("Clock moved back from {}ms to {}ms, debounce restarted", self.last_step_ms, now);
            self.last_step_ms = now;
        }

        if is_peak && !self.was_peak {
            if now.saturating_sub(self.last_step_ms) >= self.config.min_step_interval_ms {
                self.step_count += 1;
                self.last_step_ms = now;
            } else {
                trace!("Step edge {}ms after the last step, debounced", now.saturating_sub(self.last_step_ms));
            }
        }
        self.was_peak = is_peak;

        self.step_count
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    #[cfg(test)]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.step_count = 0;
        self.last_step_ms = 0;
        self.window.clear();
        self.detector.reset();
        self.was_peak = false;
    }
}
