/// Default smoothing factor for the infrared pulse stream.
pub const DEFAULT_ALPHA: f64 = 0.2;

/// Exponential moving average over a scalar stream.
///
/// The internal value starts at 0, so the first few outputs are biased
/// towards zero until the filter catches up with the real signal level.
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    alpha: f64,
    last_smoothed: f64,
}

impl SignalSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            last_smoothed: 0.0,
        }
    }

    /// Feed one raw sample and return the updated smoothed value.
    pub fn smooth(&mut self, raw: f64) -> f64 {
        let smoothed = self.last_smoothed + self.alpha * (raw - self.last_smoothed);
        self.last_smoothed = smoothed;
        smoothed
    }

    /// Last smoothed value, without feeding a sample.
    pub fn value(&self) -> f64 {
        self.last_smoothed
    }

    pub fn reset(&mut self) {
        self.last_smoothed = 0.0;
    }
}

impl Default for SignalSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_pulled_from_zero() {
        let mut smoother = SignalSmoother::default();
        // 0 + 0.2 * (100 - 0)
        assert!((smoother.smooth(100.0) - 20.0).abs() < 1e-9);
        // 20 + 0.2 * (100 - 20)
        assert!((smoother.smooth(100.0) - 36.0).abs() < 1e-9);
    }

    #[test]
    fn output_stays_within_input_range() {
        let mut smoother = SignalSmoother::default();
        smoother.smooth(10.0);
        let inputs = [10.0, 40.0, 25.0, 12.0, 39.0, 40.0, 10.0];
        let mut last = smoother.value();
        for raw in inputs {
            last = smoother.smooth(raw);
            assert!(last >= 0.0 && last <= 40.0);
        }
        assert_eq!(last, smoother.value());
    }

    #[test]
    fn converges_on_constant_input() {
        let mut smoother = SignalSmoother::new(0.5);
        for _ in 0..60 {
            smoother.smooth(7.0);
        }
        assert!((smoother.value() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn reset_returns_to_cold_start() {
        let mut smoother = SignalSmoother::default();
        smoother.smooth(500.0);
        smoother.reset();
        assert_eq!(smoother.value(), 0.0);
        assert!((smoother.smooth(50.0) - 10.0).abs() < 1e-9);
    }
}
