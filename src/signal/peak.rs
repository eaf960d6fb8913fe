//! Local-maximum tests shared by the two estimators.

/// Smoothed infrared amplitude a heartbeat peak has to exceed.
pub const PEAK_THRESHOLD: f64 = 50.0;

/// Smoothed acceleration magnitude (in g) a step peak has to exceed.
pub const STEP_THRESHOLD: f64 = 1.2;

/// `current` is a heartbeat peak when it rises above both neighbours and the threshold.
pub fn is_heartbeat_peak(current: f64, previous: f64, next: f64, threshold: f64) -> bool {
    current > previous && current > next && current > threshold
}

/// Rising-edge peak test over a magnitude stream.
///
/// Reports `true` only while the signal is above the threshold and still climbing.
#[derive(Debug, Clone)]
pub struct RisingEdgeDetector {
    threshold: f64,
    last_magnitude: f64,
}

impl RisingEdgeDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_magnitude: 0.0,
        }
    }

    /// Test `current` and remember it as the reference for the next call.
    pub fn is_peak(&mut self, current: f64) -> bool {
        let peak = current > self.threshold && current > self.last_magnitude;
        self.last_magnitude = current;
        peak
    }

    #[cfg(test)]
    pub fn last_magnitude(&self) -> f64 {
        self.last_magnitude
    }

    pub fn reset(&mut self) {
        self.last_magnitude = 0.0;
    }
}

impl Default for RisingEdgeDetector {
    fn default() -> Self {
        Self::new(STEP_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_peak_needs_both_neighbours_lower() {
        assert!(is_heartbeat_peak(80.0, 70.0, 75.0, PEAK_THRESHOLD));
        assert!(!is_heartbeat_peak(80.0, 85.0, 75.0, PEAK_THRESHOLD));
        assert!(!is_heartbeat_peak(80.0, 70.0, 80.0, PEAK_THRESHOLD));
    }

    #[test]
    fn heartbeat_peak_below_threshold_is_ignored() {
        assert!(!is_heartbeat_peak(40.0, 10.0, 20.0, PEAK_THRESHOLD));
        assert!(!is_heartbeat_peak(50.0, 10.0, 20.0, PEAK_THRESHOLD));
    }

    #[test]
    fn rising_edge_only_while_climbing() {
        let mut detector = RisingEdgeDetector::default();
        assert!(!detector.is_peak(1.0));
        assert!(detector.is_peak(1.3));
        assert!(detector.is_peak(1.5));
        // plateau above threshold is not a peak
        assert!(!detector.is_peak(1.5));
        assert!(!detector.is_peak(1.4));
        assert_eq!(detector.last_magnitude(), 1.4);
    }

    #[test]
    fn reference_updates_even_without_peak() {
        let mut detector = RisingEdgeDetector::new(1.2);
        detector.is_peak(3.0);
        assert!(!detector.is_peak(2.0));
        assert!(detector.is_peak(2.5));
    }

    #[test]
    fn reset_forgets_last_magnitude() {
        let mut detector = RisingEdgeDetector::default();
        detector.is_peak(2.0);
        detector.reset();
        assert_eq!(detector.last_magnitude(), 0.0);
        assert!(detector.is_peak(2.0));
    }
}
