use std::collections::VecDeque;

/// Default number of magnitude samples averaged by the step estimator.
pub const WINDOW_SIZE: usize = 10;

/// Simple moving average over the most recent `capacity` samples.
///
/// Until the buffer fills up, the average covers every sample seen so far.
#[derive(Debug, Clone)]
pub struct SlidingWindowAverager {
    buffer: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindowAverager {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one once full, and return the mean.
    pub fn push(&mut self, value: f64) -> f64 {
        self.buffer.push_back(value);
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            return 0.0;
        }
        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for SlidingWindowAverager {
    fn default() -> Self {
        Self::new(WINDOW_SIZE)
    }
}
