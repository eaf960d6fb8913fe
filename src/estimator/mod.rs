pub mod clock;
pub mod heart_rate;
pub mod steps;

pub use clock::{Clock, ManualClock, SystemClock};
pub use heart_rate::HeartRateEstimator;
pub use steps::StepEstimator;
