pub mod smoother;
pub mod window;
pub mod peak;

pub use smoother::SignalSmoother;
pub use window::SlidingWindowAverager;
pub use peak::{is_heartbeat_peak, RisingEdgeDetector};
