pub mod reading;
pub mod results;
pub mod tasks;

pub use reading::SensorReading;
pub use results::{MetricsResponse, SessionOutcome};
pub use tasks::SessionTask;
