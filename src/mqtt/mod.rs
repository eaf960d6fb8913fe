pub mod client;
pub mod topics;

pub use client::{connect, run_metrics_publisher, run_mqtt_client};
