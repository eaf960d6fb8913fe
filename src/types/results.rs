use serde::{Deserialize, Serialize};

/// Metrics returned for every processed reading.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub bpm: u32,
    pub calories_burnt: f64,
    pub steps: u64,
}

impl MetricsResponse {
    pub fn new(bpm: u32, calories_burnt: f64, steps: u64) -> Self {
        Self {
            bpm,
            calories_burnt,
            steps,
        }
    }
}

/// Result of one session task, routed back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub session_id: String,
    pub metrics: MetricsResponse,
}

impl SessionOutcome {
    pub fn new(session_id: String, metrics: MetricsResponse) -> Self {
        Self { session_id, metrics }
    }
}
