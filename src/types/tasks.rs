use super::SensorReading;

/// Work items consumed by the session handler thread.
#[derive(Clone, Debug)]
pub enum SessionTask {
    Sample {
        session_id: String,
        reading: SensorReading,
    },
    Reset {
        session_id: String,
    },
    End {
        session_id: String,
    },
}

impl SessionTask {
    pub fn session_id(&self) -> &str {
        match self {
            SessionTask::Sample { session_id, .. }
            | SessionTask::Reset { session_id }
            | SessionTask::End { session_id } => session_id,
        }
    }
}
