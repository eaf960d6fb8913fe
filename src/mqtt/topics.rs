//! Topic layout: `<prefix>/<session>/reading|reset|end` in, `<prefix>/<session>/metrics` out.

use crate::types::{SensorReading, SessionTask};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("JSON parsing error: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Unexpected topic: {0}")]
    UnknownTopic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Reading,
    Reset,
    End,
}

impl TopicKind {
    fn suffix(self) -> &'static str {
        match self {
            TopicKind::Reading => "reading",
            TopicKind::Reset => "reset",
            TopicKind::End => "end",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "reading" => Some(TopicKind::Reading),
            "reset" => Some(TopicKind::Reset),
            "end" => Some(TopicKind::End),
            _ => None,
        }
    }
}

/// Wildcard filters the service subscribes to.
pub fn subscription_filters(prefix: &str) -> Vec<String> {
    [TopicKind::Reading, TopicKind::Reset, TopicKind::End]
        .iter()
        .map(|kind| format!("{}/+/{}", prefix, kind.suffix()))
        .collect()
}

pub fn metrics_topic(prefix: &str, session_id: &str) -> String {
    format!("{}/{}/metrics", prefix, session_id)
}

pub fn status_topic(prefix: &str) -> String {
    format!("{}/status", prefix)
}

/// Split an incoming topic into its session id and kind.
pub fn parse_topic<'a>(prefix: &str, topic: &'a str) -> Result<(&'a str, TopicKind), TransportError> {
    let unknown = || TransportError::UnknownTopic(topic.to_string());

    let rest = topic
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(unknown)?;
    let (session_id, suffix) = rest.split_once('/').ok_or_else(unknown)?;
    if session_id.is_empty() || suffix.contains('/') {
        return Err(unknown());
    }
    let kind = TopicKind::from_suffix(suffix).ok_or_else(unknown)?;
    Ok((session_id, kind))
}

pub fn parse_sensor_reading(payload: &[u8]) -> Result<SensorReading, TransportError> {
    let payload_str = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str::<SensorReading>(payload_str)?)
}

/// Turn one publish into a session task.
pub fn decode_publish(prefix: &str, topic: &str, payload: &[u8]) -> Result<SessionTask, TransportError> {
    let (session_id, kind) = parse_topic(prefix, topic)?;
    let session_id = session_id.to_string();
    Ok(match kind {
        TopicKind::Reading => SessionTask::Sample {
            session_id,
            reading: parse_sensor_reading(payload)?,
        },
        TopicKind::Reset => SessionTask::Reset { session_id },
        TopicKind::End => SessionTask::End { session_id },
    })
}
