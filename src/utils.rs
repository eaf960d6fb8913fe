use chrono::{DateTime, Utc};

/// 将毫秒时间戳格式化为标准时间格式 HH:MM:SS.mmm (UTC)
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(time) => time.format("%H:%M:%S%.3f").to_string(),
        None => format!("Invalid timestamp: {}", timestamp_ms),
    }
}
