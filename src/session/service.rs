//! Per-session estimator registry.
//!
//! Detection only works when every sample of a session reaches the same
//! estimator pair in arrival order, so sessions are kept alive across
//! readings until they are ended, evicted as idle, or displaced when the
//! registry is full.

use std::collections::HashMap;

use log::{debug, info};

use crate::calories::{estimate_calories, CalorieProfile};
use crate::config::{AppConfig, HeartRateConfig, SessionConfig, StepConfig};
use crate::estimator::{Clock, HeartRateEstimator, ManualClock, StepEstimator, SystemClock};
use crate::types::{MetricsResponse, SensorReading};
use crate::utils::format_timestamp;

/// Estimator state owned by one session.
#[derive(Debug)]
pub struct SessionEstimators {
    // shared with both estimators, moved to each sample's time
    clock: ManualClock,
    // fixed for the life of the session so the timeline never switches source
    device_time: bool,
    heart_rate: HeartRateEstimator<ManualClock>,
    steps: StepEstimator<ManualClock>,
    last_seen_ms: u64,
    samples: u64,
}

impl SessionEstimators {
    fn new(heart_rate: &HeartRateConfig, steps: &StepConfig, device_time: bool, started_ms: u64, seen_ms: u64) -> Self {
        let clock = ManualClock::new(started_ms);
        Self {
            heart_rate: HeartRateEstimator::new(heart_rate, clock.clone()),
            steps: StepEstimator::new(steps, clock.clone()),
            clock,
            device_time,
            last_seen_ms: seen_ms,
            samples: 0,
        }
    }

    /// Device sessions follow the reading's timestamp and hold their last
    /// time when one is missing; wall-clock sessions ignore timestamps.
    fn sample_time(&self, reading: &SensorReading, now: u64) -> u64 {
        if !self.device_time {
            return now;
        }
        match device_timestamp(reading) {
            Some(timestamp) => timestamp,
            None => self.clock.now_ms(),
        }
    }

    pub fn bpm(&self) -> u32 {
        self.heart_rate.bpm()
    }

    pub fn step_count(&self) -> u64 {
        self.steps.step_count()
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    fn reset(&mut self) {
        self.heart_rate.reset();
        self.steps.reset();
        self.samples = 0;
    }
}

fn device_timestamp(reading: &SensorReading) -> Option<u64> {
    reading.timestamp.and_then(|timestamp| u64::try_from(timestamp).ok())
}

/// Routes readings to their session's estimators and builds the response.
pub struct MetricsService<C: Clock = SystemClock> {
    heart_rate: HeartRateConfig,
    steps: StepConfig,
    sessions_config: SessionConfig,
    clock: C,
    sessions: HashMap<String, SessionEstimators>,
}

impl<C: Clock> MetricsService<C> {
    pub fn new(config: &AppConfig, clock: C) -> Self {
        Self {
            heart_rate: config.heart_rate.clone(),
            steps: config.steps.clone(),
            sessions_config: config.sessions.clone(),
            clock,
            sessions: HashMap::new(),
        }
    }

    /// Process one reading for `session_id`, creating the session on first use.
    pub fn handle_sample(&mut self, session_id: &str, reading: &SensorReading) -> MetricsResponse {
        let now = self.clock.now_ms();

        if !self.sessions.contains_key(session_id) {
            self.make_room();
        }

        let heart_rate = &self.heart_rate;
        let steps = &self.steps;
        let use_device_timestamps = self.sessions_config.use_device_timestamps;
        let session = self.sessions.entry(session_id.to_string()).or_insert_with(|| {
            match device_timestamp(reading).filter(|_| use_device_timestamps) {
                Some(started_ms) => {
                    info!("Session {} started at device time {}ms", session_id, started_ms);
                    SessionEstimators::new(heart_rate, steps, true, started_ms, now)
                }
                None => {
                    info!("Session {} started at {}", session_id, format_timestamp(now as i64));
                    SessionEstimators::new(heart_rate, steps, false, now, now)
                }
            }
        });

        let sample_ms = session.sample_time(reading, now);
        session.clock.set(sample_ms);
        let bpm = session.heart_rate.update(reading.infrared_value);
        let step_count = session.steps.update(reading.x, reading.y, reading.z);
        session.last_seen_ms = now;
        session.samples += 1;

        let calories = estimate_calories(&CalorieProfile::from(reading));
        MetricsResponse::new(bpm, calories, step_count)
    }

    // 会话数达到上限时移除最久未活动的会话
    fn make_room(&mut self) {
        while self.sessions.len() >= self.sessions_config.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|(_, session)| session.last_seen_ms)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    self.sessions.remove(&id);
                    info!("Session limit {} reached, dropped least recent session {}", self.sessions_config.max_sessions, id);
                }
                None => break,
            }
        }
    }

    /// Reset both estimators of a session. Returns false for unknown sessions.
    pub fn reset_session(&mut self, session_id: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.reset();
                info!("Session {} reset", session_id);
                true
            }
            None => false,
        }
    }

    /// Dispose of a session. Returns false for unknown sessions.
    pub fn end_session(&mut self, session_id: &str) -> bool {
        match self.sessions.remove(session_id) {
            Some(session) => {
                info!(
                    "Session {} ended after {} samples ({} bpm over {} intervals, {} steps)",
                    session_id,
                    session.samples(),
                    session.bpm(),
                    session.heart_rate.history_len(),
                    session.step_count()
                );
                true
            }
            None => false,
        }
    }

    /// Drop sessions that have not seen a sample within the idle timeout.
    pub fn evict_idle(&mut self) -> usize {
        let now = self.clock.now_ms();
        let timeout_ms = self.sessions_config.idle_timeout_seconds.saturating_mul(1000);
        let before = self.sessions.len();
        self.sessions.retain(|id, session| {
            let idle = now.saturating_sub(session.last_seen_ms) > timeout_ms;
            if idle {
                debug!("Session {} idle for {}ms, evicting", id, now.saturating_sub(session.last_seen_ms));
            }
            !idle
        });
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle sessions, {} remaining", evicted, self.sessions.len());
        }
        evicted
    }

    #[cfg(test)]
    pub fn session(&self, session_id: &str) -> Option<&SessionEstimators> {
        self.sessions.get(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
