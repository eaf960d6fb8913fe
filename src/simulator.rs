//! Synthetic collar for running the service without hardware.
//!
//! Produces a pulse-sensor spike train at a fixed heart rate over a noisy
//! baseline, and short vertical acceleration bursts at a fixed cadence on
//! top of 1 g of gravity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulatorConfig;
use crate::types::{SensorReading, SessionOutcome, SessionTask};

const IR_BASELINE: f64 = 20.0;
const IR_NOISE: f64 = 3.0;
const IR_PULSE: f64 = 1000.0;
const ACCEL_NOISE: f64 = 0.02;
const STEP_ACCEL_G: f64 = 2.0;
const STEP_BURST_MS: u64 = 100;

pub struct SyntheticWearable {
    config: SimulatorConfig,
    rng: StdRng,
    now_ms: u64,
    beat_period_ms: f64,
    next_beat_ms: f64,
    step_period_ms: Option<f64>,
    next_step_ms: f64,
    burst_until_ms: u64,
}

impl SyntheticWearable {
    pub fn new(config: &SimulatorConfig) -> Self {
        let beat_period_ms = 60_000.0 / config.heart_rate_bpm.max(1.0);
        let step_period_ms = (config.cadence_hz > 0.0).then(|| 1000.0 / config.cadence_hz);
        Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed),
            now_ms: 0,
            beat_period_ms,
            next_beat_ms: beat_period_ms / 2.0,
            step_period_ms,
            next_step_ms: step_period_ms.unwrap_or(f64::INFINITY),
            burst_until_ms: 0,
        }
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        self.rng.random_range(-amplitude..amplitude)
    }

    fn next_reading(&mut self) -> SensorReading {
        let t = self.now_ms;

        let pulse = if t as f64 >= self.next_beat_ms {
            self.next_beat_ms += self.beat_period_ms;
            IR_PULSE
        } else {
            IR_BASELINE
        };
        let infrared_value = pulse + self.noise(IR_NOISE);

        if let Some(period) = self.step_period_ms {
            if t as f64 >= self.next_step_ms {
                self.next_step_ms += period;
                self.burst_until_ms = t + STEP_BURST_MS;
            }
        }
        let vertical = if t < self.burst_until_ms { STEP_ACCEL_G } else { 1.0 };
        let x = self.noise(ACCEL_NOISE);
        let y = self.noise(ACCEL_NOISE);
        let z = vertical + self.noise(ACCEL_NOISE);

        self.now_ms += self.config.sample_interval_ms.max(1);

        SensorReading::new(infrared_value, x, y, z)
            .with_timestamp(t as i64)
            .with_profile(
                &self.config.species,
                self.config.weight_kg,
                &self.config.age_group,
                &self.config.sex,
                self.config.speed,
            )
    }
}

impl Iterator for SyntheticWearable {
    type Item = SensorReading;

    fn next(&mut self) -> Option<SensorReading> {
        Some(self.next_reading())
    }
}

/// Feed simulated readings to the session handler in real time.
pub fn run_simulator(config: SimulatorConfig, task_sender: Sender<SessionTask>, shutdown_signal: Arc<AtomicBool>) {
    info!(
        "Simulating collar {} at {:.0} bpm, {:.1} steps/s",
        config.session_id, config.heart_rate_bpm, config.cadence_hz
    );
    let interval = Duration::from_millis(config.sample_interval_ms.max(1));

    for reading in SyntheticWearable::new(&config) {
        if shutdown_signal.load(Ordering::Relaxed) {
            break;
        }
        let task = SessionTask::Sample {
            session_id: config.session_id.clone(),
            reading,
        };
        if task_sender.send(task).is_err() {
            info!("Session task channel disconnected, simulator exiting");
            break;
        }
        thread::sleep(interval);
    }

    if task_sender
        .send(SessionTask::End { session_id: config.session_id.clone() })
        .is_err()
    {
        info!("Simulator could not end session {}", config.session_id);
    }
}

/// Log simulated metrics about once a second instead of publishing them.
pub fn log_outcomes(result_receiver: Receiver<SessionOutcome>, shutdown_signal: Arc<AtomicBool>, every: u64) {
    let mut received = 0u64;
    while !shutdown_signal.load(Ordering::Relaxed) {
        match result_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(outcome) => {
                received += 1;
                if received % every.max(1) == 0 {
                    info!(
                        "{}: {} bpm, {} steps, {:.1} kcal/day",
                        outcome.session_id, outcome.metrics.bpm, outcome.metrics.steps, outcome.metrics.calories_burnt
                    );
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }
}
