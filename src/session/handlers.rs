use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use super::service::MetricsService;
use crate::estimator::Clock;
use crate::types::{SessionOutcome, SessionTask};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);
const EVICTION_INTERVAL: Duration = Duration::from_secs(1);

/// Session worker loop. This thread is the only owner of the estimators, so
/// every session sees its samples one at a time in channel order.
///
/// Returns the number of tasks processed.
pub fn run_session_handler<C: Clock>(
    mut service: MetricsService<C>,
    task_receiver: Receiver<SessionTask>,
    result_sender: Sender<SessionOutcome>,
    shutdown_signal: Arc<AtomicBool>,
) -> u64 {
    info!("Session handler thread started");

    let mut processed = 0u64;
    let mut last_eviction = Instant::now();

    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(RECV_TIMEOUT) {
            Ok(task) => {
                processed += 1;
                match task {
                    SessionTask::Sample { session_id, reading } => {
                        let metrics = service.handle_sample(&session_id, &reading);
                        if !send_outcome(&result_sender, SessionOutcome::new(session_id, metrics)) {
                            info!("Session handler: Result channel disconnected, exiting");
                            break;
                        }
                    }
                    SessionTask::Reset { session_id } => {
                        if !service.reset_session(&session_id) {
                            warn!("Session handler: Reset for unknown session {}", session_id);
                        }
                    }
                    SessionTask::End { session_id } => {
                        if !service.end_session(&session_id) {
                            debug!("Session handler: End for unknown session {}", session_id);
                        }
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                // 通道断开，退出循环
                info!("Session handler: Task channel disconnected, exiting");
                break;
            }
        }

        if last_eviction.elapsed() >= EVICTION_INTERVAL {
            service.evict_idle();
            last_eviction = Instant::now();
        }
    }

    info!("Session handler thread exiting after {} tasks, {} sessions open", processed, service.session_count());
    processed
}

/// Returns false once nobody is listening for results any more.
fn send_outcome(result_sender: &Sender<SessionOutcome>, outcome: SessionOutcome) -> bool {
    match result_sender.try_send(outcome) {
        Ok(()) => true,
        Err(crossbeam_channel::TrySendError::Full(outcome)) => {
            warn!("Session handler: Result channel is full, dropping metrics for {}", outcome.session_id);
            true
        }
        Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
    }
}
