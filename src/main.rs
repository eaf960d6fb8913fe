mod calories;
mod config;
mod estimator;
mod logger;
mod mqtt;
mod session;
mod signal;
mod simulator;
mod types;
mod utils;

use crossbeam_channel::bounded;
use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::Notify;

use config::ConfigManager;
use estimator::SystemClock;
use session::{run_session_handler, MetricsService};
use types::{SessionOutcome, SessionTask};

#[tokio::main]
async fn main() {
    dotenv().ok(); // 加载 .env 文件
    logger::init_logger();
    info!("VitalsHub starting");

    let config_manager = match ConfigManager::discover() {
        Ok(manager) => manager,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    match config_manager.config_path() {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file, using defaults"),
    }
    let config = config_manager.get_config().clone();

    let (task_sender, task_receiver) = bounded::<SessionTask>(config.channels.task_channel_capacity);
    let (result_sender, result_receiver) = bounded::<SessionOutcome>(config.channels.result_channel_capacity);
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let transport_stopped = Arc::new(Notify::new());

    let mut handles = Vec::new();

    let service = MetricsService::new(&config, SystemClock);
    let handler_shutdown = Arc::clone(&shutdown_signal);
    handles.push(thread::spawn(move || {
        run_session_handler(service, task_receiver, result_sender, handler_shutdown);
    }));

    let mut mqtt_client = None;
    if config.simulator.enabled {
        let simulator_config = config.simulator.clone();
        let simulator_shutdown = Arc::clone(&shutdown_signal);
        handles.push(thread::spawn(move || {
            simulator::run_simulator(simulator_config, task_sender, simulator_shutdown);
        }));

        let every = (1000 / config.simulator.sample_interval_ms.max(1)).max(1);
        let logger_shutdown = Arc::clone(&shutdown_signal);
        handles.push(thread::spawn(move || {
            simulator::log_outcomes(result_receiver, logger_shutdown, every);
        }));
    } else {
        let (client, connection) = match mqtt::connect(&config.mqtt) {
            Ok(pair) => pair,
            Err(e) => {
                error!("Invalid MQTT settings: {}", e);
                std::process::exit(1);
            }
        };

        let subscriber = client.clone();
        let mqtt_config = config.mqtt.clone();
        let mqtt_shutdown = Arc::clone(&shutdown_signal);
        handles.push(thread::spawn(stop_all_on_exit(
            Arc::clone(&shutdown_signal),
            Arc::clone(&transport_stopped),
            move || {
                if let Err(e) = mqtt::run_mqtt_client(subscriber, connection, &mqtt_config, task_sender, mqtt_shutdown) {
                    error!("MQTT thread failed: {}", e);
                }
            },
        )));

        let publisher = client.clone();
        let publisher_config = config.mqtt.clone();
        let publisher_shutdown = Arc::clone(&shutdown_signal);
        handles.push(thread::spawn(move || {
            if let Err(e) = mqtt::run_metrics_publisher(publisher, &publisher_config, result_receiver, publisher_shutdown) {
                error!("Metrics publisher failed: {}", e);
            }
        }));

        mqtt_client = Some(client);
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested, stopping worker threads");
        }
        _ = transport_stopped.notified() => {
            warn!("MQTT transport stopped, no more readings can arrive, shutting down");
        }
    }
    shutdown_signal.store(true, Ordering::Relaxed);

    if let Some(client) = mqtt_client {
        if let Err(e) = client.disconnect() {
            warn!("MQTT disconnect failed: {}", e);
        }
    }

    let joined = tokio::task::spawn_blocking(move || {
        handles.into_iter().map(|handle| handle.join()).filter(Result::is_err).count()
    })
    .await;

    match joined {
        Ok(0) => info!("All worker threads shut down gracefully"),
        Ok(panicked) => error!("{} worker threads panicked", panicked),
        Err(e) => error!("Failed to join worker threads: {}", e),
    }
}

/// Wrap a worker so that its exit, for whatever reason, shuts the service down.
fn stop_all_on_exit<F>(shutdown_signal: Arc<AtomicBool>, stopped: Arc<Notify>, work: F) -> impl FnOnce() + Send + 'static
where
    F: FnOnce() + Send + 'static,
{
    move || {
        work();
        shutdown_signal.store(true, Ordering::Relaxed);
        stopped.notify_one();
    }
}
