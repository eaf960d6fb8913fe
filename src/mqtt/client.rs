use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, Packet, QoS};

use super::topics::{decode_publish, metrics_topic, status_topic, subscription_filters};
use crate::config::MqttConfig;
use crate::types::{SessionOutcome, SessionTask};

const REQUEST_CHANNEL_CAPACITY: usize = 100;

pub fn to_qos(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// Build the broker connection. `MQTT_HOST`/`MQTT_PORT` override the config,
/// `MQTT_USER`/`MQTT_PASS` supply credentials when set.
pub fn connect(config: &MqttConfig) -> Result<(Client, Connection), Box<dyn std::error::Error>> {
    let mqtt_host = env::var("MQTT_HOST").unwrap_or_else(|_| config.broker.clone());
    let mqtt_port = match env::var("MQTT_PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => config.port,
    };

    let mut mqtt_options = MqttOptions::new(config.client_id.clone(), mqtt_host.clone(), mqtt_port);

    if let (Ok(mqtt_user), Ok(mqtt_pass)) = (env::var("MQTT_USER"), env::var("MQTT_PASS")) {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    mqtt_options
        .set_keep_alive(Duration::from_secs(config.keep_alive.max(1) as u64))
        .set_last_will(LastWill::new(
            status_topic(&config.topic_prefix),
            "offline",
            QoS::AtLeastOnce,
            true,
        ));

    info!("Connecting to MQTT broker {}:{} as {}", mqtt_host, mqtt_port, config.client_id);
    Ok(Client::new(mqtt_options, REQUEST_CHANNEL_CAPACITY))
}

/// Subscribe and forward every inbound publish to the session handler.
pub fn run_mqtt_client(
    client: Client,
    mut connection: Connection,
    config: &MqttConfig,
    task_sender: Sender<SessionTask>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let qos = to_qos(config.qos);
    for filter in subscription_filters(&config.topic_prefix) {
        client.subscribe(filter.as_str(), qos)?;
        info!("Subscribed to {}", filter);
    }
    client.publish(status_topic(&config.topic_prefix), QoS::AtLeastOnce, true, "online")?;

    for event in connection.iter() {
        // 检查关闭信号
        if shutdown_signal.load(Ordering::Relaxed) {
            info!("MQTT thread received shutdown signal, exiting gracefully");
            break;
        }

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match decode_publish(&config.topic_prefix, &publish.topic, &publish.payload) {
                    Ok(task) => {
                        debug!("Forwarding message on {} to session {}", publish.topic, task.session_id());
                        if task_sender.send(task).is_err() {
                            info!("Session task channel disconnected, MQTT thread exiting");
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping message on {}: {}", publish.topic, e),
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("MQTT connection established"),
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

/// Publish each session outcome on the session's metrics topic.
pub fn run_metrics_publisher(
    client: Client,
    config: &MqttConfig,
    result_receiver: Receiver<SessionOutcome>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let qos = to_qos(config.qos);

    while !shutdown_signal.load(Ordering::Relaxed) {
        match result_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(outcome) => {
                let payload = serde_json::to_vec(&outcome.metrics)?;
                let topic = metrics_topic(&config.topic_prefix, &outcome.session_id);
                debug!("Publishing {} bytes to {}", payload.len(), topic);
                if let Err(e) = client.publish(topic, qos, false, payload) {
                    warn!("Failed to publish metrics for {}: {}", outcome.session_id, e);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                info!("Metrics channel disconnected, publisher exiting");
                break;
            }
        }
    }

    Ok(())
}
