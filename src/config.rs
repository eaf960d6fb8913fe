//! 应用配置管理模块
//! 集中管理所有配置项，提供默认值和配置验证

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::estimator::heart_rate::{HISTORY_CAPACITY, MAX_BPM, MIN_BPM};
use crate::estimator::steps::MIN_STEP_INTERVAL_MS;
use crate::signal::peak::{PEAK_THRESHOLD, STEP_THRESHOLD};
use crate::signal::smoother::DEFAULT_ALPHA;
use crate::signal::window::WINDOW_SIZE;

/// Environment variable naming the config file to load.
pub const CONFIG_PATH_ENV: &str = "VITALS_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub heart_rate: HeartRateConfig,
    pub steps: StepConfig,
    pub sessions: SessionConfig,
    pub channels: ChannelConfig,
    pub simulator: SimulatorConfig,
}

/// MQTT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    /// Topics are `<prefix>/<session>/reading|reset|end|metrics`.
    pub topic_prefix: String,
    pub qos: u8,
    pub keep_alive: u16,
}

/// Which neighbours the heartbeat peak test compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakMode {
    /// Smoothed sample against the previous smoothed value and the raw sample.
    RawNeighbor,
    /// Previous smoothed sample against the smoothed values on either side.
    DelayedLocalMax,
}

/// 心率估计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartRateConfig {
    pub smoothing_alpha: f64,
    pub peak_threshold: f64,
    pub peak_mode: PeakMode,
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub history_capacity: usize,
}

/// 计步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub threshold: f64,
    pub min_step_interval_ms: u64,
    pub window_size: usize,
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions without samples for this long are dropped.
    pub idle_timeout_seconds: u64,
    pub max_sessions: usize,
    /// Drive estimator time from the payload `timestamp` when one is sent.
    pub use_device_timestamps: bool,
}

/// 通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub task_channel_capacity: usize,
    pub result_channel_capacity: usize,
}

/// 模拟器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub session_id: String,
    pub sample_interval_ms: u64,
    pub heart_rate_bpm: f64,
    pub cadence_hz: f64,
    pub seed: u64,
    pub species: String,
    pub weight_kg: f64,
    pub age_group: String,
    pub sex: String,
    pub speed: f64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "vitalshub_service".to_string(),
            topic_prefix: "vitals".to_string(),
            qos: 1,
            keep_alive: 5,
        }
    }
}

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_ALPHA,
            peak_threshold: PEAK_THRESHOLD,
            peak_mode: PeakMode::DelayedLocalMax,
            min_bpm: MIN_BPM,
            max_bpm: MAX_BPM,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            threshold: STEP_THRESHOLD,
            min_step_interval_ms: MIN_STEP_INTERVAL_MS,
            window_size: WINDOW_SIZE,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: 300,
            max_sessions: 1024,
            use_device_timestamps: true,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            task_channel_capacity: 5000,
            result_channel_capacity: 1000,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            session_id: "simulated-collar".to_string(),
            sample_interval_ms: 20,
            heart_rate_bpm: 90.0,
            cadence_hz: 2.0,
            seed: 7,
            species: "Labrador".to_string(),
            weight_kg: 20.0,
            age_group: "adult (1-7 years)".to_string(),
            sex: "male".to_string(),
            speed: 3.0,
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        config.validate()?;
        Ok(config)
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.heart_rate.smoothing_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::ValidationError("Smoothing alpha must be in (0, 1]".to_string()));
        }

        if self.heart_rate.min_bpm <= 0.0 || self.heart_rate.min_bpm >= self.heart_rate.max_bpm {
            return Err(ConfigError::ValidationError("BPM range must be positive and non-empty".to_string()));
        }

        if self.heart_rate.history_capacity == 0 {
            return Err(ConfigError::ValidationError("BPM history capacity must be positive".to_string()));
        }

        if self.steps.window_size == 0 {
            return Err(ConfigError::ValidationError("Step window size must be positive".to_string()));
        }

        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::ValidationError("Maximum sessions must be positive".to_string()));
        }

        if self.channels.task_channel_capacity == 0 || self.channels.result_channel_capacity == 0 {
            return Err(ConfigError::ValidationError("Channel capacities must be positive".to_string()));
        }

        if self.mqtt.qos > 2 {
            return Err(ConfigError::ValidationError("MQTT QoS must be 0, 1 or 2".to_string()));
        }

        if self.mqtt.topic_prefix.is_empty() || self.mqtt.topic_prefix.contains(|c: char| c == '+' || c == '#') {
            return Err(ConfigError::ValidationError("MQTT topic prefix must be a plain topic".to_string()));
        }

        if self.simulator.enabled && (self.simulator.sample_interval_ms == 0 || self.simulator.heart_rate_bpm <= 0.0) {
            return Err(ConfigError::ValidationError("Simulator needs a positive sample interval and heart rate".to_string()));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Load `$VITALS_CONFIG`, else `config.toml` when it exists, else defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::load_from_file(path);
        }
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::load_from_file(DEFAULT_CONFIG_FILE);
        }
        Ok(Self::new())
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_tuned_constants() {
        let config = AppConfig::default();
        assert_eq!(config.heart_rate.smoothing_alpha, 0.2);
        assert_eq!(config.heart_rate.peak_threshold, 50.0);
        assert_eq!(config.heart_rate.min_bpm, 40.0);
        assert_eq!(config.heart_rate.max_bpm, 220.0);
        assert_eq!(config.heart_rate.history_capacity, 100);
        assert_eq!(config.steps.threshold, 1.2);
        assert_eq!(config.steps.min_step_interval_ms, 250);
        assert_eq!(config.steps.window_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [mqtt]
            broker = "broker.local"

            [heart_rate]
            peak_mode = "raw_neighbor"
            "#,
        )
        .unwrap();
        assert_eq!(config.mqtt.broker, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.heart_rate.peak_mode, PeakMode::RawNeighbor);
        assert_eq!(config.heart_rate.history_capacity, 100);
        assert_eq!(config.steps.window_size, 10);
    }

    #[test]
    fn rejects_bad_alpha() {
        let mut config = AppConfig::default();
        config.heart_rate.smoothing_alpha = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
        config.heart_rate.smoothing_alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_bpm_range() {
        let mut config = AppConfig::default();
        config.heart_rate.min_bpm = 220.0;
        config.heart_rate.max_bpm = 40.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_wildcard_topic_prefix() {
        let mut config = AppConfig::default();
        config.mqtt.topic_prefix = "vitals/#".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn written_config_loads_back() {
        let path = std::env::temp_dir().join(format!("vitalshub-config-{}.toml", std::process::id()));
        let mut config = AppConfig::default();
        config.sessions.idle_timeout_seconds = 42;
        config.heart_rate.peak_mode = PeakMode::RawNeighbor;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let manager = ConfigManager::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(manager.get_config().sessions.idle_timeout_seconds, 42);
        assert_eq!(manager.get_config().heart_rate.peak_mode, PeakMode::RawNeighbor);
        assert_eq!(manager.config_path(), Some(path.as_path()));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = AppConfig::load_from_file("/nonexistent/vitalshub.toml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
