//! Configuration for the proctorwatch agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interval between sampling ticks
    #[serde(with = "duration_millis")]
    pub sample_interval: Duration,

    /// Interval between fallback-mode ticks (face estimation unavailable)
    #[serde(with = "duration_millis")]
    pub fallback_interval: Duration,

    /// Chance per fallback tick of shipping a screenshot
    pub fallback_screenshot_probability: f64,

    /// Chance per sampling tick of a routine audit check
    pub random_check_probability: f64,

    /// Delay before the return capture once the exam surface is visible
    /// again, giving the feed time to resynchronize
    pub return_capture_delay_ms: i64,

    /// Tab switches before each switch is also recorded as serious
    pub tab_switch_serious_after: u32,

    /// Look-down vote thresholds
    pub detection: DetectionConfig,

    /// Counter hysteresis thresholds
    pub debounce: DebounceConfig,

    /// Logging endpoint and retry policy
    pub delivery: DeliveryConfig,

    /// Path for queue and statistics persistence
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proctorwatch");

        Self {
            sample_interval: Duration::from_millis(1500),
            fallback_interval: Duration::from_millis(3000),
            fallback_screenshot_probability: 0.1,
            random_check_probability: 0.01,
            return_capture_delay_ms: 1000,
            tab_switch_serious_after: 3,
            detection: DetectionConfig::default(),
            debounce: DebounceConfig::default(),
            delivery: DeliveryConfig::default(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proctorwatch")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path).map_err(|e| ConfigError::IoError(e.to_string()))
    }
}

/// Thresholds for the look-down composite vote.
///
/// These mirror the tuned values of the deployed heuristic; they are
/// sensitivity knobs, not validated constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Face-center vertical position, as a fraction of frame height, above
    /// which the face counts as sitting low in the frame
    pub position_ratio: f32,
    /// Pixels the nose must sit below the eye line to count as head tilt
    pub nose_drop_px: f32,
    /// Detection confidence below this counts as an odd-pose proxy
    pub min_confidence: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            position_ratio: 0.6,
            nose_drop_px: 8.0,
            min_confidence: 0.9,
        }
    }
}

/// Counter thresholds for the violation debouncer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Consecutive absent frames before a `face_missing` event fires
    pub absence_emit: u32,
    /// Absence counter value that clamps back down to `absence_emit`
    pub absence_clamp: u32,
    /// Cumulative multi-face detections from which each one is also serious
    pub multi_serious_after: u32,
    /// Multi-face counter cap; crossing it floors the counter back down
    pub multi_cap: u32,
    /// Value the multi-face counter floors to after the cap
    pub multi_floor: u32,
    /// Lookdown score from which suspicion events fire
    pub lookdown_emit: f64,
    /// Lookdown score that escalates to a serious violation
    pub lookdown_serious: f64,
    /// Amount the lookdown score decays per normal frame
    pub lookdown_decay: f64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            absence_emit: 2,
            absence_clamp: 5,
            multi_serious_after: 3,
            multi_cap: 10,
            multi_floor: 5,
            lookdown_emit: 2.0,
            lookdown_serious: 4.0,
            lookdown_decay: 0.5,
        }
    }
}

/// Logging endpoint and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Proctoring log endpoint URL
    pub endpoint_url: String,
    /// Bound for the immediate delivery attempt, in seconds
    pub send_timeout_secs: u64,
    /// Bound for each queued retry attempt, in seconds
    pub retry_timeout_secs: u64,
    /// Delay before the first drain after the queue becomes non-empty
    pub initial_drain_delay_secs: u64,
    /// Base drain backoff, in seconds
    pub backoff_base_secs: u64,
    /// Additional backoff per queued entry, in seconds
    pub backoff_step_secs: u64,
    /// Backoff ceiling, in seconds
    pub backoff_max_secs: u64,
    /// Entries kept when persistent storage rejects the queue
    pub max_persisted_entries: usize,
    /// Evidence payloads above this many bytes are truncated before
    /// the event is persisted
    pub max_persisted_evidence_bytes: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://127.0.0.1:5000/student/api/proctoring/log".to_string(),
            send_timeout_secs: 10,
            retry_timeout_secs: 8,
            initial_drain_delay_secs: 5,
            backoff_base_secs: 10,
            backoff_step_secs: 2,
            backoff_max_secs: 30,
            max_persisted_entries: 10,
            max_persisted_evidence_bytes: 1024,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_interval, Duration::from_millis(1500));
        assert_eq!(config.debounce.absence_emit, 2);
        assert_eq!(config.debounce.absence_clamp, 5);
        assert_eq!(config.delivery.backoff_max_secs, 30);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sample_interval, config.sample_interval);
        assert_eq!(parsed.fallback_interval, config.fallback_interval);
        assert_eq!(parsed.delivery.endpoint_url, config.delivery.endpoint_url);
    }

    #[test]
    fn test_detection_defaults_match_deployed_heuristic() {
        let detection = DetectionConfig::default();
        assert!((detection.position_ratio - 0.6).abs() < f32::EPSILON);
        assert!((detection.nose_drop_px - 8.0).abs() < f32::EPSILON);
        assert!((detection.min_confidence - 0.9).abs() < f32::EPSILON);
    }
}
