use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_API_BASE_URL: &str = "ENGIE_API_BASE_URL";
pub const ENV_GROK_API_KEY: &str = "ENGIE_GROK_API_KEY";

/// Top-level engine configuration. Every section falls back to its defaults,
/// so an empty file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngieConfig {
    /// Selector of the editable region that suggestion scans read from.
    pub target_selector: String,
    pub api: ApiConfig,
    pub timing: TimingConfig,
    pub thresholds: ThresholdConfig,
    pub position: PositionConfig,
    /// Credential gating heightened mode. Absent means the mode refuses to start.
    pub grok_api_key: Option<String>,
}

impl Default for EngieConfig {
    fn default() -> Self {
        Self {
            target_selector: "#editor".to_string(),
            api: ApiConfig::default(),
            timing: TimingConfig::default(),
            thresholds: ThresholdConfig::default(),
            position: PositionConfig::default(),
            grok_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub suggestions_path: String,
    pub tone_path: String,
    pub chat_path: String,
    pub encouragement_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 15_000,
            suggestions_path: "/api/suggestions".to_string(),
            tone_path: "/api/tone".to_string(),
            chat_path: "/api/chat".to_string(),
            encouragement_path: "/api/encouragement".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub debounce_ms: u64,
    pub inactivity_secs: u64,
    pub grok_duration_secs: u64,
    pub idea_cue_ms: u64,
    pub position_tick_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1_000,
            inactivity_secs: 30,
            grok_duration_secs: 600,
            idea_cue_ms: 2_500,
            position_tick_ms: 50,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn inactivity(&self) -> Duration {
        Duration::from_secs(self.inactivity_secs)
    }

    pub fn grok_duration(&self) -> Duration {
        Duration::from_secs(self.grok_duration_secs)
    }

    pub fn idea_cue(&self) -> Duration {
        Duration::from_millis(self.idea_cue_ms)
    }

    pub fn position_tick(&self) -> Duration {
        Duration::from_millis(self.position_tick_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Target-region text shorter than this (in chars, trimmed) is not scanned.
    pub min_scan_chars: usize,
    /// Page text shorter than this aborts ideation.
    pub min_ideation_chars: usize,
    pub max_idea_notifications: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_scan_chars: 10,
            min_ideation_chars: 20,
            max_idea_notifications: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Fraction of the remaining distance covered per stepper tick.
    pub step_fraction: f32,
    pub epsilon: f32,
    pub companion_size: f32,
    pub margin: f32,
    pub max_ticks: u32,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            step_fraction: 0.2,
            epsilon: 1.0,
            companion_size: 80.0,
            margin: 16.0,
            max_ticks: 200,
        }
    }
}

impl EngieConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Environment wins over file values.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
        if let Ok(key) = std::env::var(ENV_GROK_API_KEY) {
            if !key.trim().is_empty() {
                self.grok_api_key = Some(key.trim().to_string());
            }
        }
        self
    }

    pub fn has_grok_credentials(&self) -> bool {
        self.grok_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}
