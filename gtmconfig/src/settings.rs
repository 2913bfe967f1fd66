//! String-keyed settings store
//!
//! User settings live under the `settings` mapping of `config.yaml` and are
//! read and written by key. [`AudioSettings`] is the typed view consumed when
//! an ambient audio handle is initialized.

use crate::Config;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

const SETTINGS_ROOT: &str = "settings";

/// Playback settings shared by the preview player and the ambient stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Start ambient audio muted
    pub default_muted: bool,
    /// Linear volume in `[0, 1]`
    pub volume: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            default_muted: false,
            volume: 1.0,
        }
    }
}

impl AudioSettings {
    /// Volume to apply to a freshly installed ambient handle
    pub fn effective_volume(&self) -> f64 {
        if self.default_muted {
            0.0
        } else {
            self.volume.clamp(0.0, 1.0)
        }
    }
}

impl Config {
    /// Reads a setting, returning `default` when the key is absent
    pub fn get_setting(&self, key: &str, default: Value) -> Value {
        let value = self.get_value(&[SETTINGS_ROOT, key]).unwrap_or(default);
        debug!(key, ?value, "Getting setting");
        value
    }

    /// Writes a setting and persists the configuration
    pub fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        debug!(key, ?value, "Setting value");
        self.set_value(&[SETTINGS_ROOT, key], value)
    }

    /// Typed view over the audio-related settings
    pub fn get_audio_settings(&self) -> AudioSettings {
        let defaults = AudioSettings::default();
        let default_muted = match self.get_setting("default_muted", Value::Bool(defaults.default_muted)) {
            Value::Bool(b) => b,
            _ => defaults.default_muted,
        };
        let volume = match self.get_setting("volume", Value::Null) {
            Value::Number(n) => n.as_f64().unwrap_or(defaults.volume),
            _ => defaults.volume,
        };
        AudioSettings {
            default_muted,
            volume,
        }
    }

    pub fn set_audio_settings(&self, settings: AudioSettings) -> Result<()> {
        self.set_setting("default_muted", Value::Bool(settings.default_muted))?;
        self.set_setting("volume", Value::Number(settings.volume.into()))
    }
}
