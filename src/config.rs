use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::ConfigError;
use crate::model::Direction;

// ─── Persisted settings ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    Google,
    DeepL,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub provider: TranslationProvider,
    pub deepl_api_key: String,
    pub received_input: String,
    pub received_output: String,
    pub sent_input: String,
    pub sent_output: String,
    /// Translate outgoing drafts before they are sent.
    pub auto_translate: bool,
    pub show_auto_translate_tooltip: bool,
    pub show_chat_bar_button: bool,
    /// How many recent messages to translate when entering a channel.
    pub amount_to_auto_translate: usize,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::Google,
            deepl_api_key: String::new(),
            received_input: "auto".into(),
            received_output: "en".into(),
            sent_input: "auto".into(),
            sent_output: "en".into(),
            auto_translate: false,
            show_auto_translate_tooltip: true,
            show_chat_bar_button: true,
            amount_to_auto_translate: 5,
            request_timeout_secs: 30,
            log_level: "info".into(),
        }
    }
}

/// Settings shared between the pipeline and the UI callbacks.
pub type SharedSettings = Arc<RwLock<Settings>>;

pub fn shared(settings: Settings) -> SharedSettings {
    Arc::new(RwLock::new(settings))
}

/// Snapshot of the shared settings. A poisoned lock still holds usable data.
pub fn snapshot(settings: &SharedSettings) -> Settings {
    match settings.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub fn config_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_dir().join("config.toml"))
    }

    /// A missing file is created with defaults. A file that cannot be read or
    /// parsed is left untouched and reported.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let settings = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file found, creating default settings");
                let settings = Self::default();
                settings.save_to(path);
                Ok(settings)
            }
            Err(e) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    pub fn save_to(&self, path: &Path) {
        match toml::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = std::fs::write(path, content) {
                    error!("Failed to save settings: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize settings: {}", e),
        }
    }

    /// Write back only if something changed since `loaded`. True when written.
    pub fn save_if_changed(&self, loaded: &Settings) -> bool {
        self.save_if_changed_to(loaded, &config_dir().join("config.toml"))
    }

    pub fn save_if_changed_to(&self, loaded: &Settings, path: &Path) -> bool {
        if self == loaded {
            return false;
        }
        self.save_to(path);
        true
    }

    /// (input, output) language codes for a direction. Empty input means
    /// auto-detect.
    pub fn languages(&self, direction: Direction) -> (&str, &str) {
        match direction {
            Direction::Sent => (self.sent_input.as_str(), self.sent_output.as_str()),
            Direction::Received => (self.received_input.as_str(), self.received_output.as_str()),
        }
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        match self.log_level.parse() {
            Ok(level) => level,
            Err(_) => {
                warn!("Unknown log level {:?}, using info", self.log_level);
                log::LevelFilter::Info
            }
        }
    }
}
