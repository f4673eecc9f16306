//! # Configuration Module
//!
//! User-selectable options and their persistence.
//!
//! Configuration is stored as JSON in the user's config directory
//! (default: `~/.config/tuneo/config.json`). Loading never fails: every
//! field is checked against its closed set of options and anything unknown
//! or invalid keeps its default.

use crate::error::{Result, TunerError};
use crate::instrument::InstrumentKind;
use crate::tuning::TuningReference;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Colour theme. Only a dark theme exists for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 1] = [Self::Dark];

    pub fn id(self) -> &'static str {
        match self {
            Self::Dark => "dark",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }
}

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub const ALL: [Language; 2] = [Self::En, Self::Es];

    pub fn id(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.id() == id)
    }

    /// First supported language named by the process locale.
    ///
    /// Checks `LC_ALL`, `LC_MESSAGES` and `LANG` in that order, reading the
    /// two-letter prefix of values such as `es_ES.UTF-8`. Falls back to English.
    pub fn from_environment() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find_map(|locale| Self::from_locale(&locale))
            .unwrap_or_default()
    }

    /// Parses a POSIX or BCP 47 locale string (`es_AR.UTF-8`, `en-GB`).
    pub fn from_locale(locale: &str) -> Option<Self> {
        let prefix = locale
            .split(['_', '-', '.', '@'])
            .next()?
            .to_ascii_lowercase();
        Self::from_id(&prefix)
    }
}

/// Rendering quality trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsMode {
    /// Better performance
    Low,
    /// Better quality
    High,
}

impl Default for GraphicsMode {
    fn default() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl GraphicsMode {
    pub const ALL: [GraphicsMode; 2] = [Self::Low, Self::High];

    pub fn id(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.id() == id)
    }

    /// Keep every n-th sample when drawing the waveform.
    pub fn waveform_step(self) -> usize {
        match self {
            Self::Low => 12,
            Self::High => 4,
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub instrument: InstrumentKind,
    pub tuning: TuningReference,
    pub theme: Theme,
    pub language: Language,
    pub graphics: GraphicsMode,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            instrument: InstrumentKind::default(),
            tuning: TuningReference::default(),
            theme: Theme::default(),
            language: Language::from_environment(),
            graphics: GraphicsMode::default(),
        }
    }
}

impl Configuration {
    /// Whether switching to `other` changes the meaning of frequencies,
    /// which invalidates the vote queue and the history.
    pub fn requires_reset(&self, other: &Configuration) -> bool {
        self.instrument != other.instrument || self.tuning != other.tuning
    }

    /// Overlays a persisted JSON object onto `self`.
    ///
    /// Each known key is taken only if it holds a string naming a valid
    /// option. Unknown keys, wrong types and unknown values are ignored.
    pub fn merge_persisted(mut self, persisted: &Value) -> Self {
        let Some(saved) = persisted.as_object() else {
            log::warn!("[CONFIG] Persisted configuration is not an object, ignoring it");
            return self;
        };

        let field = |key: &str| saved.get(key).and_then(Value::as_str);

        if let Some(v) = field("instrument").and_then(InstrumentKind::from_id) {
            self.instrument = v;
        }
        if let Some(v) = field("tuning").and_then(TuningReference::from_id) {
            self.tuning = v;
        }
        if let Some(v) = field("theme").and_then(Theme::from_id) {
            self.theme = v;
        }
        if let Some(v) = field("language").and_then(Language::from_id) {
            self.language = v;
        }
        if let Some(v) = field("graphics").and_then(GraphicsMode::from_id) {
            self.graphics = v;
        }
        self
    }
}

/// Get the default config file path
///
/// Returns: ~/.config/tuneo/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("tuneo")
        .join("config.json")
}

/// Load configuration from a JSON file.
///
/// A missing, unreadable or unparsable file yields the defaults; problems
/// are logged, never returned.
pub fn load_config(path: &Path) -> Configuration {
    log::info!("[CONFIG] Loading from {:?}", path);
    let defaults = Configuration::default();

    if !path.exists() {
        log::info!("[CONFIG] Config file doesn't exist, using defaults");
        return defaults;
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("[CONFIG] Failed to read config file: {}, using defaults", e);
            return defaults;
        }
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(value) => {
            let config = defaults.merge_persisted(&value);
            log::info!(
                "[CONFIG] Loaded config - instrument: {}, tuning: {}, language: {}, graphics: {}",
                config.instrument.id(),
                config.tuning.id(),
                config.language.id(),
                config.graphics.id()
            );
            config
        }
        Err(e) => {
            log::warn!("[CONFIG] Failed to parse config: {}, using defaults", e);
            defaults
        }
    }
}

/// Save configuration to a JSON file, creating parent directories as needed.
pub fn save_config(config: &Configuration, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| TunerError::ConfigIo {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).map_err(|source| TunerError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("[CONFIG] Saved config to {:?}", path);
    Ok(())
}
