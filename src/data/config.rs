use std::{
    fs,
    path::{Path, PathBuf},
};

use bevy::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_JSON: &str = include_str!("./content/hover_popup.json");

static DEFAULT_CONFIG: Lazy<HoverPopupConfig> =
    Lazy::new(|| match HoverPopupConfig::from_json(DEFAULT_CONFIG_JSON) {
        Ok(config) => config,
        Err(error) => {
            warn!("failed to load default hover popup config: {error}; using safe defaults");
            HoverPopupConfig::fallback()
        }
    });

/// What a target does when more than one marker-class descendant answers
/// its lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplePopups {
    /// Toggle the first in document order and warn about the rest.
    #[default]
    First,
    All,
}

#[derive(Resource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverPopupConfig {
    #[serde(default = "HoverPopupConfig::default_marker_class")]
    pub marker_class: String,
    #[serde(default)]
    pub multiple: MultiplePopups,
}

impl Default for HoverPopupConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

impl HoverPopupConfig {
    pub const MARKER_CLASS: &'static str = "popup";

    fn default_marker_class() -> String {
        String::from(Self::MARKER_CLASS)
    }

    pub fn fallback() -> Self {
        Self {
            marker_class: Self::default_marker_class(),
            multiple: MultiplePopups::First,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validated()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Loads `path` when given, falling back to the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::from_file(path) {
            Ok(config) => {
                info!("loaded hover popup config from {}", path.display());
                config
            }
            Err(error) => {
                warn!("{error}; using default hover popup config");
                Self::default()
            }
        }
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let class = self.marker_class.as_str();
        if class.is_empty() || class.starts_with('.') || class.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidMarkerClass(self.marker_class));
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidMarkerClass(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::Parse(error) => write!(f, "failed to parse config: {error}"),
            Self::InvalidMarkerClass(class) => {
                write!(f, "`{class}` is not usable as a marker class")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(error) => Some(error),
            Self::InvalidMarkerClass(_) => None,
        }
    }
}
