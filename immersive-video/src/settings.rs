//! Settings management for Immersive Video
//!
//! Player settings are persisted as XML in the user config directory.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::playback::PlaybackOptions;
use crate::video::{HwAccelKind, PresentationLayout};

/// Persisted player settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename = "ImmersiveVideoSettings")]
pub struct PlayerSettings {
    /// Video file to open on startup
    #[serde(rename = "source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Rewind and continue at end of stream
    #[serde(rename = "looping", default)]
    pub looping: bool,

    /// Start playing as soon as the host starts ticking
    #[serde(rename = "autoplay", default)]
    pub autoplay: bool,

    #[serde(rename = "hwAccel", default, with = "as_text")]
    pub hw_accel: HwAccelKind,

    #[serde(rename = "outputLayout", default, with = "as_text")]
    pub output_layout: PresentationLayout,
}

/// Enum fields are stored as their display names ("cuda", "bgra", ...)
mod as_text {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + Default,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        if s.trim().is_empty() {
            Ok(T::default())
        } else {
            s.parse().map_err(serde::de::Error::custom)
        }
    }
}

impl PlayerSettings {
    /// Default settings file: `<config dir>/ImmersiveVideo/settings.xml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("ImmersiveVideo");
            p.push("settings.xml");
            p
        })
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        from_str(&contents).map_err(SettingsError::XmlParse)
    }

    /// Save settings to an XML file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }

        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Load from the default path, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save to the default path
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::default_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        self.save_to_file(&path)
    }

    /// Configured source as a path
    pub fn source_path(&self) -> Option<PathBuf> {
        self.source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            looping: self.looping,
            autoplay: self.autoplay,
        }
    }
}

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(quick_xml::SeError),
    #[error("Could not find config directory")]
    NoConfigDir,
}
