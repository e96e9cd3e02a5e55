//! Panel preferences restored at startup and saved on close.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use dirigo_core::{ChannelDisplay, Gamma};

const SETTINGS_DIR: &str = "Dirigo-GUI";
const SETTINGS_FILE: &str = "settings.json";

/// Location of the settings file, if the platform has a config directory.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

/// Persisted panel state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    pub dark_mode: bool,
    /// Display settings per digitizer channel, in channel order.
    pub channels: Vec<ChannelDisplay>,
    pub gamma: Gamma,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            channels: Vec::new(),
            gamma: Gamma::default(),
        }
    }
}

impl PanelSettings {
    /// Reads settings from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("no settings at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("cannot read {}: {e}; using defaults", path.display());
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("ignoring malformed settings in {}: {e}", path.display());
            Self::default()
        })
    }

    /// Writes settings to `path`, creating its directory.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating settings directory {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("serialising settings")?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        log::debug!("saved settings to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirigo_core::{ColorVector, DataRange};

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let mut channel = ChannelDisplay::full_range(DataRange::default());
        channel.color = ColorVector::Magenta;
        channel.display_max = 4000;
        let settings = PanelSettings {
            dark_mode: false,
            channels: vec![channel, ChannelDisplay::full_range(DataRange::default())],
            gamma: Gamma::new(1.8).unwrap(),
        };
        settings.save(&path).unwrap();
        assert_eq!(PanelSettings::load(&path), settings);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            PanelSettings::load(&dir.path().join(SETTINGS_FILE)),
            PanelSettings::default()
        );
    }

    #[test]
    fn test_malformed_or_out_of_domain_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(PanelSettings::load(&path), PanelSettings::default());
        fs::write(&path, r#"{"gamma": 42.0}"#).unwrap();
        assert_eq!(PanelSettings::load(&path), PanelSettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"dark_mode": false}"#).unwrap();
        let settings = PanelSettings::load(&path);
        assert!(!settings.dark_mode);
        assert_eq!(settings.gamma, Gamma::default());
    }
}
