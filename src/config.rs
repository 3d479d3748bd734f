//! Process-level configuration: default room settings and the default
//! truth/dare lists that seed every new room.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room::RoomSettings;

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DARE_NIGHT_CONFIG_PATH";

/// Immutable runtime configuration shared across the engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Settings a freshly created room starts with.
    pub default_settings: RoomSettings,
    /// Truth texts seeded into every joining player's inventory.
    pub default_truths: Vec<String>,
    /// Dare texts seeded into every joining player's inventory.
    pub default_dares: Vec<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to baked-in defaults
    /// when the file is absent or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        truths = config.default_truths.len(),
                        dares = config.default_dares.len(),
                        "loaded defaults from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_settings: RoomSettings::default(),
            default_truths: default_truths(),
            default_dares: default_dares(),
        }
    }
}

/// JSON representation of the configuration file. Every section is optional
/// and overlays the baked-in defaults.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    settings: Option<RoomSettings>,
    #[serde(default)]
    truths: Option<Vec<String>>,
    #[serde(default)]
    dares: Option<Vec<String>>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            default_settings: raw.settings.unwrap_or_default(),
            default_truths: raw.truths.unwrap_or_else(default_truths),
            default_dares: raw.dares.unwrap_or_else(default_dares),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in truth questions shipped with the engine.
fn default_truths() -> Vec<String> {
    [
        "What is the most embarrassing thing you have ever done?",
        "What is a secret you have never told anyone in this room?",
        "Who in this room would you trade lives with for a week?",
        "What is the worst gift you have ever received, and who gave it?",
        "What is the most childish thing you still do?",
        "What lie have you told that you never got caught for?",
        "What is your most irrational fear?",
        "What is the strangest dream you remember?",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Built-in dare challenges shipped with the engine.
fn default_dares() -> Vec<String> {
    [
        "Speak in an accent of the group's choosing until your next turn.",
        "Let the player to your left write a status update for you.",
        "Do your best impression of another player until someone guesses who.",
        "Sing everything you say for the next two minutes.",
        "Dance with no music for thirty seconds.",
        "Tell a joke; if nobody laughs, tell another.",
        "Balance something on your head until your next turn.",
        "Talk without closing your mouth fully for one minute.",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_defaults_are_non_empty() {
        let config = AppConfig::default();
        assert!(!config.default_truths.is_empty());
        assert!(!config.default_dares.is_empty());
        assert_eq!(config.default_settings, RoomSettings::default());
    }

    #[test]
    fn raw_config_overlays_partial_sections() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "truths": ["only this one"] }"#).unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.default_truths, vec!["only this one".to_string()]);
        assert!(!config.default_dares.is_empty());
        assert_eq!(config.default_settings, RoomSettings::default());
    }
}
