//! AI service settings.
//!
//! Loaded from `gridmind.toml` in the user config directory, with
//! environment overrides (`GRIDMIND_ENDPOINT`, `GRIDMIND_MODEL`). The API
//! key only ever comes from `GRIDMIND_API_KEY`; it is not read from or
//! written to disk. A missing or unreadable settings file falls back to
//! defaults with a logged warning — settings can never prevent startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::protocol::{DEFAULT_EXPLAIN_MODEL, DEFAULT_MODEL};

const DEFAULT_ENDPOINT: &str = "https://api.gridmind.dev";

/// Default number of cells serialized into the request context snapshot.
/// A tunable, not a correctness constant: it bounds request size.
const DEFAULT_CONTEXT_CAP: usize = 50;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_explain_model")]
    pub explain_model: String,
    #[serde(default = "default_context_cap")]
    pub context_cap: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_explain_model() -> String {
    DEFAULT_EXPLAIN_MODEL.to_string()
}

fn default_context_cap() -> usize {
    DEFAULT_CONTEXT_CAP
}

impl Default for AiSettings {
    fn default() -> Self {
        AiSettings {
            endpoint: default_endpoint(),
            model: default_model(),
            explain_model: default_explain_model(),
            context_cap: default_context_cap(),
        }
    }
}

/// Returns the default settings file path.
pub fn settings_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("gridmind/gridmind.toml"))
}

/// Load settings from the given path (or the default location), then apply
/// environment overrides.
pub fn load_settings(path: Option<&Path>) -> AiSettings {
    let resolved = path.map(Path::to_path_buf).or_else(settings_file_path);
    let mut settings = match resolved {
        Some(ref p) if p.exists() => match std::fs::read_to_string(p) {
            Ok(content) => match toml::from_str::<AiSettings>(&content) {
                Ok(parsed) => parsed,
                Err(err) => {
                    log::warn!("failed to parse {}: {}", p.display(), err);
                    AiSettings::default()
                }
            },
            Err(err) => {
                log::warn!("failed to read {}: {}", p.display(), err);
                AiSettings::default()
            }
        },
        _ => AiSettings::default(),
    };

    if let Ok(endpoint) = std::env::var("GRIDMIND_ENDPOINT")
        && !endpoint.trim().is_empty()
    {
        settings.endpoint = endpoint;
    }
    if let Ok(model) = std::env::var("GRIDMIND_MODEL")
        && !model.trim().is_empty()
    {
        settings.model = model;
    }

    settings
}

/// The API key, if configured in the environment.
pub fn api_key_from_env() -> Option<String> {
    std::env::var("GRIDMIND_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AiSettings::default();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.context_cap, 50);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridmind.toml");
        std::fs::write(
            &path,
            "endpoint = \"https://ai.internal.test\"\ncontext_cap = 10\n",
        )
        .unwrap();

        let settings = load_settings(Some(&path));
        assert_eq!(settings.endpoint, "https://ai.internal.test");
        assert_eq!(settings.context_cap, 10);
        // Unspecified fields keep their defaults.
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridmind.toml");
        std::fs::write(&path, "endpoint = [not toml").unwrap();

        let settings = load_settings(Some(&path));
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(Some(&dir.path().join("nope.toml")));
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_settings_file_path_location() {
        let path = settings_file_path().unwrap();
        assert!(path.to_string_lossy().contains("gridmind"));
        assert!(path.to_string_lossy().ends_with("gridmind.toml"));
    }
}
