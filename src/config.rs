//! Backend configuration persistence
//!
//! Stores the backend URL and anon key in ~/.config/journal/config.json.
//! `SUPABASE_URL` and `SUPABASE_ANON_KEY` override the stored values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub const URL_ENV: &str = "SUPABASE_URL";
pub const ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";

/// Persistent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend project URL
    pub url: Option<String>,
    /// Public anon key of the project
    pub anon_key: Option<String>,
}

/// Fully resolved backend connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
}

impl Config {
    /// Load the config from disk and apply environment overrides
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::config_path()?)?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Load the config stored at `path`, using defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents).with_context(|| "Failed to parse config")
    }

    /// Save the config to disk
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("journal").join("config.json"))
    }

    /// Replace stored values with any set in the environment
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Using backend URL from {}", URL_ENV);
            self.url = Some(url);
        }
        if let Some(key) = lookup(ANON_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Using anon key from {}", ANON_KEY_ENV);
            self.anon_key = Some(key);
        }
        self
    }

    /// Settings needed to reach the backend
    pub fn resolve(&self) -> Result<BackendSettings> {
        let (Some(url), Some(anon_key)) = (&self.url, &self.anon_key) else {
            anyhow::bail!("Backend not configured. Run 'journal configure' first.");
        };

        let anon_key = anon_key.trim();
        if !anon_key.bytes().all(|b| b.is_ascii_graphic()) {
            anyhow::bail!("Invalid anon key: expected a printable token without spaces");
        }

        Ok(BackendSettings {
            url: normalize_url(url)?,
            anon_key: anon_key.to_string(),
        })
    }
}

/// Validate a backend URL and strip any trailing slash
pub fn normalize_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid backend URL {:?}", raw))?;

    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Backend URL must use http or https, got {:?}", url.scheme());
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            url: Some("https://project.example.co".into()),
            anon_key: Some("anon".into()),
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_stored_values() {
        let config = Config {
            url: Some("https://stored.example.co".into()),
            anon_key: Some("stored".into()),
        }
        .with_overrides(|key| match key {
            URL_ENV => Some("https://env.example.co".into()),
            ANON_KEY_ENV => Some("  ".into()),
            _ => None,
        });

        assert_eq!(config.url.as_deref(), Some("https://env.example.co"));
        assert_eq!(config.anon_key.as_deref(), Some("stored"));
    }

    #[test]
    fn test_resolve_requires_both_values() {
        let config = Config {
            url: Some("https://project.example.co".into()),
            anon_key: None,
        };
        let err = config.resolve().unwrap_err();
        assert!(err.to_string().contains("journal configure"));
    }

    #[test]
    fn test_resolve_normalizes_url() {
        let config = Config {
            url: Some("https://project.example.co/".into()),
            anon_key: Some(" anon \n".into()),
        };
        assert_eq!(
            config.resolve().unwrap(),
            BackendSettings {
                url: "https://project.example.co".into(),
                anon_key: "anon".into(),
            }
        );
    }

    #[test]
    fn test_resolve_rejects_malformed_anon_key() {
        let config = Config {
            url: Some("https://project.example.co".into()),
            anon_key: Some("anon\nkey".into()),
        };
        let err = config.resolve().unwrap_err();
        assert!(err.to_string().starts_with("Invalid anon key"));
    }

    #[test]
    fn test_normalize_url_rejects_bad_input() {
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("ftp://project.example.co").is_err());
        assert_eq!(
            normalize_url("http://localhost:54321").unwrap(),
            "http://localhost:54321"
        );
    }
}
