use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::DEFAULT_API_URL;
use crate::theme::ThemePreset;

pub const API_URL_ENV: &str = "TASKBOARD_API_URL";

const DEFAULT_THEME: &str = "default";
const MIN_TOAST_DURATION_MS: u64 = 500;
const MAX_TOAST_DURATION_MS: u64 = 10_000;
const DEFAULT_TOAST_DURATION_MS: u64 = 1_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: Option<String>,
    pub theme: String,
    pub toast_duration_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            theme: DEFAULT_THEME.to_string(),
            toast_duration_ms: DEFAULT_TOAST_DURATION_MS,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("taskboard");
        path.push("settings.toml");
        Some(path)
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from_path(&path)
    }

    fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    settings.validate();
                    settings
                }
                Err(error) => {
                    warn!(
                        "failed to parse settings config '{}': {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read settings config '{}': {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    fn validate(&mut self) {
        if ThemePreset::from_str(&self.theme).is_err() {
            warn!("unknown theme '{}', using '{}'", self.theme, DEFAULT_THEME);
            self.theme = DEFAULT_THEME.to_string();
        }
        self.toast_duration_ms = self
            .toast_duration_ms
            .clamp(MIN_TOAST_DURATION_MS, MAX_TOAST_DURATION_MS);
    }

    pub fn theme_preset(&self) -> ThemePreset {
        ThemePreset::from_str(&self.theme).unwrap_or_default()
    }
}

/// Resolve the API base URL: CLI flag, then `TASKBOARD_API_URL`, then the
/// settings file, then the built-in default.
pub fn resolve_api_url(
    flag: Option<String>,
    env_value: Option<String>,
    settings: &Settings,
) -> String {
    flag.or(env_value)
        .or_else(|| settings.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_settings(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("settings.toml");
        let mut file = fs::File::create(&path).expect("create settings file");
        file.write_all(contents.as_bytes()).expect("write settings");
        path
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let settings = Settings::load_from_path(&dir.path().join("nope.toml"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_settings(
            &dir,
            "api_url = \"http://tasks.example:9000/api\"\ntheme = \"mono\"\ntoast_duration_ms = 2000\n",
        );
        let settings = Settings::load_from_path(&path);
        assert_eq!(
            settings.api_url.as_deref(),
            Some("http://tasks.example:9000/api")
        );
        assert_eq!(settings.theme_preset(), ThemePreset::Mono);
        assert_eq!(settings.toast_duration_ms, 2000);
    }

    #[test]
    fn test_invalid_values_are_corrected() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_settings(&dir, "theme = \"neon\"\ntoast_duration_ms = 50\n");
        let settings = Settings::load_from_path(&path);
        assert_eq!(settings.theme, "default");
        assert_eq!(settings.toast_duration_ms, MIN_TOAST_DURATION_MS);
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_settings(&dir, "theme = [not toml");
        assert_eq!(Settings::load_from_path(&path), Settings::default());
    }

    #[test]
    fn test_resolve_api_url_priority() {
        let mut settings = Settings::default();
        settings.api_url = Some("http://from-settings/api".to_string());

        assert_eq!(
            resolve_api_url(
                Some("http://from-flag/api".to_string()),
                Some("http://from-env/api".to_string()),
                &settings
            ),
            "http://from-flag/api"
        );
        assert_eq!(
            resolve_api_url(None, Some("http://from-env/api".to_string()), &settings),
            "http://from-env/api"
        );
        assert_eq!(
            resolve_api_url(None, None, &settings),
            "http://from-settings/api"
        );
        assert_eq!(
            resolve_api_url(None, None, &Settings::default()),
            DEFAULT_API_URL
        );
    }
}
