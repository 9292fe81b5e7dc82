// src/settings.rs -------------------------------------------------------------
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const THEME_KEY: &str = "theme";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark  => Theme::Light,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark  => "dark",
        }
    }
}

/// User preferences backed by a small JSON key-value file.
///
/// Reads happen once in [`Settings::load`]; every setter writes the whole
/// slot back so the file always mirrors memory.
#[derive(Debug)]
pub struct Settings {
    path:  PathBuf,
    slots: BTreeMap<String, String>,
    theme: Theme,
}

impl Settings {
    /// Read the slot at `path`. A missing or unreadable file means defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slots = match read_slots(&path) {
            Ok(slots) => slots,
            Err(e) => {
                if path.exists() {
                    warn!("ignoring settings at {}: {e:#}", path.display());
                }
                BTreeMap::new()
            }
        };

        let theme = match slots.get(THEME_KEY).map(String::as_str) {
            Some("dark") => Theme::Dark,
            _            => Theme::Light,
        };
        debug!("theme preference: {}", theme.as_str());

        Self { path, slots, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.theme = theme;
        self.slots.insert(THEME_KEY.to_string(), theme.as_str().to_string());
        self.flush()
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.theme.toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(&self.slots)?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

fn read_slots(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).context("settings file is not a JSON object of strings")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_defaults_to_light() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("absent.json"));
        assert_eq!(settings.theme(), Theme::Light);
    }

    #[test]
    fn set_theme_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");

        let mut settings = Settings::load(&path);
        settings.set_theme(Theme::Dark).unwrap();

        assert_eq!(Settings::load(&path).theme(), Theme::Dark);
    }

    #[test]
    fn toggle_flips_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::load(&path);
        assert_eq!(settings.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(settings.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(Settings::load(&path).theme(), Theme::Light);
    }

    #[test]
    fn unrelated_keys_survive_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"theme":"light","locale":"pt-BR"}"#).unwrap();

        let mut settings = Settings::load(&path);
        settings.set_theme(Theme::Dark).unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["locale"], "pt-BR");
        assert_eq!(raw["theme"], "dark");
    }

    #[test]
    fn garbage_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        assert_eq!(Settings::load(&path).theme(), Theme::Light);
    }
}
