//! Crate configuration, persisted as JSON next to the user's other app settings.

use crate::error::SettingsError;
use crate::project::{DanglingParentPolicy, SecondRootPolicy};
use crate::serializer::ParentPathStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Reject assets of unrecognized type instead of accepting them with a warning.
    pub strict_mode: bool,
    pub dangling_parent: DanglingParentPolicy,
    pub second_root: SecondRootPolicy,
    pub engine_version_tag: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            strict_mode: false,
            dangling_parent: DanglingParentPolicy::default(),
            second_root: SecondRootPolicy::default(),
            engine_version_tag: "4.3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Also write `<project>/project.godot`.
    pub include_project_file: bool,
    pub parent_style: ParentPathStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub model: ModelSettings,
    pub export: ExportSettings,
}

impl Settings {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scenecraft")
            .join("settings.json")
    }

    /// Reads settings from `path`. A missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => log::warn!("[settings] Ignoring malformed {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("[settings] Failed to read {}: {}", path.display(), e),
            }
        }
        Settings::default()
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
