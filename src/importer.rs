//! Rebuilds a [`ProjectModel`] from an exported archive.

use crate::archive::Archive;
use crate::assets::AssetType;
use crate::config::ProjectConfig;
use crate::error::{ImportError, ProjectError};
use crate::parser::{parse_resource, parse_scene};
use crate::project::{ProjectModel, ScriptLanguage};
use crate::settings::ModelSettings;
use crate::templates::CREDITS_SCENE_FILE;
use crate::value::Value;
use indexmap::IndexMap;

/// Top-level directory shared by every entry, if there is one.
fn common_root(entries: &[String]) -> Option<&str> {
    let first = entries.first()?.split_once('/')?.0;
    entries
        .iter()
        .all(|e| e.split_once('/').map(|(head, _)| head) == Some(first))
        .then_some(first)
}

fn text(data: Vec<u8>) -> String {
    String::from_utf8(data).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Import order: config first so later steps see the final project name,
/// scenes last. The name comes from `config/name` when the archive carries a
/// `project.godot`, otherwise from the top-level directory.
fn rank(rel: &str) -> u8 {
    if rel == "project.godot" {
        0
    } else if rel.starts_with("scripts/") {
        1
    } else if rel.starts_with("resources/") {
        2
    } else if rel.starts_with("assets/") {
        3
    } else {
        4
    }
}

pub fn import_archive(
    archive: &impl Archive,
    settings: &ModelSettings,
) -> Result<ProjectModel, ImportError> {
    let entries = archive.list_entries();
    if entries.is_empty() {
        return Err(ImportError::EmptyArchive);
    }

    let root = common_root(&entries);
    let name = root.unwrap_or("project");
    let mut project = ProjectModel::with_settings(name, settings);
    log::info!("[importer] Importing {} ({} entries)", name, entries.len());

    let mut files: Vec<(&str, &str)> = entries
        .iter()
        .map(|entry| {
            let rel = match root {
                Some(root) => &entry[root.len() + 1..],
                None => entry.as_str(),
            };
            (entry.as_str(), rel)
        })
        .collect();
    files.sort_by_key(|(_, rel)| rank(rel));

    for (entry, rel) in files {
        if rel.is_empty() || rel == CREDITS_SCENE_FILE {
            continue;
        }
        let data = archive.read_entry(entry)?;

        if rel == "project.godot" {
            let config = ProjectConfig::parse(&text(data));
            // config/name survives characters the directory name had to drop
            if let Some(app_name) = config.app_name().filter(|n| !n.trim().is_empty()) {
                project.set_project_name(app_name);
            }
            project.replace_config(config);
        } else if let Some(path) = rel.strip_prefix("scripts/") {
            project.create_script(path, ScriptLanguage::from_path(path), &text(data))?;
        } else if let Some(path) = rel.strip_prefix("assets/") {
            let file_name = path.rsplit('/').next().unwrap_or(path);
            match project.add_named_asset(path, AssetType::from_path(path), data, file_name) {
                Ok(()) => {}
                Err(ProjectError::ValidationFailed { path, reason }) => {
                    log::warn!("[importer] Skipping invalid asset {}: {}", path, reason);
                }
                Err(e) => return Err(e.into()),
            }
        } else if let Some(path) = rel
            .strip_prefix("resources/")
            .and_then(|p| p.strip_suffix(".tres"))
        {
            match parse_resource(path, &text(data)) {
                Ok(resource) => {
                    project.create_resource(path, &resource.resource_type, resource.properties)?;
                }
                Err(e) => log::warn!("[importer] Skipping resource {}: {}", path, e),
            }
        } else if let Some(path) = rel.strip_suffix(".tscn") {
            let source = text(data);
            match parse_scene(path, &source) {
                Ok(scene) => project.insert_scene(scene)?,
                Err(e) => {
                    log::warn!("[importer] Keeping unparsed scene {} as a resource: {}", path, e);
                    let mut properties = IndexMap::new();
                    properties.insert("source".to_string(), Value::String(source));
                    project.create_resource(path, "PackedScene", properties)?;
                }
            }
        } else {
            log::debug!("[importer] Ignoring {}", entry);
        }
    }

    Ok(project)
}
