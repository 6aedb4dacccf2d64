//! JSON snapshot of a whole project, asset bytes included.

use crate::assets::{hex_digest, AssetType};
use crate::config::ProjectConfig;
use crate::error::{ProjectError, SnapshotError};
use crate::project::{ProjectModel, Resource, Scene, Script};
use crate::settings::ModelSettings;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRecord {
    path: String,
    #[serde(rename = "type")]
    asset_type: AssetType,
    original_name: String,
    sha256: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    name: String,
    engine_version_tag: String,
    config: ProjectConfig,
    #[serde(default)]
    folders: Vec<String>,
    #[serde(default)]
    scenes: Vec<Scene>,
    #[serde(default)]
    scripts: Vec<Script>,
    #[serde(default)]
    resources: Vec<Resource>,
    #[serde(default)]
    assets: Vec<AssetRecord>,
}

pub fn to_json(project: &ProjectModel) -> Result<String, SnapshotError> {
    let snapshot = Snapshot {
        name: project.name().to_string(),
        engine_version_tag: project.engine_version_tag().to_string(),
        config: project.config().clone(),
        folders: project
            .folders()
            .iter()
            .filter(|f| !f.path.is_empty())
            .map(|f| f.path.clone())
            .collect(),
        scenes: project.scenes().cloned().collect(),
        scripts: project.scripts().cloned().collect(),
        resources: project.resources().cloned().collect(),
        assets: project
            .assets()
            .iter()
            .map(|asset| AssetRecord {
                path: asset.path.clone(),
                asset_type: asset.asset_type.clone(),
                original_name: asset.original_name.clone(),
                sha256: asset.digest(),
                data: base64::engine::general_purpose::STANDARD.encode(&asset.raw_data),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Loads a snapshot. Policies and strict mode come from `settings`; every asset
/// is re-validated and must match its recorded digest.
pub fn from_json(json: &str, settings: &ModelSettings) -> Result<ProjectModel, SnapshotError> {
    let snapshot: Snapshot = serde_json::from_str(json)?;

    let settings = ModelSettings {
        engine_version_tag: snapshot.engine_version_tag,
        ..settings.clone()
    };
    let mut project = ProjectModel::with_settings(&snapshot.name, &settings);
    project.replace_config(snapshot.config);

    for folder in &snapshot.folders {
        project.ensure_folder(folder);
    }
    for script in snapshot.scripts {
        project.create_script(&script.path, script.language, &script.source)?;
    }
    for resource in snapshot.resources {
        project.create_resource(&resource.path, &resource.resource_type, resource.properties)?;
    }
    for record in snapshot.assets {
        let data = base64::engine::general_purpose::STANDARD
            .decode(record.data.as_bytes())
            .map_err(|_| SnapshotError::Encoding(record.path.clone()))?;
        let digest = hex_digest(&data);
        if digest != record.sha256 {
            return Err(ProjectError::ValidationFailed {
                path: record.path,
                reason: format!("digest mismatch: expected {}, got {}", record.sha256, digest),
            }
            .into());
        }
        project.add_named_asset(&record.path, record.asset_type, data, &record.original_name)?;
    }
    for scene in snapshot.scenes {
        project.insert_scene(scene)?;
    }

    log::debug!("[snapshot] Loaded {}", project.name());
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::author::{Role, SceneAuthor};
    use crate::config::InputEvent;
    use crate::value::Value;

    fn sample() -> ProjectModel {
        let mut project = ProjectModel::new("Snap");
        {
            let mut author = SceneAuthor::create(&mut project, "scenes/intro", Role::Cutscene).unwrap();
            author.set_description("Opening cutscene").unwrap();
            author.set_transition_target("scenes/level").unwrap();
            author.set_property("Game", "duration", 3.5).unwrap();
        }
        project.ensure_folder("empty/dir");
        project.create_script("intro.gd", "gdscript", "extends Node\n").unwrap();
        project
            .add_asset("audio/theme.ogg", "audio", b"OggS\x00\x02".to_vec())
            .unwrap();
        project.define_input_action("pause", vec![InputEvent::key("Escape").unwrap()]);
        project
    }

    #[test]
    fn test_snapshot_restores_project() {
        let project = sample();
        let json = to_json(&project).unwrap();
        let loaded = from_json(&json, &ModelSettings::default()).unwrap();

        assert_eq!(loaded.name(), "Snap");
        assert_eq!(loaded.scene("scenes/intro"), project.scene("scenes/intro"));
        let metadata = &loaded.scene("scenes/intro").unwrap().metadata;
        assert_eq!(metadata.role, Some(Role::Cutscene));
        assert_eq!(metadata.transition_target.as_deref(), Some("scenes/level"));
        assert_eq!(
            loaded.scene("scenes/intro").unwrap().nodes["Game"].properties["duration"],
            Value::from(3.5)
        );
        assert_eq!(loaded.asset("audio/theme.ogg"), project.asset("audio/theme.ogg"));
        assert_eq!(loaded.script("intro.gd"), project.script("intro.gd"));
        assert_eq!(loaded.config(), project.config());
        assert_eq!(loaded.folders(), project.folders());
    }

    #[test]
    fn test_digest_mismatch_is_rejected() {
        let json = to_json(&sample()).unwrap();
        let mut raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        raw["assets"][0]["data"] = serde_json::Value::from(
            base64::engine::general_purpose::STANDARD.encode(b"tampered"),
        );

        let err = from_json(&raw.to_string(), &ModelSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Project(ProjectError::ValidationFailed { ref path, .. }) if path == "audio/theme.ogg"
        ));
    }

    #[test]
    fn test_bad_base64_and_bad_json() {
        let json = to_json(&sample()).unwrap();
        let mut raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        raw["assets"][0]["data"] = serde_json::Value::from("%%%");
        assert!(matches!(
            from_json(&raw.to_string(), &ModelSettings::default()),
            Err(SnapshotError::Encoding(_))
        ));

        assert!(matches!(
            from_json("{", &ModelSettings::default()),
            Err(SnapshotError::Json(_))
        ));
    }
}
