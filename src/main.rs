// Builds a starter project and exports it as a zip archive (or a JSON snapshot).
//
//   scenecraft [OUTPUT] [PROJECT NAME]
//
// OUTPUT defaults to `<name>.zip`; an OUTPUT ending in `.json` writes a snapshot instead.

use scenecraft::archive::ZipArchive;
use scenecraft::author::{Role, SceneAuthor, ROOT_NAME};
use scenecraft::config::InputEvent;
use scenecraft::packager::{project_dir_name, ExportProgress, Packager};
use scenecraft::project::{script_export_path, ProjectModel, ScriptLanguage};
use scenecraft::settings::{ExportSettings, Settings};
use scenecraft::snapshot;
use scenecraft::templates::{starter_script, starter_script_path, EVENT_BUS_GD, EVENT_BUS_PATH};
use scenecraft::value::Value;
use std::fs;
use std::path::PathBuf;

/// (scene path, role, next scene)
const STARTER_SCENES: &[(&str, Role, Option<&str>)] = &[
    ("scenes/title", Role::Menu, Some("scenes/intro")),
    ("scenes/intro", Role::Cutscene, Some("scenes/level")),
    ("scenes/level", Role::Gameplay, None),
];

fn build_starter_project(name: &str, settings: &Settings) -> Result<ProjectModel, String> {
    let mut project = ProjectModel::with_settings(name, &settings.model);

    project
        .create_script(EVENT_BUS_PATH, ScriptLanguage::GdScript, EVENT_BUS_GD)
        .map_err(|e| format!("Failed to add EventBus: {}", e))?;
    project.config_mut().set(
        "autoload",
        "EventBus",
        Value::from(format!(
            "*res://{}",
            script_export_path(EVENT_BUS_PATH, &ScriptLanguage::GdScript)
        )),
    );

    for (action, keys) in [
        ("move_left", ["A", "Left"]),
        ("move_right", ["D", "Right"]),
        ("jump", ["Space", "W"]),
        ("pause", ["Escape", "P"]),
    ] {
        let events = keys.iter().filter_map(|k| InputEvent::key(k)).collect();
        project.define_input_action(action, events);
    }

    for (index, (scene_path, role, next)) in STARTER_SCENES.iter().enumerate() {
        let script_path = starter_script_path(scene_path);
        project
            .create_script(&script_path, ScriptLanguage::GdScript, &starter_script(*role, *next))
            .map_err(|e| format!("Failed to add script {}: {}", script_path, e))?;

        let mut author = SceneAuthor::create(&mut project, scene_path, *role)
            .map_err(|e| format!("Failed to create scene {}: {}", scene_path, e))?;
        author
            .attach_script(ROOT_NAME, &script_path)
            .map_err(|e| e.to_string())?;
        if let Some(next) = next {
            author.set_transition_target(next).map_err(|e| e.to_string())?;
        }
        if index == 0 {
            author.mark_as_entry_scene().map_err(|e| e.to_string())?;
        }

        if *role == Role::Gameplay {
            author
                .add_node("Player", "CharacterBody2D", Some("Game"))
                .map_err(|e| e.to_string())?;
            author
                .set_property("Player", "position", Value::vector2(576.0, 324.0))
                .map_err(|e| e.to_string())?;
            author
                .add_node("Sprite", "Sprite2D", Some("Player"))
                .map_err(|e| e.to_string())?;
            author
                .set_property("Sprite", "modulate", Value::color(0.4, 0.8, 1.0, 1.0))
                .map_err(|e| e.to_string())?;
        }
    }

    let report = project.validate();
    for warning in &report.warnings {
        log::warn!("[scenecraft] {}", warning);
    }
    Ok(project)
}

async fn run() -> Result<(), String> {
    let mut args = std::env::args().skip(1);
    let output = args.next();
    let name = args.next().unwrap_or_else(|| "Starter".to_string());
    let output = PathBuf::from(
        output.unwrap_or_else(|| format!("{}.zip", project_dir_name(&name))),
    );

    let settings = Settings::load();
    println!("[scenecraft] Settings: {}", Settings::default_path().display());

    let project = build_starter_project(&name, &settings)?;

    let bytes = if output.extension().and_then(|e| e.to_str()) == Some("json") {
        snapshot::to_json(&project)
            .map_err(|e| format!("Failed to write snapshot: {}", e))?
            .into_bytes()
    } else {
        // the starter archive is meant to open as a project, so it carries project.godot
        let packager = Packager::new(ExportSettings {
            include_project_file: true,
            ..settings.export.clone()
        });
        let observer = |p: &ExportProgress| {
            log::debug!("[scenecraft] {:>3}% {}", p.percent, p.entry);
        };
        packager
            .export(&project, ZipArchive::new(), &observer)
            .await
            .map_err(|e| format!("Export failed: {}", e))?
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    fs::write(&output, &bytes)
        .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;

    println!(
        "[scenecraft] Wrote {} ({} bytes, {} scenes)",
        output.display(),
        bytes.len(),
        project.scenes().count()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("[scenecraft] {}", e);
        std::process::exit(1);
    }
}
