// ============================================================================
// Fixed engine files - credits scene, autoloads and per-role starter scripts
// ============================================================================

use crate::author::Role;
use crate::project::scene_export_path;

/// File name of the credits scene every export carries, relative to the project directory.
pub const CREDITS_SCENE_FILE: &str = "credits.tscn";

pub const CREDITS_SCENE: &str = r#"[gd_scene format=3]

[node name="Credits" type="Control"]
layout_mode = 3
anchors_preset = 15
anchor_right = 1.0
anchor_bottom = 1.0

[node name="Background" type="ColorRect" parent="Credits"]
layout_mode = 1
anchors_preset = 15
anchor_right = 1.0
anchor_bottom = 1.0
color = Color(0.08, 0.08, 0.1, 1)

[node name="Title" type="Label" parent="Credits"]
layout_mode = 1
offset_left = 40.0
offset_top = 40.0
text = "Credits"

[node name="Body" type="Label" parent="Credits"]
layout_mode = 1
offset_left = 40.0
offset_top = 96.0
text = "Made with scenecraft.\nBuilt on the Godot Engine."
"#;

// ============================================================================
// Autoloads
// ============================================================================

pub const EVENT_BUS_PATH: &str = "autoload/event_bus.gd";

pub const EVENT_BUS_GD: &str = r#"extends Node
## EventBus - Central signal hub for decoupled communication
## Scenes emit/listen here instead of holding direct references

# Game Flow Events
signal game_started
signal game_paused
signal game_resumed
signal scene_finished(next_scene: String)

# Player Events
signal player_spawned(player: Node)
signal player_died

# UI Events
signal score_changed(new_score: int)
signal menu_option_selected(option: String)
"#;

// ============================================================================
// Starter scripts
// ============================================================================

/// Script path a scene's starter script is written to, e.g. `scenes/level` → `scenes/level.gd`.
pub fn starter_script_path(scene_path: &str) -> String {
    let scene_path = scene_path.strip_suffix(".tscn").unwrap_or(scene_path);
    format!("{}.gd", scene_path)
}

/// GDScript for a scene's root node. `next_scene` is the scene the script hands
/// off to when it finishes.
pub fn starter_script(role: Role, next_scene: Option<&str>) -> String {
    let handoff = match next_scene {
        Some(scene) => format!(
            "\tEventBus.scene_finished.emit(\"{0}\")\n\tget_tree().change_scene_to_file(\"{0}\")",
            format!("res://{}", scene_export_path(scene))
        ),
        None => "\tEventBus.scene_finished.emit(\"\")".to_string(),
    };

    match role {
        Role::Gameplay | Role::Gameplay3d => format!(
            r#"extends {root}
## {role} scene - owns the camera, UI layer and game-logic anchor

@onready var game: Node = $Game
@onready var ui: CanvasLayer = $UI

func _ready() -> void:
	EventBus.player_died.connect(_on_player_died)
	EventBus.game_started.emit()

func _unhandled_input(event: InputEvent) -> void:
	if event.is_action_pressed("pause"):
		get_tree().paused = not get_tree().paused
		if get_tree().paused:
			EventBus.game_paused.emit()
		else:
			EventBus.game_resumed.emit()

func _on_player_died() -> void:
	finish()

func finish() -> void:
{handoff}
"#,
            root = role.root_type(),
            role = role,
            handoff = handoff
        ),
        Role::Menu => format!(
            r#"extends Control
## Menu scene - forwards selections through the EventBus

func _ready() -> void:
	EventBus.menu_option_selected.connect(_on_option_selected)

func _on_option_selected(option: String) -> void:
	if option == "start":
		finish()
	elif option == "quit":
		get_tree().quit()

func finish() -> void:
{handoff}
"#,
            handoff = handoff
        ),
        Role::Cutscene => format!(
            r#"extends Node
## Cutscene scene - plays through, then hands off

@export var duration: float = 3.0

func _ready() -> void:
	await get_tree().create_timer(duration).timeout
	finish()

func _unhandled_input(event: InputEvent) -> void:
	if event.is_action_pressed("ui_accept"):
		finish()

func finish() -> void:
{handoff}
"#,
            handoff = handoff
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_scene;

    #[test]
    fn test_credits_scene_parses() {
        let scene = parse_scene("credits", CREDITS_SCENE).unwrap();
        assert_eq!(scene.root_node_id.as_deref(), Some("Credits"));
        assert_eq!(scene.nodes["Credits"].children, vec!["Background", "Title", "Body"]);
    }

    #[test]
    fn test_starter_script_extends_role_root() {
        assert!(starter_script(Role::Gameplay, None).starts_with("extends Node2D\n"));
        assert!(starter_script(Role::Gameplay3d, None).starts_with("extends Node3D\n"));
        assert!(starter_script(Role::Menu, None).starts_with("extends Control\n"));
        assert!(starter_script(Role::Cutscene, None).starts_with("extends Node\n"));
    }

    #[test]
    fn test_starter_script_hands_off_to_next_scene() {
        let script = starter_script(Role::Menu, Some("scenes/level"));
        assert!(script.contains("change_scene_to_file(\"res://scenes/level.tscn\")"));
        assert!(!starter_script(Role::Menu, None).contains("change_scene_to_file"));
    }

    #[test]
    fn test_starter_script_path() {
        assert_eq!(starter_script_path("scenes/level"), "scenes/level.gd");
        assert_eq!(starter_script_path("title.tscn"), "title.gd");
    }
}
