//! Project configuration: the nested section → key → value mapping the engine
//! persists as `project.godot`.

use crate::value::{parse_value, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 5;
pub const APP_SECTION: &str = "application";
pub const INPUT_SECTION: &str = "input";
pub const NAME_KEY: &str = "config/name";
pub const MAIN_SCENE_KEY: &str = "run/main_scene";

/// Sections present in every fresh config, in render order.
const DEFAULT_SECTIONS: [&str; 5] =
    [APP_SECTION, "autoload", INPUT_SECTION, "rendering", "physics"];

/// One entry of an input action's event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    Key { physical_keycode: u32 },
    MouseButton { button_index: u32 },
    JoypadButton { button_index: u32 },
}

impl InputEvent {
    /// Key event from a readable name such as `"A"`, `"Space"` or `"Left"`.
    pub fn key(name: &str) -> Option<Self> {
        name_to_keycode(name).map(|physical_keycode| InputEvent::Key { physical_keycode })
    }

    pub fn describe(&self) -> String {
        match self {
            InputEvent::Key { physical_keycode } => keycode_to_name(*physical_keycode)
                .unwrap_or_else(|| format!("Key{}", physical_keycode)),
            InputEvent::MouseButton { button_index: 1 } => "LeftClick".to_string(),
            InputEvent::MouseButton { button_index: 2 } => "RightClick".to_string(),
            InputEvent::MouseButton { button_index } => format!("Mouse{}", button_index),
            InputEvent::JoypadButton { button_index } => format!("Joypad{}", button_index),
        }
    }

    fn render(&self) -> String {
        const COMMON: &str = r#""resource_local_to_scene":false,"resource_name":"","device":-1"#;
        const MODIFIERS: &str = r#""window_id":0,"alt_pressed":false,"shift_pressed":false,"ctrl_pressed":false,"meta_pressed":false"#;
        match self {
            InputEvent::Key { physical_keycode } => format!(
                r#"Object(InputEventKey,{},{},"pressed":false,"keycode":0,"physical_keycode":{},"key_label":0,"unicode":0,"location":0,"echo":false,"script":null)"#,
                COMMON, MODIFIERS, physical_keycode
            ),
            InputEvent::MouseButton { button_index } => format!(
                r#"Object(InputEventMouseButton,{},{},"button_mask":0,"position":Vector2(0, 0),"global_position":Vector2(0, 0),"factor":1.0,"button_index":{},"canceled":false,"pressed":false,"double_click":false,"script":null)"#,
                COMMON, MODIFIERS, button_index
            ),
            InputEvent::JoypadButton { button_index } => format!(
                r#"Object(InputEventJoypadButton,{},"button_index":{},"pressure":0.0,"pressed":false,"script":null)"#,
                COMMON, button_index
            ),
        }
    }
}

fn keycode_to_name(code: u32) -> Option<String> {
    match code {
        48..=57 | 65..=90 => Some(((code as u8) as char).to_string()),
        32 => Some("Space".to_string()),
        4194305 => Some("Escape".to_string()),
        4194306 => Some("Tab".to_string()),
        4194309 => Some("Enter".to_string()),
        4194325 => Some("Shift".to_string()),
        4194326 => Some("Ctrl".to_string()),
        4194328 => Some("Alt".to_string()),
        4194319 => Some("Left".to_string()),
        4194320 => Some("Up".to_string()),
        4194321 => Some("Right".to_string()),
        4194322 => Some("Down".to_string()),
        _ => None,
    }
}

fn name_to_keycode(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            return Some(c as u32);
        }
    }
    match name.to_ascii_lowercase().as_str() {
        "space" => Some(32),
        "escape" | "esc" => Some(4194305),
        "tab" => Some(4194306),
        "enter" | "return" => Some(4194309),
        "shift" => Some(4194325),
        "ctrl" | "control" => Some(4194326),
        "alt" => Some(4194328),
        "left" => Some(4194319),
        "up" => Some(4194320),
        "right" => Some(4194321),
        "down" => Some(4194322),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAction {
    pub deadzone: f64,
    pub events: Vec<InputEvent>,
}

impl InputAction {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            deadzone: 0.5,
            events,
        }
    }
}

/// Section → key → value configuration. The `input` section is kept typed as
/// [`InputAction`]s; every other section holds plain [`Value`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    sections: IndexMap<String, IndexMap<String, Value>>,
    input: IndexMap<String, InputAction>,
}

impl ProjectConfig {
    pub fn new(app_name: &str) -> Self {
        let mut sections: IndexMap<String, IndexMap<String, Value>> = DEFAULT_SECTIONS
            .iter()
            .map(|s| (s.to_string(), IndexMap::new()))
            .collect();
        sections[APP_SECTION].insert(NAME_KEY.to_string(), Value::from(app_name));
        Self {
            sections,
            input: IndexMap::new(),
        }
    }

    pub fn app_name(&self) -> Option<&str> {
        self.get(APP_SECTION, NAME_KEY).and_then(Value::as_str)
    }

    pub(crate) fn set_app_name(&mut self, name: &str) {
        self.set(APP_SECTION, NAME_KEY, Value::from(name));
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections.get(section)?.get(key)
    }

    pub fn set(&mut self, section: &str, key: &str, value: Value) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn section(&self, section: &str) -> Option<&IndexMap<String, Value>> {
        self.sections.get(section)
    }

    /// Inserts or replaces an input action.
    pub fn define_input_action(&mut self, name: &str, events: Vec<InputEvent>) {
        self.input.insert(name.to_string(), InputAction::new(events));
    }

    pub fn input_action(&self, name: &str) -> Option<&InputAction> {
        self.input.get(name)
    }

    pub fn input_actions(&self) -> impl Iterator<Item = (&str, &InputAction)> {
        self.input.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Renders the config in `project.godot` syntax. Empty sections are omitted.
    pub fn render(&self) -> String {
        let mut out = String::from("; Engine configuration file.\n; Generated by scenecraft\n\n");
        out.push_str(&format!("config_version={}\n", CONFIG_VERSION));

        for (name, entries) in &self.sections {
            if name == INPUT_SECTION {
                if self.input.is_empty() {
                    continue;
                }
                out.push_str(&format!("\n[{}]\n\n", name));
                for (action, def) in &self.input {
                    let events: Vec<String> = def.events.iter().map(InputEvent::render).collect();
                    out.push_str(&format!(
                        "{}={{\n\"deadzone\": {},\n\"events\": [{}]\n}}\n",
                        action,
                        Value::Number(def.deadzone),
                        events.join(", ")
                    ));
                }
                continue;
            }

            if entries.is_empty() {
                continue;
            }
            out.push_str(&format!("\n[{}]\n\n", name));
            for (key, value) in entries {
                out.push_str(&format!("{}={}\n", key, value));
            }
        }

        out
    }

    /// Reads `project.godot` text. Values outside the supported subset are skipped.
    pub fn parse(text: &str) -> Self {
        let mut config = ProjectConfig {
            sections: DEFAULT_SECTIONS
                .iter()
                .map(|s| (s.to_string(), IndexMap::new()))
                .collect(),
            input: IndexMap::new(),
        };
        let mut section = String::new();
        let mut pending: Option<(String, String)> = None;

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some((key, mut block)) = pending.take() {
                block.push('\n');
                block.push_str(trimmed);
                if brace_balance(&block) > 0 {
                    pending = Some((key, block));
                } else {
                    config.insert_parsed(&section, &key, &block);
                }
                continue;
            }

            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].to_string();
                config.sections.entry(section.clone()).or_default();
                continue;
            }

            if section.is_empty() {
                // top-level keys such as config_version
                continue;
            }

            if let Some((key, value)) = trimmed.split_once('=') {
                if brace_balance(value) > 0 {
                    pending = Some((key.to_string(), value.to_string()));
                } else {
                    config.insert_parsed(&section, key, value);
                }
            }
        }

        config
    }

    fn insert_parsed(&mut self, section: &str, key: &str, raw: &str) {
        if section == INPUT_SECTION {
            self.input.insert(
                key.to_string(),
                InputAction {
                    deadzone: parse_deadzone(raw).unwrap_or(0.5),
                    events: parse_events(raw),
                },
            );
            return;
        }

        match parse_value(raw) {
            Ok(value) => self.set(section, key, value),
            Err(e) => log::debug!("[config] Skipping {}/{}: {}", section, key, e),
        }
    }
}

fn brace_balance(text: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn parse_deadzone(block: &str) -> Option<f64> {
    let start = block.find("\"deadzone\":")? + "\"deadzone\":".len();
    let rest = block[start..].trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

fn field_u32(object: &str, field: &str) -> Option<u32> {
    let search = format!("\"{}\":", field);
    let start = object.find(&search)? + search.len();
    let rest = &object[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse().ok()
}

fn parse_events(block: &str) -> Vec<InputEvent> {
    let mut events = Vec::new();

    for object in block.split("Object(").skip(1) {
        let class = object.split(',').next().unwrap_or_default().trim();
        let event = match class {
            "InputEventKey" => field_u32(object, "physical_keycode")
                .filter(|code| *code != 0)
                .or_else(|| field_u32(object, "keycode"))
                .map(|physical_keycode| InputEvent::Key { physical_keycode }),
            "InputEventMouseButton" => field_u32(object, "button_index")
                .map(|button_index| InputEvent::MouseButton { button_index }),
            "InputEventJoypadButton" => field_u32(object, "button_index")
                .map(|button_index| InputEvent::JoypadButton { button_index }),
            other => {
                log::debug!("[config] Ignoring input event class {}", other);
                None
            }
        };
        if let Some(event) = event {
            if !events.contains(&event) {
                events.push(event);
            }
        }
    }

    events
}
