//! Writes scenes in the engine's text scene format (`.tscn`).
//!
//! ```text
//! [gd_scene load_steps=2 format=3]
//!
//! [ext_resource type="Script" path="res://scripts/player.gd" id="1"]
//!
//! [node name="Root" type="Node2D"]
//!
//! [node name="Player" type="Sprite2D" parent="Root"]
//! position = Vector2(10, 20)
//! script = ExtResource("1")
//! ```

use crate::error::ProjectError;
use crate::graph::SceneGraph;
use crate::project::{
    resource_export_path, script_export_path, ProjectModel, Resource, Scene, SceneMetadata,
    ScriptLanguage,
};
use crate::value::{quote, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SCENE_FORMAT: u32 = 3;

/// How a node's `parent="..."` attribute is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPathStyle {
    /// Ancestor names from the root: `Root`, `Root/A`.
    #[default]
    RootNamed,
    /// The engine's own convention: `.` for the root, then `A`, `A/B`.
    EngineRelative,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    pub parent_style: ParentPathStyle,
}

struct NodeView<'a> {
    node_type: &'a str,
    children: &'a [String],
    properties: Option<&'a IndexMap<String, Value>>,
    script: Option<&'a str>,
}

/// Anything the writer can walk: a full scene or its flat projection.
trait NodeSource {
    fn root(&self) -> Option<&str>;
    fn node(&self, id: &str) -> Option<NodeView<'_>>;
    fn metadata(&self) -> &SceneMetadata;
}

impl NodeSource for Scene {
    fn root(&self) -> Option<&str> {
        self.root_node_id.as_deref()
    }

    fn node(&self, id: &str) -> Option<NodeView<'_>> {
        self.nodes.get(id).map(|n| NodeView {
            node_type: &n.node_type,
            children: &n.children,
            properties: Some(&n.properties),
            script: n.script.as_deref(),
        })
    }

    fn metadata(&self) -> &SceneMetadata {
        &self.metadata
    }
}

impl NodeSource for SceneGraph {
    fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    fn node(&self, id: &str) -> Option<NodeView<'_>> {
        self.nodes.get(id).map(|n| NodeView {
            node_type: &n.node_type,
            children: &n.children,
            properties: None,
            script: n.scripts.first().map(String::as_str),
        })
    }

    fn metadata(&self) -> &SceneMetadata {
        &self.metadata
    }
}

struct Visit<'a> {
    id: &'a str,
    view: NodeView<'a>,
    /// `parent="..."` value; `None` for the root.
    parent: Option<String>,
}

/// Pre-order walk from the root. Dangling and already-visited ids are skipped.
fn walk<'a, S: NodeSource>(
    source: &'a S,
    style: ParentPathStyle,
    paths: &mut IndexMap<String, String>,
) -> Vec<Visit<'a>> {
    let mut visits = Vec::new();
    let Some(root) = source.root() else {
        return visits;
    };

    let mut seen = HashSet::new();
    // (id, parent id) in reverse order so children pop in stored order
    let mut stack: Vec<(&'a str, Option<&'a str>)> = vec![(root, None)];

    while let Some((id, parent)) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(view) = source.node(id) else {
            log::debug!("[serializer] Skipping dangling node id '{}'", id);
            continue;
        };

        let parent_path = parent.and_then(|p| paths.get(p).cloned());
        let own_path = match (&parent_path, style) {
            (None, ParentPathStyle::RootNamed) => id.to_string(),
            (None, ParentPathStyle::EngineRelative) => ".".to_string(),
            (Some(p), _) if p == "." => id.to_string(),
            (Some(p), _) => format!("{}/{}", p, id),
        };
        paths.insert(id.to_string(), own_path);

        for child in view.children.iter().rev() {
            stack.push((child.as_str(), Some(id)));
        }
        visits.push(Visit {
            id,
            view,
            parent: parent_path,
        });
    }

    visits
}

struct ExtResource {
    kind: String,
    path: String,
}

fn write_scene<S: NodeSource>(
    source: &S,
    options: &SerializeOptions,
    script_language: impl Fn(&str) -> ScriptLanguage,
    resources: &[(String, String)],
    connections: &[(String, String, String, String)],
) -> String {
    let mut paths = IndexMap::new();
    let visits = walk(source, options.parent_style, &mut paths);

    let mut ext: Vec<ExtResource> = Vec::new();
    let mut script_ids: IndexMap<&str, usize> = IndexMap::new();
    for visit in &visits {
        if let Some(script) = visit.view.script {
            if !script_ids.contains_key(script) {
                ext.push(ExtResource {
                    kind: "Script".to_string(),
                    path: format!("res://{}", script_export_path(script, &script_language(script))),
                });
                script_ids.insert(script, ext.len());
            }
        }
    }
    for (kind, path) in resources {
        ext.push(ExtResource {
            kind: kind.clone(),
            path: format!("res://{}", resource_export_path(path)),
        });
    }

    let mut out = if ext.is_empty() {
        format!("[gd_scene format={}]\n", SCENE_FORMAT)
    } else {
        format!("[gd_scene load_steps={} format={}]\n", ext.len() + 1, SCENE_FORMAT)
    };

    if !ext.is_empty() {
        out.push('\n');
        for (i, res) in ext.iter().enumerate() {
            out.push_str(&format!(
                "[ext_resource type={} path={} id=\"{}\"]\n",
                quote(&res.kind),
                quote(&res.path),
                i + 1
            ));
        }
    }

    for visit in &visits {
        out.push('\n');
        out.push_str(&format!(
            "[node name={} type={}",
            quote(visit.id),
            quote(visit.view.node_type)
        ));
        if let Some(parent) = &visit.parent {
            out.push_str(&format!(" parent={}", quote(parent)));
        }
        out.push_str("]\n");

        if let Some(properties) = visit.view.properties {
            for (name, value) in properties {
                out.push_str(&format!("{} = {}\n", name, value));
            }
        }
        if let Some(id) = visit.view.script.and_then(|s| script_ids.get(s)) {
            out.push_str(&format!("script = ExtResource(\"{}\")\n", id));
        }
        if visit.parent.is_none() {
            for (name, value) in source.metadata().to_properties() {
                out.push_str(&format!("{} = {}\n", name, value));
            }
        }
    }

    let mut wrote_connection = false;
    for (signal, from, to, method) in connections {
        let (Some(from), Some(to)) = (paths.get(from), paths.get(to)) else {
            log::debug!("[serializer] Skipping connection {} with unknown endpoint", signal);
            continue;
        };
        if !wrote_connection {
            out.push('\n');
            wrote_connection = true;
        }
        out.push_str(&format!(
            "[connection signal={} from={} to={} method={}]\n",
            quote(signal),
            quote(from),
            quote(to),
            quote(method)
        ));
    }

    out
}

pub fn serialize_scene(project: &ProjectModel, path: &str) -> Result<String, ProjectError> {
    serialize_scene_with(project, path, &SerializeOptions::default())
}

pub fn serialize_scene_with(
    project: &ProjectModel,
    path: &str,
    options: &SerializeOptions,
) -> Result<String, ProjectError> {
    let scene = project
        .scene(path)
        .ok_or_else(|| ProjectError::SceneNotFound(path.to_string()))?;

    let language = |script: &str| {
        project
            .script(script)
            .map(|s| s.language.clone())
            .unwrap_or_else(|| ScriptLanguage::from_path(script))
    };
    let resources: Vec<(String, String)> = scene
        .resources
        .iter()
        .map(|path| {
            let kind = project
                .resource(path)
                .map(|r| r.resource_type.clone())
                .unwrap_or_else(|| "Resource".to_string());
            (kind, path.clone())
        })
        .collect();
    let connections: Vec<_> = scene
        .connections
        .iter()
        .map(|c| (c.signal.clone(), c.from.clone(), c.to.clone(), c.method.clone()))
        .collect();

    Ok(write_scene(scene, options, language, &resources, &connections))
}

/// Writes a projection. Only node types, hierarchy, scene metadata and the first
/// script of each node are represented.
pub fn serialize_graph(graph: &SceneGraph, options: &SerializeOptions) -> String {
    write_scene(graph, options, ScriptLanguage::from_path, &[], &[])
}

/// Writes a standalone resource file (`.tres`).
pub fn serialize_resource(resource: &Resource) -> String {
    let mut out = format!(
        "[gd_resource type={} format={}]\n\n[resource]\n",
        quote(&resource.resource_type),
        SCENE_FORMAT
    );
    for (name, value) in &resource.properties {
        out.push_str(&format!("{} = {}\n", name, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::author::{Role, SceneAuthor};
    use crate::project::SignalConnection;
    use serde_json::json;

    fn chain_project() -> ProjectModel {
        let mut project = ProjectModel::new("Chain");
        project.create_scene("main").unwrap();
        project.create_node("main", "Root", "Node2D", None).unwrap();
        project.create_node("main", "A", "Node2D", Some("Root")).unwrap();
        project.create_node("main", "B", "Node2D", Some("A")).unwrap();
        project
    }

    #[test]
    fn test_chain_parent_paths() {
        let text = serialize_scene(&chain_project(), "main").unwrap();
        assert_eq!(
            text,
            "[gd_scene format=3]\n\
             \n[node name=\"Root\" type=\"Node2D\"]\n\
             \n[node name=\"A\" type=\"Node2D\" parent=\"Root\"]\n\
             \n[node name=\"B\" type=\"Node2D\" parent=\"Root/A\"]\n"
        );
    }

    #[test]
    fn test_engine_relative_parent_paths() {
        let options = SerializeOptions {
            parent_style: ParentPathStyle::EngineRelative,
        };
        let text = serialize_scene_with(&chain_project(), "main", &options).unwrap();
        assert!(text.contains("[node name=\"Root\" type=\"Node2D\"]\n"));
        assert!(text.contains("[node name=\"A\" type=\"Node2D\" parent=\".\"]"));
        assert!(text.contains("[node name=\"B\" type=\"Node2D\" parent=\"A\"]"));
    }

    #[test]
    fn test_sprite_with_position_and_script() {
        let mut project = ProjectModel::new("Demo");
        project.create_script("player.gd", "gdscript", "extends Sprite2D").unwrap();
        project.create_scene("scenes/main").unwrap();
        project.create_node("scenes/main", "Root", "Node2D", None).unwrap();
        project.create_node("scenes/main", "Player", "Sprite2D", Some("Root")).unwrap();
        let position = Value::from_json(&json!({"x": 10, "y": 20})).unwrap();
        project.set_node_property("scenes/main", "Player", "position", position).unwrap();
        project.attach_script_to_node("scenes/main", "Player", "player.gd").unwrap();

        let first = serialize_scene(&project, "scenes/main").unwrap();
        let second = serialize_scene(&project, "scenes/main").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            "[gd_scene load_steps=2 format=3]\n\
             \n[ext_resource type=\"Script\" path=\"res://scripts/player.gd\" id=\"1\"]\n\
             \n[node name=\"Root\" type=\"Node2D\"]\n\
             \n[node name=\"Player\" type=\"Sprite2D\" parent=\"Root\"]\n\
             position = Vector2(10, 20)\n\
             script = ExtResource(\"1\")\n"
        );
    }

    #[test]
    fn test_property_order_and_values() {
        let mut project = chain_project();
        project.set_node_property("main", "A", "visible", false).unwrap();
        project.set_node_property("main", "A", "label", "hi").unwrap();
        project
            .set_node_property("main", "A", "tint", Value::color(1.0, 0.5, 0.0, 1.0))
            .unwrap();
        project
            .set_node_property("main", "A", "stats", Value::from_json(&json!({"hp": 3})).unwrap())
            .unwrap();

        let text = serialize_scene(&project, "main").unwrap();
        assert!(text.contains(
            "parent=\"Root\"]\nvisible = false\nlabel = \"hi\"\ntint = Color(1, 0.5, 0, 1)\nstats = {\"hp\": 3}\n"
        ));
    }

    #[test]
    fn test_dangling_children_are_skipped() {
        let mut project = chain_project();
        project
            .scene_mut("main")
            .unwrap()
            .nodes
            .get_mut("A")
            .unwrap()
            .children
            .insert(0, "Ghost".to_string());

        let text = serialize_scene(&project, "main").unwrap();
        assert!(!text.contains("Ghost"));
        assert!(text.contains("parent=\"Root/A\""));
    }

    #[test]
    fn test_cycles_do_not_hang() {
        let mut project = chain_project();
        project
            .scene_mut("main")
            .unwrap()
            .nodes
            .get_mut("B")
            .unwrap()
            .children
            .push("Root".to_string());

        let text = serialize_scene(&project, "main").unwrap();
        assert_eq!(text.matches("[node ").count(), 3);
    }

    #[test]
    fn test_unknown_scene() {
        assert!(matches!(
            serialize_scene(&ProjectModel::new("Empty"), "nope"),
            Err(ProjectError::SceneNotFound(_))
        ));
    }

    #[test]
    fn test_rootless_scene_has_header_only() {
        let mut project = ProjectModel::new("Empty");
        project.create_scene("blank").unwrap();
        assert_eq!(serialize_scene(&project, "blank").unwrap(), "[gd_scene format=3]\n");
    }

    #[test]
    fn test_connections_and_resources() {
        let mut project = chain_project();
        project.create_resource("ui/theme", "Theme", IndexMap::new()).unwrap();
        project.add_resource_ref("main", "ui/theme").unwrap();
        project
            .add_connection(
                "main",
                SignalConnection {
                    signal: "ready".to_string(),
                    from: "B".to_string(),
                    to: "Root".to_string(),
                    method: "_on_b_ready".to_string(),
                },
            )
            .unwrap();

        let text = serialize_scene(&project, "main").unwrap();
        assert!(text.starts_with("[gd_scene load_steps=2 format=3]\n"));
        assert!(text.contains(
            "[ext_resource type=\"Theme\" path=\"res://resources/ui/theme.tres\" id=\"1\"]"
        ));
        assert!(text.ends_with(
            "\n[connection signal=\"ready\" from=\"Root/A/B\" to=\"Root\" method=\"_on_b_ready\"]\n"
        ));
    }

    #[test]
    fn test_graph_serialization_matches_structure() {
        let mut project = ProjectModel::new("Game");
        let mut author = SceneAuthor::create(&mut project, "level", Role::Gameplay).unwrap();
        author.attach_script("Game", "game.gd").unwrap();

        let text = serialize_graph(&author.to_graph_format(), &SerializeOptions::default());
        assert!(text.contains("[node name=\"Camera2D\" type=\"Camera2D\" parent=\"Root\"]"));
        assert!(text.contains("[ext_resource type=\"Script\" path=\"res://scripts/game.gd\" id=\"1\"]"));
        assert!(text.contains("[node name=\"Game\" type=\"Node\" parent=\"Root\"]\nscript = ExtResource(\"1\")\n"));
    }

    #[test]
    fn test_scene_metadata_on_root_node() {
        let mut project = ProjectModel::new("Game");
        {
            let mut author = SceneAuthor::create(&mut project, "title", Role::Menu).unwrap();
            author.set_description("Main \"title\" menu").unwrap();
            author.mark_as_entry_scene().unwrap();
            author.set_transition_target("level").unwrap();
        }

        let text = serialize_scene(&project, "title").unwrap();
        assert!(text.contains(
            "[node name=\"Root\" type=\"Control\"]\n\
             metadata/scenecraft_role = \"menu\"\n\
             metadata/scenecraft_description = \"Main \\\"title\\\" menu\"\n\
             metadata/scenecraft_entry = true\n\
             metadata/scenecraft_next_scene = \"level\"\n"
        ));
        assert_eq!(text.matches("metadata/").count(), 4);

        let plain = serialize_scene(&chain_project(), "main").unwrap();
        assert!(!plain.contains("metadata/"));
    }

    #[test]
    fn test_resource_file() {
        let mut properties = IndexMap::new();
        properties.insert("size".to_string(), Value::from(16.0));
        let resource = Resource {
            path: "fonts/body".to_string(),
            resource_type: "FontVariation".to_string(),
            properties,
        };
        assert_eq!(
            serialize_resource(&resource),
            "[gd_resource type=\"FontVariation\" format=3]\n\n[resource]\nsize = 16\n"
        );
    }
}
