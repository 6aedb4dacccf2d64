//! Flat, export-oriented view of a scene: node → type, parent, children, scripts.

use crate::author::Role;
use crate::project::{Scene, SceneMetadata};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub scripts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneGraph {
    pub root: Option<String>,
    pub nodes: IndexMap<String, GraphNode>,
    pub metadata: SceneMetadata,
    pub role: Role,
    pub root_type: String,
}

impl SceneGraph {
    /// Adds `script` to the node's list unless already present.
    /// Returns false when the node does not exist.
    pub fn attach_script(&mut self, node: &str, script: &str) -> bool {
        match self.nodes.get_mut(node) {
            Some(entry) => {
                if !entry.scripts.iter().any(|s| s == script) {
                    entry.scripts.push(script.to_string());
                }
                true
            }
            None => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Read-only projection of a scene. Always consistent with the scene it was built from.
pub fn project_scene(scene: &Scene) -> SceneGraph {
    let role = scene.metadata.role.unwrap_or_default();
    let nodes = scene
        .nodes
        .values()
        .map(|node| {
            (
                node.id.clone(),
                GraphNode {
                    node_type: node.node_type.clone(),
                    parent: node.parent.clone(),
                    children: node.children.clone(),
                    scripts: node.script.iter().cloned().collect(),
                },
            )
        })
        .collect();

    SceneGraph {
        root: scene.root_node_id.clone(),
        nodes,
        metadata: scene.metadata.clone(),
        role,
        root_type: scene
            .root()
            .map(|r| r.node_type.clone())
            .unwrap_or_else(|| role.root_type().to_string()),
    }
}
