//! Role-driven scene templates and the authoring façade over [`ProjectModel`].

use crate::config::{APP_SECTION, MAIN_SCENE_KEY};
use crate::error::ProjectError;
use crate::graph::{project_scene, SceneGraph};
use crate::project::{scene_export_path, ProjectModel, Scene};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ROOT_NAME: &str = "Root";

/// Coarse authoring intent that decides a scene's root type and skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Gameplay,
    #[serde(rename = "gameplay_3d")]
    Gameplay3d,
    Menu,
    Cutscene,
}

impl Role {
    /// Unknown names fall back to [`Role::Gameplay`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "gameplay_3d" | "gameplay3d" | "3d" => Role::Gameplay3d,
            "menu" | "ui" => Role::Menu,
            "cutscene" => Role::Cutscene,
            "gameplay" => Role::Gameplay,
            other => {
                log::debug!("[author] Unknown role '{}', using gameplay", other);
                Role::Gameplay
            }
        }
    }

    pub fn root_type(&self) -> &'static str {
        match self {
            Role::Gameplay => "Node2D",
            Role::Gameplay3d => "Node3D",
            Role::Menu => "Control",
            Role::Cutscene => "Node",
        }
    }

    pub fn camera_type(&self) -> Option<&'static str> {
        match self {
            Role::Gameplay => Some("Camera2D"),
            Role::Gameplay3d => Some("Camera3D"),
            Role::Menu | Role::Cutscene => None,
        }
    }

    /// `(name, type)` of every node the bootstrap places under `Root`.
    fn skeleton(&self) -> Vec<(&'static str, &'static str)> {
        let mut nodes = Vec::with_capacity(4);
        if let Some(camera) = self.camera_type() {
            nodes.push((camera, camera));
        }
        nodes.push(("UI", "CanvasLayer"));
        nodes.push(("Input", "Node"));
        nodes.push(("Game", "Node"));
        nodes
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Gameplay => "gameplay",
            Role::Gameplay3d => "gameplay_3d",
            Role::Menu => "menu",
            Role::Cutscene => "cutscene",
        })
    }
}

/// Authoring operations scoped to one scene of a project.
pub struct SceneAuthor<'a> {
    project: &'a mut ProjectModel,
    scene_path: String,
}

impl<'a> SceneAuthor<'a> {
    /// Creates the scene and seeds the role skeleton.
    pub fn create(
        project: &'a mut ProjectModel,
        path: &str,
        role: Role,
    ) -> Result<Self, ProjectError> {
        let scene_path = project.create_scene(path)?.path.clone();
        project.scene_mut(&scene_path)?.metadata.role = Some(role);
        log::info!("[author] Created {} scene {}", role, scene_path);

        let mut author = Self {
            project,
            scene_path,
        };
        author.bootstrap()?;
        Ok(author)
    }

    pub fn open(project: &'a mut ProjectModel, path: &str) -> Result<Self, ProjectError> {
        let scene_path = project
            .scene(path)
            .map(|s| s.path.clone())
            .ok_or_else(|| ProjectError::SceneNotFound(path.to_string()))?;
        Ok(Self {
            project,
            scene_path,
        })
    }

    pub fn scene(&self) -> &Scene {
        self.project
            .scene(&self.scene_path)
            .expect("authored scene is owned by the borrowed project")
    }

    pub fn role(&self) -> Role {
        self.scene().metadata.role.unwrap_or_default()
    }

    /// Adds any missing skeleton node. Names that already exist are left alone.
    pub fn bootstrap(&mut self) -> Result<(), ProjectError> {
        let role = self.role();
        if self.scene().node(ROOT_NAME).is_none() {
            self.project
                .create_node(&self.scene_path, ROOT_NAME, role.root_type(), None)?;
        }
        for (name, node_type) in role.skeleton() {
            if self.scene().node(name).is_none() {
                self.project
                    .create_node(&self.scene_path, name, node_type, Some(ROOT_NAME))?;
            }
        }
        Ok(())
    }

    /// Adds a node under `parent`, or under `Root` when no parent is given.
    pub fn add_node(
        &mut self,
        name: &str,
        node_type: &str,
        parent: Option<&str>,
    ) -> Result<(), ProjectError> {
        let parent = parent.unwrap_or(ROOT_NAME);
        self.project
            .create_node(&self.scene_path, name, node_type, Some(parent))?;
        Ok(())
    }

    pub fn set_property(
        &mut self,
        node: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ProjectError> {
        self.project
            .set_node_property(&self.scene_path, node, name, value)
    }

    /// Attaching the script a node already has is a successful no-op.
    pub fn attach_script(&mut self, node: &str, script: &str) -> Result<(), ProjectError> {
        let current = self
            .scene()
            .node(node)
            .ok_or_else(|| ProjectError::NodeNotFound {
                scene: self.scene_path.clone(),
                node: node.to_string(),
            })?
            .script
            .clone();
        if current.as_deref() == Some(script) {
            return Ok(());
        }
        self.project
            .attach_script_to_node(&self.scene_path, node, script)
    }

    pub fn set_description(&mut self, description: &str) -> Result<(), ProjectError> {
        self.project.scene_mut(&self.scene_path)?.metadata.description =
            Some(description.to_string());
        Ok(())
    }

    /// Flags this scene as the one the game starts in and points the project's
    /// main scene setting at it.
    pub fn mark_as_entry_scene(&mut self) -> Result<(), ProjectError> {
        self.project.scene_mut(&self.scene_path)?.metadata.is_entry = true;
        let res_path = format!("res://{}", scene_export_path(&self.scene_path));
        self.project
            .config_mut()
            .set(APP_SECTION, MAIN_SCENE_KEY, Value::from(res_path));
        Ok(())
    }

    /// Records the scene this one hands off to. The target is not checked.
    pub fn set_transition_target(&mut self, target_scene: &str) -> Result<(), ProjectError> {
        self.project.scene_mut(&self.scene_path)?.metadata.transition_target =
            Some(target_scene.to_string());
        Ok(())
    }

    pub fn to_graph_format(&self) -> SceneGraph {
        project_scene(self.scene())
    }
}
