//! The canonical project model and every mutation entry point on it.

use crate::assets::{Asset, AssetRegistry, AssetType};
use crate::author::Role;
use crate::config::{InputEvent, ProjectConfig};
use crate::error::ProjectError;
use crate::folders::{normalize_path, parent_path, Folder, FolderIndex};
use crate::settings::ModelSettings;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type NodeId = String;

/// What `create_node` does when the requested parent is not in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingParentPolicy {
    /// Insert the node anyway and leave it unlinked.
    #[default]
    KeepUnlinked,
    Reject,
}

/// What a parentless `create_node` does when the scene already has a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondRootPolicy {
    /// The new node silently replaces `root_node_id`.
    #[default]
    Overwrite,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub properties: IndexMap<String, Value>,
    pub script: Option<String>,
}

impl Node {
    pub fn new(id: &str, node_type: &str, parent: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            node_type: node_type.to_string(),
            parent: parent.map(str::to_string),
            children: Vec::new(),
            properties: IndexMap::new(),
            script: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConnection {
    pub signal: String,
    pub from: NodeId,
    pub to: NodeId,
    pub method: String,
}

/// Authoring facts about a scene. Scene files carry them as root `metadata/` properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub role: Option<Role>,
    pub description: Option<String>,
    pub is_entry: bool,
    pub transition_target: Option<String>,
}

/// Root-node property prefix that carries [`SceneMetadata`] through scene files.
pub const METADATA_PREFIX: &str = "metadata/scenecraft_";

impl SceneMetadata {
    /// `metadata/...` root properties for every field that differs from the default.
    pub(crate) fn to_properties(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        if let Some(role) = self.role {
            out.push(("role", Value::from(role.to_string())));
        }
        if let Some(description) = &self.description {
            out.push(("description", Value::from(description.as_str())));
        }
        if self.is_entry {
            out.push(("entry", Value::Bool(true)));
        }
        if let Some(target) = &self.transition_target {
            out.push(("next_scene", Value::from(target.as_str())));
        }
        out.into_iter()
            .map(|(field, value)| (format!("{}{}", METADATA_PREFIX, field), value))
            .collect()
    }

    /// Applies one `metadata/scenecraft_*` root property. Other keys are ignored.
    pub(crate) fn apply_property(&mut self, key: &str, value: &Value) {
        let Some(field) = key.strip_prefix(METADATA_PREFIX) else {
            return;
        };
        match (field, value) {
            ("role", Value::String(role)) => self.role = Some(Role::parse(role)),
            ("description", Value::String(text)) => self.description = Some(text.clone()),
            ("entry", Value::Bool(flag)) => self.is_entry = *flag,
            ("next_scene", Value::String(target)) => self.transition_target = Some(target.clone()),
            _ => log::warn!("[project] Ignoring scene metadata '{}' = {}", key, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub path: String,
    pub nodes: IndexMap<NodeId, Node>,
    pub root_node_id: Option<NodeId>,
    pub connections: Vec<SignalConnection>,
    /// Paths of project resources this scene references.
    pub resources: Vec<String>,
    #[serde(default)]
    pub metadata: SceneMetadata,
}

impl Scene {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            nodes: IndexMap::new(),
            root_node_id: None,
            connections: Vec::new(),
            resources: Vec::new(),
            metadata: SceneMetadata::default(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.root_node_id.as_deref().and_then(|id| self.nodes.get(id))
    }

    /// Inserts a node and links it under its parent when that parent exists.
    pub(crate) fn attach(&mut self, node: Node) {
        if let Some(parent) = node.parent.as_deref().and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScriptLanguage {
    GdScript,
    CSharp,
    Other(String),
}

impl ScriptLanguage {
    pub fn extension(&self) -> &str {
        match self {
            ScriptLanguage::GdScript => "gd",
            ScriptLanguage::CSharp => "cs",
            ScriptLanguage::Other(name) => name,
        }
    }

    /// Language implied by a file extension; extensionless paths are GDScript.
    pub fn from_path(path: &str) -> Self {
        match path.rsplit('/').next().and_then(|n| n.rsplit_once('.')) {
            Some((_, "gd")) | None => ScriptLanguage::GdScript,
            Some((_, "cs")) => ScriptLanguage::CSharp,
            Some((_, ext)) => ScriptLanguage::Other(ext.to_string()),
        }
    }
}

impl From<String> for ScriptLanguage {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "gdscript" | "gd" => ScriptLanguage::GdScript,
            "csharp" | "c#" | "cs" => ScriptLanguage::CSharp,
            _ => ScriptLanguage::Other(s),
        }
    }
}

impl From<&str> for ScriptLanguage {
    fn from(s: &str) -> Self {
        ScriptLanguage::from(s.to_string())
    }
}

impl From<ScriptLanguage> for String {
    fn from(lang: ScriptLanguage) -> Self {
        match lang {
            ScriptLanguage::GdScript => "gdscript".to_string(),
            ScriptLanguage::CSharp => "csharp".to_string(),
            ScriptLanguage::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub path: String,
    pub language: ScriptLanguage,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub properties: IndexMap<String, Value>,
}

/// Archive-relative file for a scene, e.g. `scenes/main` → `scenes/main.tscn`.
pub fn scene_export_path(path: &str) -> String {
    with_extension(path, "tscn")
}

/// Archive-relative file for a script, always under `scripts/`.
pub fn script_export_path(path: &str, language: &ScriptLanguage) -> String {
    let path = path.strip_prefix("scripts/").unwrap_or(path);
    format!("scripts/{}", with_extension(path, language.extension()))
}

/// Archive-relative file for a resource, always under `resources/`.
pub fn resource_export_path(path: &str) -> String {
    let path = path.strip_prefix("resources/").unwrap_or(path);
    format!("resources/{}", with_extension(path, "tres"))
}

fn with_extension(path: &str, ext: &str) -> String {
    let suffix = format!(".{}", ext);
    if path.ends_with(&suffix) {
        path.to_string()
    } else {
        format!("{}{}", path, suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    MissingRoot { scene: String },
    ExtraRoot { scene: String, node: NodeId },
    UnlinkedNode { scene: String, node: NodeId, parent: NodeId },
    MissingScript { scene: String, node: NodeId, script: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::MissingRoot { scene } => {
                write!(f, "scene '{}' has no root node", scene)
            }
            ValidationWarning::ExtraRoot { scene, node } => {
                write!(f, "scene '{}': node '{}' has no parent but is not the root", scene, node)
            }
            ValidationWarning::UnlinkedNode { scene, node, parent } => write!(
                f,
                "scene '{}': node '{}' points at missing parent '{}'",
                scene, node, parent
            ),
            ValidationWarning::MissingScript { scene, node, script } => write!(
                f,
                "scene '{}': node '{}' uses unknown script '{}'",
                scene, node, script
            ),
        }
    }
}

/// Result of [`ProjectModel::validate`]. Warnings never block export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug)]
pub struct ProjectModel {
    name: String,
    engine_version_tag: String,
    config: ProjectConfig,
    scenes: IndexMap<String, Scene>,
    scripts: IndexMap<String, Script>,
    resources: IndexMap<String, Resource>,
    assets: AssetRegistry,
    folders: FolderIndex,
    dangling_parent: DanglingParentPolicy,
    second_root: SecondRootPolicy,
}

impl ProjectModel {
    pub fn new(name: &str) -> Self {
        Self::with_settings(name, &ModelSettings::default())
    }

    pub fn with_settings(name: &str, settings: &ModelSettings) -> Self {
        Self {
            name: name.to_string(),
            engine_version_tag: settings.engine_version_tag.clone(),
            config: ProjectConfig::new(name),
            scenes: IndexMap::new(),
            scripts: IndexMap::new(),
            resources: IndexMap::new(),
            assets: AssetRegistry::new(settings.strict_mode),
            folders: FolderIndex::new(),
            dangling_parent: settings.dangling_parent,
            second_root: settings.second_root,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine_version_tag(&self) -> &str {
        &self.engine_version_tag
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    /// Replaces the config wholesale, then re-applies the project name to it.
    pub(crate) fn replace_config(&mut self, config: ProjectConfig) {
        self.config = config;
        self.config.set_app_name(&self.name);
    }

    pub fn set_project_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.config.set_app_name(name);
    }

    pub fn ensure_folder(&mut self, path: &str) -> &Folder {
        self.folders.ensure_folder(path)
    }

    pub fn folders(&self) -> &FolderIndex {
        &self.folders
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetRegistry {
        &mut self.assets
    }

    pub fn scene(&self, path: &str) -> Option<&Scene> {
        self.scenes.get(&normalize_path(path))
    }

    pub(crate) fn scene_mut(&mut self, path: &str) -> Result<&mut Scene, ProjectError> {
        let path = normalize_path(path);
        match self.scenes.get_mut(&path) {
            Some(scene) => Ok(scene),
            None => Err(ProjectError::SceneNotFound(path)),
        }
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    pub fn script(&self, path: &str) -> Option<&Script> {
        self.scripts.get(&normalize_path(path))
    }

    pub fn scripts(&self) -> impl Iterator<Item = &Script> {
        self.scripts.values()
    }

    pub fn resource(&self, path: &str) -> Option<&Resource> {
        self.resources.get(&normalize_path(path))
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn asset(&self, path: &str) -> Option<&Asset> {
        self.assets.get(path)
    }

    /// Creates an empty scene shell. Its root is set by the first parentless node.
    pub fn create_scene(&mut self, path: &str) -> Result<&Scene, ProjectError> {
        let path = normalize_path(path);
        if self.scenes.contains_key(&path) {
            return Err(ProjectError::AlreadyExists { kind: "scene", path });
        }
        self.folders.ensure_folder(parent_path(&path));
        log::debug!("[project] Created scene {}", path);
        Ok(self.scenes.entry(path.clone()).or_insert_with(|| Scene::new(&path)))
    }

    /// Adds an already-built scene, e.g. one read back from engine text.
    pub(crate) fn insert_scene(&mut self, mut scene: Scene) -> Result<(), ProjectError> {
        let path = normalize_path(&scene.path);
        if self.scenes.contains_key(&path) {
            return Err(ProjectError::AlreadyExists { kind: "scene", path });
        }
        self.folders.ensure_folder(parent_path(&path));
        scene.path = path.clone();
        self.scenes.insert(path, scene);
        Ok(())
    }

    pub fn remove_scene(&mut self, path: &str) -> Result<Scene, ProjectError> {
        let path = normalize_path(path);
        self.scenes
            .shift_remove(&path)
            .ok_or(ProjectError::SceneNotFound(path))
    }

    pub fn create_node(
        &mut self,
        scene_path: &str,
        node_id: &str,
        node_type: &str,
        parent_id: Option<&str>,
    ) -> Result<&Node, ProjectError> {
        let dangling_parent = self.dangling_parent;
        let second_root = self.second_root;
        let scene = self.scene_mut(scene_path)?;

        if scene.nodes.contains_key(node_id) {
            return Err(ProjectError::DuplicateNode {
                scene: scene.path.clone(),
                node: node_id.to_string(),
            });
        }

        match parent_id {
            Some(parent) if !scene.nodes.contains_key(parent) => match dangling_parent {
                DanglingParentPolicy::KeepUnlinked => {
                    log::warn!(
                        "[project] {}: parent '{}' of '{}' not found, node left unlinked",
                        scene.path,
                        parent,
                        node_id
                    );
                }
                DanglingParentPolicy::Reject => {
                    return Err(ProjectError::NodeNotFound {
                        scene: scene.path.clone(),
                        node: parent.to_string(),
                    });
                }
            },
            Some(_) => {}
            None => {
                if let Some(root) = scene.root_node_id.clone() {
                    match second_root {
                        SecondRootPolicy::Overwrite => {
                            log::warn!(
                                "[project] {}: root '{}' replaced by '{}'",
                                scene.path,
                                root,
                                node_id
                            );
                        }
                        SecondRootPolicy::Reject => {
                            return Err(ProjectError::RootAlreadySet {
                                scene: scene.path.clone(),
                                root,
                            });
                        }
                    }
                }
                scene.root_node_id = Some(node_id.to_string());
            }
        }

        scene.attach(Node::new(node_id, node_type, parent_id));
        Ok(&scene.nodes[node_id])
    }

    fn node_mut(&mut self, scene_path: &str, node_id: &str) -> Result<&mut Node, ProjectError> {
        let scene = self.scene_mut(scene_path)?;
        let scene_path = scene.path.clone();
        scene
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| ProjectError::NodeNotFound {
                scene: scene_path,
                node: node_id.to_string(),
            })
    }

    pub fn set_node_property(
        &mut self,
        scene_path: &str,
        node_id: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ProjectError> {
        let node = self.node_mut(scene_path, node_id)?;
        node.properties.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn attach_script_to_node(
        &mut self,
        scene_path: &str,
        node_id: &str,
        script_path: &str,
    ) -> Result<(), ProjectError> {
        let script_path = normalize_path(script_path);
        let node = self.node_mut(scene_path, node_id)?;
        node.script = Some(script_path);
        Ok(())
    }

    pub fn add_connection(
        &mut self,
        scene_path: &str,
        connection: SignalConnection,
    ) -> Result<(), ProjectError> {
        let scene = self.scene_mut(scene_path)?;
        for end in [&connection.from, &connection.to] {
            if !scene.nodes.contains_key(end) {
                return Err(ProjectError::NodeNotFound {
                    scene: scene.path.clone(),
                    node: end.clone(),
                });
            }
        }
        scene.connections.push(connection);
        Ok(())
    }

    /// Records that a scene uses a project resource. Repeated calls are no-ops.
    pub fn add_resource_ref(
        &mut self,
        scene_path: &str,
        resource_path: &str,
    ) -> Result<(), ProjectError> {
        let resource_path = normalize_path(resource_path);
        if !self.resources.contains_key(&resource_path) {
            return Err(ProjectError::NotFound {
                kind: "resource",
                path: resource_path,
            });
        }
        let scene = self.scene_mut(scene_path)?;
        if !scene.resources.contains(&resource_path) {
            scene.resources.push(resource_path);
        }
        Ok(())
    }

    pub fn create_script(
        &mut self,
        path: &str,
        language: impl Into<ScriptLanguage>,
        source: &str,
    ) -> Result<&Script, ProjectError> {
        let path = normalize_path(path);
        if self.scripts.contains_key(&path) {
            return Err(ProjectError::AlreadyExists { kind: "script", path });
        }
        self.folders.ensure_folder(parent_path(&path));
        let script = Script {
            path: path.clone(),
            language: language.into(),
            source: source.to_string(),
        };
        Ok(self.scripts.entry(path).or_insert(script))
    }

    pub fn remove_script(&mut self, path: &str) -> Result<Script, ProjectError> {
        let path = normalize_path(path);
        self.scripts
            .shift_remove(&path)
            .ok_or(ProjectError::NotFound { kind: "script", path })
    }

    pub fn create_resource(
        &mut self,
        path: &str,
        resource_type: &str,
        properties: IndexMap<String, Value>,
    ) -> Result<&Resource, ProjectError> {
        let path = normalize_path(path);
        if self.resources.contains_key(&path) {
            return Err(ProjectError::AlreadyExists { kind: "resource", path });
        }
        self.folders.ensure_folder(parent_path(&path));
        let resource = Resource {
            path: path.clone(),
            resource_type: resource_type.to_string(),
            properties,
        };
        Ok(self.resources.entry(path).or_insert(resource))
    }

    pub fn remove_resource(&mut self, path: &str) -> Result<Resource, ProjectError> {
        let path = normalize_path(path);
        self.resources
            .shift_remove(&path)
            .ok_or(ProjectError::NotFound { kind: "resource", path })
    }

    pub fn add_asset(
        &mut self,
        path: &str,
        asset_type: impl Into<AssetType>,
        data: Vec<u8>,
    ) -> Result<&Asset, ProjectError> {
        let path = self.assets.add(path, asset_type, data)?.path.clone();
        self.folders.add_file(&path);
        self.assets
            .get(&path)
            .ok_or(ProjectError::NotFound { kind: "asset", path })
    }

    pub(crate) fn add_named_asset(
        &mut self,
        path: &str,
        asset_type: AssetType,
        data: Vec<u8>,
        original_name: &str,
    ) -> Result<(), ProjectError> {
        let path = normalize_path(path);
        self.assets.add_named(&path, asset_type, data, original_name)?;
        self.folders.add_file(&path);
        Ok(())
    }

    pub fn remove_asset(&mut self, path: &str) -> Result<Asset, ProjectError> {
        let asset = self.assets.remove(path)?;
        self.folders.remove_file(&asset.path);
        Ok(asset)
    }

    pub fn define_input_action(&mut self, name: &str, events: Vec<InputEvent>) {
        self.config.define_input_action(name, events);
    }

    /// Reports structural problems in every scene. Never fails.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for scene in self.scenes.values() {
            if scene.root().is_none() {
                report.warnings.push(ValidationWarning::MissingRoot {
                    scene: scene.path.clone(),
                });
            }

            for node in scene.nodes.values() {
                match node.parent.as_deref() {
                    None if scene.root_node_id.as_deref() != Some(node.id.as_str()) => {
                        report.warnings.push(ValidationWarning::ExtraRoot {
                            scene: scene.path.clone(),
                            node: node.id.clone(),
                        });
                    }
                    Some(parent) if !scene.nodes.contains_key(parent) => {
                        report.warnings.push(ValidationWarning::UnlinkedNode {
                            scene: scene.path.clone(),
                            node: node.id.clone(),
                            parent: parent.to_string(),
                        });
                    }
                    _ => {}
                }

                if let Some(script) = &node.script {
                    if !self.scripts.contains_key(script) {
                        report.warnings.push(ValidationWarning::MissingScript {
                            scene: scene.path.clone(),
                            node: node.id.clone(),
                            script: script.clone(),
                        });
                    }
                }
            }
        }

        for warning in &report.warnings {
            log::warn!("[project] {}", warning);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with_scene() -> ProjectModel {
        let mut project = ProjectModel::new("Test");
        project.create_scene("scenes/main").unwrap();
        project
    }

    #[test]
    fn test_project_name_stays_in_config() {
        let mut project = ProjectModel::new("First");
        project.set_project_name("Second");
        assert_eq!(project.name(), "Second");
        assert_eq!(project.config().app_name(), Some("Second"));
    }

    #[test]
    fn test_create_scene_ensures_folder_and_rejects_duplicates() {
        let mut project = project_with_scene();
        assert!(project.folders().contains("scenes"));

        project.create_node("scenes/main", "Root", "Node2D", None).unwrap();
        let before = project.scene("scenes/main").unwrap().clone();

        let err = project.create_scene("scenes/main").unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists { kind: "scene", .. }));
        assert_eq!(project.scene("scenes/main").unwrap(), &before);
    }

    #[test]
    fn test_first_parentless_node_becomes_root() {
        let mut project = project_with_scene();
        project.create_node("scenes/main", "Root", "Node2D", None).unwrap();
        project.create_node("scenes/main", "A", "Node2D", Some("Root")).unwrap();
        project.create_node("scenes/main", "B", "Sprite2D", Some("A")).unwrap();

        let scene = project.scene("scenes/main").unwrap();
        assert_eq!(scene.root_node_id.as_deref(), Some("Root"));
        assert_eq!(scene.node("Root").unwrap().children, vec!["A"]);
        assert_eq!(scene.node("A").unwrap().children, vec!["B"]);
        assert_eq!(scene.node("B").unwrap().parent.as_deref(), Some("A"));
    }

    #[test]
    fn test_create_node_errors() {
        let mut project = project_with_scene();
        assert!(matches!(
            project.create_node("scenes/missing", "Root", "Node", None),
            Err(ProjectError::SceneNotFound(_))
        ));

        project.create_node("scenes/main", "Root", "Node", None).unwrap();
        assert!(matches!(
            project.create_node("scenes/main", "Root", "Node2D", None),
            Err(ProjectError::DuplicateNode { .. })
        ));
        assert_eq!(project.scene("scenes/main").unwrap().node("Root").unwrap().node_type, "Node");
    }

    #[test]
    fn test_dangling_parent_is_kept_unlinked_by_default() {
        let mut project = project_with_scene();
        project.create_node("scenes/main", "Root", "Node", None).unwrap();
        project.create_node("scenes/main", "Lost", "Node", Some("Nowhere")).unwrap();

        let scene = project.scene("scenes/main").unwrap();
        assert!(scene.node("Lost").is_some());
        assert!(scene.node("Root").unwrap().children.is_empty());

        let report = project.validate();
        assert!(report.warnings.contains(&ValidationWarning::UnlinkedNode {
            scene: "scenes/main".to_string(),
            node: "Lost".to_string(),
            parent: "Nowhere".to_string(),
        }));
    }

    #[test]
    fn test_strict_node_policies() {
        let settings = ModelSettings {
            dangling_parent: DanglingParentPolicy::Reject,
            second_root: SecondRootPolicy::Reject,
            ..ModelSettings::default()
        };
        let mut project = ProjectModel::with_settings("Strict", &settings);
        project.create_scene("main").unwrap();
        project.create_node("main", "Root", "Node", None).unwrap();

        assert!(matches!(
            project.create_node("main", "Lost", "Node", Some("Nowhere")),
            Err(ProjectError::NodeNotFound { .. })
        ));
        assert!(matches!(
            project.create_node("main", "Other", "Node", None),
            Err(ProjectError::RootAlreadySet { .. })
        ));
        assert_eq!(project.scene("main").unwrap().nodes.len(), 1);
    }

    #[test]
    fn test_second_root_overwrites_by_default() {
        let mut project = project_with_scene();
        project.create_node("scenes/main", "Root", "Node", None).unwrap();
        project.create_node("scenes/main", "Other", "Node", None).unwrap();

        let scene = project.scene("scenes/main").unwrap();
        assert_eq!(scene.root_node_id.as_deref(), Some("Other"));
        assert!(project
            .validate()
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::ExtraRoot { node, .. } if node == "Root")));
    }

    #[test]
    fn test_properties_and_scripts_require_node() {
        let mut project = project_with_scene();
        project.create_node("scenes/main", "Root", "Node2D", None).unwrap();

        project
            .set_node_property("scenes/main", "Root", "position", Value::vector2(1.0, 2.0))
            .unwrap();
        project.set_node_property("scenes/main", "Root", "position", 5.0).unwrap();
        project.attach_script_to_node("scenes/main", "Root", "player.gd").unwrap();

        let root = project.scene("scenes/main").unwrap().node("Root").unwrap();
        assert_eq!(root.properties["position"], Value::Number(5.0));
        assert_eq!(root.script.as_deref(), Some("player.gd"));

        assert!(matches!(
            project.set_node_property("scenes/main", "Ghost", "x", 1.0),
            Err(ProjectError::NodeNotFound { .. })
        ));
        assert!(matches!(
            project.attach_script_to_node("scenes/main", "Ghost", "player.gd"),
            Err(ProjectError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_entities_leave_originals_untouched() {
        let mut project = ProjectModel::new("Dupes");
        project.create_script("player.gd", "gdscript", "extends Node").unwrap();
        project.create_resource("theme", "Theme", IndexMap::new()).unwrap();
        project.add_asset("textures/a.png", "texture", vec![7]).unwrap();

        assert!(project.create_script("player.gd", "csharp", "x").is_err());
        assert!(project.create_resource("theme", "Font", IndexMap::new()).is_err());
        assert!(project.add_asset("textures/a.png", "audio", vec![8]).is_err());

        assert_eq!(project.script("player.gd").unwrap().source, "extends Node");
        assert_eq!(project.resource("theme").unwrap().resource_type, "Theme");
        assert_eq!(project.asset("textures/a.png").unwrap().raw_data, vec![7]);
        assert_eq!(project.folders().get("textures").unwrap().files, vec!["textures/a.png"]);
    }

    #[test]
    fn test_remove_entities() {
        let mut project = project_with_scene();
        project.add_asset("textures/a.png", "texture", vec![7]).unwrap();
        project.remove_asset("textures/a.png").unwrap();
        assert!(project.folders().get("textures").unwrap().files.is_empty());

        project.remove_scene("scenes/main").unwrap();
        assert!(matches!(
            project.remove_scene("scenes/main"),
            Err(ProjectError::SceneNotFound(_))
        ));
        assert!(matches!(
            project.remove_script("nope.gd"),
            Err(ProjectError::NotFound { kind: "script", .. })
        ));
    }

    #[test]
    fn test_validate_reports_without_failing() {
        let mut project = project_with_scene();
        project.create_scene("scenes/empty").unwrap();
        project.create_node("scenes/main", "Root", "Node", None).unwrap();
        project.attach_script_to_node("scenes/main", "Root", "missing.gd").unwrap();

        let report = project.validate();
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.contains(&ValidationWarning::MissingRoot {
            scene: "scenes/empty".to_string()
        }));
    }

    #[test]
    fn test_connections_and_resource_refs() {
        let mut project = project_with_scene();
        project.create_node("scenes/main", "Root", "Control", None).unwrap();
        project.create_node("scenes/main", "Button", "Button", Some("Root")).unwrap();

        let connection = SignalConnection {
            signal: "pressed".to_string(),
            from: "Button".to_string(),
            to: "Root".to_string(),
            method: "_on_pressed".to_string(),
        };
        project.add_connection("scenes/main", connection.clone()).unwrap();
        assert!(project
            .add_connection(
                "scenes/main",
                SignalConnection {
                    from: "Ghost".to_string(),
                    ..connection
                }
            )
            .is_err());

        assert!(project.add_resource_ref("scenes/main", "theme").is_err());
        project.create_resource("theme", "Theme", IndexMap::new()).unwrap();
        project.add_resource_ref("scenes/main", "theme").unwrap();
        project.add_resource_ref("scenes/main", "theme").unwrap();

        let scene = project.scene("scenes/main").unwrap();
        assert_eq!(scene.connections.len(), 1);
        assert_eq!(scene.resources, vec!["theme"]);
    }

    #[test]
    fn test_export_paths() {
        assert_eq!(scene_export_path("scenes/main"), "scenes/main.tscn");
        assert_eq!(scene_export_path("main.tscn"), "main.tscn");
        assert_eq!(
            script_export_path("player", &ScriptLanguage::GdScript),
            "scripts/player.gd"
        );
        assert_eq!(
            script_export_path("scripts/Enemy.cs", &ScriptLanguage::CSharp),
            "scripts/Enemy.cs"
        );
        assert_eq!(resource_export_path("ui/theme"), "resources/ui/theme.tres");
    }

    #[test]
    fn test_scene_metadata_properties() {
        assert!(SceneMetadata::default().to_properties().is_empty());

        let metadata = SceneMetadata {
            role: Some(Role::Gameplay3d),
            description: None,
            is_entry: true,
            transition_target: Some("scenes/end".to_string()),
        };
        let properties = metadata.to_properties();
        assert_eq!(
            properties,
            vec![
                ("metadata/scenecraft_role".to_string(), Value::from("gameplay_3d")),
                ("metadata/scenecraft_entry".to_string(), Value::Bool(true)),
                ("metadata/scenecraft_next_scene".to_string(), Value::from("scenes/end")),
            ]
        );

        let mut restored = SceneMetadata::default();
        for (key, value) in &properties {
            restored.apply_property(key, value);
        }
        assert_eq!(restored, metadata);

        // wrong value kinds and foreign keys leave the metadata alone
        restored.apply_property("metadata/scenecraft_entry", &Value::from("yes"));
        restored.apply_property("metadata/other", &Value::Bool(false));
        assert_eq!(restored, metadata);
    }
}
