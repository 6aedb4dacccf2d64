//! Binary assets (textures, audio, fonts, models) keyed by project path.

use crate::error::ProjectError;
use crate::folders::normalize_path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Semantic category of an asset. Anything unrecognized is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetType {
    Texture,
    Audio,
    Font,
    Model,
    Gltf,
    Other(String),
}

impl AssetType {
    pub fn as_str(&self) -> &str {
        match self {
            AssetType::Texture => "texture",
            AssetType::Audio => "audio",
            AssetType::Font => "font",
            AssetType::Model => "model",
            AssetType::Gltf => "gltf",
            AssetType::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, AssetType::Other(_))
    }

    /// Guesses the category from a file extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "webp" | "svg" | "bmp" | "tga" => AssetType::Texture,
            "wav" | "ogg" | "mp3" => AssetType::Audio,
            "ttf" | "otf" | "woff" | "woff2" => AssetType::Font,
            "gltf" => AssetType::Gltf,
            "glb" | "obj" | "fbx" | "dae" => AssetType::Model,
            _ => AssetType::Other(ext),
        }
    }
}

impl From<String> for AssetType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "texture" => AssetType::Texture,
            "audio" => AssetType::Audio,
            "font" => AssetType::Font,
            "model" => AssetType::Model,
            "gltf" => AssetType::Gltf,
            _ => AssetType::Other(s),
        }
    }
}

impl From<&str> for AssetType {
    fn from(s: &str) -> Self {
        AssetType::from(s.to_string())
    }
}

impl From<AssetType> for String {
    fn from(t: AssetType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated binary payload. Never mutated after it enters the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: String,
    pub asset_type: AssetType,
    pub raw_data: Vec<u8>,
    pub original_name: String,
}

impl Asset {
    /// Lowercase hex SHA-256 of the payload.
    pub fn digest(&self) -> String {
        hex_digest(&self.raw_data)
    }
}

pub(crate) fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetEvent {
    Added { path: String, asset_type: AssetType },
    Removed { path: String },
    Invalid { path: String, reason: String },
}

pub trait AssetObserver {
    fn on_asset_event(&self, event: &AssetEvent);
}

impl<F: Fn(&AssetEvent)> AssetObserver for F {
    fn on_asset_event(&self, event: &AssetEvent) {
        self(event)
    }
}

#[derive(Default)]
pub struct AssetRegistry {
    assets: IndexMap<String, Asset>,
    strict_mode: bool,
    observers: Vec<Box<dyn AssetObserver + Send + Sync>>,
}

impl fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("assets", &self.assets.keys().collect::<Vec<_>>())
            .field("strict_mode", &self.strict_mode)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl AssetRegistry {
    pub fn new(strict_mode: bool) -> Self {
        Self {
            strict_mode,
            ..Self::default()
        }
    }

    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    pub fn set_strict_mode(&mut self, strict: bool) {
        self.strict_mode = strict;
    }

    pub fn subscribe(&mut self, observer: impl AssetObserver + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&self, event: AssetEvent) {
        for observer in &self.observers {
            observer.on_asset_event(&event);
        }
    }

    /// Validates and stores an asset. The original name defaults to the file name.
    pub fn add(
        &mut self,
        path: &str,
        asset_type: impl Into<AssetType>,
        data: Vec<u8>,
    ) -> Result<&Asset, ProjectError> {
        let path = normalize_path(path);
        let original_name = path.rsplit('/').next().unwrap_or_default().to_string();
        self.add_named(&path, asset_type, data, &original_name)
    }

    pub fn add_named(
        &mut self,
        path: &str,
        asset_type: impl Into<AssetType>,
        data: Vec<u8>,
        original_name: &str,
    ) -> Result<&Asset, ProjectError> {
        let path = normalize_path(path);
        let asset_type = asset_type.into();

        if self.assets.contains_key(&path) {
            return Err(ProjectError::AlreadyExists { kind: "asset", path });
        }

        if let Err(reason) = self.check_payload(&asset_type, &data) {
            log::warn!("[assets] Rejected {}: {}", path, reason);
            self.notify(AssetEvent::Invalid {
                path: path.clone(),
                reason: reason.clone(),
            });
            return Err(ProjectError::ValidationFailed { path, reason });
        }

        log::debug!("[assets] Added {} ({}, {} bytes)", path, asset_type, data.len());
        self.notify(AssetEvent::Added {
            path: path.clone(),
            asset_type: asset_type.clone(),
        });
        let asset = Asset {
            path: path.clone(),
            asset_type,
            raw_data: data,
            original_name: original_name.to_string(),
        };
        Ok(self.assets.entry(path).or_insert(asset))
    }

    fn check_payload(&self, asset_type: &AssetType, data: &[u8]) -> Result<(), String> {
        if data.is_empty() {
            return Err("payload is empty".to_string());
        }

        match asset_type {
            AssetType::Gltf => {
                let text = std::str::from_utf8(data)
                    .map_err(|_| "glTF payload is not valid UTF-8 text".to_string())?;
                if text.contains("glTF") {
                    return Ok(());
                }
                let has_asset_key = serde_json::from_str::<serde_json::Value>(text)
                    .ok()
                    .and_then(|json| json.get("asset").cloned())
                    .is_some();
                if has_asset_key {
                    Ok(())
                } else {
                    Err("glTF payload has no glTF marker or \"asset\" key".to_string())
                }
            }
            AssetType::Other(name) if self.strict_mode => {
                Err(format!("unknown asset type '{}'", name))
            }
            AssetType::Other(name) => {
                log::warn!("[assets] Accepting unknown asset type '{}'", name);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn remove(&mut self, path: &str) -> Result<Asset, ProjectError> {
        let path = normalize_path(path);
        match self.assets.shift_remove(&path) {
            Some(asset) => {
                log::debug!("[assets] Removed {}", path);
                self.notify(AssetEvent::Removed { path });
                Ok(asset)
            }
            None => Err(ProjectError::NotFound { kind: "asset", path }),
        }
    }

    pub fn get(&self, path: &str) -> Option<&Asset> {
        self.assets.get(&normalize_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.assets.contains_key(&normalize_path(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_add_then_get_returns_stored_bytes() {
        let mut registry = AssetRegistry::default();
        registry.add("textures/a.png", "texture", vec![1, 2, 3]).unwrap();

        let asset = registry.get("textures/a.png").unwrap();
        assert_eq!(asset.raw_data, vec![1, 2, 3]);
        assert_eq!(asset.asset_type, AssetType::Texture);
        assert_eq!(asset.original_name, "a.png");
    }

    #[test]
    fn test_duplicate_add_keeps_first_entry() {
        let mut registry = AssetRegistry::default();
        registry.add("a.png", AssetType::Texture, vec![1]).unwrap();

        let err = registry.add("a.png", AssetType::Audio, vec![9, 9]).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists { .. }));

        let asset = registry.get("a.png").unwrap();
        assert_eq!(asset.raw_data, vec![1]);
        assert_eq!(asset.asset_type, AssetType::Texture);
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let mut registry = AssetRegistry::default();
        let err = registry.add("a.png", "texture", Vec::new()).unwrap_err();
        assert!(matches!(err, ProjectError::ValidationFailed { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_gltf_requires_marker() {
        let mut registry = AssetRegistry::default();
        assert!(registry
            .add("m/a.gltf", "gltf", br#"{"asset": {"version": "2.0"}}"#.to_vec())
            .is_ok());
        assert!(registry.add("m/b.gltf", "gltf", b"glTF....".to_vec()).is_ok());
        assert!(matches!(
            registry.add("m/c.gltf", "gltf", br#"{"scenes": []}"#.to_vec()),
            Err(ProjectError::ValidationFailed { .. })
        ));
        assert!(matches!(
            registry.add("m/d.gltf", "gltf", vec![0xff, 0xfe, 0x00]),
            Err(ProjectError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_unknown_type_follows_strict_mode() {
        let mut lenient = AssetRegistry::new(false);
        assert!(lenient.add("data.bin", "blob", vec![0]).is_ok());

        let mut strict = AssetRegistry::new(true);
        assert!(matches!(
            strict.add("data.bin", "blob", vec![0]),
            Err(ProjectError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_remove_and_observer_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut registry = AssetRegistry::default();
        registry.subscribe(move |e: &AssetEvent| sink.lock().unwrap().push(e.clone()));

        registry.add("a.png", "texture", vec![1]).unwrap();
        let _ = registry.add("b.png", "texture", vec![]);
        registry.remove("a.png").unwrap();
        assert!(matches!(
            registry.remove("a.png"),
            Err(ProjectError::NotFound { .. })
        ));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], AssetEvent::Added { .. }));
        assert!(matches!(events[1], AssetEvent::Invalid { .. }));
        assert_eq!(events[2], AssetEvent::Removed { path: "a.png".to_string() });
    }

    #[test]
    fn test_type_from_path() {
        assert_eq!(AssetType::from_path("ui/icon.PNG"), AssetType::Texture);
        assert_eq!(AssetType::from_path("sfx/hit.ogg"), AssetType::Audio);
        assert_eq!(AssetType::from_path("models/ship.gltf"), AssetType::Gltf);
        assert_eq!(AssetType::from_path("notes"), AssetType::Other(String::new()));
    }
}
