use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A directory implied by the paths of the entities stored under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub path: String,
    pub name: String,
    pub files: Vec<String>,
    pub subfolders: Vec<String>,
}

impl Folder {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            files: Vec::new(),
            subfolders: Vec::new(),
        }
    }
}

/// Folder tree keyed by path. The root folder has the empty path and always exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderIndex {
    folders: IndexMap<String, Folder>,
}

impl Default for FolderIndex {
    fn default() -> Self {
        let mut folders = IndexMap::new();
        folders.insert(String::new(), Folder::new(""));
        Self { folders }
    }
}

/// Strips redundant slashes so `/a//b/` and `a/b` name the same folder.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Folder that contains `path`; top-level entries live in the root folder `""`.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

impl FolderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `path` and every missing ancestor. Existing folders are left as-is.
    pub fn ensure_folder(&mut self, path: &str) -> &Folder {
        let path = normalize_path(path);
        let mut current = String::new();

        for part in path.split('/').filter(|p| !p.is_empty()) {
            let parent = current.clone();
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);

            if !self.folders.contains_key(&current) {
                log::debug!("[folders] Creating folder: {}", current);
                self.folders.insert(current.clone(), Folder::new(&current));
                if let Some(parent) = self.folders.get_mut(&parent) {
                    parent.subfolders.push(current.clone());
                }
            }
        }

        &self.folders[&path]
    }

    /// Records `file` inside the folder that contains it, creating folders as needed.
    pub fn add_file(&mut self, file: &str) {
        let file = normalize_path(file);
        let folder_path = parent_path(&file).to_string();
        self.ensure_folder(&folder_path);
        if let Some(folder) = self.folders.get_mut(&folder_path) {
            if !folder.files.contains(&file) {
                folder.files.push(file);
            }
        }
    }

    pub fn remove_file(&mut self, file: &str) {
        let file = normalize_path(file);
        if let Some(folder) = self.folders.get_mut(parent_path(&file)) {
            folder.files.retain(|f| *f != file);
        }
    }

    pub fn get(&self, path: &str) -> Option<&Folder> {
        self.folders.get(&normalize_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.folders.contains_key(&normalize_path(path))
    }

    pub fn root(&self) -> &Folder {
        &self.folders[""]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.len() <= 1
    }
}
