use thiserror::Error;

/// Expected failures of model and registry mutations. The model is left
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error("{kind} already exists at '{path}'")]
    AlreadyExists { kind: &'static str, path: String },

    #[error("scene not found: '{0}'")]
    SceneNotFound(String),

    #[error("node '{node}' not found in scene '{scene}'")]
    NodeNotFound { scene: String, node: String },

    #[error("node '{node}' already exists in scene '{scene}'")]
    DuplicateNode { scene: String, node: String },

    #[error("scene '{scene}' already has root node '{root}'")]
    RootAlreadySet { scene: String, root: String },

    #[error("{kind} not found: '{path}'")]
    NotFound { kind: &'static str, path: String },

    #[error("validation failed for '{path}': {reason}")]
    ValidationFailed { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("duplicate archive entry: '{0}'")]
    DuplicateEntry(String),

    #[error("archive entry not found: '{0}'")]
    EntryNotFound(String),

    #[error("archive already finalized")]
    Finalized,

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write archive entry '{entry}': {source}")]
    ArchiveAssemblyFailed {
        entry: String,
        #[source]
        source: ArchiveError,
    },

    #[error("failed to serialize scene: {0}")]
    Scene(#[from] ProjectError),

    #[error("an export is already running")]
    ExportBusy,

    #[error("export cancelled before stage '{0}'")]
    ExportCancelled(&'static str),
}

/// A scene text line the parser could not understand.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct SceneParseError {
    pub line: usize,
    pub message: String,
}

impl SceneParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("archive is empty")]
    EmptyArchive,

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("asset '{0}' is not valid base64")]
    Encoding(String),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode settings: {0}")]
    Json(#[from] serde_json::Error),
}
