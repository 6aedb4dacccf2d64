//! In-memory model of an engine project that round-trips through engine-native
//! scene text and zip archives.

pub mod archive;
pub mod assets;
pub mod author;
pub mod config;
pub mod error;
pub mod folders;
pub mod graph;
pub mod importer;
pub mod packager;
pub mod parser;
pub mod project;
pub mod serializer;
pub mod settings;
pub mod snapshot;
pub mod templates;
pub mod value;

pub use archive::{Archive, ZipArchive};
pub use author::{Role, SceneAuthor};
pub use error::{
    ArchiveError, ExportError, ImportError, ProjectError, SceneParseError, SettingsError,
    SnapshotError,
};
pub use importer::import_archive;
pub use packager::{CancelToken, ExportObserver, ExportProgress, Packager};
pub use project::ProjectModel;
pub use settings::Settings;
pub use value::Value;
