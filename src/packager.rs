//! Assembles a project into an archive of engine files.
//!
//! Export runs in three stages (scenes and resources, then scripts, assets and
//! fixed files, then finalize) and yields to the runtime between them. A
//! pending cancel request is honoured at each stage boundary.

use crate::archive::Archive;
use crate::error::ExportError;
use crate::project::{resource_export_path, scene_export_path, script_export_path, ProjectModel};
use crate::serializer::{serialize_resource, serialize_scene_with, SerializeOptions};
use crate::settings::ExportSettings;
use crate::templates::{CREDITS_SCENE, CREDITS_SCENE_FILE};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    /// Archive entry that was just written.
    pub entry: String,
    pub written: usize,
    pub total: usize,
    pub percent: u8,
}

impl ExportProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.written as f64 / self.total as f64
        }
    }
}

pub trait ExportObserver {
    fn on_progress(&self, progress: &ExportProgress);
}

impl<F: Fn(&ExportProgress)> ExportObserver for F {
    fn on_progress(&self, progress: &ExportProgress) {
        self(progress)
    }
}

/// Shared flag that asks a running export to stop at its next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a pending request, returning whether there was one.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Released on drop, so a failed or cancelled export frees the packager.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ExportError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::ExportBusy)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Directory name used inside the archive for a project.
pub fn project_dir_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "project".to_string(),
        _ => cleaned,
    }
}

struct Progress<'a, O: ExportObserver> {
    observer: &'a O,
    written: usize,
    total: usize,
}

impl<O: ExportObserver> Progress<'_, O> {
    fn add<A: Archive>(
        &mut self,
        archive: &mut A,
        entry: String,
        data: Vec<u8>,
    ) -> Result<(), ExportError> {
        if let Err(source) = archive.add_entry(&entry, data) {
            log::error!("[packager] Failed to write {}: {}", entry, source);
            return Err(ExportError::ArchiveAssemblyFailed { entry, source });
        }
        self.written += 1;
        let percent = ((self.written * 100) / self.total.max(1)) as u8;
        self.observer.on_progress(&ExportProgress {
            entry,
            written: self.written,
            total: self.total,
            percent,
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Packager {
    settings: ExportSettings,
    in_flight: AtomicBool,
    cancel: CancelToken,
}

impl Packager {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn checkpoint(&self, stage: &'static str) -> Result<(), ExportError> {
        if self.cancel.take() {
            log::info!("[packager] Export cancelled before {}", stage);
            return Err(ExportError::ExportCancelled(stage));
        }
        Ok(())
    }

    /// Writes every project entry into `archive` and hands it back unsealed.
    /// On failure the archive is dropped.
    pub async fn build_archive<A: Archive>(
        &self,
        project: &ProjectModel,
        archive: A,
        observer: &impl ExportObserver,
    ) -> Result<A, ExportError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.assemble(project, archive, observer).await
    }

    /// Builds the archive and returns its encoded bytes.
    pub async fn export<A: Archive>(
        &self,
        project: &ProjectModel,
        archive: A,
        observer: &impl ExportObserver,
    ) -> Result<Vec<u8>, ExportError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let mut archive = self.assemble(project, archive, observer).await?;

        self.checkpoint("finalize")?;
        let bytes = archive
            .finalize()
            .map_err(|source| ExportError::ArchiveAssemblyFailed {
                entry: format!("{}/", project_dir_name(project.name())),
                source,
            })?;
        log::info!("[packager] Export complete: {} bytes", bytes.len());
        Ok(bytes)
    }

    async fn assemble<A: Archive>(
        &self,
        project: &ProjectModel,
        mut archive: A,
        observer: &impl ExportObserver,
    ) -> Result<A, ExportError> {
        let dir = project_dir_name(project.name());
        let options = SerializeOptions {
            parent_style: self.settings.parent_style,
        };
        let total = project.scenes().count()
            + project.resources().count()
            + project.scripts().count()
            + project.assets().len()
            + 1
            + usize::from(self.settings.include_project_file);
        log::info!("[packager] Exporting {} as {}/ ({} entries)", project.name(), dir, total);

        let mut progress = Progress {
            observer,
            written: 0,
            total,
        };

        self.checkpoint("scenes")?;
        for scene in project.scenes() {
            let text = serialize_scene_with(project, &scene.path, &options)?;
            let entry = format!("{}/{}", dir, scene_export_path(&scene.path));
            progress.add(&mut archive, entry, text.into_bytes())?;
        }
        for resource in project.resources() {
            let entry = format!("{}/{}", dir, resource_export_path(&resource.path));
            progress.add(&mut archive, entry, serialize_resource(resource).into_bytes())?;
        }
        tokio::task::yield_now().await;

        self.checkpoint("files")?;
        for script in project.scripts() {
            let entry = format!("{}/{}", dir, script_export_path(&script.path, &script.language));
            progress.add(&mut archive, entry, script.source.clone().into_bytes())?;
        }
        for asset in project.assets().iter() {
            let entry = format!("{}/assets/{}", dir, asset.path);
            progress.add(&mut archive, entry, asset.raw_data.clone())?;
        }
        progress.add(
            &mut archive,
            format!("{}/{}", dir, CREDITS_SCENE_FILE),
            CREDITS_SCENE.as_bytes().to_vec(),
        )?;
        if self.settings.include_project_file {
            progress.add(
                &mut archive,
                format!("{}/project.godot", dir),
                project.config().render().into_bytes(),
            )?;
        }
        tokio::task::yield_now().await;

        Ok(archive)
    }
}
