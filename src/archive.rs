//! Archive containers the exporter writes into and the importer reads from.

use crate::error::ArchiveError;
use indexmap::IndexMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// A flat set of named byte entries that can be sealed into one payload.
///
/// Entry names are `/`-separated. Adding a name twice is an error so that two
/// project items can never silently overwrite each other.
pub trait Archive {
    fn add_entry(&mut self, path: &str, data: Vec<u8>) -> Result<(), ArchiveError>;

    /// Entry names in insertion order.
    fn list_entries(&self) -> Vec<String>;

    fn read_entry(&self, path: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Seals the archive and returns its encoded bytes. Further writes fail.
    fn finalize(&mut self) -> Result<Vec<u8>, ArchiveError>;
}

/// Zip archive held fully in memory until [`Archive::finalize`].
#[derive(Debug, Default)]
pub struct ZipArchive {
    entries: IndexMap<String, Vec<u8>>,
    finalized: bool,
}

impl ZipArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads an existing zip payload. Directory entries are dropped.
    pub fn open(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = IndexMap::new();

        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            if file.enclosed_name().is_none() {
                log::warn!("[archive] Skipping unsafe entry: {}", file.name());
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            if entries.insert(name.clone(), data).is_some() {
                return Err(ArchiveError::DuplicateEntry(name));
            }
        }

        log::debug!("[archive] Opened zip with {} entries", entries.len());
        Ok(Self {
            entries,
            finalized: false,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Archive for ZipArchive {
    fn add_entry(&mut self, path: &str, data: Vec<u8>) -> Result<(), ArchiveError> {
        if self.finalized {
            return Err(ArchiveError::Finalized);
        }
        if self.entries.contains_key(path) {
            return Err(ArchiveError::DuplicateEntry(path.to_string()));
        }
        self.entries.insert(path.to_string(), data);
        Ok(())
    }

    fn list_entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn read_entry(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))
    }

    fn finalize(&mut self) -> Result<Vec<u8>, ArchiveError> {
        if self.finalized {
            return Err(ArchiveError::Finalized);
        }

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            for (name, data) in &self.entries {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(data)?;
            }
            writer.finish()?;
        }

        self.finalized = true;
        log::debug!("[archive] Finalized zip with {} entries", self.entries.len());
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut archive = ZipArchive::new();
        archive.add_entry("game/main.tscn", b"scene".to_vec()).unwrap();
        archive.add_entry("game/assets/a.png", vec![1, 2, 3]).unwrap();

        assert_eq!(archive.list_entries(), vec!["game/main.tscn", "game/assets/a.png"]);
        assert_eq!(archive.read_entry("game/assets/a.png").unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            archive.read_entry("game/nope"),
            Err(ArchiveError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let mut archive = ZipArchive::new();
        archive.add_entry("game/credits.tscn", Vec::new()).unwrap();
        assert!(matches!(
            archive.add_entry("game/credits.tscn", Vec::new()),
            Err(ArchiveError::DuplicateEntry(p)) if p == "game/credits.tscn"
        ));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_finalized_archive_reopens() {
        let mut archive = ZipArchive::new();
        archive.add_entry("game/main.tscn", b"[gd_scene format=3]\n".to_vec()).unwrap();
        archive.add_entry("game/scripts/player.gd", b"extends Node\n".to_vec()).unwrap();
        let bytes = archive.finalize().unwrap();

        assert!(matches!(archive.finalize(), Err(ArchiveError::Finalized)));
        assert!(matches!(
            archive.add_entry("late", Vec::new()),
            Err(ArchiveError::Finalized)
        ));

        let reopened = ZipArchive::open(&bytes).unwrap();
        assert_eq!(reopened.list_entries(), archive.list_entries());
        assert_eq!(
            reopened.read_entry("game/scripts/player.gd").unwrap(),
            b"extends Node\n".to_vec()
        );
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(matches!(
            ZipArchive::open(b"not a zip"),
            Err(ArchiveError::Zip(_))
        ));
    }
}
