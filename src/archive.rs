//! ZIP archive access
//!
//! The parse pipeline only ever sees this surface: an immutable list of
//! entry names captured when the archive is opened, and an async
//! read-entry-by-exact-name operation. Entry names are case-sensitive;
//! any case-folding (mimetype, container path) happens in the caller.
//!
//! Each read opens a fresh `ZipArchive` over the shared bytes on the
//! blocking pool, so concurrent retrievals never contend on decoder state.

use std::io::{Cursor, Read};
use std::sync::Arc;

use zip::ZipArchive;

use crate::error::ArchiveError;

/// In-memory ZIP archive with async entry reads
#[derive(Debug, Clone)]
pub struct ZipArchiveReader {
    data: Arc<Vec<u8>>,
    entry_names: Arc<Vec<String>>,
}

impl ZipArchiveReader {
    /// Open an archive from raw bytes and capture its entry-name list.
    ///
    /// Directory entries are not listed; the pipeline only addresses files.
    pub fn new(data: Vec<u8>) -> Result<Self, ArchiveError> {
        let data = Arc::new(data);
        let mut archive = ZipArchive::new(Cursor::new(data.as_slice()))?;

        let mut entry_names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_file() {
                entry_names.push(file.name().to_string());
            }
        }

        Ok(Self {
            data,
            entry_names: Arc::new(entry_names),
        })
    }

    /// Names of all file entries, in archive order
    pub fn entry_names(&self) -> &[String] {
        &self.entry_names
    }

    /// Whether the archive contains an entry with this exact name
    pub fn contains(&self, name: &str) -> bool {
        self.entry_names.iter().any(|n| n == name)
    }

    /// Read an entry's raw bytes by exact, case-sensitive name
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        if !self.contains(name) {
            return Err(ArchiveError::EntryNotFound(name.to_string()));
        }

        let data = Arc::clone(&self.data);
        let name = name.to_string();

        tokio::task::spawn_blocking(move || {
            let mut archive = ZipArchive::new(Cursor::new(data.as_slice()))?;
            let mut file = archive.by_name(&name)?;
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)?;
            Ok(content)
        })
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
    }
}
