//! Contracts with the platform services this crate consumes.
//!
//! On Android these are implemented over JNI by `shared-storage-android`.
//! Elsewhere [`memory::MemoryBroker`] and [`host::StaticHost`] stand in.

pub mod host;
pub mod memory;

use crate::collection::MediaRoot;
use crate::error::StorageError;
use crate::file_ref::ContentUri;
use crate::intent::Intent;
use std::io::{Read, Write};
use std::path::PathBuf;

/// A row of the shared index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub id: u64,
    pub uri: ContentUri,
    pub display_name: String,
    pub mime_type: String,
    /// `RELATIVE_PATH` column, always ending in `/`
    pub relative_path: Option<String>,
    /// `DATA` column, the filesystem path of legacy rows
    pub data: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryLocation {
    RelativePath(String),
    Data(PathBuf),
}

/// Metadata for a row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub display_name: String,
    pub mime_type: String,
    pub location: EntryLocation,
}

/// Equality filter over the index columns; `None` columns are not compared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub display_name: String,
    pub relative_path: Option<String>,
    pub data: Option<PathBuf>,
}

impl Selection {
    pub fn by_name(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn in_directory(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn matches(&self, record: &EntryRecord) -> bool {
        record.display_name == self.display_name
            && self
                .relative_path
                .as_ref()
                .is_none_or(|path| record.relative_path.as_ref() == Some(path))
            && self
                .data
                .as_ref()
                .is_none_or(|data| record.data.as_ref() == Some(data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite an existing row (`"rwt"`)
    Truncate,
    /// Fill a row that was just inserted (`"w"`)
    Create,
}

impl WriteMode {
    pub fn as_android(self) -> &'static str {
        match self {
            WriteMode::Truncate => "rwt",
            WriteMode::Create => "w",
        }
    }
}

/// The content broker mediating access to the shared index.
///
/// Readers and writers are scoped: dropping them releases the underlying
/// platform stream on every exit path.
pub trait ContentBroker: Send + Sync {
    fn insert(&self, root: MediaRoot, entry: &NewEntry) -> Result<ContentUri, StorageError>;
    fn query(&self, root: MediaRoot, selection: &Selection)
    -> Result<Vec<EntryRecord>, StorageError>;
    /// Metadata of the row behind `uri`
    fn describe(&self, uri: &ContentUri) -> Result<Option<EntryRecord>, StorageError>;
    fn open_read(&self, uri: &ContentUri) -> Result<Box<dyn Read + '_>, StorageError>;
    fn open_write(
        &self,
        uri: &ContentUri,
        mode: WriteMode,
    ) -> Result<Box<dyn Write + '_>, StorageError>;
    /// Number of rows removed
    fn delete(&self, uri: &ContentUri) -> Result<usize, StorageError>;
    fn mime_type(&self, uri: &ContentUri) -> Option<String>;
}

/// Facts about the running application and device.
pub trait HostEnvironment: Send + Sync {
    fn api_level(&self) -> u32;
    fn app_title(&self) -> String;
    fn external_cache_dir(&self) -> Option<PathBuf>;
    /// Root of pre-scoped-storage shared storage, e.g. `/storage/emulated/0`
    fn external_storage_root(&self) -> Option<PathBuf>;
}

/// Starts activities on behalf of the core.
pub trait ActivityLauncher: Send + Sync {
    fn start_activity(&self, intent: &Intent) -> Result<(), StorageError>;
    fn start_activity_for_result(
        &self,
        intent: &Intent,
        request_code: i32,
    ) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, relative_path: Option<&str>) -> EntryRecord {
        EntryRecord {
            id: 1,
            uri: ContentUri::new("content://media/external/file/1"),
            display_name: name.to_string(),
            mime_type: "text/plain".to_string(),
            relative_path: relative_path.map(str::to_string),
            data: None,
        }
    }

    #[test]
    fn test_selection_by_name_ignores_path() {
        let selection = Selection::by_name("a.txt");
        assert!(selection.matches(&record("a.txt", Some("Documents/App/"))));
        assert!(selection.matches(&record("a.txt", None)));
        assert!(!selection.matches(&record("A.txt", None)));
    }

    #[test]
    fn test_selection_in_directory() {
        let selection = Selection::by_name("a.txt").in_directory("Documents/App/");
        assert!(selection.matches(&record("a.txt", Some("Documents/App/"))));
        assert!(!selection.matches(&record("a.txt", Some("Documents/Other/"))));
        assert!(!selection.matches(&record("a.txt", None)));
    }
}
