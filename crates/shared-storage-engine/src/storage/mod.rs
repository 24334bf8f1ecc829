//! The storage bridge: moving files between private and shared storage.

mod bridge;
pub mod copy;
pub mod legacy;
pub mod modern;

pub use bridge::{CACHE_DIR_NAME, SharedStorage, StorageOptions};
pub use copy::CopyStrategy;
pub use legacy::LegacyBackend;
pub use modern::ModernBackend;

use crate::collection::Collection;
use crate::error::StorageError;
use crate::file_ref::{ContentUri, FileRef};
use crate::platform::ContentBroker;
use relative_path::RelativePathBuf;
use std::fs;
use std::io::Read;
use std::path::Path;

/// First API level with scoped storage (Android 10)
pub const SCOPED_STORAGE_API_LEVEL: u32 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Shared files are content handles resolved through the broker
    Modern,
    /// Shared storage is a directory tree under a well known root
    Legacy,
}

impl StorageMode {
    pub fn for_api_level(api_level: u32) -> Self {
        if api_level >= SCOPED_STORAGE_API_LEVEL {
            StorageMode::Modern
        } else {
            StorageMode::Legacy
        }
    }
}

/// Where a published file goes: `{collection}/{app title}/{dirs...}/{file_name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub collection: Collection,
    pub directories: Vec<String>,
    pub file_name: String,
    pub mime_type: String,
}

impl Destination {
    /// The last segment of `subpath`, if any, replaces `file_name`; the
    /// rest become directories below the app title. Empty, `.` and `..`
    /// segments are dropped so the file stays inside its collection.
    pub fn new(
        collection: Collection,
        app_title: &str,
        file_name: &str,
        subpath: Option<&str>,
        mime_type: String,
    ) -> Self {
        let mut directories = vec![app_title.to_string()];
        let mut file_name = file_name.to_string();
        if let Some(subpath) = subpath {
            let mut segments: Vec<&str> = subpath
                .split('/')
                .filter(|s| !matches!(*s, "" | "." | ".."))
                .collect();
            if let Some(last) = segments.pop() {
                file_name = last.to_string();
            }
            directories.extend(segments.into_iter().map(str::to_string));
        }
        Self {
            collection,
            directories,
            file_name,
            mime_type,
        }
    }

    /// Directory relative to the shared storage root
    pub fn relative_dir(&self) -> RelativePathBuf {
        let mut dir = RelativePathBuf::from(self.collection.dir_name());
        for directory in &self.directories {
            dir.push(directory);
        }
        dir
    }

    pub fn relative_path(&self) -> RelativePathBuf {
        self.relative_dir().join(&self.file_name)
    }
}

/// An open shared file and the name it should be cached under.
pub struct SharedSource<'a> {
    pub display_name: String,
    pub reader: Box<dyn Read + 'a>,
}

/// The per-platform-version half of the bridge. Chosen once, at
/// construction of [`SharedStorage`].
pub trait StorageBackend: Send + Sync {
    fn mode(&self) -> StorageMode;

    fn copy_strategy(&self) -> CopyStrategy;

    /// Copy `source` to `destination` in shared storage
    fn publish(&self, source: &Path, destination: &Destination) -> Result<FileRef, StorageError>;

    /// A reference that can be opened directly
    fn resolve(&self, file: &FileRef) -> Result<FileRef, StorageError>;

    fn open_shared(&self, file: &FileRef) -> Result<SharedSource<'_>, StorageError>;

    fn delete(&self, file: &FileRef) -> Result<(), StorageError>;
}

/// Open a picker-supplied or published handle through the broker.
fn open_handle<'a>(
    broker: &'a dyn ContentBroker,
    uri: &ContentUri,
) -> Result<SharedSource<'a>, StorageError> {
    if let Some(path) = uri.file_path() {
        return open_file(&path);
    }
    if !uri.is_content() {
        return Err(StorageError::Unresolvable(uri.to_string()));
    }
    let record = broker
        .describe(uri)?
        .ok_or_else(|| StorageError::NotFound(uri.to_string()))?;
    Ok(SharedSource {
        display_name: record.display_name,
        reader: broker.open_read(uri)?,
    })
}

fn open_file<'a>(path: &Path) -> Result<SharedSource<'a>, StorageError> {
    if !path.is_file() {
        return Err(StorageError::NotFound(path.display().to_string()));
    }
    let display_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::Unresolvable(path.display().to_string()))?
        .to_string();
    Ok(SharedSource {
        display_name,
        reader: Box::new(fs::File::open(path)?),
    })
}

/// Succeeds only when exactly one row went away.
fn delete_handle(broker: &dyn ContentBroker, uri: &ContentUri) -> Result<(), StorageError> {
    match broker.delete(uri)? {
        1 => Ok(()),
        0 => Err(StorageError::NotFound(uri.to_string())),
        n => Err(StorageError::Unresolvable(format!(
            "{uri} matched {n} entries"
        ))),
    }
}
