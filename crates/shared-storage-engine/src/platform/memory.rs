//! In-process stand-ins for the platform services.
//!
//! `MemoryBroker` behaves like the `MediaStore` content provider closely
//! enough to exercise the modern storage protocol off-device: rows carry
//! an owner, rows owned by other apps refuse writes and deletes, inserting
//! a duplicate name into a directory creates a numbered version, and
//! legacy rows point at files on disk.

use super::{
    ActivityLauncher, ContentBroker, EntryLocation, EntryRecord, NewEntry, Selection, WriteMode,
};
use crate::collection::MediaRoot;
use crate::error::StorageError;
use crate::file_ref::ContentUri;
use crate::intent::Intent;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredEntry {
    root: MediaRoot,
    record: EntryRecord,
    bytes: Vec<u8>,
    foreign: bool,
}

#[derive(Debug, Default)]
struct IndexState {
    last_id: u64,
    entries: BTreeMap<ContentUri, StoredEntry>,
}

fn lock(state: &Mutex<IndexState>) -> MutexGuard<'_, IndexState> {
    // Recover from poisoned mutex (another thread panicked while holding lock)
    state.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default, Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<IndexState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a row owned by another application
    pub fn insert_foreign(&self, root: MediaRoot, entry: &NewEntry, bytes: &[u8]) -> ContentUri {
        self.insert_row(root, entry, bytes.to_vec(), true)
    }

    pub fn contains(&self, uri: &ContentUri) -> bool {
        lock(&self.state).entries.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).entries.is_empty()
    }

    pub fn bytes_of(&self, uri: &ContentUri) -> Option<Vec<u8>> {
        lock(&self.state)
            .entries
            .get(uri)
            .map(|entry| entry.bytes.clone())
    }

    fn insert_row(
        &self,
        root: MediaRoot,
        entry: &NewEntry,
        bytes: Vec<u8>,
        foreign: bool,
    ) -> ContentUri {
        let mut state = lock(&self.state);
        let (relative_path, data) = match &entry.location {
            EntryLocation::RelativePath(path) => (Some(normalize_directory(path)), None),
            EntryLocation::Data(path) => (None, Some(path.clone())),
        };
        let display_name = match &relative_path {
            Some(dir) => unused_display_name(&state, dir, &entry.display_name),
            None => entry.display_name.clone(),
        };

        state.last_id += 1;
        let id = state.last_id;
        let uri = root.content_uri().with_appended_id(id);
        let record = EntryRecord {
            id,
            uri: uri.clone(),
            display_name,
            mime_type: entry.mime_type.clone(),
            relative_path,
            data,
        };
        state.entries.insert(
            uri.clone(),
            StoredEntry {
                root,
                record,
                bytes,
                foreign,
            },
        );
        uri
    }
}

fn normalize_directory(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("{trimmed}/")
}

/// `name`, or `stem (n).ext` when a row with that name already exists in
/// the directory
fn unused_display_name(state: &IndexState, dir: &str, name: &str) -> String {
    let taken = |candidate: &str| {
        state.entries.values().any(|entry| {
            entry.record.relative_path.as_deref() == Some(dir)
                && entry.record.display_name == candidate
        })
    };
    if !taken(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };
    (1..)
        .map(|n| format!("{stem} ({n}){ext}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

impl ContentBroker for MemoryBroker {
    fn insert(&self, root: MediaRoot, entry: &NewEntry) -> Result<ContentUri, StorageError> {
        Ok(self.insert_row(root, entry, Vec::new(), false))
    }

    fn query(
        &self,
        root: MediaRoot,
        selection: &Selection,
    ) -> Result<Vec<EntryRecord>, StorageError> {
        // The Files table is a view over every media table
        Ok(lock(&self.state)
            .entries
            .values()
            .filter(|entry| root == MediaRoot::Files || entry.root == root)
            .filter(|entry| selection.matches(&entry.record))
            .map(|entry| entry.record.clone())
            .collect())
    }

    fn describe(&self, uri: &ContentUri) -> Result<Option<EntryRecord>, StorageError> {
        Ok(lock(&self.state)
            .entries
            .get(uri)
            .map(|entry| entry.record.clone()))
    }

    fn open_read(&self, uri: &ContentUri) -> Result<Box<dyn Read + '_>, StorageError> {
        let state = lock(&self.state);
        let entry = state
            .entries
            .get(uri)
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))?;
        match &entry.record.data {
            Some(path) => Ok(Box::new(fs::File::open(path)?)),
            None => Ok(Box::new(Cursor::new(entry.bytes.clone()))),
        }
    }

    fn open_write(
        &self,
        uri: &ContentUri,
        _mode: WriteMode,
    ) -> Result<Box<dyn Write + '_>, StorageError> {
        let state = lock(&self.state);
        let entry = state
            .entries
            .get(uri)
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))?;
        if entry.foreign {
            return Err(StorageError::PermissionDenied(format!(
                "{uri} is owned by another app"
            )));
        }
        match &entry.record.data {
            Some(path) => Ok(Box::new(fs::File::create(path)?)),
            None => Ok(Box::new(MemoryWriter {
                state: Arc::clone(&self.state),
                uri: uri.clone(),
                buffer: Vec::new(),
            })),
        }
    }

    fn delete(&self, uri: &ContentUri) -> Result<usize, StorageError> {
        let mut state = lock(&self.state);
        let foreign = match state.entries.get(uri) {
            None => return Ok(0),
            Some(entry) => entry.foreign,
        };
        if foreign {
            return Err(StorageError::PermissionDenied(format!(
                "{uri} is owned by another app"
            )));
        }
        state.entries.remove(uri);
        Ok(1)
    }

    fn mime_type(&self, uri: &ContentUri) -> Option<String> {
        lock(&self.state)
            .entries
            .get(uri)
            .map(|entry| entry.record.mime_type.clone())
    }
}

/// Buffers written bytes and stores them in the row on flush and drop.
struct MemoryWriter {
    state: Arc<Mutex<IndexState>>,
    uri: ContentUri,
    buffer: Vec<u8>,
}

impl MemoryWriter {
    fn commit(&self) {
        if let Some(entry) = lock(&self.state).entries.get_mut(&self.uri) {
            entry.bytes = self.buffer.clone();
        }
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.commit();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedIntent {
    pub intent: Intent,
    pub request_code: Option<i32>,
}

/// An [`ActivityLauncher`] that remembers what it was asked to start.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<LaunchedIntent>>,
    refuse: bool,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every start request fails, like a device without a
    /// matching activity
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn launched(&self) -> Vec<LaunchedIntent> {
        self.launched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_intent(&self) -> Option<Intent> {
        self.launched().pop().map(|launched| launched.intent)
    }

    fn record(&self, intent: &Intent, request_code: Option<i32>) -> Result<(), StorageError> {
        if self.refuse {
            return Err(StorageError::Unavailable(format!(
                "no activity handles {}",
                intent.action.as_android()
            )));
        }
        self.launched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LaunchedIntent {
                intent: intent.clone(),
                request_code,
            });
        Ok(())
    }
}

impl ActivityLauncher for RecordingLauncher {
    fn start_activity(&self, intent: &Intent) -> Result<(), StorageError> {
        self.record(intent, None)
    }

    fn start_activity_for_result(
        &self,
        intent: &Intent,
        request_code: i32,
    ) -> Result<(), StorageError> {
        self.record(intent, Some(request_code))
    }
}
