//! Scoped storage: every shared file is a row in the platform's shared
//! index, reached through the content broker.

use super::{
    CopyStrategy, Destination, SharedSource, StorageBackend, StorageMode, delete_handle,
    open_handle,
};
use crate::collection::{Collection, media_root};
use crate::error::{ErrorKind, StorageError};
use crate::file_ref::{ContentUri, FileRef};
use crate::mime::{MimeRegistry, mime_type_of};
use crate::platform::{ContentBroker, EntryLocation, NewEntry, Selection, WriteMode};
use relative_path::{RelativePath, RelativePathBuf};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub struct ModernBackend {
    broker: Arc<dyn ContentBroker>,
    registry: Arc<dyn MimeRegistry>,
    strategy: CopyStrategy,
}

impl ModernBackend {
    pub fn new(broker: Arc<dyn ContentBroker>, registry: Arc<dyn MimeRegistry>) -> Self {
        Self {
            broker,
            registry,
            strategy: CopyStrategy::Bulk,
        }
    }

    pub fn with_copy_strategy(mut self, strategy: CopyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Find the row for a shared path like `Documents/MyApp/notes.txt`.
    ///
    /// Several rows may share a display name; the first whose name matches
    /// exactly within the same directory wins.
    fn lookup(&self, path: &RelativePath) -> Result<Option<ContentUri>, StorageError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| StorageError::Unresolvable(path.to_string()))?;
        let collection = path
            .as_str()
            .split('/')
            .next()
            .and_then(|first| first.parse::<Collection>().ok())
            .unwrap_or(Collection::Documents);
        let mime_type = mime_type_of(file_name, self.registry.as_ref());
        let directory = path.parent().map(|p| p.as_str()).unwrap_or_default();
        let selection = Selection::by_name(file_name).in_directory(format!("{directory}/"));

        let records = self
            .broker
            .query(media_root(collection, &mime_type), &selection)?;
        Ok(records
            .into_iter()
            .find(|record| record.display_name == file_name)
            .map(|record| record.uri))
    }

    fn resolve_uri(&self, file: &FileRef) -> Result<ContentUri, StorageError> {
        match file {
            FileRef::Handle(uri) if uri.is_content() => Ok(uri.clone()),
            FileRef::Handle(uri) => Err(StorageError::Unresolvable(uri.to_string())),
            FileRef::LegacyPath(path) => {
                let relative = RelativePathBuf::from_path(path)
                    .map_err(|_| StorageError::Unresolvable(path.display().to_string()))?;
                self.lookup(&relative)?
                    .ok_or_else(|| StorageError::Unresolvable(relative.to_string()))
            }
        }
    }

    /// Open the existing row for overwrite, or `None` when there is no row
    /// or this app may not replace it.
    fn open_existing(
        &self,
        destination: &Destination,
    ) -> Result<Option<(ContentUri, Box<dyn Write + '_>)>, StorageError> {
        let Some(uri) = self.lookup(&destination.relative_path())? else {
            return Ok(None);
        };
        match self.broker.open_write(&uri, WriteMode::Truncate) {
            Ok(writer) => Ok(Some((uri, writer))),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                log::info!("File replace permission not granted for {uri}.");
                log::info!("A new file version will be created.");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl StorageBackend for ModernBackend {
    fn mode(&self) -> StorageMode {
        StorageMode::Modern
    }

    fn copy_strategy(&self) -> CopyStrategy {
        self.strategy
    }

    fn publish(&self, source: &Path, destination: &Destination) -> Result<FileRef, StorageError> {
        let mut reader = fs::File::open(source)?;

        let (uri, mut writer, inserted) = match self.open_existing(destination)? {
            Some((uri, writer)) => (uri, writer, false),
            None => {
                let entry = NewEntry {
                    display_name: destination.file_name.clone(),
                    mime_type: destination.mime_type.clone(),
                    location: EntryLocation::RelativePath(format!(
                        "{}/",
                        destination.relative_dir()
                    )),
                };
                let root = media_root(destination.collection, &destination.mime_type);
                let uri = self.broker.insert(root, &entry)?;
                match self.broker.open_write(&uri, WriteMode::Create) {
                    Ok(writer) => (uri, writer, true),
                    Err(e) => {
                        discard_row(self.broker.as_ref(), &uri);
                        return Err(e);
                    }
                }
            }
        };

        let copied = self.strategy.copy(&mut reader, writer.as_mut());
        drop(writer);
        match copied {
            Ok(bytes) => {
                log::debug!("Published {} ({bytes} bytes) as {uri}", source.display());
                Ok(FileRef::Handle(uri))
            }
            Err(e) => {
                if inserted {
                    discard_row(self.broker.as_ref(), &uri);
                }
                Err(StorageError::Interrupted(e))
            }
        }
    }

    fn resolve(&self, file: &FileRef) -> Result<FileRef, StorageError> {
        self.resolve_uri(file).map(FileRef::Handle)
    }

    fn open_shared(&self, file: &FileRef) -> Result<SharedSource<'_>, StorageError> {
        let uri = match file {
            FileRef::Handle(uri) => uri.clone(),
            FileRef::LegacyPath(_) => self.resolve_uri(file)?,
        };
        open_handle(self.broker.as_ref(), &uri)
    }

    fn delete(&self, file: &FileRef) -> Result<(), StorageError> {
        let uri = self.resolve_uri(file)?;
        delete_handle(self.broker.as_ref(), &uri)
    }
}

/// Remove a row this backend inserted but could not fill.
fn discard_row(broker: &dyn ContentBroker, uri: &ContentUri) {
    if let Err(e) = broker.delete(uri) {
        log::warn!("Could not remove incomplete entry {uri}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::MediaRoot;
    use crate::mime::AndroidMimeTable;
    use crate::platform::memory::MemoryBroker;
    use crate::tests::{BrokenStreamBroker, create_private_file};
    use std::io::Read;

    fn backend(broker: &Arc<MemoryBroker>) -> ModernBackend {
        ModernBackend::new(broker.clone(), Arc::new(AndroidMimeTable))
    }

    fn destination(file_name: &str, mime_type: &str, collection: Collection) -> Destination {
        Destination::new(collection, "MyApp", file_name, None, mime_type.to_string())
    }

    fn read_all(backend: &ModernBackend, file: &FileRef) -> Vec<u8> {
        let mut bytes = Vec::new();
        backend
            .open_shared(file)
            .unwrap()
            .reader
            .read_to_end(&mut bytes)
            .unwrap();
        bytes
    }

    #[test]
    fn test_publish_inserts_row_in_media_table() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "cat.png", b"png bytes");
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(&broker);

        let published = backend
            .publish(&source, &destination("cat.png", "image/png", Collection::Pictures))
            .unwrap();

        let FileRef::Handle(uri) = &published else {
            panic!("expected a handle, got {published}");
        };
        assert_eq!(MediaRoot::of_uri(uri), Some(MediaRoot::Images));
        let record = broker.describe(uri).unwrap().unwrap();
        assert_eq!(record.display_name, "cat.png");
        assert_eq!(record.relative_path.as_deref(), Some("Pictures/MyApp/"));
        assert_eq!(broker.bytes_of(uri).unwrap(), b"png bytes");
    }

    #[test]
    fn test_republish_overwrites_own_row() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "a.txt", b"first");
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(&broker);
        let target = destination("a.txt", "text/plain", Collection::Documents);

        let first = backend.publish(&source, &target).unwrap();
        std::fs::write(&source, b"second").unwrap();
        let second = backend.publish(&source, &target).unwrap();

        assert_eq!(first, second);
        assert_eq!(broker.len(), 1);
        assert_eq!(read_all(&backend, &second), b"second");
    }

    #[test]
    fn test_republish_over_foreign_row_creates_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "a.txt", b"mine");
        let broker = Arc::new(MemoryBroker::new());
        let foreign = broker.insert_foreign(
            MediaRoot::Files,
            &NewEntry {
                display_name: "a.txt".to_string(),
                mime_type: "text/plain".to_string(),
                location: EntryLocation::RelativePath("Documents/MyApp/".to_string()),
            },
            b"theirs",
        );
        let backend = backend(&broker);

        let published = backend
            .publish(&source, &destination("a.txt", "text/plain", Collection::Documents))
            .unwrap();

        assert_ne!(published, FileRef::Handle(foreign.clone()));
        assert_eq!(broker.bytes_of(&foreign).unwrap(), b"theirs");
        assert_eq!(read_all(&backend, &published), b"mine");
    }

    #[test]
    fn test_failed_copy_removes_inserted_row() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "big.bin", &[7u8; 10_000]);
        let inner = Arc::new(MemoryBroker::new());
        let backend = ModernBackend::new(
            Arc::new(BrokenStreamBroker::breaking_writes(inner.clone())),
            Arc::new(AndroidMimeTable),
        );

        let result = backend.publish(
            &source,
            &destination("big.bin", "application/octet-stream", Collection::Documents),
        );

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Interrupted);
        assert!(inner.is_empty());
    }

    #[test]
    fn test_failed_overwrite_keeps_existing_row() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "a.txt", b"first");
        let inner = Arc::new(MemoryBroker::new());
        let target = destination("a.txt", "text/plain", Collection::Documents);
        let published = backend(&inner).publish(&source, &target).unwrap();
        let broken = ModernBackend::new(
            Arc::new(BrokenStreamBroker::breaking_writes(inner.clone())),
            Arc::new(AndroidMimeTable),
        );
        std::fs::write(&source, b"a much longer second version").unwrap();

        let result = broken.publish(&source, &target);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Interrupted);
        assert_eq!(inner.len(), 1);
        let FileRef::Handle(uri) = &published else {
            panic!("expected a handle, got {published}");
        };
        assert!(inner.contains(uri));
    }

    #[test]
    fn test_resolve_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "song.mp3", b"id3");
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(&broker);
        let published = backend
            .publish(&source, &destination("song.mp3", "audio/mpeg", Collection::Podcasts))
            .unwrap();

        let resolved = backend
            .resolve(&FileRef::parse("Podcasts/MyApp/song.mp3"))
            .unwrap();

        assert_eq!(resolved, published);
    }

    #[test]
    fn test_resolve_picks_exact_directory_match() {
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(&broker);
        let entry = |dir: &str| NewEntry {
            display_name: "a.txt".to_string(),
            mime_type: "text/plain".to_string(),
            location: EntryLocation::RelativePath(dir.to_string()),
        };
        broker.insert(MediaRoot::Files, &entry("Documents/Other/")).unwrap();
        let wanted = broker.insert(MediaRoot::Files, &entry("Documents/MyApp/")).unwrap();

        let resolved = backend.resolve(&FileRef::parse("Documents/MyApp/a.txt")).unwrap();

        assert_eq!(resolved, FileRef::Handle(wanted));
    }

    #[test]
    fn test_resolve_failures() {
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(&broker);

        let missing = backend.resolve(&FileRef::parse("Documents/MyApp/none.txt"));
        assert_eq!(missing.unwrap_err().kind(), ErrorKind::Unresolvable);

        let absolute = backend.resolve(&FileRef::parse("/sdcard/Documents/a.txt"));
        assert_eq!(absolute.unwrap_err().kind(), ErrorKind::Unresolvable);

        let file_uri = backend.resolve(&FileRef::parse("file:///sdcard/a.txt"));
        assert_eq!(file_uri.unwrap_err().kind(), ErrorKind::Unresolvable);
    }

    #[test]
    fn test_delete_own_and_foreign_rows() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "a.txt", b"x");
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(&broker);
        let published = backend
            .publish(&source, &destination("a.txt", "text/plain", Collection::Documents))
            .unwrap();
        let foreign = broker.insert_foreign(
            MediaRoot::Files,
            &NewEntry {
                display_name: "b.txt".to_string(),
                mime_type: "text/plain".to_string(),
                location: EntryLocation::RelativePath("Documents/Other/".to_string()),
            },
            b"y",
        );

        assert!(backend.delete(&published).is_ok());
        assert_eq!(
            backend.delete(&published).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            backend.delete(&FileRef::Handle(foreign)).unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_open_file_uri_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = create_private_file(&dir, "picked.txt", b"picked");
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(&broker);
        let uri = FileRef::Handle(ContentUri::new(format!("file://{}", source.display())));

        let shared = backend.open_shared(&uri).unwrap();
        assert_eq!(shared.display_name, "picked.txt");
    }
}
