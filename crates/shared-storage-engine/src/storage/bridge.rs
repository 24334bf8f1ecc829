use super::{
    CopyStrategy, Destination, LegacyBackend, ModernBackend, StorageBackend, StorageMode,
};
use crate::collection::{Collection, auto_collection, validate_collection};
use crate::error::{ErrorKind, StorageError};
use crate::file_ref::FileRef;
use crate::mime::{AndroidMimeTable, MimeRegistry, mime_type_of};
use crate::platform::{ContentBroker, HostEnvironment};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sub-directory of the app's external cache that receives copies of
/// shared files
pub const CACHE_DIR_NAME: &str = "FromSharedStorage";

/// Construction options for [`SharedStorage`].
pub struct StorageOptions {
    pub mime_registry: Arc<dyn MimeRegistry>,
    /// Overrides the mode's default (bulk for modern, chunked for legacy)
    /// for fetches into the cache and modern publishing. Legacy publishing
    /// is always a plain file copy.
    pub copy_strategy: Option<CopyStrategy>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            mime_registry: Arc::new(AndroidMimeTable),
            copy_strategy: None,
        }
    }
}

/// Copies files between the app's private storage and shared storage.
///
/// Every public operation is fail-soft: failures are logged and reported
/// as `None`/`false`, never as a panic or error. The `try_*` variants
/// return the typed cause instead.
pub struct SharedStorage {
    host: Arc<dyn HostEnvironment>,
    backend: Box<dyn StorageBackend>,
    mime_registry: Arc<dyn MimeRegistry>,
}

impl SharedStorage {
    pub fn new(host: Arc<dyn HostEnvironment>, broker: Arc<dyn ContentBroker>) -> Self {
        Self::with_options(host, broker, StorageOptions::default())
    }

    /// Pick the backend once, from the host's API level
    pub fn with_options(
        host: Arc<dyn HostEnvironment>,
        broker: Arc<dyn ContentBroker>,
        options: StorageOptions,
    ) -> Self {
        let mode = StorageMode::for_api_level(host.api_level());
        log::info!(
            "Shared storage in {mode:?} mode (API level {})",
            host.api_level()
        );
        let backend: Box<dyn StorageBackend> = match mode {
            StorageMode::Modern => {
                let backend = ModernBackend::new(broker, Arc::clone(&options.mime_registry));
                match options.copy_strategy {
                    Some(strategy) => Box::new(backend.with_copy_strategy(strategy)),
                    None => Box::new(backend),
                }
            }
            StorageMode::Legacy => {
                let backend = LegacyBackend::new(host.external_storage_root(), broker);
                match options.copy_strategy {
                    Some(strategy) => Box::new(backend.with_copy_strategy(strategy)),
                    None => Box::new(backend),
                }
            }
        };
        Self::with_backend(host, backend, options.mime_registry)
    }

    pub fn with_backend(
        host: Arc<dyn HostEnvironment>,
        backend: Box<dyn StorageBackend>,
        mime_registry: Arc<dyn MimeRegistry>,
    ) -> Self {
        Self {
            host,
            backend,
            mime_registry,
        }
    }

    pub fn mode(&self) -> StorageMode {
        self.backend.mode()
    }

    // ============ Public operations ============

    /// Publish a private file. The collection follows the file's MIME type
    /// unless `collection` is an allowed override; `subpath` adds
    /// directories below the app title and its last segment renames the
    /// file.
    pub fn copy_to_shared(
        &self,
        private_file: &Path,
        collection: Option<Collection>,
        subpath: Option<&str>,
    ) -> Option<FileRef> {
        report(
            "copy_to_shared",
            self.try_copy_to_shared(private_file, collection, subpath),
        )
    }

    /// Copy a shared file into `<cache>/FromSharedStorage/`, replacing an
    /// earlier copy of the same name. Returns the private path.
    pub fn copy_from_shared(&self, shared_file: &FileRef) -> Option<PathBuf> {
        report("copy_from_shared", self.try_copy_from_shared(shared_file))
    }

    /// True only if exactly one shared entry was removed
    pub fn delete_shared(&self, shared_file: &FileRef) -> bool {
        report("delete_shared", self.try_delete_shared(shared_file)).is_some()
    }

    pub fn resolve_handle(&self, shared_file: &FileRef) -> Option<FileRef> {
        report("resolve_handle", self.try_resolve_handle(shared_file))
    }

    pub fn mime_type_of(&self, file_name: &str) -> String {
        mime_type_of(file_name, self.mime_registry.as_ref())
    }

    pub fn app_title(&self) -> String {
        self.host.app_title()
    }

    /// The cache directory for copies of shared files, created on first use
    pub fn cache_dir(&self) -> Option<PathBuf> {
        report("cache_dir", self.try_cache_dir())
    }

    // ============ Typed variants ============

    pub fn try_copy_to_shared(
        &self,
        private_file: &Path,
        collection: Option<Collection>,
        subpath: Option<&str>,
    ) -> Result<FileRef, StorageError> {
        if !private_file.is_file() {
            return Err(StorageError::NotFound(private_file.display().to_string()));
        }
        let file_name = private_file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StorageError::Unresolvable(private_file.display().to_string()))?;
        let mime_type = self.mime_type_of(file_name);
        let collection = validate_collection(auto_collection(&mime_type), collection);
        let destination = Destination::new(
            collection,
            &self.app_title(),
            file_name,
            subpath,
            mime_type,
        );
        self.backend.publish(private_file, &destination)
    }

    pub fn try_copy_from_shared(&self, shared_file: &FileRef) -> Result<PathBuf, StorageError> {
        let mut source = self.backend.open_shared(shared_file)?;
        let file_name = Path::new(&source.display_name)
            .file_name()
            .ok_or_else(|| StorageError::Unresolvable(source.display_name.clone()))?
            .to_owned();
        let cache_file = self.try_cache_dir()?.join(file_name);
        if cache_file.exists() {
            fs::remove_file(&cache_file)?;
        }

        let mut writer = fs::File::create(&cache_file)?;
        if let Err(e) = self
            .backend
            .copy_strategy()
            .copy(source.reader.as_mut(), &mut writer)
        {
            drop(writer);
            if let Err(cleanup) = fs::remove_file(&cache_file) {
                log::debug!("Could not remove partial {}: {cleanup}", cache_file.display());
            }
            return Err(StorageError::Interrupted(e));
        }
        Ok(cache_file)
    }

    pub fn try_delete_shared(&self, shared_file: &FileRef) -> Result<(), StorageError> {
        self.backend.delete(shared_file)
    }

    pub fn try_resolve_handle(&self, shared_file: &FileRef) -> Result<FileRef, StorageError> {
        self.backend.resolve(shared_file)
    }

    fn try_cache_dir(&self) -> Result<PathBuf, StorageError> {
        let cache_root = self
            .host
            .external_cache_dir()
            .ok_or_else(|| StorageError::Unavailable("no external cache directory".to_string()))?;
        let cache_dir = cache_root.join(CACHE_DIR_NAME);
        fs::create_dir_all(&cache_dir)?;
        Ok(cache_dir)
    }
}

/// Log a failure under the operation's name and turn it into `None`
fn report<T>(operation: &str, result: Result<T, StorageError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            log::info!("SharedStorage.{operation}(): {e}, ignored.");
            None
        }
        Err(e) => {
            log::warn!("SharedStorage.{operation}(): {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::MediaRoot;
    use crate::platform::host::StaticHost;
    use crate::platform::memory::MemoryBroker;
    use crate::platform::{EntryLocation, NewEntry, WriteMode};
    use crate::tests::{BrokenStreamBroker, create_private_file};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::TempDir;

    struct Fixture {
        private: TempDir,
        cache: TempDir,
        shared: TempDir,
        broker: Arc<MemoryBroker>,
        storage: SharedStorage,
    }

    fn fixture(api_level: u32) -> Fixture {
        let private = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        let host = StaticHost::new("MyApp", api_level)
            .with_cache_dir(cache.path())
            .with_storage_root(shared.path());
        let broker = Arc::new(MemoryBroker::new());
        let storage = SharedStorage::new(Arc::new(host), broker.clone());
        Fixture {
            private,
            cache,
            shared,
            broker,
            storage,
        }
    }

    #[test]
    fn test_mode_follows_api_level() {
        assert_eq!(fixture(28).storage.mode(), StorageMode::Legacy);
        assert_eq!(fixture(33).storage.mode(), StorageMode::Modern);
    }

    #[test]
    fn test_copy_to_shared_uses_auto_collection() {
        let f = fixture(33);
        let source = create_private_file(&f.private, "scan.PNG", b"img");

        let published = f.storage.copy_to_shared(&source, None, None).unwrap();

        let FileRef::Handle(uri) = published else {
            panic!("modern mode publishes handles");
        };
        let record = f.broker.describe(&uri).unwrap().unwrap();
        assert_eq!(record.relative_path.as_deref(), Some("Pictures/MyApp/"));
        assert_eq!(record.mime_type, "image/png");
        assert_eq!(MediaRoot::of_uri(&uri), Some(MediaRoot::Images));
    }

    #[test]
    fn test_rejected_override_falls_back_to_auto_collection() {
        let f = fixture(28);
        let source = create_private_file(&f.private, "track.mp3", b"id3");

        let rejected = f
            .storage
            .copy_to_shared(&source, Some(Collection::Pictures), None)
            .unwrap();
        let accepted = f
            .storage
            .copy_to_shared(&source, Some(Collection::Ringtones), None)
            .unwrap();

        assert_eq!(
            rejected,
            FileRef::LegacyPath(f.shared.path().join("Music/MyApp/track.mp3"))
        );
        assert_eq!(
            accepted,
            FileRef::LegacyPath(f.shared.path().join("Ringtones/MyApp/track.mp3"))
        );
    }

    #[test]
    fn test_copy_to_shared_missing_source() {
        for api_level in [28, 33] {
            let f = fixture(api_level);
            let missing = f.private.path().join("missing.txt");

            assert_eq!(f.storage.copy_to_shared(&missing, None, None), None);
            assert_eq!(
                f.storage
                    .try_copy_to_shared(&missing, None, None)
                    .unwrap_err()
                    .kind(),
                ErrorKind::NotFound
            );
            assert!(f.broker.is_empty());
            assert_eq!(fs::read_dir(f.shared.path()).unwrap().count(), 0);
        }
    }

    #[test]
    fn test_copy_from_shared_overwrites_cache_entry() {
        let f = fixture(33);
        let source = create_private_file(&f.private, "notes.txt", b"old");
        let published = f.storage.copy_to_shared(&source, None, None).unwrap();
        let first = f.storage.copy_from_shared(&published).unwrap();

        fs::write(&source, b"new").unwrap();
        let republished = f.storage.copy_to_shared(&source, None, None).unwrap();
        let second = f.storage.copy_from_shared(&republished).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            second,
            f.cache.path().join(CACHE_DIR_NAME).join("notes.txt")
        );
        assert_eq!(fs::read(second).unwrap(), b"new");
    }

    #[test]
    fn test_copy_from_shared_without_cache_dir() {
        let broker = Arc::new(MemoryBroker::new());
        let private = tempfile::tempdir().unwrap();
        let source = create_private_file(&private, "a.txt", b"x");
        let storage = SharedStorage::new(Arc::new(StaticHost::new("MyApp", 33)), broker);
        let published = storage.copy_to_shared(&source, None, None).unwrap();

        let result = storage.try_copy_from_shared(&published);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(storage.cache_dir(), None);
    }

    #[test]
    fn test_delete_shared_is_true_once() {
        for api_level in [28, 33] {
            let f = fixture(api_level);
            let source = create_private_file(&f.private, "a.pdf", b"%PDF");
            let published = f.storage.copy_to_shared(&source, None, None).unwrap();

            assert!(f.storage.delete_shared(&published));
            assert!(!f.storage.delete_shared(&published));
            assert!(source.exists());
        }
    }

    #[test]
    fn test_resolve_handle_by_shared_path() {
        let f = fixture(33);
        let source = create_private_file(&f.private, "a.pdf", b"%PDF");
        let published = f
            .storage
            .copy_to_shared(&source, Some(Collection::Downloads), Some("bills/march.pdf"))
            .unwrap();

        let resolved = f
            .storage
            .resolve_handle(&FileRef::parse("Download/MyApp/bills/march.pdf"));

        assert_eq!(resolved, Some(published));
        assert_eq!(
            f.storage
                .resolve_handle(&FileRef::parse("Download/MyApp/bills/april.pdf")),
            None
        );
    }

    #[test]
    fn test_copy_strategy_override() {
        let host = Arc::new(StaticHost::new("MyApp", 33));
        let options = StorageOptions {
            copy_strategy: Some(CopyStrategy::Chunked),
            ..StorageOptions::default()
        };
        let storage =
            SharedStorage::with_options(host, Arc::new(MemoryBroker::new()), options);
        assert_eq!(storage.backend.copy_strategy(), CopyStrategy::Chunked);
    }

    #[rstest]
    #[case(28)]
    #[case(33)]
    fn test_failed_fetch_leaves_no_cache_file(#[case] api_level: u32) {
        let cache = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        let host = StaticHost::new("MyApp", api_level)
            .with_cache_dir(cache.path())
            .with_storage_root(shared.path());
        let inner = Arc::new(MemoryBroker::new());
        let uri = inner
            .insert(
                MediaRoot::Files,
                &NewEntry {
                    display_name: "movie.mp4".to_string(),
                    mime_type: "video/mp4".to_string(),
                    location: EntryLocation::RelativePath("Movies/Other/".to_string()),
                },
            )
            .unwrap();
        inner
            .open_write(&uri, WriteMode::Create)
            .unwrap()
            .write_all(&[1u8; 4096])
            .unwrap();
        let storage = SharedStorage::new(
            Arc::new(host),
            Arc::new(BrokenStreamBroker::breaking_reads(inner)),
        );

        let result = storage.try_copy_from_shared(&FileRef::Handle(uri));

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Interrupted);
        let cached = fs::read_dir(cache.path().join(CACHE_DIR_NAME)).unwrap();
        assert_eq!(cached.count(), 0);
    }

    #[test]
    fn test_audiobook_override_in_legacy_mode() {
        let f = fixture(28);
        let source = create_private_file(&f.private, "podcast.m4b", b"ftyp");

        let published = f
            .storage
            .copy_to_shared(&source, Some(Collection::Audiobooks), None)
            .unwrap();

        assert_eq!(
            published,
            FileRef::LegacyPath(f.shared.path().join("Audiobooks/MyApp/podcast.m4b"))
        );
    }

    #[test]
    fn test_legacy_strategy_override_applies_to_fetch() {
        let private = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        let host = StaticHost::new("MyApp", 28)
            .with_cache_dir(cache.path())
            .with_storage_root(shared.path());
        let options = StorageOptions {
            copy_strategy: Some(CopyStrategy::Bulk),
            ..StorageOptions::default()
        };
        let storage =
            SharedStorage::with_options(Arc::new(host), Arc::new(MemoryBroker::new()), options);
        let bytes = vec![3u8; 5000];
        let source = create_private_file(&private, "blob.bin", &bytes);

        let published = storage.copy_to_shared(&source, None, None).unwrap();
        let fetched = storage.copy_from_shared(&published).unwrap();

        assert_eq!(storage.backend.copy_strategy(), CopyStrategy::Bulk);
        assert_eq!(fs::read(fetched).unwrap(), bytes);
    }
}
