//! Pre-scoped-storage devices: shared storage is a plain directory tree.
//!
//! Handles still show up here, since the picker hands out content URIs on
//! every platform version; those go through the broker.

use super::{
    CopyStrategy, Destination, SharedSource, StorageBackend, StorageMode, delete_handle,
    open_file, open_handle,
};
use crate::error::StorageError;
use crate::file_ref::FileRef;
use crate::platform::ContentBroker;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct LegacyBackend {
    root: Option<PathBuf>,
    broker: Arc<dyn ContentBroker>,
    strategy: CopyStrategy,
}

impl LegacyBackend {
    pub fn new(root: Option<PathBuf>, broker: Arc<dyn ContentBroker>) -> Self {
        Self {
            root,
            broker,
            strategy: CopyStrategy::Chunked,
        }
    }

    pub fn with_copy_strategy(mut self, strategy: CopyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn root(&self) -> Result<&Path, StorageError> {
        match &self.root {
            Some(root) if root.is_dir() => Ok(root),
            Some(root) => Err(StorageError::Unavailable(format!(
                "shared storage root {} does not exist",
                root.display()
            ))),
            None => Err(StorageError::Unavailable(
                "no shared storage root".to_string(),
            )),
        }
    }

    /// Shared paths are relative to the root; absolute paths stay as they are
    fn locate(&self, path: &Path) -> Result<PathBuf, StorageError> {
        Ok(self.root()?.join(path))
    }
}

impl StorageBackend for LegacyBackend {
    fn mode(&self) -> StorageMode {
        StorageMode::Legacy
    }

    fn copy_strategy(&self) -> CopyStrategy {
        self.strategy
    }

    fn publish(&self, source: &Path, destination: &Destination) -> Result<FileRef, StorageError> {
        let dir = destination.relative_dir().to_path(self.root()?);
        fs::create_dir_all(&dir)?;
        let public_path = dir.join(&destination.file_name);
        if public_path.exists() {
            fs::remove_file(&public_path)?;
        }
        fs::copy(source, &public_path)?;
        log::debug!(
            "Published {} to {}",
            source.display(),
            public_path.display()
        );
        Ok(FileRef::LegacyPath(public_path))
    }

    fn resolve(&self, file: &FileRef) -> Result<FileRef, StorageError> {
        match file {
            FileRef::LegacyPath(path) => {
                let located = self.locate(path)?;
                if located.exists() {
                    Ok(FileRef::LegacyPath(located))
                } else {
                    Err(StorageError::NotFound(located.display().to_string()))
                }
            }
            FileRef::Handle(uri) => match uri.file_path() {
                Some(path) if path.exists() => Ok(FileRef::LegacyPath(path)),
                Some(path) => Err(StorageError::NotFound(path.display().to_string())),
                None if uri.is_content() => Ok(file.clone()),
                None => Err(StorageError::Unresolvable(uri.to_string())),
            },
        }
    }

    fn open_shared(&self, file: &FileRef) -> Result<SharedSource<'_>, StorageError> {
        match file {
            FileRef::LegacyPath(path) => open_file(&self.locate(path)?),
            FileRef::Handle(uri) => open_handle(self.broker.as_ref(), uri),
        }
    }

    fn delete(&self, file: &FileRef) -> Result<(), StorageError> {
        let path = match file {
            FileRef::LegacyPath(path) => self.locate(path)?,
            FileRef::Handle(uri) => match uri.file_path() {
                Some(path) => path,
                None => return delete_handle(self.broker.as_ref(), uri),
            },
        };
        if !path.is_file() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }
}
