//! Handing files to other apps through the share sheet.
//!
//! A private file on a legacy device has no handle another process could
//! read, so the session registers a temporary index row (a grant) that
//! points at it. Grants live until the next share operation on the same
//! session, which revokes them before doing anything else.

use crate::collection::MediaRoot;
use crate::error::StorageError;
use crate::file_ref::{ContentUri, FileRef};
use crate::intent::{Intent, IntentAction};
use crate::mime::{AndroidMimeTable, MimeRegistry, mime_type_of};
use crate::platform::{
    ActivityLauncher, ContentBroker, EntryLocation, HostEnvironment, NewEntry, Selection,
};
use crate::storage::StorageMode;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Nothing to share")]
    Empty,
    #[error("None of the {0} files could be shared")]
    NoneResolvable(usize),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct ShareSession {
    mode: StorageMode,
    broker: Arc<dyn ContentBroker>,
    launcher: Arc<dyn ActivityLauncher>,
    mime_registry: Arc<dyn MimeRegistry>,
    grants: Vec<ContentUri>,
}

impl ShareSession {
    pub fn new(
        mode: StorageMode,
        broker: Arc<dyn ContentBroker>,
        launcher: Arc<dyn ActivityLauncher>,
    ) -> Self {
        Self {
            mode,
            broker,
            launcher,
            mime_registry: Arc::new(AndroidMimeTable),
            grants: Vec::new(),
        }
    }

    pub fn for_host(
        host: &dyn HostEnvironment,
        broker: Arc<dyn ContentBroker>,
        launcher: Arc<dyn ActivityLauncher>,
    ) -> Self {
        Self::new(StorageMode::for_api_level(host.api_level()), broker, launcher)
    }

    pub fn with_mime_registry(mut self, mime_registry: Arc<dyn MimeRegistry>) -> Self {
        self.mime_registry = mime_registry;
        self
    }

    /// Grants created by the most recent share operation
    pub fn live_grants(&self) -> &[ContentUri] {
        &self.grants
    }

    pub fn share_text(&mut self, text: &str, target_app: Option<&str>) {
        report("share_plain_text", self.try_share_text(text, target_app));
    }

    pub fn share_one(&mut self, file: &FileRef, target_app: Option<&str>, text: Option<&str>) {
        report("share_file", self.try_share_one(file, target_app, text));
    }

    pub fn share_many(&mut self, files: &[FileRef], target_app: Option<&str>) {
        report("share_file_list", self.try_share_many(files, target_app));
    }

    pub fn try_share_text(
        &mut self,
        text: &str,
        target_app: Option<&str>,
    ) -> Result<Intent, ShareError> {
        self.revoke_all();
        let intent = Intent::new(IntentAction::Send, "text/plain")
            .with_text(Some(text))
            .addressed_to(target_app);
        self.launcher.start_activity(&intent)?;
        Ok(intent)
    }

    pub fn try_share_one(
        &mut self,
        file: &FileRef,
        target_app: Option<&str>,
        text: Option<&str>,
    ) -> Result<Intent, ShareError> {
        self.revoke_all();
        self.send_one(file, target_app, text)
    }

    pub fn try_share_many(
        &mut self,
        files: &[FileRef],
        target_app: Option<&str>,
    ) -> Result<Intent, ShareError> {
        self.revoke_all();
        match files {
            [] => Err(ShareError::Empty),
            [file] => self.send_one(file, target_app, None),
            _ => self.send_many(files, target_app),
        }
    }

    /// Delete every grant's index row. The files they point at are left
    /// alone.
    pub fn revoke_all(&mut self) {
        for uri in self.grants.drain(..) {
            match self.broker.delete(&uri) {
                Ok(_) => log::debug!("Revoked grant {uri}"),
                Err(e) => log::warn!("ShareSession.revoke_all(): {uri}: {e}"),
            }
        }
    }

    fn send_one(
        &mut self,
        file: &FileRef,
        target_app: Option<&str>,
        text: Option<&str>,
    ) -> Result<Intent, ShareError> {
        let uri = self.grantable(file)?;
        let mime_type = self.mime_type_for(&uri, file);
        let intent = Intent::new(IntentAction::Send, mime_type)
            .with_streams(vec![uri])
            .with_text(text)
            .addressed_to(target_app);
        self.launcher.start_activity(&intent)?;
        Ok(intent)
    }

    fn send_many(
        &mut self,
        files: &[FileRef],
        target_app: Option<&str>,
    ) -> Result<Intent, ShareError> {
        let mut shared = Vec::new();
        for file in files {
            match self.grantable(file) {
                Ok(uri) => shared.push((uri, file)),
                Err(e) => log::info!("Skipping {file}: {e}"),
            }
        }
        let Some((first_uri, first_file)) = shared.first() else {
            return Err(ShareError::NoneResolvable(files.len()));
        };

        // One MIME type for the whole batch
        let mime_type = self.mime_type_for(first_uri, first_file);
        if shared
            .iter()
            .skip(1)
            .any(|(uri, file)| self.mime_type_for(uri, file) != mime_type)
        {
            log::warn!("Sharing files of mixed types, all sent as {mime_type}");
        }

        let streams = shared.into_iter().map(|(uri, _)| uri).collect();
        let intent = Intent::new(IntentAction::SendMultiple, mime_type)
            .with_streams(streams)
            .addressed_to(target_app);
        self.launcher.start_activity(&intent)?;
        Ok(intent)
    }

    /// A handle the receiving process may be granted read access to
    fn grantable(&mut self, file: &FileRef) -> Result<ContentUri, StorageError> {
        match (self.mode, file) {
            (_, FileRef::Handle(uri)) => Ok(uri.clone()),
            (StorageMode::Modern, FileRef::LegacyPath(path)) => Err(StorageError::Unresolvable(
                format!("{} is a path, scoped storage needs a handle", path.display()),
            )),
            (StorageMode::Legacy, FileRef::LegacyPath(path)) => self.create_grant(path),
        }
    }

    fn create_grant(&mut self, path: &Path) -> Result<ContentUri, StorageError> {
        if !path.is_file() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        let display_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StorageError::Unresolvable(path.display().to_string()))?
            .to_string();
        self.destroy_stale_grant(&display_name)?;

        let entry = NewEntry {
            mime_type: mime_type_of(&display_name, self.mime_registry.as_ref()),
            display_name,
            location: EntryLocation::Data(path.to_path_buf()),
        };
        let uri = self.broker.insert(MediaRoot::Files, &entry)?;
        self.grants.push(uri.clone());
        Ok(uri)
    }

    /// Remove a leftover row with this display name from an earlier run,
    /// so the receiving app is not offered an outdated copy.
    fn destroy_stale_grant(&self, display_name: &str) -> Result<(), StorageError> {
        let stale = self
            .broker
            .query(MediaRoot::Files, &Selection::by_name(display_name))?
            .into_iter()
            .find(|record| {
                record.display_name == display_name && !self.grants.contains(&record.uri)
            });
        if let Some(record) = stale
            && let Err(e) = self.broker.delete(&record.uri)
        {
            log::info!("Could not remove stale entry {}: {e}", record.uri);
        }
        Ok(())
    }

    fn mime_type_for(&self, uri: &ContentUri, file: &FileRef) -> String {
        self.broker
            .mime_type(uri)
            .or_else(|| {
                file.file_name()
                    .map(|name| mime_type_of(&name, self.mime_registry.as_ref()))
            })
            .unwrap_or_else(|| "*/*".to_string())
    }
}

impl Drop for ShareSession {
    fn drop(&mut self) {
        self.revoke_all();
    }
}

fn report(operation: &str, result: Result<Intent, ShareError>) {
    if let Err(e) = result {
        log::warn!("ShareSession.{operation}(): {e}");
    }
}
