use crate::broker::JniContentBroker;
use crate::context::AndroidContext;
use crate::host::AndroidHost;
use crate::launcher::AndroidLauncher;
use crate::mime::JniMimeTypeMap;
use shared_storage_engine::chooser::ResultCallback;
use shared_storage_engine::{Chooser, ShareSession, SharedStorage, StorageError, StorageOptions};
use std::sync::Arc;

/// The engine's collaborators wired to the running app.
pub struct AndroidServices {
    pub context: Arc<AndroidContext>,
    pub host: Arc<AndroidHost>,
    pub broker: Arc<JniContentBroker>,
    pub launcher: Arc<AndroidLauncher>,
}

impl AndroidServices {
    pub fn from_ndk() -> Result<Self, StorageError> {
        let context = Arc::new(AndroidContext::from_ndk()?);
        Ok(Self {
            host: Arc::new(AndroidHost::new(&context)?),
            broker: Arc::new(JniContentBroker::new(context.clone())),
            launcher: Arc::new(AndroidLauncher::new(context.clone())),
            context,
        })
    }

    pub fn shared_storage(&self) -> SharedStorage {
        SharedStorage::with_options(
            self.host.clone(),
            self.broker.clone(),
            StorageOptions {
                mime_registry: Arc::new(JniMimeTypeMap::new(self.context.clone())),
                copy_strategy: None,
            },
        )
    }

    pub fn share_session(&self) -> ShareSession {
        ShareSession::for_host(self.host.as_ref(), self.broker.clone(), self.launcher.clone())
            .with_mime_registry(Arc::new(JniMimeTypeMap::new(self.context.clone())))
    }

    pub fn chooser(&self, on_result: ResultCallback) -> Chooser {
        Chooser::new(self.launcher.clone(), on_result)
    }
}
