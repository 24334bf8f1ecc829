use super::HostEnvironment;
use std::path::{Path, PathBuf};

/// A [`HostEnvironment`] with fixed answers, for desktop hosts and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHost {
    api_level: u32,
    app_title: String,
    cache_dir: Option<PathBuf>,
    storage_root: Option<PathBuf>,
}

impl StaticHost {
    pub fn new(app_title: impl Into<String>, api_level: u32) -> Self {
        Self {
            api_level,
            app_title: app_title.into(),
            cache_dir: None,
            storage_root: None,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl AsRef<Path>) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    pub fn with_storage_root(mut self, storage_root: impl AsRef<Path>) -> Self {
        self.storage_root = Some(storage_root.as_ref().to_path_buf());
        self
    }
}

impl HostEnvironment for StaticHost {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn app_title(&self) -> String {
        self.app_title.clone()
    }

    fn external_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone()
    }

    fn external_storage_root(&self) -> Option<PathBuf> {
        self.storage_root.clone()
    }
}
