pub mod chooser;
pub mod collection;
pub mod error;
pub mod file_ref;
pub mod intent;
pub mod mime;
pub mod platform;
pub mod share;
pub mod storage;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use chooser::{Chooser, PickerResult, REQUEST_CODE_MULTIPLE, REQUEST_CODE_SINGLE, RESULT_OK};
pub use collection::{Collection, MediaRoot, auto_collection, media_root, validate_collection};
pub use error::{ErrorKind, StorageError};
pub use file_ref::{ContentUri, FileRef};
pub use intent::{Intent, IntentAction};
pub use mime::{AndroidMimeTable, MimeRegistry, UNKNOWN_MIME_TYPE, mime_type_of};
pub use platform::host::StaticHost;
pub use platform::memory::{MemoryBroker, RecordingLauncher};
pub use platform::{
    ActivityLauncher, ContentBroker, EntryLocation, EntryRecord, HostEnvironment, NewEntry,
    Selection, WriteMode,
};
pub use share::{ShareError, ShareSession};
pub use storage::{CopyStrategy, SharedStorage, StorageMode, StorageOptions};
