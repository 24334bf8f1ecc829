use std::io;

/// Why a storage operation did not happen.
///
/// Public entry points of the bridge and the share session never return
/// these to the host UI; they log them and degrade to `None`/`false`.
/// The `try_*` variants expose them so callers (and tests) can tell the
/// causes apart.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Cannot resolve shared entry: {0}")]
    Unresolvable(String),
    #[error("Copy interrupted: {0}")]
    Interrupted(#[source] io::Error),
    #[error("Platform service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    Unresolvable,
    Interrupted,
    Unavailable,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            StorageError::Unresolvable(_) => ErrorKind::Unresolvable,
            StorageError::Interrupted(_) => ErrorKind::Interrupted,
            StorageError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(error.to_string()),
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(error.to_string()),
            _ => StorageError::Interrupted(error),
        }
    }
}
