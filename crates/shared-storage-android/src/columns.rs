//! MediaStore column names and the pieces of a query that need no JVM.

use shared_storage_engine::{
    ContentUri, EntryLocation, EntryRecord, NewEntry, Selection, StorageError,
};
use std::path::PathBuf;

pub const ID: &str = "_id";
pub const DISPLAY_NAME: &str = "_display_name";
pub const MIME_TYPE: &str = "mime_type";
/// Only present from API level 29
pub const RELATIVE_PATH: &str = "relative_path";
/// Deprecated from API level 29, still used for legacy grants
pub const DATA: &str = "_data";

/// `(column, value)` pairs for `ContentValues`
pub fn content_values(entry: &NewEntry) -> Vec<(&'static str, String)> {
    let location = match &entry.location {
        EntryLocation::RelativePath(path) => (RELATIVE_PATH, path.clone()),
        EntryLocation::Data(path) => (DATA, path.display().to_string()),
    };
    vec![
        (DISPLAY_NAME, entry.display_name.clone()),
        (MIME_TYPE, entry.mime_type.clone()),
        location,
    ]
}

/// A `selection` clause with `?` placeholders, and its arguments in order
pub fn selection_clause(selection: &Selection) -> (String, Vec<String>) {
    let mut clauses = vec![format!("{DISPLAY_NAME}=?")];
    let mut args = vec![selection.display_name.clone()];
    if let Some(relative_path) = &selection.relative_path {
        clauses.push(format!("{RELATIVE_PATH}=?"));
        args.push(relative_path.clone());
    }
    if let Some(data) = &selection.data {
        clauses.push(format!("{DATA}=?"));
        args.push(data.display().to_string());
    }
    (clauses.join(" AND "), args)
}

/// One cursor row, with absent or null columns as `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub id: i64,
    pub display_name: Option<String>,
    pub mime_type: Option<String>,
    pub relative_path: Option<String>,
    pub data: Option<String>,
}

impl Row {
    /// `uri` is the row itself, or `None` to append the id to `table`
    pub fn into_record(self, table: &ContentUri, uri: Option<&ContentUri>) -> EntryRecord {
        let id = u64::try_from(self.id).unwrap_or_default();
        EntryRecord {
            id,
            uri: uri.cloned().unwrap_or_else(|| table.with_appended_id(id)),
            display_name: self.display_name.unwrap_or_default(),
            mime_type: self.mime_type.unwrap_or_default(),
            relative_path: self.relative_path,
            data: self.data.map(PathBuf::from),
        }
    }
}

/// Map a Java exception to the error a caller can act on
pub fn classify_exception(class_name: &str, message: Option<&str>) -> StorageError {
    let detail = match message {
        Some(message) => format!("{class_name}: {message}"),
        None => class_name.to_string(),
    };
    match class_name {
        "java.lang.SecurityException" | "android.app.RecoverableSecurityException" => {
            StorageError::PermissionDenied(detail)
        }
        "java.io.FileNotFoundException" => StorageError::NotFound(detail),
        "java.lang.IllegalArgumentException" | "java.lang.UnsupportedOperationException" => {
            StorageError::Unresolvable(detail)
        }
        "java.io.IOException" | "java.io.EOFException" => {
            StorageError::Interrupted(std::io::Error::other(detail))
        }
        _ => StorageError::Unavailable(detail),
    }
}
