use std::fmt;
use std::path::{Path, PathBuf};

/// An opaque handle to an entry owned by the platform's shared index,
/// e.g. `content://media/external/images/media/42`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentUri(String);

impl ContentUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URI scheme, if the string has one (`content`, `file`, ...)
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.0.split_once(':')?;
        let valid = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then_some(scheme)
    }

    pub fn is_content(&self) -> bool {
        self.scheme()
            .is_some_and(|s| s.eq_ignore_ascii_case("content"))
    }

    /// Filesystem path of a `file://` URI
    pub fn file_path(&self) -> Option<PathBuf> {
        if !self.scheme()?.eq_ignore_ascii_case("file") {
            return None;
        }
        let rest = &self.0[self.0.find(':')? + 1..];
        let path = rest.strip_prefix("//").unwrap_or(rest);
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// Equivalent of `ContentUris.withAppendedId`
    pub fn with_appended_id(&self, id: u64) -> Self {
        Self(format!("{}/{id}", self.0.trim_end_matches('/')))
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to a file outside the app's private sandbox.
///
/// Legacy paths are only meaningful before scoped storage; once the bridge
/// runs in modern mode every file it hands out is a [`ContentUri`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    LegacyPath(PathBuf),
    Handle(ContentUri),
}

impl FileRef {
    /// Interpret user supplied text: anything carrying a URI scheme
    /// separator is a handle, everything else a path.
    pub fn parse(text: &str) -> Self {
        let uri = ContentUri::new(text);
        if text.contains("://") && uri.scheme().is_some() {
            FileRef::Handle(uri)
        } else {
            FileRef::LegacyPath(PathBuf::from(text))
        }
    }

    /// Base name for paths and `file://` handles. Content handles need an
    /// index lookup to learn their display name.
    pub fn file_name(&self) -> Option<String> {
        let path = match self {
            FileRef::LegacyPath(path) => path.clone(),
            FileRef::Handle(uri) => uri.file_path()?,
        };
        path.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
    }
}

impl From<PathBuf> for FileRef {
    fn from(path: PathBuf) -> Self {
        FileRef::LegacyPath(path)
    }
}

impl From<&Path> for FileRef {
    fn from(path: &Path) -> Self {
        FileRef::LegacyPath(path.to_path_buf())
    }
}

impl From<ContentUri> for FileRef {
    fn from(uri: ContentUri) -> Self {
        FileRef::Handle(uri)
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRef::LegacyPath(path) => write!(f, "{}", path.display()),
            FileRef::Handle(uri) => write!(f, "{uri}"),
        }
    }
}
