//! Shared storage collections and the policy that decides which one a
//! published file lands in.

use crate::file_ref::ContentUri;
use crate::mime;
use std::fmt;
use std::str::FromStr;

/// A platform-defined shared storage directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Pictures,
    Movies,
    Music,
    Documents,
    Downloads,
    Alarms,
    Audiobooks,
    Notifications,
    Podcasts,
    Recordings,
    Ringtones,
    Dcim,
    Screenshots,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Pictures,
        Collection::Movies,
        Collection::Music,
        Collection::Documents,
        Collection::Downloads,
        Collection::Alarms,
        Collection::Audiobooks,
        Collection::Notifications,
        Collection::Podcasts,
        Collection::Recordings,
        Collection::Ringtones,
        Collection::Dcim,
        Collection::Screenshots,
    ];

    /// Directory name as defined by `android.os.Environment.DIRECTORY_*`
    pub fn dir_name(self) -> &'static str {
        match self {
            Collection::Pictures => "Pictures",
            Collection::Movies => "Movies",
            Collection::Music => "Music",
            Collection::Documents => "Documents",
            Collection::Downloads => "Download",
            Collection::Alarms => "Alarms",
            Collection::Audiobooks => "Audiobooks",
            Collection::Notifications => "Notifications",
            Collection::Podcasts => "Podcasts",
            Collection::Recordings => "Recordings",
            Collection::Ringtones => "Ringtones",
            Collection::Dcim => "DCIM",
            Collection::Screenshots => "Screenshots",
        }
    }

    /// Collections a caller may pick instead of this auto collection
    fn accepted_overrides(self) -> &'static [Collection] {
        match self {
            Collection::Music => &[
                Collection::Alarms,
                Collection::Audiobooks,
                Collection::Music,
                Collection::Notifications,
                Collection::Podcasts,
                Collection::Recordings,
                Collection::Ringtones,
            ],
            Collection::Pictures => &[
                Collection::Dcim,
                Collection::Pictures,
                Collection::Screenshots,
            ],
            Collection::Movies => &[Collection::Movies],
            _ => &[Collection::Documents],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown collection: {0}")]
pub struct UnknownCollection(pub String);

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Collection::ALL
            .into_iter()
            .find(|c| {
                c.dir_name().eq_ignore_ascii_case(wanted)
                    || (*c == Collection::Downloads && wanted.eq_ignore_ascii_case("downloads"))
            })
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}

/// Collection a file of this MIME type is published to by default.
///
/// Total: malformed input falls back to [`Collection::Documents`].
pub fn auto_collection(mime_type: &str) -> Collection {
    match mime::top_level_type(mime_type).as_str() {
        "image" => Collection::Pictures,
        "video" => Collection::Movies,
        "audio" => Collection::Music,
        _ => Collection::Documents,
    }
}

/// Accept `requested` only when the policy table allows it for `auto`.
///
/// Downloads is always allowed. Anything else degrades to `auto`.
pub fn validate_collection(auto: Collection, requested: Option<Collection>) -> Collection {
    let Some(requested) = requested else {
        return auto;
    };
    if requested == Collection::Downloads || auto.accepted_overrides().contains(&requested) {
        requested
    } else {
        log::debug!("Collection {requested} not allowed for {auto} files, using {auto}");
        auto
    }
}

/// The shared index table an entry is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaRoot {
    Images,
    Video,
    Audio,
    Downloads,
    Files,
}

impl MediaRoot {
    pub const ALL: [MediaRoot; 5] = [
        MediaRoot::Images,
        MediaRoot::Video,
        MediaRoot::Audio,
        MediaRoot::Downloads,
        MediaRoot::Files,
    ];

    /// `EXTERNAL_CONTENT_URI` of the matching `MediaStore` table
    pub fn content_uri(self) -> ContentUri {
        ContentUri::new(match self {
            MediaRoot::Images => "content://media/external/images/media",
            MediaRoot::Video => "content://media/external/video/media",
            MediaRoot::Audio => "content://media/external/audio/media",
            MediaRoot::Downloads => "content://media/external/downloads",
            MediaRoot::Files => "content://media/external/file",
        })
    }

    /// Table owning `uri`, if it is a shared index handle
    pub fn of_uri(uri: &ContentUri) -> Option<MediaRoot> {
        MediaRoot::ALL.into_iter().find(|root| {
            uri.as_str()
                .strip_prefix(root.content_uri().as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

pub fn media_root(collection: Collection, mime_type: &str) -> MediaRoot {
    if collection == Collection::Downloads {
        return MediaRoot::Downloads;
    }
    match mime::top_level_type(mime_type).as_str() {
        "image" => MediaRoot::Images,
        "video" => MediaRoot::Video,
        "audio" => MediaRoot::Audio,
        _ => MediaRoot::Files,
    }
}
