//! File name to MIME type derivation.

pub const UNKNOWN_MIME_TYPE: &str = "application/unknown";

/// Extension to MIME type lookup, as provided by the platform.
pub trait MimeRegistry: Send + Sync {
    /// `extension` is lowercase and has no leading dot
    fn mime_type_from_extension(&self, extension: &str) -> Option<String>;
}

/// Off-device stand-in for Android's `MimeTypeMap`.
///
/// Answers from `mime_guess`, except for the extensions in
/// `ANDROID_OVERRIDES` where the platform disagrees.
#[derive(Debug, Default, Clone, Copy)]
pub struct AndroidMimeTable;

/// Entries where `MimeTypeMap` answers differently from `mime_guess`
const ANDROID_OVERRIDES: &[(&str, &str)] = &[
    ("csv", "text/comma-separated-values"),
    ("gz", "application/gzip"),
    ("m4a", "audio/mpeg"),
    ("m4b", "audio/mp4"),
    ("opus", "audio/ogg"),
    ("ts", "video/mp2ts"),
    ("wav", "audio/x-wav"),
];

impl MimeRegistry for AndroidMimeTable {
    fn mime_type_from_extension(&self, extension: &str) -> Option<String> {
        ANDROID_OVERRIDES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mime_type)| mime_type.to_string())
            .or_else(|| mime_guess::from_ext(extension).first_raw().map(str::to_string))
    }
}

/// Extension of the base name, without the dot. Leading dots (hidden
/// files) do not start an extension.
fn extension(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let stem = base.trim_start_matches('.');
    let dot = stem.rfind('.')?;
    let ext = &stem[dot + 1..];
    (!ext.is_empty()).then_some(ext)
}

/// MIME type for a file name.
///
/// `application/unknown` without an extension, `application/{ext}` when
/// the registry does not know the extension. Never fails.
pub fn mime_type_of(file_name: &str, registry: &dyn MimeRegistry) -> String {
    let Some(ext) = extension(file_name) else {
        return UNKNOWN_MIME_TYPE.to_string();
    };
    registry
        .mime_type_from_extension(&ext.to_lowercase())
        .filter(|mime_type| !mime_type.is_empty())
        .unwrap_or_else(|| format!("application/{ext}"))
}

/// Lowercased part before the first `/`
pub(crate) fn top_level_type(mime_type: &str) -> String {
    mime_type
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Collection, auto_collection, validate_collection};
    use rstest::rstest;

    #[rstest]
    #[case("photo.JPG", "image/jpeg")]
    #[case("photo.jpeg", "image/jpeg")]
    #[case("clip.Mp4", "video/mp4")]
    #[case("song.mp3", "audio/mpeg")]
    #[case("report.pdf", "application/pdf")]
    #[case("notes.txt", "text/plain")]
    #[case("archive.tar.gz", "application/gzip")]
    #[case("noext", "application/unknown")]
    #[case(".bashrc", "application/unknown")]
    #[case("trailing.", "application/unknown")]
    #[case("file.qzx", "application/qzx")]
    #[case("file.QZX", "application/QZX")]
    #[case("Documents/MyApp/scan.png", "image/png")]
    #[case("data.csv", "text/comma-separated-values")]
    #[case("stream.ts", "video/mp2ts")]
    fn test_mime_type_of(#[case] file_name: &str, #[case] expected: &str) {
        assert_eq!(mime_type_of(file_name, &AndroidMimeTable), expected);
    }

    #[rstest]
    #[case("book.m4b", Collection::Audiobooks, Collection::Audiobooks)]
    #[case("track.wma", Collection::Music, Collection::Music)]
    #[case("album.mka", Collection::Podcasts, Collection::Podcasts)]
    #[case("photo.avif", Collection::Pictures, Collection::Pictures)]
    #[case("clip.mkv", Collection::Movies, Collection::Movies)]
    fn test_media_beyond_common_extensions(
        #[case] file_name: &str,
        #[case] requested: Collection,
        #[case] expected: Collection,
    ) {
        let mime_type = mime_type_of(file_name, &AndroidMimeTable);

        assert_eq!(
            validate_collection(auto_collection(&mime_type), Some(requested)),
            expected,
            "{file_name} derived as {mime_type}"
        );
    }

    #[test]
    fn test_custom_registry_is_consulted() {
        struct Everything;
        impl MimeRegistry for Everything {
            fn mime_type_from_extension(&self, extension: &str) -> Option<String> {
                Some(format!("x-test/{extension}"))
            }
        }

        assert_eq!(mime_type_of("a.TXT", &Everything), "x-test/txt");
    }

    #[rstest]
    #[case("image/png", "image")]
    #[case("Audio/ogg", "audio")]
    #[case("nonsense", "nonsense")]
    #[case("", "")]
    fn test_top_level_type(#[case] mime_type: &str, #[case] expected: &str) {
        assert_eq!(top_level_type(mime_type), expected);
    }
}
