// SPDX-License-Identifier: GPL-3.0-or-later

//! Local audio library: directory scanning and tag reading.

use chrono::{DateTime, Utc};
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use top100_domain::{LocalTrackMetadata, TrackFile};
use tracing::{debug, info, warn};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
const ISRC_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("path does not exist: {0}")]
    PathNotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("failed to read tags from {path}: {message}")]
    Tags { path: String, message: String },
}

/// Recursively collect audio files under `root`, sorted by path.
///
/// Symlinks and empty files are skipped.
pub fn scan_audio_files(root: impl AsRef<Path>) -> Result<Vec<TrackFile>, LibraryError> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(LibraryError::PathNotFound(root.display().to_string()));
    }

    let mut scanned = Vec::new();
    visit_directory(root, &mut scanned)?;
    scanned.sort_by(|left, right| left.path.cmp(&right.path));

    info!(target: "library", root = %root.display(), count = scanned.len(), "scanned audio library");
    Ok(scanned)
}

fn visit_directory(directory: &Path, scanned: &mut Vec<TrackFile>) -> Result<(), LibraryError> {
    let entries = fs::read_dir(directory).map_err(|err| LibraryError::Io(err.to_string()))?;

    for entry in entries {
        let entry = entry.map_err(|err| LibraryError::Io(err.to_string()))?;
        let path = entry.path();

        let file_type = entry
            .file_type()
            .map_err(|err| LibraryError::Io(err.to_string()))?;

        if file_type.is_symlink() {
            continue;
        }

        if file_type.is_dir() {
            visit_directory(&path, scanned)?;
            continue;
        }

        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        if !is_audio_extension(&extension.to_ascii_lowercase()) {
            continue;
        }

        let metadata = fs::metadata(&path).map_err(|err| LibraryError::Io(err.to_string()))?;
        if metadata.len() == 0 {
            warn!(target: "library", path = %path.display(), "skipping zero-byte file");
            continue;
        }

        let mut file = TrackFile::new(path, metadata.len());
        if let Ok(modified) = metadata.modified() {
            file = file.with_modified_at(format_timestamp(modified.into()));
        }
        debug!(target: "library", path = %file.path.display(), "found audio file");
        scanned.push(file);
    }

    Ok(())
}

fn is_audio_extension(extension: &str) -> bool {
    matches!(
        extension,
        "mp3" | "flac" | "m4a" | "aac" | "ogg" | "opus" | "wav" | "wv" | "ape" | "dsf"
    )
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Raw values pulled from a file's tags, before fallbacks are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedTags {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub isrc: String,
    pub duration_seconds: Option<f64>,
}

type Extractor = fn(&Tag) -> Option<String>;

const ARTIST_EXTRACTORS: &[Extractor] = &[track_artist, album_artist];
const TITLE_EXTRACTORS: &[Extractor] = &[track_title];
const ALBUM_EXTRACTORS: &[Extractor] = &[album_title];
const ISRC_EXTRACTORS: &[Extractor] = &[isrc];

fn track_artist(tag: &Tag) -> Option<String> {
    tag.artist().map(|value| value.into_owned())
}

fn album_artist(tag: &Tag) -> Option<String> {
    tag.get_string(&ItemKey::AlbumArtist).map(str::to_string)
}

fn track_title(tag: &Tag) -> Option<String> {
    tag.title().map(|value| value.into_owned())
}

fn album_title(tag: &Tag) -> Option<String> {
    tag.album().map(|value| value.into_owned())
}

fn isrc(tag: &Tag) -> Option<String> {
    tag.get_string(&ItemKey::Isrc).map(str::to_string)
}

fn first_non_empty_value(
    primary_tag: Option<&Tag>,
    tags: &[Tag],
    extractors: &[Extractor],
) -> String {
    for extractor in extractors {
        for tag in primary_tag.into_iter().chain(tags) {
            if let Some(value) = extractor(tag) {
                let value = cleanup(&value);
                if !value.is_empty() {
                    return value;
                }
            }
        }
    }

    String::new()
}

/// Read embedded tags and audio properties with `lofty`.
pub fn read_embedded_tags(path: &Path) -> Result<EmbeddedTags, LibraryError> {
    let tagged_file = read_from_path(path).map_err(|err| LibraryError::Tags {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    let primary_tag = tagged_file.primary_tag();
    let tags = tagged_file.tags();

    let duration = tagged_file.properties().duration();

    Ok(EmbeddedTags {
        artist: first_non_empty_value(primary_tag, tags, ARTIST_EXTRACTORS),
        title: first_non_empty_value(primary_tag, tags, TITLE_EXTRACTORS),
        album: first_non_empty_value(primary_tag, tags, ALBUM_EXTRACTORS),
        isrc: first_non_empty_value(primary_tag, tags, ISRC_EXTRACTORS),
        duration_seconds: (!duration.is_zero()).then(|| duration.as_secs_f64()),
    })
}

/// Tag metadata for one file, falling back to the file name when the artist
/// or title tag is missing.
pub fn read_track_metadata(path: &Path) -> Result<LocalTrackMetadata, LibraryError> {
    let tags = read_embedded_tags(path)?;
    Ok(resolve_metadata(tags, path))
}

pub fn resolve_metadata(tags: EmbeddedTags, path: &Path) -> LocalTrackMetadata {
    let mut artist = cleanup(&tags.artist);
    let mut title = cleanup(&tags.title);

    if artist.is_empty() || title.is_empty() {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (parsed_artist, parsed_title) = parse_filename(&stem);
        debug!(
            target: "library",
            path = %path.display(),
            artist = %parsed_artist,
            title = %parsed_title,
            "using file name for missing tags"
        );
        if artist.is_empty() {
            artist = cleanup(&parsed_artist);
        }
        if title.is_empty() {
            title = cleanup(&parsed_title);
        }
    }

    let album = cleanup(&tags.album);
    LocalTrackMetadata {
        artist,
        title,
        album: (!album.is_empty()).then_some(album),
        isrc: normalize_isrc(&tags.isrc),
        duration_seconds: tags.duration_seconds,
    }
}

/// Source of tag metadata for scanned files.
pub trait TrackMetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<LocalTrackMetadata, LibraryError>;
}

impl fmt::Debug for dyn TrackMetadataReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrackMetadataReader")
    }
}

/// Reads tags from disk with `lofty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TrackMetadataReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<LocalTrackMetadata, LibraryError> {
        read_track_metadata(path)
    }
}

/// Split `Artist - Title` or `Artist-Title`; anything else is a bare title.
pub fn parse_filename(stem: &str) -> (String, String) {
    let split = stem.split_once(" - ").or_else(|| stem.split_once('-'));
    match split {
        Some((artist, title)) => (artist.trim().to_string(), title.trim().to_string()),
        None => (UNKNOWN_ARTIST.to_string(), stem.to_string()),
    }
}

/// Uppercased ISRC with separators removed, if it has the expected length.
pub fn normalize_isrc(raw: &str) -> Option<String> {
    let isrc: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (isrc.len() == ISRC_LENGTH).then_some(isrc)
}

fn cleanup(value: &str) -> String {
    value.replace('\0', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn scan_recursively_filters_supported_extensions() {
        let root = tempfile::tempdir().expect("temp dir should be created");
        let album_dir = root.path().join("artist").join("album");
        fs::create_dir_all(&album_dir).expect("nested dir should be created");

        let audio = album_dir.join("01 - Track.MP3");
        let flac = root.path().join("b.flac");
        fs::write(&audio, b"audio-data").expect("audio file should exist");
        fs::write(&flac, b"audio-data").expect("flac file should exist");
        fs::write(album_dir.join("cover.jpg"), b"image-data").expect("image file should exist");
        fs::write(root.path().join("empty.mp3"), b"").expect("empty file should exist");

        let scanned = scan_audio_files(root.path()).expect("scan should succeed");

        let paths: Vec<&PathBuf> = scanned.iter().map(|file| &file.path).collect();
        assert_eq!(paths, vec![&audio, &flac]);
        assert_eq!(scanned[0].file_name, "01 - Track.MP3");
        assert_eq!(scanned[0].size_bytes, 10);

        let modified_at = scanned[0].modified_at.as_deref().expect("mtime recorded");
        assert_eq!(modified_at.len(), "2025-01-01 00:00:00".len());
        assert_eq!(&modified_at[10..11], " ");
    }

    #[test]
    fn scan_missing_root_fails() {
        let root = tempfile::tempdir().expect("temp dir should be created");
        let missing = root.path().join("missing");

        assert!(matches!(
            scan_audio_files(&missing),
            Err(LibraryError::PathNotFound(_))
        ));
    }

    #[test]
    fn unreadable_audio_reports_tag_error() {
        let root = tempfile::tempdir().expect("temp dir should be created");
        let path = root.path().join("broken.mp3");
        fs::write(&path, b"definitely not audio").expect("file should exist");

        assert!(matches!(
            LoftyTagReader.read(&path),
            Err(LibraryError::Tags { .. })
        ));
    }

    #[test]
    fn filename_patterns() {
        assert_eq!(
            parse_filename("The Killers - Mr. Brightside"),
            ("The Killers".to_string(), "Mr. Brightside".to_string())
        );
        assert_eq!(
            parse_filename("Jay-Z - 99 Problems"),
            ("Jay-Z".to_string(), "99 Problems".to_string())
        );
        assert_eq!(
            parse_filename("Muse-Hysteria"),
            ("Muse".to_string(), "Hysteria".to_string())
        );
        assert_eq!(
            parse_filename("untitled"),
            (UNKNOWN_ARTIST.to_string(), "untitled".to_string())
        );
    }

    #[test]
    fn isrc_is_normalized_and_length_checked() {
        assert_eq!(normalize_isrc("gb-aye-06-01498"), Some("GBAYE0601498".to_string()));
        assert_eq!(normalize_isrc(" USIR20400274 "), Some("USIR20400274".to_string()));
        assert_eq!(normalize_isrc("USIR2040027"), None);
        assert_eq!(normalize_isrc(""), None);
    }

    #[test]
    fn non_ascii_letters_do_not_expand_into_isrc_characters() {
        assert_eq!(normalize_isrc("ßIR20400274"), None);
        assert_eq!(normalize_isrc("USÍR20400274"), None);
    }

    #[test]
    fn tags_win_over_file_name() {
        let tags = EmbeddedTags {
            artist: "Radiohead\0".to_string(),
            title: "  Creep ".to_string(),
            album: "Pablo Honey".to_string(),
            isrc: "GB-AYE-92-00001".to_string(),
            duration_seconds: Some(238.6),
        };

        let metadata = resolve_metadata(tags, Path::new("/music/Other - Name.mp3"));

        assert_eq!(metadata.artist, "Radiohead");
        assert_eq!(metadata.title, "Creep");
        assert_eq!(metadata.album.as_deref(), Some("Pablo Honey"));
        assert_eq!(metadata.isrc.as_deref(), Some("GBAYE9200001"));
        assert_eq!(metadata.duration_seconds, Some(238.6));
    }

    #[test]
    fn missing_title_falls_back_to_file_name() {
        let tags = EmbeddedTags {
            artist: "Tagged Artist".to_string(),
            ..EmbeddedTags::default()
        };

        let metadata = resolve_metadata(tags, Path::new("/music/File Artist - File Title.mp3"));

        assert_eq!(metadata.artist, "Tagged Artist");
        assert_eq!(metadata.title, "File Title");
        assert_eq!(metadata.album, None);
        assert_eq!(metadata.isrc, None);
    }

    #[test]
    fn untagged_unparseable_file_is_unknown_artist() {
        let metadata = resolve_metadata(EmbeddedTags::default(), Path::new("/music/track01.mp3"));

        assert_eq!(metadata.artist, UNKNOWN_ARTIST);
        assert_eq!(metadata.title, "track01");
    }
}
