//! Track model shared by the library, playlists and the playback engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "ogg", "flac", "aac"];
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mkv", "mov"];

/// Well-known attribute keys stored in [`Metadata::attributes`].
pub mod keys {
    pub const TITLE: &str = "title";
    pub const ARTIST: &str = "artist";
    pub const ALBUM: &str = "album";
    pub const YEAR: &str = "year";
    pub const GENRE: &str = "genre";
    pub const TRACK_NUMBER: &str = "track_number";
    pub const BITRATE: &str = "bitrate";
    pub const CODEC: &str = "codec";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Audio,
    Video,
    #[default]
    Unknown,
}

impl FileType {
    pub fn from_path(path: &Path) -> Self {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return Self::Unknown;
        };
        if AUDIO_EXTENSIONS
            .iter()
            .any(|supported| extension.eq_ignore_ascii_case(supported))
        {
            return Self::Audio;
        }
        if VIDEO_EXTENSIONS
            .iter()
            .any(|supported| extension.eq_ignore_ascii_case(supported))
        {
            return Self::Video;
        }
        Self::Unknown
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Audio => "Audio",
            Self::Video => "Video",
            Self::Unknown => "Unknown",
        }
    }
}

/// Display name, duration and free-form tag attributes of a track.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub duration_secs: f64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            attributes: BTreeMap::new(),
        }
    }

    /// Returns the attribute value, or `""` when absent.
    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or("")
    }

    /// Stores a trimmed value; empty values remove the key.
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.attributes.remove(key);
        } else {
            self.attributes.insert(key.to_string(), trimmed.to_string());
        }
    }

    pub fn duration_string(&self) -> String {
        format_minutes_seconds(self.duration_secs)
    }
}

/// Formats seconds as `m:ss`.
pub fn format_minutes_seconds(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub file_type: FileType,
    pub metadata: Metadata,
}

impl MediaFile {
    /// Builds a file entry with only the file name as metadata.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_type = FileType::from_path(&path);
        let name = file_name_of(&path);
        Self {
            path,
            file_type,
            metadata: Metadata::new(name, 0.0),
        }
    }

    pub fn with_metadata(path: impl Into<PathBuf>, metadata: Metadata) -> Self {
        let path = path.into();
        let file_type = FileType::from_path(&path);
        Self {
            path,
            file_type,
            metadata,
        }
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_extension_is_case_insensitive() {
        assert_eq!(FileType::from_path(Path::new("a/b/song.MP3")), FileType::Audio);
        assert_eq!(FileType::from_path(Path::new("clip.Mkv")), FileType::Video);
        assert_eq!(FileType::from_path(Path::new("notes.txt")), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("no_extension")), FileType::Unknown);
    }

    #[test]
    fn test_new_media_file_uses_file_name_as_display_name() {
        let file = MediaFile::new("/music/album/01 - Intro.flac");
        assert_eq!(file.metadata.name, "01 - Intro.flac");
        assert_eq!(file.file_type, FileType::Audio);
        assert_eq!(file.file_name(), "01 - Intro.flac");
    }

    #[test]
    fn test_set_attribute_trims_and_removes_empty_values() {
        let mut metadata = Metadata::new("song", 0.0);
        metadata.set_attribute(keys::ARTIST, "  Someone  ");
        assert_eq!(metadata.attribute(keys::ARTIST), "Someone");

        metadata.set_attribute(keys::ARTIST, "   ");
        assert_eq!(metadata.attribute(keys::ARTIST), "");
        assert!(!metadata.attributes.contains_key(keys::ARTIST));
    }

    #[test]
    fn test_duration_string_formats_minutes_and_seconds() {
        assert_eq!(Metadata::new("a", 185.7).duration_string(), "3:05");
        assert_eq!(Metadata::new("b", 0.0).duration_string(), "0:00");
        assert_eq!(format_minutes_seconds(-4.0), "0:00");
        assert_eq!(format_minutes_seconds(f64::NAN), "0:00");
    }
}
