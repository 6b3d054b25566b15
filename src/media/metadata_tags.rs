//! Tag reading and writing backed by `lofty`.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};
use log::debug;

use super::media_file::{keys, FileType, MediaFile, Metadata};
use crate::error::MetadataError;

/// Editable tag fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
}

impl TagUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.genre.is_none()
            && self.year.is_none()
    }
}

fn first_non_empty_value<F>(primary_tag: Option<&Tag>, tags: &[Tag], mut extractor: F) -> String
where
    F: FnMut(&Tag) -> Option<String>,
{
    primary_tag
        .into_iter()
        .chain(tags.iter())
        .filter_map(|tag| extractor(tag))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn derive_year_from_date(date: &str) -> String {
    let mut consecutive_digits = String::with_capacity(4);
    for ch in date.chars() {
        if ch.is_ascii_digit() {
            consecutive_digits.push(ch);
            if consecutive_digits.len() == 4 {
                return consecutive_digits;
            }
        } else {
            consecutive_digits.clear();
        }
    }
    String::new()
}

/// Reads display metadata for `path`. Files without readable tags keep only their name.
pub fn read_metadata(path: &Path) -> Metadata {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut metadata = Metadata::new(file_name.clone(), 0.0);

    if FileType::from_path(path) == FileType::Video {
        metadata.set_attribute(keys::CODEC, &extension_label(path));
        return metadata;
    }

    let tagged_file = match read_from_path(path) {
        Ok(tagged_file) => tagged_file,
        Err(error) => {
            debug!("Metadata read failed for {}: {}", path.display(), error);
            return metadata;
        }
    };
    let primary_tag = tagged_file.primary_tag();
    let tags = tagged_file.tags();

    let title = first_non_empty_value(primary_tag, tags, |tag| {
        tag.title().map(|value| value.into_owned())
    });
    metadata.name = if title.is_empty() { file_name } else { title.clone() };
    metadata.set_attribute(keys::TITLE, &title);
    metadata.set_attribute(
        keys::ARTIST,
        &first_non_empty_value(primary_tag, tags, |tag| {
            tag.artist().map(|value| value.into_owned())
        }),
    );
    metadata.set_attribute(
        keys::ALBUM,
        &first_non_empty_value(primary_tag, tags, |tag| {
            tag.album().map(|value| value.into_owned())
        }),
    );
    metadata.set_attribute(
        keys::GENRE,
        &first_non_empty_value(primary_tag, tags, |tag| {
            tag.genre().map(|value| value.into_owned())
        }),
    );
    let year = {
        let direct_year = first_non_empty_value(primary_tag, tags, |tag| {
            tag.get_string(ItemKey::Year).map(str::to_string)
        });
        if direct_year.is_empty() {
            let date = first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::RecordingDate)
                    .or_else(|| tag.get_string(ItemKey::ReleaseDate))
                    .map(str::to_string)
            });
            derive_year_from_date(&date)
        } else {
            direct_year
        }
    };
    metadata.set_attribute(keys::YEAR, &year);
    metadata.set_attribute(
        keys::TRACK_NUMBER,
        &first_non_empty_value(primary_tag, tags, |tag| {
            tag.get_string(ItemKey::TrackNumber)
                .map(str::to_string)
                .or_else(|| tag.track().map(|value| value.to_string()))
        }),
    );

    let properties = tagged_file.properties();
    metadata.duration_secs = properties.duration().as_secs_f64();
    if let Some(bitrate) = properties.audio_bitrate() {
        metadata.set_attribute(keys::BITRATE, &format!("{bitrate} kbps"));
    }
    metadata.set_attribute(keys::CODEC, &extension_label(path));

    metadata
}

fn extension_label(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_uppercase())
        .unwrap_or_default()
}

/// Builds a [`MediaFile`] for `path`, reading tags when requested.
pub fn read_media_file(path: &Path, read_tags: bool) -> MediaFile {
    if read_tags {
        MediaFile::with_metadata(path, read_metadata(path))
    } else {
        MediaFile::new(path)
    }
}

fn apply_year(tag: &mut Tag, value: &str) {
    tag.remove_key(ItemKey::Year);
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        tag.insert_text(ItemKey::Year, trimmed.to_string());
    }
}

/// Writes `update` to the file's primary tag and returns the refreshed metadata.
pub fn write_tags(path: &Path, update: &TagUpdate) -> Result<Metadata, MetadataError> {
    let mut tagged_file = read_from_path(path).map_err(|error| MetadataError::Read {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| MetadataError::Write {
            path: path.to_path_buf(),
            reason: format!("no writable tag available for {:?}", tag_type),
        })?;

    if let Some(title) = update.title.as_deref().map(str::trim) {
        if title.is_empty() {
            tag.remove_title();
        } else {
            tag.set_title(title.to_string());
        }
    }
    if let Some(artist) = update.artist.as_deref().map(str::trim) {
        if artist.is_empty() {
            tag.remove_artist();
        } else {
            tag.set_artist(artist.to_string());
        }
    }
    if let Some(album) = update.album.as_deref().map(str::trim) {
        if album.is_empty() {
            tag.remove_album();
        } else {
            tag.set_album(album.to_string());
        }
    }
    if let Some(genre) = update.genre.as_deref().map(str::trim) {
        if genre.is_empty() {
            tag.remove_genre();
        } else {
            tag.set_genre(genre.to_string());
        }
    }
    if let Some(year) = &update.year {
        apply_year(tag, year);
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|error| MetadataError::Write {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

    Ok(read_metadata(path))
}
