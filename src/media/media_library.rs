//! Scanned media collection rooted at the current browse directory.

use std::path::Path;

use log::{debug, info};

use super::media_file::{FileType, MediaFile, Metadata};
use super::media_file_discovery::collect_media_files_from_folder;
use super::metadata_tags::read_media_file;
use crate::playlist::Playlist;

pub const ROOT_PLAYLIST_NAME: &str = "root";

/// All media found by the last scan, kept as the `root` playlist.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: Playlist,
    recursive: bool,
    read_tags: bool,
}

impl MediaLibrary {
    pub fn new(recursive: bool, read_tags: bool) -> Self {
        Self {
            root: Playlist::new(ROOT_PLAYLIST_NAME),
            recursive,
            read_tags,
        }
    }

    /// Replaces the library contents with the media found under `directory`.
    pub fn scan_directory(&mut self, directory: &Path) -> usize {
        self.root.clear();
        if !directory.is_dir() {
            debug!(
                "MediaLibrary: {} is not a directory, library left empty",
                directory.display()
            );
            return 0;
        }

        for path in collect_media_files_from_folder(directory, self.recursive) {
            self.root.add_track(read_media_file(&path, self.read_tags));
        }
        info!(
            "MediaLibrary: scanned {} media file(s) under {}",
            self.root.len(),
            directory.display()
        );
        self.root.len()
    }

    pub fn root(&self) -> &Playlist {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaFile> {
        self.root.track(index)
    }

    pub fn add(&mut self, file: MediaFile) {
        self.root.add_track(file);
    }

    pub fn clear(&mut self) {
        self.root.clear();
    }

    /// Case-insensitive substring search on file names.
    pub fn search(&self, query: &str) -> Vec<MediaFile> {
        let needle = query.trim().to_lowercase();
        self.root
            .tracks()
            .iter()
            .filter(|file| file.file_name().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn files_by_type(&self, file_type: FileType) -> Vec<MediaFile> {
        self.root
            .tracks()
            .iter()
            .filter(|file| file.file_type == file_type)
            .cloned()
            .collect()
    }

    /// Position of `path` in the library, if it was scanned.
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.root.tracks().iter().position(|file| file.path == path)
    }

    pub fn update_metadata(&mut self, index: usize, metadata: Metadata) -> bool {
        match self.root.track_mut(index) {
            Some(file) => {
                file.metadata = metadata;
                true
            }
            None => false,
        }
    }

    /// Swaps in `file` for the entry at `path`. Returns `false` when `path` is not in the library.
    pub fn replace(&mut self, path: &Path, file: MediaFile) -> bool {
        let Some(index) = self.index_of(path) else {
            return false;
        };
        match self.root.track_mut(index) {
            Some(slot) => {
                *slot = file;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_with(paths: &[&str]) -> MediaLibrary {
        let mut library = MediaLibrary::new(true, false);
        for path in paths {
            library.add(MediaFile::new(*path));
        }
        library
    }

    #[test]
    fn test_search_matches_file_name_case_insensitively() {
        let library = library_with(&["/m/Blue Monday.mp3", "/m/red.flac", "/blue/other.wav"]);
        let found = library.search("BLUE");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name(), "Blue Monday.mp3");
    }

    #[test]
    fn test_files_by_type_filters_audio_and_video() {
        let library = library_with(&["/m/a.mp3", "/m/b.mp4", "/m/c.ogg"]);
        assert_eq!(library.files_by_type(FileType::Audio).len(), 2);
        assert_eq!(library.files_by_type(FileType::Video).len(), 1);
        assert!(library.files_by_type(FileType::Unknown).is_empty());
    }

    #[test]
    fn test_update_metadata_rejects_out_of_range_index() {
        let mut library = library_with(&["/m/a.mp3"]);
        assert!(library.update_metadata(0, Metadata::new("Renamed", 12.0)));
        assert_eq!(library.get(0).map(|f| f.metadata.name.as_str()), Some("Renamed"));
        assert!(!library.update_metadata(3, Metadata::new("x", 0.0)));
    }

    #[test]
    fn test_scan_of_missing_directory_leaves_library_empty() {
        let mut library = library_with(&["/m/a.mp3"]);
        let count = library.scan_directory(Path::new("/definitely/not/a/dir"));
        assert_eq!(count, 0);
        assert!(library.is_empty());
        assert_eq!(library.root().name, ROOT_PLAYLIST_NAME);
    }

    #[test]
    fn test_replace_swaps_entry_in_place() {
        let mut library = library_with(&["/m/a.mp3", "/m/b.mp3"]);
        let edited = MediaFile::with_metadata("/m/b.mp3", Metadata::new("Edited", 30.0));
        assert!(library.replace(Path::new("/m/b.mp3"), edited));
        assert_eq!(library.get(1).map(|f| f.metadata.name.as_str()), Some("Edited"));
        assert!(!library.replace(Path::new("/m/z.mp3"), MediaFile::new("/m/z.mp3")));
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_index_of_finds_scanned_path() {
        let library = library_with(&["/m/a.mp3", "/m/b.mp3"]);
        assert_eq!(library.index_of(Path::new("/m/b.mp3")), Some(1));
        assert_eq!(library.index_of(Path::new("/m/z.mp3")), None);
    }
}
