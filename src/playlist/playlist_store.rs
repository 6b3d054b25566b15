//! Persists user playlists as `<name>.playlist` JSON files.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::Playlist;
use crate::error::PlaylistError;

pub const PLAYLIST_EXTENSION: &str = "playlist";

/// In-memory playlist collection backed by a directory of playlist files.
pub struct PlaylistStore {
    directory: PathBuf,
    playlists: Vec<Playlist>,
}

impl PlaylistStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            playlists: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path_for(&self, name: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", sanitize_file_stem(name), PLAYLIST_EXTENSION))
    }

    /// Loads every playlist file in the directory, replacing the in-memory set.
    pub fn load_all(&mut self) -> Result<usize, PlaylistError> {
        self.playlists.clear();
        if !self.directory.is_dir() {
            debug!(
                "PlaylistStore: {} does not exist yet",
                self.directory.display()
            );
            return Ok(0);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext == PLAYLIST_EXTENSION)
                    .unwrap_or(false)
            })
            .collect();
        paths.sort_unstable();

        for path in paths {
            match Self::read_playlist_file(&path) {
                Ok(playlist) => self.playlists.push(playlist),
                Err(error) => warn!(
                    "PlaylistStore: skipping unreadable playlist {}: {}",
                    path.display(),
                    error
                ),
            }
        }
        info!(
            "PlaylistStore: loaded {} playlist(s) from {}",
            self.playlists.len(),
            self.directory.display()
        );
        Ok(self.playlists.len())
    }

    fn read_playlist_file(path: &Path) -> Result<Playlist, PlaylistError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes one playlist to disk.
    pub fn save(&self, playlist: &Playlist) -> Result<(), PlaylistError> {
        std::fs::create_dir_all(&self.directory)?;
        let serialized = serde_json::to_string_pretty(playlist)?;
        std::fs::write(self.file_path_for(&playlist.name), serialized)?;
        Ok(())
    }

    pub fn save_all(&self) -> Result<(), PlaylistError> {
        for playlist in &self.playlists {
            self.save(playlist)?;
        }
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.playlists.iter().any(|playlist| playlist.name == name)
    }

    /// Adds an empty playlist and persists it.
    pub fn create(&mut self, name: &str) -> Result<&mut Playlist, PlaylistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaylistError::InvalidName);
        }
        if self.exists(name) {
            return Err(PlaylistError::AlreadyExists(name.to_string()));
        }
        let playlist = Playlist::new(name);
        self.save(&playlist)?;
        self.playlists.push(playlist);
        let index = self.playlists.len() - 1;
        Ok(&mut self.playlists[index])
    }

    /// Inserts or replaces a playlist by name and persists it.
    pub fn upsert(&mut self, playlist: Playlist) -> Result<(), PlaylistError> {
        self.save(&playlist)?;
        match self
            .playlists
            .iter_mut()
            .find(|existing| existing.name == playlist.name)
        {
            Some(existing) => *existing = playlist,
            None => self.playlists.push(playlist),
        }
        Ok(())
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<(), PlaylistError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(PlaylistError::InvalidName);
        }
        if old_name == new_name {
            return Ok(());
        }
        if self.exists(new_name) {
            return Err(PlaylistError::AlreadyExists(new_name.to_string()));
        }
        let old_path = self.file_path_for(old_name);
        let playlist = self
            .get_mut(old_name)
            .ok_or_else(|| PlaylistError::NotFound(old_name.to_string()))?;
        playlist.name = new_name.to_string();
        let renamed = playlist.clone();
        self.save(&renamed)?;
        if old_path.exists() {
            std::fs::remove_file(old_path)?;
        }
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<(), PlaylistError> {
        let position = self
            .playlists
            .iter()
            .position(|playlist| playlist.name == name)
            .ok_or_else(|| PlaylistError::NotFound(name.to_string()))?;
        self.playlists.remove(position);
        let path = self.file_path_for(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|playlist| playlist.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Playlist> {
        self.playlists
            .iter_mut()
            .find(|playlist| playlist.name == name)
    }

    pub fn all(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn names(&self) -> Vec<String> {
        self.playlists
            .iter()
            .map(|playlist| playlist.name.clone())
            .collect()
    }
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect()
}
