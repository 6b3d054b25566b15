//! In-memory backend and renderer used by the playback tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::audio_backend::AudioBackend;
use super::playback_state::PlaybackSnapshot;
use super::view::PlayerRenderer;
use crate::error::PlaybackError;
use crate::media::{MediaFile, Metadata};
use crate::playlist::Playlist;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Initialize,
    LoadAndPlay(PathBuf),
    Pause,
    Resume,
    Stop,
    SetVolume(u8),
    Cleanup,
}

#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    playing: AtomicBool,
    fail_initialize: AtomicBool,
    failing_paths: Mutex<HashSet<PathBuf>>,
    cleanup_count: AtomicUsize,
}

impl MockBackend {
    pub fn failing_initialize() -> Self {
        let backend = Self::default();
        backend.fail_initialize.store(true, Ordering::SeqCst);
        backend
    }

    pub fn fail_loading(&self, path: impl Into<PathBuf>) {
        self.failing_paths.lock().unwrap().insert(path.into());
    }

    /// Simulates the loaded track reaching its end.
    pub fn finish_track(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::LoadAndPlay(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanup_count.load(Ordering::SeqCst)
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AudioBackend for MockBackend {
    fn initialize(&self) -> Result<(), PlaybackError> {
        self.record(BackendCall::Initialize);
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(PlaybackError::BackendInit("no output device".to_string()));
        }
        Ok(())
    }

    fn load_and_play(&self, path: &Path) -> Result<(), PlaybackError> {
        self.record(BackendCall::LoadAndPlay(path.to_path_buf()));
        if self.failing_paths.lock().unwrap().contains(path) {
            self.playing.store(false, Ordering::SeqCst);
            return Err(PlaybackError::Load {
                path: path.to_path_buf(),
                reason: "scripted failure".to_string(),
            });
        }
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.record(BackendCall::Pause);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.record(BackendCall::Resume);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.record(BackendCall::Stop);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: u8) {
        self.record(BackendCall::SetVolume(volume));
    }

    fn current_position(&self) -> f64 {
        0.0
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn duration(&self) -> f64 {
        0.0
    }

    fn cleanup(&self) {
        self.record(BackendCall::Cleanup);
        self.cleanup_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingView {
    flashes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    renders: AtomicUsize,
}

impl RecordingView {
    pub fn flashes(&self) -> Vec<String> {
        self.flashes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl PlayerRenderer for RecordingView {
    fn render(&self, _snapshot: &PlaybackSnapshot) {
        self.renders.fetch_add(1, Ordering::SeqCst);
    }

    fn flash_message(&self, message: &str) {
        self.flashes.lock().unwrap().push(message.to_string());
    }

    fn display_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Playlist of `durations.len()` tracks at `/music/t{i}.mp3`.
pub fn playlist_of(durations: &[f64]) -> Playlist {
    Playlist::with_tracks(
        "test",
        durations
            .iter()
            .enumerate()
            .map(|(index, duration)| {
                MediaFile::with_metadata(
                    format!("/music/t{index}.mp3"),
                    Metadata::new(format!("t{index}"), *duration),
                )
            })
            .collect(),
    )
}

pub fn track_path(index: usize) -> PathBuf {
    PathBuf::from(format!("/music/t{index}.mp3"))
}
