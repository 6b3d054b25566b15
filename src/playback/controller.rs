//! Facade over the playback state, command flags and the two playback threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use super::audio_backend::AudioBackend;
use super::command_flags::{Command, CommandFlags};
use super::playback_state::{PlaybackSnapshot, PlaybackState, PlayerStatus};
use super::playback_worker::{PlaybackContext, PlaybackWorker, StopSignal, NO_MEDIA_TO_PLAY};
use super::view::PlayerRenderer;
use super::view_refresh::{ViewGate, ViewRefreshWorker};
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::hardware::TransportControl;
use crate::playlist::Playlist;
use crate::worker_thread::{join_logged, spawn_named};

const PLAYBACK_THREAD_NAME: &str = "playback-worker";
const VIEW_THREAD_NAME: &str = "view-refresh";
const AUDIO_UNAVAILABLE: &str = "Audio system is not available";

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub view_refresh_interval: Duration,
    pub initial_volume: i32,
    pub volume_step: i32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for ControllerSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            view_refresh_interval: Duration::from_millis(config.view_refresh_interval_ms),
            initial_volume: config.initial_volume,
            volume_step: config.volume_step,
        }
    }
}

/// Only entry point the UI and the hardware input use to drive playback.
///
/// Transport methods set command flags; the playback worker applies them.
pub struct PlaybackController {
    context: Arc<PlaybackContext>,
    settings: ControllerSettings,
    playback_stop: Arc<StopSignal>,
    playback_handle: Mutex<Option<JoinHandle<()>>>,
    view_handle: Mutex<Option<JoinHandle<()>>>,
    initialized: AtomicBool,
    shut_down: AtomicBool,
}

impl PlaybackController {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        view: Arc<dyn PlayerRenderer>,
        settings: ControllerSettings,
    ) -> Self {
        let context = Arc::new(PlaybackContext {
            state: Arc::new(Mutex::new(PlaybackState::new(settings.initial_volume))),
            flags: CommandFlags::new(),
            backend,
            view,
            gate: Arc::new(ViewGate::new()),
        });
        Self {
            context,
            settings,
            playback_stop: Arc::new(StopSignal::new()),
            playback_handle: Mutex::new(None),
            view_handle: Mutex::new(None),
            initialized: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Starts the backend and both workers. No thread is started when the backend fails.
    pub fn initialize(&self) -> Result<(), PlaybackError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(PlaybackError::BackendInit(
                "controller already shut down".to_string(),
            ));
        }
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(error) = self.context.backend.initialize() {
            warn!("PlaybackController: {}", error);
            self.context
                .view
                .display_error("Failed to initialize audio system");
            return Err(error);
        }
        let volume = self.context.lock_state().volume();
        self.context.backend.set_volume(volume);

        let worker = PlaybackWorker::new(
            Arc::clone(&self.context),
            Arc::clone(&self.playback_stop),
            self.settings.poll_interval,
        );
        let playback_handle = spawn_named(PLAYBACK_THREAD_NAME, move || worker.run()).map_err(
            |error| PlaybackError::WorkerSpawn {
                name: PLAYBACK_THREAD_NAME,
                reason: error.to_string(),
            },
        )?;

        let view_worker = ViewRefreshWorker::new(
            Arc::clone(&self.context.gate),
            Arc::clone(&self.context.state),
            Arc::clone(&self.context.view),
            self.settings.view_refresh_interval,
        );
        let view_handle = match spawn_named(VIEW_THREAD_NAME, move || view_worker.run()) {
            Ok(handle) => handle,
            Err(error) => {
                self.playback_stop.trigger();
                join_logged(PLAYBACK_THREAD_NAME, playback_handle);
                return Err(PlaybackError::WorkerSpawn {
                    name: VIEW_THREAD_NAME,
                    reason: error.to_string(),
                });
            }
        };

        *lock_handle(&self.playback_handle) = Some(playback_handle);
        *lock_handle(&self.view_handle) = Some(view_handle);
        self.initialized.store(true, Ordering::SeqCst);
        info!("PlaybackController: initialized");
        Ok(())
    }

    /// Requests playback of the current track from scratch.
    pub fn play_current_playlist(&self) -> Result<(), PlaybackError> {
        let started = {
            let mut state = self.context.lock_state();
            self.request_playback(&mut state)
        };
        self.report_start(started)
    }

    /// Swaps in `playlist` and requests playback from `start_index` under one state lock.
    pub fn play_playlist(&self, playlist: Playlist, start_index: usize) -> Result<(), PlaybackError> {
        debug!(
            "PlaybackController: playing playlist '{}' ({} tracks) from {}",
            playlist.name,
            playlist.len(),
            start_index
        );
        let started = {
            let mut state = self.context.lock_state();
            state.load_playlist(playlist, start_index);
            self.request_playback(&mut state)
        };
        self.report_start(started)
    }

    /// Workers are up and shutdown has not begun.
    fn is_running(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && !self.shut_down.load(Ordering::SeqCst)
    }

    /// Sets the play intents for the state's current playlist. Call with the state lock held.
    fn request_playback(&self, state: &mut PlaybackState) -> Result<(), PlaybackError> {
        if !self.is_running() {
            return Err(PlaybackError::BackendInit(
                "playback engine is not running".to_string(),
            ));
        }
        if state.playlist().is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }
        let flags = &self.context.flags;
        flags.set(Command::ReloadSource);
        flags.set(Command::Play);
        flags.clear(Command::Stop);
        state.set_status(PlayerStatus::Playing);
        Ok(())
    }

    fn report_start(&self, started: Result<(), PlaybackError>) -> Result<(), PlaybackError> {
        if let Err(error) = &started {
            warn!("PlaybackController: {}", error);
            let message = match error {
                PlaybackError::EmptyPlaylist => NO_MEDIA_TO_PLAY,
                _ => AUDIO_UNAVAILABLE,
            };
            self.context.view.display_error(message);
        }
        started
    }

    pub fn toggle_play_pause(&self) {
        let _state = self.context.lock_state();
        self.context.flags.set(Command::Toggle);
    }

    pub fn stop(&self) {
        let _state = self.context.lock_state();
        self.context.flags.clear(Command::Play);
        self.context.flags.set(Command::Stop);
    }

    pub fn next(&self) {
        let _state = self.context.lock_state();
        self.context.flags.set(Command::Next);
    }

    pub fn previous(&self) {
        let _state = self.context.lock_state();
        self.context.flags.set(Command::Previous);
    }

    /// Clamps to 0..=100 and applies it to the state and the backend immediately.
    pub fn set_volume(&self, volume: i32) -> u8 {
        let applied = {
            let mut state = self.context.lock_state();
            let applied = state.set_volume(volume);
            self.context.backend.set_volume(applied);
            applied
        };
        self.context
            .view
            .flash_message(&format!("Volume: {}", applied));
        applied
    }

    pub fn increase_volume(&self) -> u8 {
        self.step_volume(self.settings.volume_step)
    }

    pub fn decrease_volume(&self) -> u8 {
        self.step_volume(-self.settings.volume_step)
    }

    fn step_volume(&self, delta: i32) -> u8 {
        let applied = {
            let mut state = self.context.lock_state();
            let current = i32::from(state.volume());
            let applied = state.set_volume(current + delta);
            self.context.backend.set_volume(applied);
            applied
        };
        self.context
            .view
            .flash_message(&format!("Volume: {}", applied));
        applied
    }

    pub fn show_player_view(&self) {
        self.context.gate.show();
    }

    pub fn hide_player_view(&self) {
        self.context.gate.hide();
    }

    pub fn is_displaying(&self) -> bool {
        self.context.gate.is_displaying()
    }

    pub fn is_playing(&self) -> bool {
        self.context.lock_state().status() == PlayerStatus::Playing
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.context.lock_state().snapshot()
    }

    /// Stops both workers, then the backend. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("PlaybackController: shutting down");

        self.context.gate.stop();
        if let Some(handle) = lock_handle(&self.view_handle).take() {
            join_logged(VIEW_THREAD_NAME, handle);
        }

        self.playback_stop.trigger();
        if let Some(handle) = lock_handle(&self.playback_handle).take() {
            join_logged(PLAYBACK_THREAD_NAME, handle);
        }

        if self.initialized.load(Ordering::SeqCst) {
            self.context.backend.stop();
            self.context.backend.cleanup();
        }
        self.context.lock_state().set_status(PlayerStatus::Stopped);
        info!("PlaybackController: shut down");
    }
}

fn lock_handle(
    slot: &Mutex<Option<JoinHandle<()>>>,
) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TransportControl for PlaybackController {
    fn previous(&self) {
        PlaybackController::previous(self);
    }

    fn next(&self) {
        PlaybackController::next(self);
    }

    fn toggle_play_pause(&self) {
        PlaybackController::toggle_play_pause(self);
    }

    fn stop(&self) {
        PlaybackController::stop(self);
    }

    fn set_volume(&self, volume: i32) {
        PlaybackController::set_volume(self, volume);
    }

    fn is_displaying(&self) -> bool {
        PlaybackController::is_displaying(self)
    }
}
