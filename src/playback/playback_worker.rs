//! Background loop that drains command flags and drives the audio backend.
//!
//! Each iteration handles, in order: source reload, natural end of track,
//! play/pause toggle, next or previous, then stop. The worker is the only
//! caller of the backend's transport methods.

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use super::audio_backend::AudioBackend;
use super::command_flags::{Command, CommandFlags};
use super::playback_state::{PlaybackState, PlayerStatus};
use super::view::PlayerRenderer;
use super::view_refresh::ViewGate;

pub const NO_MEDIA_TO_PLAY: &str = "There's no media file to play!";
const NO_MEDIA_IN_PLAYLIST: &str = "There's no media in the current playlist";

/// Dependencies shared between the controller and its workers.
pub struct PlaybackContext {
    pub state: Arc<Mutex<PlaybackState>>,
    pub flags: CommandFlags,
    pub backend: Arc<dyn AudioBackend>,
    pub view: Arc<dyn PlayerRenderer>,
    pub gate: Arc<ViewGate>,
}

impl PlaybackContext {
    pub fn lock_state(&self) -> MutexGuard<'_, PlaybackState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Renders the current state, but only while the player view is shown.
    pub fn refresh_view(&self) {
        if !self.gate.is_displaying() {
            return;
        }
        let snapshot = self.lock_state().snapshot();
        self.view.render(&snapshot);
    }
}

/// Wakeable stop flag for the polling loop.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let mut stopped = match self.stopped.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *stopped = true;
        self.condvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        match self.stopped.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Waits up to `timeout`. Returns `true` once stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let stopped = match self.stopped.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = self
            .condvar
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped);
        match result {
            Ok((guard, _)) => *guard,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipDirection {
    Next,
    Previous,
}

impl SkipDirection {
    fn flash_text(self) -> &'static str {
        match self {
            Self::Next => "Next track",
            Self::Previous => "Previous track",
        }
    }

    fn failure_text(self) -> &'static str {
        match self {
            Self::Next => "Failed to play next track",
            Self::Previous => "Failed to play previous track",
        }
    }

    fn unavailable_text(self) -> &'static str {
        match self {
            Self::Next => "No next track available",
            Self::Previous => "No previous track available",
        }
    }
}

pub struct PlaybackWorker {
    context: Arc<PlaybackContext>,
    stop_signal: Arc<StopSignal>,
    poll_interval: Duration,
}

impl PlaybackWorker {
    pub fn new(
        context: Arc<PlaybackContext>,
        stop_signal: Arc<StopSignal>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            context,
            stop_signal,
            poll_interval,
        }
    }

    pub fn run(&self) {
        debug!(
            "PlaybackWorker: started with poll interval {:?}",
            self.poll_interval
        );
        while !self.stop_signal.is_triggered() {
            self.run_iteration();
            if self.stop_signal.wait_timeout(self.poll_interval) {
                break;
            }
        }
        debug!("PlaybackWorker: stopped");
    }

    /// Processes every pending command once.
    pub fn run_iteration(&self) {
        self.sync_position();
        self.handle_reload();
        self.handle_end_of_track();
        self.handle_toggle();
        self.handle_skip();
        self.handle_stop();
    }

    fn sync_position(&self) {
        if self.context.lock_state().status() == PlayerStatus::Stopped {
            return;
        }
        let position = self.context.backend.current_position();
        let duration = self.context.backend.duration();
        let mut state = self.context.lock_state();
        state.set_position_secs(position);
        state.set_duration_secs(duration);
    }

    fn current_track_path(&self) -> Option<PathBuf> {
        self.context
            .lock_state()
            .current_track()
            .ok()
            .map(|track| track.path.clone())
    }

    /// Loads `path` and marks the state playing. Returns `false` on backend failure.
    fn start_track(&self, path: PathBuf) -> bool {
        debug!("PlaybackWorker: loading {}", path.display());
        match self.context.backend.load_and_play(&path) {
            Ok(()) => {
                let duration = self.context.backend.duration();
                let mut state = self.context.lock_state();
                state.set_position_secs(0.0);
                state.set_duration_secs(duration);
                state.set_status(PlayerStatus::Playing);
                true
            }
            Err(error) => {
                warn!("PlaybackWorker: {}", error);
                false
            }
        }
    }

    fn fail_playback(&self, message: &str) {
        let flags = &self.context.flags;
        flags.clear(Command::Play);
        {
            let mut state = self.context.lock_state();
            state.set_status(PlayerStatus::Stopped);
            state.set_position_secs(0.0);
        }
        self.context.view.display_error(message);
    }

    fn handle_reload(&self) {
        let flags = &self.context.flags;
        if !(flags.is_set(Command::ReloadSource) && flags.is_set(Command::Play)) {
            return;
        }
        flags.clear(Command::ReloadSource);

        match self.current_track_path() {
            Some(path) => {
                let failure = format!("Failed to play {}", path.display());
                if !self.start_track(path) {
                    self.fail_playback(&failure);
                }
            }
            None => self.fail_playback(NO_MEDIA_TO_PLAY),
        }
        self.context.refresh_view();
    }

    fn handle_end_of_track(&self) {
        let flags = &self.context.flags;
        if !flags.is_set(Command::Play)
            || flags.is_set(Command::ReloadSource)
            || self.context.backend.is_playing()
        {
            return;
        }

        let advanced = self.context.lock_state().next_track();
        if advanced {
            debug!("PlaybackWorker: track finished, advancing");
            if let Some(path) = self.current_track_path() {
                let failure = format!("Failed to play {}", path.display());
                if !self.start_track(path) {
                    self.fail_playback(&failure);
                }
            }
        } else {
            self.fail_playback(NO_MEDIA_IN_PLAYLIST);
        }
        self.context.refresh_view();
    }

    fn handle_toggle(&self) {
        let flags = &self.context.flags;
        if !flags.take(Command::Toggle) {
            return;
        }

        let (status, current_path) = {
            let state = self.context.lock_state();
            let path = state.current_track().ok().map(|track| track.path.clone());
            (state.status(), path)
        };
        match status {
            PlayerStatus::Playing => {
                self.context.backend.pause();
                self.context.lock_state().set_status(PlayerStatus::Paused);
                flags.clear(Command::Play);
                self.context.view.flash_message("Paused");
            }
            PlayerStatus::Paused => {
                self.context.backend.resume();
                self.context.lock_state().set_status(PlayerStatus::Playing);
                flags.set(Command::Play);
                self.context.view.flash_message("Playing");
            }
            PlayerStatus::Stopped => match current_path {
                Some(path) => {
                    let failure = format!("Failed to play {}", path.display());
                    if self.start_track(path) {
                        flags.set(Command::Play);
                        self.context.view.flash_message("Playing");
                    } else {
                        self.fail_playback(&failure);
                    }
                }
                None => self.context.view.display_error(NO_MEDIA_TO_PLAY),
            },
        }
        self.context.refresh_view();
    }

    fn handle_skip(&self) {
        let flags = &self.context.flags;
        let next = flags.take(Command::Next);
        let previous = flags.take(Command::Previous);
        let direction = match (next, previous) {
            (true, true) => {
                debug!("PlaybackWorker: next and previous both pending, applying next");
                SkipDirection::Next
            }
            (true, false) => SkipDirection::Next,
            (false, true) => SkipDirection::Previous,
            (false, false) => return,
        };
        self.skip(direction);
        self.context.refresh_view();
    }

    fn skip(&self, direction: SkipDirection) {
        let flags = &self.context.flags;
        let advanced = {
            let mut state = self.context.lock_state();
            match direction {
                SkipDirection::Next => state.next_track(),
                SkipDirection::Previous => state.previous_track(),
            }
        };

        if !advanced {
            self.context.view.display_error(direction.unavailable_text());
            flags.clear(Command::Play);
            flags.set(Command::Stop);
            return;
        }

        let Some(path) = self.current_track_path() else {
            return;
        };
        if self.start_track(path) {
            flags.set(Command::Play);
            flags.clear(Command::Stop);
            self.context.view.flash_message(direction.flash_text());
        } else {
            self.fail_playback(direction.failure_text());
        }
    }

    fn handle_stop(&self) {
        let flags = &self.context.flags;
        if !flags.take(Command::Stop) {
            return;
        }
        flags.clear(Command::Play);
        self.context.backend.stop();
        self.context.view.flash_message("Stopped");

        let advanced = {
            let mut state = self.context.lock_state();
            let advanced = state.next_track();
            state.set_status(PlayerStatus::Stopped);
            state.set_position_secs(0.0);
            advanced
        };
        if !advanced {
            self.context.view.display_error(NO_MEDIA_IN_PLAYLIST);
        }
        self.context.refresh_view();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::test_support::{
        playlist_of, track_path, BackendCall, MockBackend, RecordingView,
    };
    use crate::playlist::Playlist;

    struct Harness {
        backend: Arc<MockBackend>,
        view: Arc<RecordingView>,
        context: Arc<PlaybackContext>,
        worker: PlaybackWorker,
    }

    impl Harness {
        fn new(playlist: Playlist) -> Self {
            let backend = Arc::new(MockBackend::default());
            let view = Arc::new(RecordingView::default());
            let mut state = PlaybackState::new(80);
            state.load_playlist(playlist, 0);
            let context = Arc::new(PlaybackContext {
                state: Arc::new(Mutex::new(state)),
                flags: CommandFlags::new(),
                backend: Arc::clone(&backend) as Arc<dyn AudioBackend>,
                view: Arc::clone(&view) as Arc<dyn PlayerRenderer>,
                gate: Arc::new(ViewGate::new()),
            });
            let worker = PlaybackWorker::new(
                Arc::clone(&context),
                Arc::new(StopSignal::new()),
                Duration::from_millis(10),
            );
            Self {
                backend,
                view,
                context,
                worker,
            }
        }

        fn start_playing(&self) {
            self.context.lock_state().set_status(PlayerStatus::Playing);
            self.context.flags.set(Command::Play);
            self.context.flags.set(Command::ReloadSource);
            self.worker.run_iteration();
        }

        fn status(&self) -> PlayerStatus {
            self.context.lock_state().status()
        }

        fn index(&self) -> Option<usize> {
            self.context.lock_state().current_index()
        }
    }

    #[test]
    fn test_reload_loads_current_track_and_clears_reload() {
        let harness = Harness::new(playlist_of(&[180.0, 200.0]));
        harness.start_playing();

        assert_eq!(harness.backend.loaded_paths(), vec![track_path(0)]);
        assert!(!harness.context.flags.is_set(Command::ReloadSource));
        assert!(harness.context.flags.is_set(Command::Play));
        assert_eq!(harness.status(), PlayerStatus::Playing);
    }

    #[test]
    fn test_end_of_track_advances_and_plays_next() {
        let harness = Harness::new(playlist_of(&[180.0, 200.0]));
        harness.start_playing();

        harness.backend.finish_track();
        harness.worker.run_iteration();

        assert_eq!(harness.index(), Some(1));
        assert_eq!(
            harness.backend.loaded_paths(),
            vec![track_path(0), track_path(1)]
        );
        assert_eq!(harness.status(), PlayerStatus::Playing);
    }

    #[test]
    fn test_failed_reload_stops_without_skipping_ahead() {
        let harness = Harness::new(playlist_of(&[180.0, 200.0]));
        harness.backend.fail_loading(track_path(0));
        harness.start_playing();

        assert_eq!(harness.index(), Some(0));
        assert_eq!(harness.backend.loaded_paths(), vec![track_path(0)]);
        assert_eq!(harness.status(), PlayerStatus::Stopped);
        assert!(!harness.context.flags.is_set(Command::Play));
        assert_eq!(
            harness.view.errors(),
            vec!["Failed to play /music/t0.mp3".to_string()]
        );
    }

    #[test]
    fn test_toggle_cycles_stopped_playing_paused_playing() {
        let harness = Harness::new(playlist_of(&[180.0]));
        assert_eq!(harness.status(), PlayerStatus::Stopped);

        harness.context.flags.set(Command::Toggle);
        harness.worker.run_iteration();
        assert_eq!(harness.status(), PlayerStatus::Playing);

        harness.context.flags.set(Command::Toggle);
        harness.worker.run_iteration();
        assert_eq!(harness.status(), PlayerStatus::Paused);
        assert!(!harness.context.flags.is_set(Command::Play));

        harness.context.flags.set(Command::Toggle);
        harness.worker.run_iteration();
        assert_eq!(harness.status(), PlayerStatus::Playing);
        assert!(harness.context.flags.is_set(Command::Play));

        assert_eq!(
            harness.view.flashes(),
            vec!["Playing".to_string(), "Paused".to_string(), "Playing".to_string()]
        );
        assert!(!harness.context.flags.is_set(Command::Toggle));
        assert_eq!(
            harness.backend.calls(),
            vec![
                BackendCall::LoadAndPlay(track_path(0)),
                BackendCall::Pause,
                BackendCall::Resume,
            ]
        );
    }

    #[test]
    fn test_toggle_without_track_reports_error() {
        let harness = Harness::new(Playlist::new("empty"));
        harness.context.flags.set(Command::Toggle);
        harness.worker.run_iteration();

        assert_eq!(harness.status(), PlayerStatus::Stopped);
        assert_eq!(harness.view.errors(), vec![NO_MEDIA_TO_PLAY.to_string()]);
        assert!(harness.backend.calls().is_empty());
    }

    #[test]
    fn test_toggle_from_stopped_refreshes_shown_view() {
        let harness = Harness::new(playlist_of(&[180.0]));
        harness.context.gate.show();

        harness.context.flags.set(Command::Toggle);
        harness.worker.run_iteration();
        assert_eq!(harness.status(), PlayerStatus::Playing);
        assert_eq!(harness.view.render_count(), 1);

        let empty = Harness::new(Playlist::new("empty"));
        empty.context.gate.show();
        empty.context.flags.set(Command::Toggle);
        empty.worker.run_iteration();
        assert_eq!(empty.view.errors(), vec![NO_MEDIA_TO_PLAY.to_string()]);
        assert_eq!(empty.view.render_count(), 1);
    }

    #[test]
    fn test_next_example_scenario_wraps_two_tracks() {
        let harness = Harness::new(playlist_of(&[180.0, 200.0]));
        harness.start_playing();

        harness.context.flags.set(Command::Next);
        harness.worker.run_iteration();
        assert_eq!(harness.index(), Some(1));
        assert_eq!(harness.context.lock_state().position_secs(), 0.0);

        harness.context.flags.set(Command::Next);
        harness.worker.run_iteration();
        assert_eq!(harness.index(), Some(0));
        assert_eq!(
            harness.view.flashes(),
            vec!["Next track".to_string(), "Next track".to_string()]
        );
    }

    #[test]
    fn test_previous_from_first_track_plays_last() {
        let harness = Harness::new(playlist_of(&[1.0, 2.0, 3.0]));
        harness.context.flags.set(Command::Previous);
        harness.worker.run_iteration();

        assert_eq!(harness.index(), Some(2));
        assert_eq!(harness.backend.loaded_paths(), vec![track_path(2)]);
        assert_eq!(harness.status(), PlayerStatus::Playing);
        assert_eq!(harness.view.flashes(), vec!["Previous track".to_string()]);
    }

    #[test]
    fn test_next_and_previous_pending_together_apply_once() {
        let harness = Harness::new(playlist_of(&[1.0, 2.0, 3.0]));
        harness.context.flags.set(Command::Next);
        harness.context.flags.set(Command::Previous);

        harness.worker.run_iteration();

        assert_eq!(harness.backend.loaded_paths().len(), 1);
        assert_eq!(harness.index(), Some(1));
        assert!(!harness.context.flags.is_set(Command::Next));
        assert!(!harness.context.flags.is_set(Command::Previous));
    }

    #[test]
    fn test_backend_failure_on_next_stops_playback() {
        let harness = Harness::new(playlist_of(&[1.0, 2.0]));
        harness.start_playing();
        harness.backend.fail_loading(track_path(1));

        harness.context.flags.set(Command::Next);
        harness.worker.run_iteration();

        assert_eq!(harness.status(), PlayerStatus::Stopped);
        assert!(!harness.context.flags.is_set(Command::Play));
        assert_eq!(
            harness.view.errors(),
            vec!["Failed to play next track".to_string()]
        );
    }

    #[test]
    fn test_next_and_previous_on_empty_playlist_report_and_stop() {
        for (command, message) in [
            (Command::Next, "No next track available"),
            (Command::Previous, "No previous track available"),
        ] {
            let harness = Harness::new(Playlist::new("empty"));
            harness.context.flags.set(Command::Play);
            harness.context.flags.set(command);

            harness.worker.run_iteration();

            assert!(harness.view.errors().contains(&message.to_string()));
            assert!(!harness.context.flags.is_set(Command::Play));
            assert!(!harness.context.flags.is_set(Command::Stop));
            assert_eq!(harness.status(), PlayerStatus::Stopped);
        }
    }

    #[test]
    fn test_stop_halts_backend_and_selects_next_track() {
        let harness = Harness::new(playlist_of(&[1.0, 2.0]));
        harness.start_playing();

        harness.context.flags.clear(Command::Play);
        harness.context.flags.set(Command::Stop);
        harness.worker.run_iteration();

        assert_eq!(harness.status(), PlayerStatus::Stopped);
        assert_eq!(harness.index(), Some(1));
        assert!(harness.backend.calls().contains(&BackendCall::Stop));
        assert_eq!(harness.view.flashes(), vec!["Stopped".to_string()]);
        assert!(!harness.context.flags.is_set(Command::Stop));
    }

    #[test]
    fn test_stop_then_toggle_plays_again() {
        let harness = Harness::new(playlist_of(&[1.0, 2.0]));
        harness.start_playing();

        harness.context.flags.clear(Command::Play);
        harness.context.flags.set(Command::Stop);
        harness.worker.run_iteration();
        harness.context.flags.set(Command::Toggle);
        harness.worker.run_iteration();

        assert_eq!(harness.status(), PlayerStatus::Playing);
        assert!(harness.context.flags.is_set(Command::Play));
    }

    #[test]
    fn test_run_exits_when_stop_signal_triggered() {
        let harness = Harness::new(playlist_of(&[1.0]));
        let stop_signal = Arc::new(StopSignal::new());
        let worker = PlaybackWorker::new(
            Arc::clone(&harness.context),
            Arc::clone(&stop_signal),
            Duration::from_secs(60),
        );
        let handle = std::thread::spawn(move || worker.run());

        stop_signal.trigger();
        handle.join().expect("playback worker should exit cleanly");
        assert!(stop_signal.wait_timeout(Duration::from_millis(1)));
    }
}
