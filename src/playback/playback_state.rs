//! Shared record of what is loaded, where playback is and how loud it is.

use crate::error::PlaybackError;
use crate::media::MediaFile;
use crate::playlist::Playlist;

pub const MIN_VOLUME: i32 = 0;
pub const MAX_VOLUME: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlayerStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }
}

/// Owned copy of the state handed to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub playlist_name: String,
    pub track: Option<MediaFile>,
    pub track_index: Option<usize>,
    pub track_count: usize,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: u8,
    pub status: PlayerStatus,
}

/// Current playlist, selected track, position, volume and status.
///
/// Callers hold the controller's state lock while mutating it. The playlist is
/// an owned copy, decoupled from the library or store it came from.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    playlist: Playlist,
    current_index: Option<usize>,
    position_secs: f64,
    duration_secs: f64,
    volume: u8,
    status: PlayerStatus,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(80)
    }
}

impl PlaybackState {
    pub fn new(initial_volume: i32) -> Self {
        Self {
            playlist: Playlist::default(),
            current_index: None,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: clamp_volume(initial_volume),
            status: PlayerStatus::Stopped,
        }
    }

    /// Replaces the playlist wholesale and selects `start_index` (clamped).
    pub fn load_playlist(&mut self, playlist: Playlist, start_index: usize) {
        self.current_index = if playlist.is_empty() {
            None
        } else {
            Some(start_index.min(playlist.len() - 1))
        };
        self.playlist = playlist;
        self.reset_position();
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Result<&MediaFile, PlaybackError> {
        self.current_index
            .and_then(|index| self.playlist.track(index))
            .ok_or(PlaybackError::NoTrackSelected)
    }

    /// Advances circularly. Returns `false` only for an empty playlist.
    pub fn next_track(&mut self) -> bool {
        let len = self.playlist.len();
        if len == 0 {
            return false;
        }
        self.current_index = Some(match self.current_index {
            Some(index) => (index + 1) % len,
            None => 0,
        });
        self.reset_position();
        true
    }

    /// Retreats circularly. Returns `false` only for an empty playlist.
    pub fn previous_track(&mut self) -> bool {
        let len = self.playlist.len();
        if len == 0 {
            return false;
        }
        self.current_index = Some(match self.current_index {
            Some(index) if index > 0 && index < len => index - 1,
            _ => len - 1,
        });
        self.reset_position();
        true
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn set_position_secs(&mut self, position_secs: f64) {
        self.position_secs = if position_secs.is_finite() {
            position_secs.max(0.0)
        } else {
            0.0
        };
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn set_duration_secs(&mut self, duration_secs: f64) {
        if duration_secs.is_finite() && duration_secs > 0.0 {
            self.duration_secs = duration_secs;
        }
    }

    pub fn reset_position(&mut self) {
        self.position_secs = 0.0;
        self.duration_secs = self
            .current_track()
            .map(|track| track.metadata.duration_secs)
            .unwrap_or(0.0);
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Stores the volume clamped to 0..=100 and returns the stored value.
    pub fn set_volume(&mut self, volume: i32) -> u8 {
        self.volume = clamp_volume(volume);
        self.volume
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn set_status(&mut self, status: PlayerStatus) {
        self.status = status;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let track = self.current_track().ok().cloned();
        PlaybackSnapshot {
            playlist_name: self.playlist.name.clone(),
            track,
            track_index: self.current_index,
            track_count: self.playlist.len(),
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            volume: self.volume,
            status: self.status,
        }
    }
}

fn clamp_volume(volume: i32) -> u8 {
    volume.clamp(MIN_VOLUME, MAX_VOLUME) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaFile, Metadata};

    fn playlist_of(durations: &[f64]) -> Playlist {
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

    #[test]
    fn test_next_track_wraps_back_to_start_after_full_cycle() {
        for len in 1..6 {
            let mut state = PlaybackState::new(80);
            state.load_playlist(playlist_of(&vec![10.0; len]), 0);
            for _ in 0..len {
                assert!(state.next_track());
            }
            assert_eq!(state.current_index(), Some(0), "len={len}");
        }
    }

    #[test]
    fn test_previous_track_from_first_goes_to_last() {
        let mut state = PlaybackState::new(80);
        state.load_playlist(playlist_of(&[1.0, 2.0, 3.0, 4.0]), 0);
        assert!(state.previous_track());
        assert_eq!(state.current_index(), Some(3));
    }

    #[test]
    fn test_navigation_on_empty_playlist_is_noop() {
        let mut state = PlaybackState::new(80);
        assert!(!state.next_track());
        assert!(!state.previous_track());
        assert_eq!(state.current_index(), None);
        assert!(matches!(
            state.current_track(),
            Err(PlaybackError::NoTrackSelected)
        ));
    }

    #[test]
    fn test_set_volume_clamps_to_range() {
        let mut state = PlaybackState::new(80);
        assert_eq!(state.set_volume(-10), 0);
        assert_eq!(state.volume(), 0);
        assert_eq!(state.set_volume(150), 100);
        assert_eq!(state.volume(), 100);
        assert_eq!(PlaybackState::new(400).volume(), 100);
    }

    #[test]
    fn test_next_resets_position_and_wraps_in_two_track_playlist() {
        let mut state = PlaybackState::new(80);
        state.load_playlist(playlist_of(&[180.0, 200.0]), 0);
        state.set_position_secs(42.0);

        assert!(state.next_track());
        assert_eq!(state.current_index(), Some(1));
        assert_eq!(state.position_secs(), 0.0);
        assert_eq!(state.duration_secs(), 200.0);

        assert!(state.next_track());
        assert_eq!(state.current_index(), Some(0));
        assert_eq!(state.duration_secs(), 180.0);
    }

    #[test]
    fn test_load_playlist_clamps_start_index() {
        let mut state = PlaybackState::new(80);
        state.load_playlist(playlist_of(&[1.0, 2.0]), 7);
        assert_eq!(state.current_index(), Some(1));

        state.load_playlist(Playlist::new("empty"), 3);
        assert_eq!(state.current_index(), None);
    }

    #[test]
    fn test_snapshot_copies_current_track() {
        let mut state = PlaybackState::new(55);
        state.load_playlist(playlist_of(&[30.0, 60.0]), 1);
        state.set_status(PlayerStatus::Paused);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.track_index, Some(1));
        assert_eq!(snapshot.track_count, 2);
        assert_eq!(snapshot.volume, 55);
        assert_eq!(snapshot.status, PlayerStatus::Paused);
        assert_eq!(
            snapshot.track.map(|track| track.metadata.name),
            Some("t1".to_string())
        );
    }
}
