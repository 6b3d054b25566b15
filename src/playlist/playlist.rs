use std::fmt;

use crate::media::MediaFile;

/// Named, ordered list of tracks.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    tracks: Vec<MediaFile>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_tracks(name: impl Into<String>, tracks: Vec<MediaFile>) -> Self {
        Self {
            name: name.into(),
            tracks,
        }
    }

    pub fn add_track(&mut self, track: MediaFile) {
        self.tracks.push(track);
    }

    /// Removes the track at `index`. Out-of-range indices are ignored.
    pub fn remove_track(&mut self, index: usize) -> Option<MediaFile> {
        if index < self.tracks.len() {
            Some(self.tracks.remove(index))
        } else {
            None
        }
    }

    /// Moves a track so it lands before the item currently at `to_index`.
    pub fn move_track(&mut self, from_index: usize, to_index: usize) -> bool {
        let len = self.tracks.len();
        if from_index >= len || to_index >= len || from_index == to_index {
            return false;
        }
        let track = self.tracks.remove(from_index);
        let insert_at = if to_index > from_index {
            to_index - 1
        } else {
            to_index
        };
        self.tracks.insert(insert_at, track);
        true
    }

    pub fn tracks(&self) -> &[MediaFile] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&MediaFile> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut MediaFile> {
        self.tracks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.tracks
            .iter()
            .map(|track| track.metadata.duration_secs.max(0.0))
            .sum()
    }

    /// `h:mm:ss` for playlists of an hour or more, `m:ss` otherwise.
    pub fn total_duration_string(&self) -> String {
        let total_seconds = self.total_duration_secs() as u64;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} tracks, {})",
            self.name,
            self.tracks.len(),
            self.total_duration_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Playlist;
    use crate::media::{MediaFile, Metadata};

    fn track(name: &str, duration_secs: f64) -> MediaFile {
        MediaFile::with_metadata(
            format!("/music/{name}.mp3"),
            Metadata::new(name, duration_secs),
        )
    }

    fn names(playlist: &Playlist) -> Vec<&str> {
        playlist
            .tracks()
            .iter()
            .map(|track| track.metadata.name.as_str())
            .collect()
    }

    fn abcd() -> Playlist {
        Playlist::with_tracks(
            "mix",
            vec![
                track("a", 1.0),
                track("b", 1.0),
                track("c", 1.0),
                track("d", 1.0),
            ],
        )
    }

    #[test]
    fn test_move_track_forward_lands_before_target() {
        let mut playlist = abcd();
        assert!(playlist.move_track(0, 2));
        assert_eq!(names(&playlist), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_move_track_backward() {
        let mut playlist = abcd();
        assert!(playlist.move_track(3, 1));
        assert_eq!(names(&playlist), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_move_track_ignores_invalid_indices() {
        let mut playlist = abcd();
        assert!(!playlist.move_track(1, 1));
        assert!(!playlist.move_track(0, 9));
        assert!(!playlist.move_track(9, 0));
        assert_eq!(names(&playlist), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_remove_track_out_of_range_is_noop() {
        let mut playlist = abcd();
        assert!(playlist.remove_track(10).is_none());
        assert_eq!(playlist.len(), 4);
        let removed = playlist.remove_track(1).expect("index 1 exists");
        assert_eq!(removed.metadata.name, "b");
        assert_eq!(names(&playlist), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_total_duration_string_switches_to_hours() {
        let short = Playlist::with_tracks("s", vec![track("a", 180.0), track("b", 200.0)]);
        assert_eq!(short.total_duration_string(), "6:20");

        let long = Playlist::with_tracks("l", vec![track("a", 3_600.0), track("b", 65.0)]);
        assert_eq!(long.total_duration_string(), "1:01:05");
        assert_eq!(long.to_string(), "l (2 tracks, 1:01:05)");
    }
}
