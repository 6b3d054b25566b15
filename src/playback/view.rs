use super::playback_state::PlaybackSnapshot;

/// Rendering capability required by the playback workers.
pub trait PlayerRenderer: Send + Sync {
    fn render(&self, snapshot: &PlaybackSnapshot);
    fn flash_message(&self, message: &str);
    fn display_error(&self, message: &str);
}
