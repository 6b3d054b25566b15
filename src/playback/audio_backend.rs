use std::path::Path;

use crate::error::PlaybackError;

/// Sound output engine driven by the playback worker.
///
/// Only the playback worker calls the transport methods. Volume may also be
/// written by the controller; implementations keep it in an atomic.
pub trait AudioBackend: Send + Sync {
    fn initialize(&self) -> Result<(), PlaybackError>;
    /// Stops whatever is loaded, then starts `path` from the beginning.
    fn load_and_play(&self, path: &Path) -> Result<(), PlaybackError>;
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
    /// `volume` is 0..=100.
    fn set_volume(&self, volume: u8);
    /// Elapsed seconds in the loaded track.
    fn current_position(&self) -> f64;
    /// `false` once the loaded track has finished, or when paused or stopped.
    fn is_playing(&self) -> bool;
    fn duration(&self) -> f64;
    /// Releases the output device. Safe to call more than once.
    fn cleanup(&self);
}
