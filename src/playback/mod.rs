pub(crate) mod audio_backend;
pub(crate) mod command_flags;
pub(crate) mod controller;
pub(crate) mod playback_state;
pub(crate) mod playback_worker;
#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod view;
pub(crate) mod view_refresh;

pub use audio_backend::AudioBackend;
pub use command_flags::{Command, CommandFlags};
pub use controller::{ControllerSettings, PlaybackController};
pub use playback_state::{PlaybackSnapshot, PlaybackState, PlayerStatus};
pub use view::PlayerRenderer;
