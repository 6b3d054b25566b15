pub(crate) mod mixer_backend;
pub(crate) mod output_config_selection;
pub(crate) mod render;
pub(crate) mod track_decoder;

pub use mixer_backend::MixerBackend;
