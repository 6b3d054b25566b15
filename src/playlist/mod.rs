//! User playlists and their on-disk store.

#[allow(clippy::module_inception)]
pub(crate) mod playlist;
pub(crate) mod playlist_store;

pub use playlist::Playlist;
pub use playlist_store::PlaylistStore;
