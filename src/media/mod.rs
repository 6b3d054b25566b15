//! Media files, tag reading and the scanned library.

pub(crate) mod media_file;
pub(crate) mod media_file_discovery;
pub(crate) mod media_library;
pub(crate) mod metadata_tags;

pub use media_file::{format_minutes_seconds, keys, FileType, MediaFile, Metadata};
pub use media_library::MediaLibrary;
