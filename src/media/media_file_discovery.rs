use std::path::{Path, PathBuf};

use log::debug;

use super::media_file::FileType;

pub fn is_supported_media_file(path: &Path) -> bool {
    FileType::from_path(path) != FileType::Unknown
}

/// Collects supported audio and video files below `folder_path`, sorted by path.
pub fn collect_media_files_from_folder(folder_path: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut pending_directories = vec![folder_path.to_path_buf()];
    let mut files = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        let entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Failed to read directory {}: {}", directory.display(), err);
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(
                        "Failed to read a directory entry in {}: {}",
                        directory.display(),
                        err
                    );
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    debug!("Failed to inspect {}: {}", path.display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                if recursive {
                    pending_directories.push(path);
                }
                continue;
            }

            if file_type.is_file() && is_supported_media_file(&path) {
                files.push(path);
            }
        }
    }

    files.sort_unstable();
    files
}
