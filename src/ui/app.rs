//! Menu loop: library browsing, playlist management and the player screen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use super::formatting::{
    banner, list_header, media_details, media_row, page_bounds, pagination_controls, playlist_row,
};
use super::terminal_view::TerminalView;
use crate::media::metadata_tags::{write_tags, TagUpdate};
use crate::media::{keys, FileType, MediaFile, MediaLibrary};
use crate::playback::{PlaybackController, PlayerRenderer};
use crate::playlist::{Playlist, PlaylistStore};
use crate::shutdown::CancellationToken;

enum PageInput {
    Previous,
    Next,
    Option(usize),
    Invalid,
}

fn parse_page_input(input: &str) -> PageInput {
    let trimmed = input.trim();
    match trimmed.to_ascii_uppercase().as_str() {
        "P" => PageInput::Previous,
        "N" => PageInput::Next,
        other => other
            .parse::<usize>()
            .map(PageInput::Option)
            .unwrap_or(PageInput::Invalid),
    }
}

/// What the player screen does with one line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerKey {
    Toggle,
    Stop,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    Back,
    Refresh,
    Ignored,
}

fn parse_player_key(input: &str) -> PlayerKey {
    let Some(key) = input.chars().next() else {
        return PlayerKey::Refresh;
    };
    match key.to_ascii_uppercase() {
        ' ' => PlayerKey::Toggle,
        'S' => PlayerKey::Stop,
        'N' => PlayerKey::Next,
        'P' => PlayerKey::Previous,
        '+' => PlayerKey::VolumeUp,
        '-' => PlayerKey::VolumeDown,
        'Q' => PlayerKey::Back,
        _ => PlayerKey::Ignored,
    }
}

/// Interprets a user-typed directory relative to `current`.
fn resolve_directory(current: &Path, input: &str) -> PathBuf {
    let candidate = Path::new(input.trim());
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        current.join(candidate)
    }
}

fn optional_field(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub struct App {
    view: Arc<TerminalView>,
    controller: Arc<PlaybackController>,
    library: MediaLibrary,
    store: PlaylistStore,
    current_directory: PathBuf,
    items_per_page: usize,
    cancel: CancellationToken,
}

impl App {
    pub fn new(
        view: Arc<TerminalView>,
        controller: Arc<PlaybackController>,
        library: MediaLibrary,
        store: PlaylistStore,
        current_directory: PathBuf,
        items_per_page: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            view,
            controller,
            library,
            store,
            current_directory,
            items_per_page,
            cancel,
        }
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    fn keep_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Runs the main menu until the user exits, input ends or the token is cancelled.
    pub fn run(&mut self) {
        info!("App: starting in {}", self.current_directory.display());
        while self.keep_running() {
            self.view.clear_screen();
            self.view.write(&banner("Media Player CLI", '='));
            self.view.write(&format!(
                "Current Directory: {}\n\n",
                self.current_directory.display()
            ));
            self.view.write(
                "  1. Show Media Library\n  2. Show List of Playlists\n  3. Now Playing\n  4. Play\n  5. Change Directory\n  0. Exit\n\n",
            );
            let Some(choice) = self.view.menu_choice(0, 5) else {
                break;
            };
            match choice {
                1 => {
                    let files = self.library.root().tracks().to_vec();
                    self.browse_files(files, "Media Files");
                }
                2 => self.playlists_menu(),
                3 => self.now_playing(),
                4 => self.play_all(),
                5 => self.change_directory(),
                _ => break,
            }
        }
        if let Err(error) = self.store.save_all() {
            warn!("App: failed to save playlists on exit: {}", error);
        }
        info!("App: leaving main menu");
    }

    fn now_playing(&mut self) {
        if self.controller.is_playing() {
            self.player_screen();
        } else {
            self.view.message("No media is currently playing.");
            self.view.wait_for_enter();
        }
    }

    fn play_all(&mut self) {
        if self.library.is_empty() {
            self.view
                .error("No media files found in the current directory.");
            self.view.wait_for_enter();
            return;
        }
        if self
            .controller
            .play_playlist(self.library.root().clone(), 0)
            .is_ok()
        {
            self.player_screen();
        }
    }

    fn change_directory(&mut self) {
        let Some(input) = self
            .view
            .prompt("Enter new directory (or leave empty to cancel): ")
        else {
            return;
        };
        if input.trim().is_empty() {
            return;
        }
        let directory = resolve_directory(&self.current_directory, &input);
        if !directory.is_dir() {
            self.view
                .error(&format!("Invalid directory: {}", directory.display()));
            self.view.wait_for_enter();
            return;
        }
        self.current_directory = directory;
        let count = self.library.scan_directory(&self.current_directory);
        self.view.message(&format!(
            "Directory changed to: {} ({} media files)",
            self.current_directory.display(),
            count
        ));
        self.view.wait_for_enter();
    }

    /// Gives the terminal to the player view until `Q` or end of input.
    fn player_screen(&mut self) {
        self.controller.show_player_view();
        self.view.render(&self.controller.snapshot());
        while self.keep_running() {
            let Some(input) = self.view.prompt("") else {
                break;
            };
            match parse_player_key(&input) {
                PlayerKey::Toggle => self.controller.toggle_play_pause(),
                PlayerKey::Stop => self.controller.stop(),
                PlayerKey::Next => self.controller.next(),
                PlayerKey::Previous => self.controller.previous(),
                PlayerKey::VolumeUp => {
                    self.controller.increase_volume();
                }
                PlayerKey::VolumeDown => {
                    self.controller.decrease_volume();
                }
                PlayerKey::Refresh => self.view.render(&self.controller.snapshot()),
                PlayerKey::Back => break,
                PlayerKey::Ignored => {}
            }
        }
        self.controller.hide_player_view();
    }

    fn browse_files(&mut self, files: Vec<MediaFile>, title: &str) {
        if files.is_empty() {
            self.view.message("No media files found in this location.");
            self.view.wait_for_enter();
            return;
        }
        let mut page = 0;
        while self.keep_running() {
            let (start, end, total_pages) = page_bounds(files.len(), page, self.items_per_page);
            page = start / self.items_per_page.max(1);

            self.view.clear_screen();
            let mut screen = banner(title, '=');
            screen.push_str(&list_header("Type"));
            for (index, file) in files.iter().enumerate().take(end).skip(start) {
                screen.push_str(&media_row(index, file));
                screen.push('\n');
            }
            screen.push('\n');
            screen.push_str(&pagination_controls(page, total_pages));
            screen.push_str("\nOptions:\n  1. View file details\n  2. Search files\n  3. Filter by type\n  4. Add to playlist\n  0. Back\n");
            self.view.write(&screen);

            let Some(input) = self
                .view
                .prompt("\nEnter option (0-4) or P/N for pagination: ")
            else {
                return;
            };
            match parse_page_input(&input) {
                PageInput::Previous if page > 0 => page -= 1,
                PageInput::Next if page + 1 < total_pages => page += 1,
                PageInput::Option(0) => return,
                PageInput::Option(1) => {
                    if let Some(index) = self.view.item_index("Enter file number: ", files.len())
                    {
                        self.file_details(&files[index].path);
                    }
                }
                PageInput::Option(2) => {
                    let Some(query) = self.view.prompt("Enter search term: ") else {
                        return;
                    };
                    let results = self.library.search(query.trim());
                    self.browse_files(results, &format!("Search: {}", query.trim()));
                }
                PageInput::Option(3) => {
                    let Some(kind) = self.view.prompt("Filter by type (1=Audio, 2=Video): ")
                    else {
                        return;
                    };
                    let file_type = match kind.trim() {
                        "1" => FileType::Audio,
                        "2" => FileType::Video,
                        _ => {
                            self.view.error("Invalid type");
                            continue;
                        }
                    };
                    let filtered = self.library.files_by_type(file_type);
                    self.browse_files(filtered, &format!("{} Files", file_type.label()));
                }
                PageInput::Option(4) => {
                    if let Some(index) = self
                        .view
                        .item_index("Enter file number to add to playlist: ", files.len())
                    {
                        self.add_to_playlist(files[index].clone());
                    }
                }
                PageInput::Previous | PageInput::Next => {}
                _ => self.view.error("Invalid option"),
            }
        }
    }

    fn file_details(&mut self, path: &Path) {
        let Some(index) = self.library.index_of(path) else {
            self.view.error("File is no longer in the library");
            return;
        };
        let Some(file) = self.library.get(index).cloned() else {
            return;
        };
        self.view.clear_screen();
        self.view.write(&media_details(&file));
        self.view.write(
            "\nOptions:\n  1. Edit metadata\n  2. Play this file\n  3. Add to playlist\n  0. Back to file list\n",
        );
        match self.view.menu_choice(0, 3) {
            Some(1) => self.edit_metadata(&file),
            Some(2) => {
                if self
                    .controller
                    .play_playlist(self.library.root().clone(), index)
                    .is_ok()
                {
                    self.player_screen();
                }
            }
            Some(3) => self.add_to_playlist(file),
            _ => {}
        }
    }

    fn edit_metadata(&mut self, file: &MediaFile) {
        let metadata = &file.metadata;
        let ask = |label: &str, current: &str| -> Option<Option<String>> {
            self.view
                .prompt(&format!("{label} [{current}] (Enter keeps): "))
                .map(optional_field)
        };
        let Some(title) = ask("Title", &metadata.name) else {
            return;
        };
        let Some(artist) = ask("Artist", metadata.attribute(keys::ARTIST)) else {
            return;
        };
        let Some(album) = ask("Album", metadata.attribute(keys::ALBUM)) else {
            return;
        };
        let Some(genre) = ask("Genre", metadata.attribute(keys::GENRE)) else {
            return;
        };
        let Some(year) = ask("Year", metadata.attribute(keys::YEAR)) else {
            return;
        };
        let update = TagUpdate {
            title,
            artist,
            album,
            genre,
            year,
        };
        if update.is_empty() {
            self.view.message("No changes made.");
            self.view.wait_for_enter();
            return;
        }

        match write_tags(&file.path, &update) {
            Ok(metadata) => {
                let updated = MediaFile::with_metadata(file.path.clone(), metadata);
                self.library.replace(&file.path, updated.clone());
                self.refresh_in_playlists(&updated);
                self.view.message("Metadata saved.");
            }
            Err(error) => {
                warn!("App: {}", error);
                self.view.error(&error.to_string());
            }
        }
        self.view.wait_for_enter();
    }

    /// Copies edited metadata into every stored playlist holding the same file.
    fn refresh_in_playlists(&mut self, updated: &MediaFile) {
        for name in self.store.names() {
            let Some(playlist) = self.store.get_mut(&name) else {
                continue;
            };
            let mut changed = false;
            for index in 0..playlist.len() {
                if let Some(track) = playlist.track_mut(index) {
                    if track.path == updated.path {
                        track.metadata = updated.metadata.clone();
                        changed = true;
                    }
                }
            }
            if changed {
                let snapshot = playlist.clone();
                if let Err(error) = self.store.save(&snapshot) {
                    warn!("App: failed to save playlist '{}': {}", name, error);
                }
            }
        }
    }

    fn add_to_playlist(&mut self, file: MediaFile) {
        self.view.clear_screen();
        self.view.write(&self.playlist_table("Playlists"));
        self.view
            .write("\nOptions:\n  1. Choose a playlist\n  2. Create a new playlist\n  0. Back\n");
        let name = match self.view.menu_choice(0, 2) {
            Some(1) => {
                let Some(index) = self
                    .view
                    .item_index("Enter playlist number: ", self.store.all().len())
                else {
                    return;
                };
                self.store.all()[index].name.clone()
            }
            Some(2) => match self.create_playlist() {
                Some(name) => name,
                None => return,
            },
            _ => return,
        };
        let file_name = file.file_name();
        self.modify_playlist(&name, |playlist| {
            playlist.add_track(file);
            true
        });
        self.view
            .message(&format!("Added {} to playlist '{}'", file_name, name));
        self.view.wait_for_enter();
    }

    fn playlist_table(&self, title: &str) -> String {
        let mut screen = banner(title, '=');
        let playlists = self.store.all();
        if playlists.is_empty() {
            screen.push_str("\nNo playlists found.\n");
        } else {
            screen.push_str(&list_header("Tracks"));
            for (index, playlist) in playlists.iter().enumerate() {
                screen.push_str(&playlist_row(index, playlist));
                screen.push('\n');
            }
        }
        screen
    }

    fn playlists_menu(&mut self) {
        while self.keep_running() {
            self.view.clear_screen();
            self.view.write(&self.playlist_table("Playlists"));
            self.view.write("\nOptions:\n  1. View playlist\n  2. Create new playlist\n  3. Edit playlist\n  4. Delete playlist\n  5. Play playlist\n  0. Back to main menu\n");
            let Some(choice) = self.view.menu_choice(0, 5) else {
                return;
            };
            if choice == 0 {
                return;
            }
            if choice == 2 {
                if self.create_playlist().is_some() {
                    self.view.wait_for_enter();
                }
                continue;
            }
            let Some(index) = self
                .view
                .item_index("Enter playlist number: ", self.store.all().len())
            else {
                continue;
            };
            let name = self.store.all()[index].name.clone();
            match choice {
                1 => self.view_playlist(&name),
                3 => self.edit_playlist(&name),
                4 => self.delete_playlist(&name),
                5 => self.play_stored_playlist(&name),
                _ => {}
            }
        }
    }

    /// Prompts for a name and creates the playlist. Returns the name on success.
    fn create_playlist(&mut self) -> Option<String> {
        let name = self.view.prompt("Enter playlist name: ")?;
        match self.store.create(&name) {
            Ok(playlist) => {
                let name = playlist.name.clone();
                info!("App: created playlist '{}'", name);
                self.view.message(&format!("Playlist '{}' created.", name));
                Some(name)
            }
            Err(error) => {
                self.view.error(&error.to_string());
                None
            }
        }
    }

    fn view_playlist(&mut self, name: &str) {
        let Some(playlist) = self.store.get(name).cloned() else {
            return;
        };
        let mut page = 0;
        while self.keep_running() {
            let (start, end, total_pages) =
                page_bounds(playlist.len(), page, self.items_per_page);
            page = start / self.items_per_page.max(1);
            self.view.clear_screen();
            let mut screen = banner(&format!("Playlist: {}", playlist.name), '=');
            if playlist.is_empty() {
                screen.push_str("\nThis playlist is empty.\n");
            } else {
                screen.push_str(&list_header("Type"));
                for (index, track) in playlist.tracks().iter().enumerate().take(end).skip(start)
                {
                    screen.push_str(&media_row(index, track));
                    screen.push('\n');
                }
                screen.push_str(&format!(
                    "\nTotal tracks: {}\nTotal duration: {}\n\n",
                    playlist.len(),
                    playlist.total_duration_string()
                ));
                screen.push_str(&pagination_controls(page, total_pages));
            }
            screen.push_str("\nOptions:\n  1. Play playlist\n  2. Edit playlist\n  0. Back to playlists\n");
            self.view.write(&screen);
            let Some(input) = self
                .view
                .prompt("\nEnter option (0-2) or P/N for pagination: ")
            else {
                return;
            };
            match parse_page_input(&input) {
                PageInput::Previous if page > 0 => page -= 1,
                PageInput::Next if page + 1 < total_pages => page += 1,
                PageInput::Option(0) => return,
                PageInput::Option(1) => {
                    self.play_stored_playlist(name);
                    return;
                }
                PageInput::Option(2) => {
                    self.edit_playlist(name);
                    return;
                }
                PageInput::Previous | PageInput::Next => {}
                _ => self.view.error("Invalid option"),
            }
        }
    }

    /// Applies `change` to the stored playlist and persists it when `change` returns `true`.
    fn modify_playlist<F>(&mut self, name: &str, change: F) -> bool
    where
        F: FnOnce(&mut Playlist) -> bool,
    {
        let Some(mut playlist) = self.store.get(name).cloned() else {
            self.view.error(&format!("Playlist '{}' not found", name));
            return false;
        };
        if !change(&mut playlist) {
            return false;
        }
        match self.store.upsert(playlist) {
            Ok(()) => true,
            Err(error) => {
                warn!("App: {}", error);
                self.view.error(&error.to_string());
                false
            }
        }
    }

    fn edit_playlist(&mut self, name: &str) {
        let mut name = name.to_string();
        while self.keep_running() {
            let Some(playlist) = self.store.get(&name) else {
                return;
            };
            let track_count = playlist.len();
            self.view.clear_screen();
            let mut screen = banner(&format!("Edit Playlist: {}", playlist), '=');
            for (index, track) in playlist.tracks().iter().enumerate() {
                screen.push_str(&media_row(index, track));
                screen.push('\n');
            }
            screen.push_str("\n1. Rename playlist\n2. Add tracks\n3. Remove tracks\n4. Reorder tracks\n5. Clear playlist\n0. Save and return\n");
            self.view.write(&screen);
            let Some(choice) = self.view.menu_choice(0, 5) else {
                return;
            };
            match choice {
                0 => return,
                1 => {
                    let Some(new_name) = self.view.prompt("Enter new name: ") else {
                        return;
                    };
                    match self.store.rename(&name, &new_name) {
                        Ok(()) => name = new_name.trim().to_string(),
                        Err(error) => self.view.error(&error.to_string()),
                    }
                }
                2 => {
                    let library_len = self.library.len();
                    if library_len == 0 {
                        self.view.error("Media library is empty.");
                        continue;
                    }
                    let Some(index) = self.view.item_index(
                        &format!("Enter library file number (1-{library_len}): "),
                        library_len,
                    ) else {
                        continue;
                    };
                    if let Some(file) = self.library.get(index).cloned() {
                        self.modify_playlist(&name, |playlist| {
                            playlist.add_track(file);
                            true
                        });
                    }
                }
                3 => {
                    let Some(index) = self
                        .view
                        .item_index("Enter track number to remove: ", track_count)
                    else {
                        continue;
                    };
                    self.modify_playlist(&name, |playlist| playlist.remove_track(index).is_some());
                }
                4 => {
                    let Some(from) = self.view.item_index("Move track number: ", track_count)
                    else {
                        continue;
                    };
                    let Some(to) = self.view.item_index("To position: ", track_count) else {
                        continue;
                    };
                    self.modify_playlist(&name, |playlist| playlist.move_track(from, to));
                }
                _ => {
                    self.modify_playlist(&name, |playlist| {
                        playlist.clear();
                        true
                    });
                }
            }
        }
    }

    fn delete_playlist(&mut self, name: &str) {
        let Some(answer) = self
            .view
            .prompt(&format!("Delete playlist '{}'? (y/N): ", name))
        else {
            return;
        };
        if !answer.trim().eq_ignore_ascii_case("y") {
            return;
        }
        match self.store.delete(name) {
            Ok(()) => {
                info!("App: deleted playlist '{}'", name);
                self.view.message(&format!("Playlist '{}' deleted.", name));
            }
            Err(error) => self.view.error(&error.to_string()),
        }
        self.view.wait_for_enter();
    }

    fn play_stored_playlist(&mut self, name: &str) {
        let Some(playlist) = self.store.get(name).cloned() else {
            return;
        };
        debug!("App: playing playlist '{}'", name);
        if self.controller.play_playlist(playlist, 0).is_ok() {
            self.player_screen();
        } else {
            self.view.wait_for_enter();
        }
    }
}
