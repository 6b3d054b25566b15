//! Pure text layout for the terminal screens.

use crate::media::{format_minutes_seconds, keys, MediaFile};
use crate::playback::PlaybackSnapshot;
use crate::playlist::Playlist;

pub const SCREEN_WIDTH: usize = 80;
pub const PROGRESS_BAR_WIDTH: usize = 60;
pub const VOLUME_BAR_WIDTH: usize = 20;
const NAME_COLUMN_CHARS: usize = 37;

pub const PLAYER_CONTROLS: &str = "\nControls:\n  [Space] Play/Pause\n  [S] Stop\n  [N] Next track\n  [P] Previous track\n  [+] Volume up\n  [-] Volume down\n  [Q] Back to main menu\nEnter Command: ";

/// `title` centered between two rules of `fill`.
pub fn banner(title: &str, fill: char) -> String {
    let rule: String = std::iter::repeat(fill).take(SCREEN_WIDTH).collect();
    format!("{rule}\n{title:>40}\n{rule}\n")
}

pub fn progress_percentage(position_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 && position_secs.is_finite() {
        (position_secs / duration_secs * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// `[====>     ] N%`
pub fn draw_progress_bar(percentage: f64, width: usize) -> String {
    let percentage = percentage.clamp(0.0, 100.0);
    let head = (width as f64 * percentage / 100.0) as usize;
    let mut bar = String::with_capacity(width + 8);
    bar.push('[');
    for column in 0..width {
        bar.push(match column.cmp(&head) {
            std::cmp::Ordering::Less => '=',
            std::cmp::Ordering::Equal => '>',
            std::cmp::Ordering::Greater => ' ',
        });
    }
    bar.push_str(&format!("] {}%", percentage as u32));
    bar
}

pub fn draw_volume_bar(volume: u8, width: usize) -> String {
    let filled = width * usize::from(volume.min(100)) / 100;
    format!("[{}{}]", "█".repeat(filled), " ".repeat(width - filled))
}

pub fn truncate_name(name: &str) -> String {
    if name.chars().count() > NAME_COLUMN_CHARS {
        let kept: String = name.chars().take(NAME_COLUMN_CHARS).collect();
        format!("{kept}...")
    } else {
        name.to_string()
    }
}

pub fn list_header(third_column: &str) -> String {
    format!(
        "{:<4}{:<40}{:<15}{:<10}\n{}\n",
        "#",
        "Name",
        third_column,
        "Duration",
        "-".repeat(SCREEN_WIDTH)
    )
}

/// One 1-based row of a media listing.
pub fn media_row(index: usize, file: &MediaFile) -> String {
    format!(
        "{:<4}{:<40}{:<15}{:<10}",
        index + 1,
        truncate_name(&file.metadata.name),
        file.file_type.label(),
        file.metadata.duration_string()
    )
}

pub fn playlist_row(index: usize, playlist: &Playlist) -> String {
    format!(
        "{:<4}{:<40}{:<15}{:<10}",
        index + 1,
        truncate_name(&playlist.name),
        playlist.len(),
        playlist.total_duration_string()
    )
}

/// Page slice bounds as `(start, end, total_pages)`. `page` is clamped to the last page.
pub fn page_bounds(total_items: usize, page: usize, per_page: usize) -> (usize, usize, usize) {
    let per_page = per_page.max(1);
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.min(total_pages - 1);
    let start = page * per_page;
    let end = (start + per_page).min(total_items);
    (start, end, total_pages)
}

pub fn pagination_controls(page: usize, total_pages: usize) -> String {
    let mut text = format!("Page {} of {}\n", page + 1, total_pages);
    if page > 0 {
        text.push_str("  [P] Previous page\n");
    }
    if page + 1 < total_pages {
        text.push_str("  [N] Next page\n");
    }
    text
}

pub fn media_details(file: &MediaFile) -> String {
    let mut text = banner("Media File Details", '=');
    text.push_str(&format!("File: {}\n", file.file_name()));
    text.push_str(&format!("Path: {}\n", file.path.display()));
    text.push_str(&format!("Type: {}\n\n", file.file_type.label()));
    text.push_str("Metadata:\n");
    text.push_str(&format!("  Title: {}\n", file.metadata.name));
    text.push_str(&format!("  Duration: {}\n", file.metadata.duration_string()));
    for (key, value) in &file.metadata.attributes {
        text.push_str(&format!("  {key}: {value}\n"));
    }
    text
}

/// Full "Now Playing" screen, without the screen clear.
pub fn now_playing(snapshot: &PlaybackSnapshot, status_line: Option<&str>) -> String {
    let mut text = banner("Now Playing", '=');
    match (&snapshot.track, snapshot.track_index) {
        (Some(track), Some(index)) => {
            let metadata = &track.metadata;
            text.push_str(&format!("\nTitle: {}\n", metadata.name));
            for (label, key) in [("Artist", keys::ARTIST), ("Album", keys::ALBUM), ("Year", keys::YEAR)] {
                let value = metadata.attribute(key);
                if !value.is_empty() {
                    text.push_str(&format!("{label}: {value}\n"));
                }
            }
            text.push_str(&format!("File: {}\n\n", track.file_name()));

            let duration = if snapshot.duration_secs > 0.0 {
                snapshot.duration_secs
            } else {
                metadata.duration_secs
            };
            let percentage = progress_percentage(snapshot.position_secs, duration);
            text.push_str(&draw_progress_bar(percentage, PROGRESS_BAR_WIDTH));
            text.push('\n');
            text.push_str(&format!(
                "{} / {}\n",
                format_minutes_seconds(snapshot.position_secs),
                format_minutes_seconds(duration)
            ));
            text.push_str(&format!(
                "Volume: {} {}%\n",
                draw_volume_bar(snapshot.volume, VOLUME_BAR_WIDTH),
                snapshot.volume
            ));
            text.push_str(&format!("State: {}\n", snapshot.status.label()));
            text.push_str(&format!("\nPlaylist: {}\n", snapshot.playlist_name));
            text.push_str(&format!(
                "Track {} of {}\n",
                index + 1,
                snapshot.track_count
            ));
        }
        _ => text.push_str("\nNo track is currently playing.\n"),
    }
    if let Some(status_line) = status_line {
        text.push_str(&format!("\n{status_line}\n"));
    }
    text.push_str(PLAYER_CONTROLS);
    text
}
