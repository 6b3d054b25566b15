//! Line-oriented terminal I/O shared by the menus and the player renderer.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::warn;

use super::formatting;
use crate::playback::{PlaybackSnapshot, PlayerRenderer};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

struct FlashLine {
    text: String,
    shown_at: Instant,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Terminal front end. Writes are serialized so the view-refresh thread and
/// the menu thread never interleave half screens.
pub struct TerminalView {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
    flash: Mutex<Option<FlashLine>>,
    flash_duration: Duration,
}

impl TerminalView {
    pub fn new(flash_duration: Duration) -> Self {
        Self::with_io(
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
            flash_duration,
        )
    }

    pub fn with_io(
        input: Box<dyn BufRead + Send>,
        output: Box<dyn Write + Send>,
        flash_duration: Duration,
    ) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
            flash: Mutex::new(None),
            flash_duration,
        }
    }

    pub fn write(&self, text: &str) {
        let mut output = lock(&self.output);
        if let Err(error) = output
            .write_all(text.as_bytes())
            .and_then(|()| output.flush())
        {
            warn!("TerminalView: write failed: {}", error);
        }
    }

    pub fn clear_screen(&self) {
        self.write(CLEAR_SCREEN);
    }

    pub fn message(&self, text: &str) {
        self.write(&format!("{text}\n"));
    }

    pub fn error(&self, text: &str) {
        self.write(&format!("ERROR: {text}\n"));
    }

    /// Prints `prompt` and reads one line without its newline. `None` on end of input.
    pub fn prompt(&self, prompt: &str) -> Option<String> {
        self.write(prompt);
        let mut line = String::new();
        match lock(&self.input).read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(error) => {
                warn!("TerminalView: read failed: {}", error);
                None
            }
        }
    }

    /// Prompts until a number in `min..=max` is entered.
    pub fn menu_choice(&self, min: usize, max: usize) -> Option<usize> {
        loop {
            let line = self.prompt(&format!("Enter your choice ({min}-{max}): "))?;
            match line.trim().parse::<usize>() {
                Ok(choice) if (min..=max).contains(&choice) => return Some(choice),
                Ok(_) => self.message("Choice out of range. Please try again."),
                Err(_) => self.message("Invalid input. Please enter a number."),
            }
        }
    }

    /// Reads a 1-based item number and returns it 0-based when below `count`.
    pub fn item_index(&self, prompt: &str, count: usize) -> Option<usize> {
        let line = self.prompt(prompt)?;
        match line.trim().parse::<usize>() {
            Ok(number) if number >= 1 && number <= count => Some(number - 1),
            _ => {
                self.error("Invalid number");
                None
            }
        }
    }

    pub fn wait_for_enter(&self) {
        let _ = self.prompt("\nPress Enter to continue...");
    }

    fn current_flash(&self) -> Option<String> {
        let mut flash = lock(&self.flash);
        match flash.as_ref() {
            Some(line) if line.shown_at.elapsed() < self.flash_duration => Some(line.text.clone()),
            Some(_) => {
                *flash = None;
                None
            }
            None => None,
        }
    }

    fn set_flash(&self, text: String) {
        *lock(&self.flash) = Some(FlashLine {
            text,
            shown_at: Instant::now(),
        });
    }
}

impl PlayerRenderer for TerminalView {
    fn render(&self, snapshot: &PlaybackSnapshot) {
        let status_line = self.current_flash();
        let screen = formatting::now_playing(snapshot, status_line.as_deref());
        self.write(&format!("{CLEAR_SCREEN}{screen}"));
    }

    fn flash_message(&self, message: &str) {
        self.write(&format!("\r{message}{}\n", " ".repeat(20)));
        self.set_flash(message.to_string());
    }

    fn display_error(&self, message: &str) {
        self.error(message);
        self.set_flash(format!("ERROR: {message}"));
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::scripted_view;
    use super::*;
    use crate::playback::PlayerStatus;

    fn empty_snapshot() -> PlaybackSnapshot {
        PlaybackSnapshot {
            playlist_name: String::new(),
            track: None,
            track_index: None,
            track_count: 0,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: 80,
            status: PlayerStatus::Stopped,
        }
    }

    #[test]
    fn test_prompt_strips_line_endings_and_reports_eof() {
        let (view, output) = scripted_view("hello\r\n");
        assert_eq!(view.prompt("> ").as_deref(), Some("hello"));
        assert_eq!(view.prompt("> "), None);
        assert_eq!(output.text(), "> > ");
    }

    #[test]
    fn test_menu_choice_retries_until_in_range() {
        let (view, output) = scripted_view("abc\n9\n2\n");
        assert_eq!(view.menu_choice(0, 5), Some(2));
        let text = output.text();
        assert!(text.contains("Invalid input. Please enter a number."));
        assert!(text.contains("Choice out of range. Please try again."));
    }

    #[test]
    fn test_item_index_converts_to_zero_based() {
        let (view, _output) = scripted_view("3\n0\n");
        assert_eq!(view.item_index("n: ", 3), Some(2));
        assert_eq!(view.item_index("n: ", 3), None);
    }

    #[test]
    fn test_flash_message_appears_in_next_render() {
        let (view, output) = scripted_view("");
        view.flash_message("Paused");
        view.render(&empty_snapshot());
        let text = output.text();
        assert!(text.starts_with("\rPaused"));
        assert!(text.contains(CLEAR_SCREEN));
        assert!(text.contains("\nPaused\n"));
    }

    #[test]
    fn test_expired_flash_is_dropped() {
        let output = test_support::SharedOutput::default();
        let view = TerminalView::with_io(
            Box::new(io::Cursor::new(Vec::new())),
            Box::new(output.clone()),
            Duration::ZERO,
        );
        view.display_error("Failed to play /m/a.mp3");
        assert_eq!(view.current_flash(), None);
        assert!(output.text().contains("ERROR: Failed to play /m/a.mp3"));
    }
}
