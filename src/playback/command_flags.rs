//! Independent command intents drained by the playback worker.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Persistent intent: playback should be running.
    Play,
    Stop,
    Toggle,
    Next,
    Previous,
    /// Load the current track from scratch on the next iteration.
    ReloadSource,
}

#[derive(Debug, Default)]
pub struct CommandFlags {
    play: AtomicBool,
    stop: AtomicBool,
    toggle: AtomicBool,
    next: AtomicBool,
    previous: AtomicBool,
    reload_source: AtomicBool,
}

impl CommandFlags {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, command: Command) -> &AtomicBool {
        match command {
            Command::Play => &self.play,
            Command::Stop => &self.stop,
            Command::Toggle => &self.toggle,
            Command::Next => &self.next,
            Command::Previous => &self.previous,
            Command::ReloadSource => &self.reload_source,
        }
    }

    pub fn set(&self, command: Command) {
        self.flag(command).store(true, Ordering::SeqCst);
    }

    pub fn clear(&self, command: Command) {
        self.flag(command).store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self, command: Command) -> bool {
        self.flag(command).load(Ordering::SeqCst)
    }

    /// Clears the flag and reports whether it was set.
    pub fn take(&self, command: Command) -> bool {
        self.flag(command).swap(false, Ordering::SeqCst)
    }
}
