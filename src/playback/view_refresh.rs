//! Periodic "now playing" re-render, parked on a condition variable while hidden.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::debug;

use super::playback_state::PlaybackState;
use super::view::PlayerRenderer;

#[derive(Debug)]
struct GateState {
    running: bool,
    displaying: bool,
}

/// Running/displaying flags guarded by their own mutex, separate from the state lock.
#[derive(Debug)]
pub struct ViewGate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl Default for ViewGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                running: true,
                displaying: false,
            }),
            condvar: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn show(&self) {
        let mut state = self.lock();
        state.displaying = true;
        self.condvar.notify_all();
    }

    pub fn hide(&self) {
        let mut state = self.lock();
        state.displaying = false;
        self.condvar.notify_all();
    }

    /// Clears both flags and wakes every waiter.
    pub fn stop(&self) {
        let mut state = self.lock();
        state.running = false;
        state.displaying = false;
        self.condvar.notify_all();
    }

    pub fn is_displaying(&self) -> bool {
        let state = self.lock();
        state.running && state.displaying
    }

    /// Blocks until the view is shown or the gate is stopped. Returns `false` when stopped.
    pub fn wait_until_displaying(&self) -> bool {
        let mut state = self.lock();
        while state.running && !state.displaying {
            state = match self.condvar.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        state.running
    }

    /// Sleeps up to `interval`, returning early when hidden or stopped.
    pub fn wait_interval(&self, interval: Duration) {
        let deadline = Instant::now() + interval;
        let mut state = self.lock();
        while state.running && state.displaying {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            state = match self.condvar.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// Re-renders the state at a fixed interval while the player view is shown.
pub struct ViewRefreshWorker {
    gate: Arc<ViewGate>,
    state: Arc<Mutex<PlaybackState>>,
    view: Arc<dyn PlayerRenderer>,
    interval: Duration,
}

impl ViewRefreshWorker {
    pub fn new(
        gate: Arc<ViewGate>,
        state: Arc<Mutex<PlaybackState>>,
        view: Arc<dyn PlayerRenderer>,
        interval: Duration,
    ) -> Self {
        Self {
            gate,
            state,
            view,
            interval,
        }
    }

    pub fn run(&self) {
        debug!("ViewRefreshWorker: started");
        while self.gate.wait_until_displaying() {
            let snapshot = match self.state.lock() {
                Ok(state) => state.snapshot(),
                Err(poisoned) => poisoned.into_inner().snapshot(),
            };
            self.view.render(&snapshot);
            self.gate.wait_interval(self.interval);
        }
        debug!("ViewRefreshWorker: stopped");
    }
}
