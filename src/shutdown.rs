//! Process shutdown signalling.
//!
//! A [`CancellationToken`] is handed to every component that must react to
//! Ctrl-C. Cancelling runs the registered callbacks once, in registration order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, info, warn};

type CancelCallback = Box<dyn FnOnce() + Send>;

struct TokenInner {
    cancelled: AtomicBool,
    callbacks: Mutex<Vec<CancelCallback>>,
}

/// Clonable shutdown signal shared between the UI, the controller and the signal watcher.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Marks the token cancelled and runs pending callbacks. Later calls are no-ops.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let callbacks = {
            let mut guard = match self.inner.callbacks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *guard)
        };
        debug!(
            "CancellationToken: running {} shutdown callback(s)",
            callbacks.len()
        );
        for callback in callbacks {
            callback();
        }
    }

    /// Registers work to run on cancellation. Runs immediately if already cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut guard = match self.inner.callbacks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !self.is_cancelled() {
                guard.push(Box::new(callback));
                return;
            }
        }
        callback();
    }
}

/// Spawns a thread that cancels `token` when the process receives Ctrl-C.
pub fn spawn_ctrl_c_watcher(token: CancellationToken) {
    let spawn_result = thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(error) => {
                    warn!("SignalWatcher: failed to build runtime: {}", error);
                    return;
                }
            };
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    info!("SignalWatcher: interrupt received, shutting down");
                    token.cancel();
                    // The UI thread may be parked on stdin; the controller is already torn down.
                    std::process::exit(130);
                }
                Err(error) => warn!("SignalWatcher: failed to listen for Ctrl-C: {}", error),
            }
        });
    if let Err(error) = spawn_result {
        warn!("SignalWatcher: failed to spawn watcher thread: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::CancellationToken;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_cancel_runs_callbacks_exactly_once() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        token.on_cancel(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel();
        token.cancel();

        assert!(token.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_registered_after_cancel_runs_immediately() {
        let token = CancellationToken::new();
        token.cancel();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        token.on_cancel(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_cancellation_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
