//! Named worker thread spawning and logged joins.

use std::any::Any;
use std::thread::{self, JoinHandle};

use log::{debug, error};

fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

pub fn spawn_named<F>(name: &str, body: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new().name(name.to_string()).spawn(body)
}

/// Joins `handle`, logging a panic instead of propagating it.
pub fn join_logged(name: &str, handle: JoinHandle<()>) {
    match handle.join() {
        Ok(()) => debug!("{} thread joined", name),
        Err(payload) => error!(
            "{} thread panicked: {}",
            name,
            panic_payload_to_string(payload.as_ref())
        ),
    }
}
