//! Loop turning serial tokens into transport calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};

use super::hardware_command::HardwareCommand;
use super::serial_link::HardwareLink;

const ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// Transport operations the hardware panel can trigger.
pub trait TransportControl: Send + Sync {
    fn previous(&self);
    fn next(&self);
    fn toggle_play_pause(&self);
    fn stop(&self);
    fn set_volume(&self, volume: i32);
    fn is_displaying(&self) -> bool;
}

pub(crate) fn lock_link(
    link: &Mutex<Box<dyn HardwareLink>>,
) -> MutexGuard<'_, Box<dyn HardwareLink>> {
    match link.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct InputWorker {
    link: Arc<Mutex<Box<dyn HardwareLink>>>,
    transport: Arc<dyn TransportControl>,
    running: Arc<AtomicBool>,
}

impl InputWorker {
    pub fn new(
        link: Arc<Mutex<Box<dyn HardwareLink>>>,
        transport: Arc<dyn TransportControl>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            link,
            transport,
            running,
        }
    }

    pub fn run(&self) {
        debug!("InputWorker: started");
        while self.running.load(Ordering::SeqCst) {
            if !self.poll_once() {
                thread::sleep(ERROR_BACKOFF);
            }
        }
        debug!("InputWorker: stopped");
    }

    /// Reads at most one token and dispatches it. Returns `false` after a read error.
    pub fn poll_once(&self) -> bool {
        let token = {
            let mut link = lock_link(&self.link);
            if !link.is_connected() {
                return false;
            }
            link.read_token()
        };
        match token {
            Ok(Some(token)) => {
                self.dispatch(&token);
                true
            }
            Ok(None) => true,
            Err(error) => {
                warn!("InputWorker: read failed: {}", error);
                false
            }
        }
    }

    fn dispatch(&self, token: &str) {
        let Some(command) = HardwareCommand::parse(token) else {
            debug!("InputWorker: ignoring unknown token {:?}", token);
            return;
        };
        if !self.transport.is_displaying() {
            trace!(
                "InputWorker: player view hidden, dropping {:?}",
                command
            );
            return;
        }
        debug!("InputWorker: {:?}", command);
        match command {
            HardwareCommand::Previous => self.transport.previous(),
            HardwareCommand::Next => self.transport.next(),
            HardwareCommand::Toggle => self.transport.toggle_play_pause(),
            HardwareCommand::Stop => self.transport.stop(),
            HardwareCommand::Volume(volume) => self.transport.set_volume(i32::from(volume)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::HardwareError;
    use std::collections::VecDeque;

    /// Scripted link: hands out queued tokens, then times out.
    #[derive(Default)]
    pub struct ScriptedLink {
        pub tokens: Arc<Mutex<VecDeque<Result<Option<String>, String>>>>,
        pub connected: bool,
        pub fail_connect: bool,
        pub disconnects: Arc<Mutex<usize>>,
    }

    impl ScriptedLink {
        pub fn with_tokens(tokens: &[&str]) -> Self {
            let link = Self::default();
            {
                let mut queue = link.tokens.lock().unwrap();
                for token in tokens {
                    queue.push_back(Ok(Some(token.to_string())));
                }
            }
            link
        }
    }

    impl HardwareLink for ScriptedLink {
        fn connect(&mut self) -> Result<(), HardwareError> {
            if self.fail_connect {
                return Err(HardwareError::Open {
                    port: "scripted".to_string(),
                    reason: "no device".to_string(),
                });
            }
            self.connected = true;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn read_token(&mut self) -> Result<Option<String>, HardwareError> {
            match self.tokens.lock().unwrap().pop_front() {
                Some(Ok(token)) => Ok(token),
                Some(Err(reason)) => Err(HardwareError::Io(std::io::Error::other(reason))),
                None => {
                    thread::sleep(Duration::from_millis(2));
                    Ok(None)
                }
            }
        }

        fn disconnect(&mut self) {
            self.connected = false;
            *self.disconnects.lock().unwrap() += 1;
        }
    }

    #[derive(Default)]
    pub struct RecordingTransport {
        pub displaying: AtomicBool,
        pub calls: Mutex<Vec<String>>,
    }

    impl RecordingTransport {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    impl TransportControl for RecordingTransport {
        fn previous(&self) {
            self.record("previous");
        }

        fn next(&self) {
            self.record("next");
        }

        fn toggle_play_pause(&self) {
            self.record("toggle");
        }

        fn stop(&self) {
            self.record("stop");
        }

        fn set_volume(&self, volume: i32) {
            self.record(format!("volume {volume}"));
        }

        fn is_displaying(&self) -> bool {
            self.displaying.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{RecordingTransport, ScriptedLink};
    use super::*;

    fn worker_for(
        mut link: ScriptedLink,
        transport: &Arc<RecordingTransport>,
    ) -> InputWorker {
        link.connected = true;
        InputWorker::new(
            Arc::new(Mutex::new(Box::new(link) as Box<dyn HardwareLink>)),
            Arc::clone(transport) as Arc<dyn TransportControl>,
            Arc::new(AtomicBool::new(true)),
        )
    }

    #[test]
    fn test_tokens_dispatch_while_player_view_shown() {
        let transport = Arc::new(RecordingTransport::default());
        transport.displaying.store(true, Ordering::SeqCst);
        let worker = worker_for(
            ScriptedLink::with_tokens(&["P", "N", "T", "S", "250", "bogus"]),
            &transport,
        );

        for _ in 0..6 {
            assert!(worker.poll_once());
        }

        assert_eq!(
            transport.calls(),
            vec!["previous", "next", "toggle", "stop", "volume 100"]
        );
    }

    #[test]
    fn test_tokens_dropped_while_player_view_hidden() {
        let transport = Arc::new(RecordingTransport::default());
        let worker = worker_for(ScriptedLink::with_tokens(&["N", "40"]), &transport);

        assert!(worker.poll_once());
        assert!(worker.poll_once());

        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_read_error_reports_failure_without_dispatch() {
        let transport = Arc::new(RecordingTransport::default());
        transport.displaying.store(true, Ordering::SeqCst);
        let link = ScriptedLink::default();
        link.tokens
            .lock()
            .unwrap()
            .push_back(Err("unplugged".to_string()));
        let worker = worker_for(link, &transport);

        assert!(!worker.poll_once());
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_run_exits_after_running_flag_cleared() {
        let transport = Arc::new(RecordingTransport::default());
        let worker = worker_for(ScriptedLink::default(), &transport);
        let running = Arc::clone(&worker.running);
        let handle = thread::spawn(move || worker.run());

        thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::SeqCst);
        handle.join().expect("input worker should exit");
    }
}
