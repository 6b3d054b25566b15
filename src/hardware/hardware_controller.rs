//! Owns the serial link and the `hardware-input` thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use log::{info, warn};

use super::input_worker::{lock_link, InputWorker, TransportControl};
use super::serial_link::HardwareLink;
use crate::error::HardwareError;
use crate::worker_thread::{join_logged, spawn_named};

const INPUT_THREAD_NAME: &str = "hardware-input";

pub struct HardwareController {
    link: Arc<Mutex<Box<dyn HardwareLink>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HardwareController {
    pub fn new(link: Box<dyn HardwareLink>) -> Self {
        Self {
            link: Arc::new(Mutex::new(link)),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Connects and starts forwarding tokens to `transport`.
    pub fn initialize(&self, transport: Arc<dyn TransportControl>) -> Result<(), HardwareError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(error) = lock_link(&self.link).connect() {
            warn!("HardwareController: {}", error);
            return Err(error);
        }

        self.running.store(true, Ordering::SeqCst);
        let worker = InputWorker::new(
            Arc::clone(&self.link),
            transport,
            Arc::clone(&self.running),
        );
        match spawn_named(INPUT_THREAD_NAME, move || worker.run()) {
            Ok(handle) => {
                *self.lock_handle() = Some(handle);
                info!("HardwareController: input worker started");
                Ok(())
            }
            Err(error) => {
                self.running.store(false, Ordering::SeqCst);
                lock_link(&self.link).disconnect();
                warn!("HardwareController: failed to start input worker: {}", error);
                Err(HardwareError::Io(error))
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops and joins the input worker, then closes the link. Safe to call repeatedly.
    pub fn cleanup(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.lock_handle().take() {
            join_logged(INPUT_THREAD_NAME, handle);
        }
        let mut link = lock_link(&self.link);
        if link.is_connected() {
            link.disconnect();
        }
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for HardwareController {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::input_worker::test_support::{RecordingTransport, ScriptedLink};
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_initialize_failure_leaves_worker_stopped() {
        let link = ScriptedLink {
            fail_connect: true,
            ..ScriptedLink::default()
        };
        let controller = HardwareController::new(Box::new(link));
        let transport = Arc::new(RecordingTransport::default());

        assert!(matches!(
            controller.initialize(transport),
            Err(HardwareError::Open { .. })
        ));
        assert!(!controller.is_active());
        assert!(controller.lock_handle().is_none());
    }

    #[test]
    fn test_tokens_flow_to_transport_until_cleanup() {
        let link = ScriptedLink::with_tokens(&["N", "30"]);
        let disconnects = Arc::clone(&link.disconnects);
        let controller = HardwareController::new(Box::new(link));
        let transport = Arc::new(RecordingTransport::default());
        transport
            .displaying
            .store(true, std::sync::atomic::Ordering::SeqCst);

        controller
            .initialize(Arc::clone(&transport) as Arc<dyn TransportControl>)
            .expect("scripted link connects");
        assert!(controller.is_active());

        let deadline = Instant::now() + Duration::from_secs(2);
        while transport.calls().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(transport.calls(), vec!["next", "volume 30"]);

        controller.cleanup();
        controller.cleanup();
        assert!(!controller.is_active());
        assert_eq!(*disconnects.lock().unwrap(), 1);
    }
}
