// Mon Oct 19 2026 - Alex

use crate::config::Config;
use crate::service::{MemoryService, ServiceError, Transport, UnixDatagramTransport};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Running receive loop. Stops and joins its worker on `stop` or drop.
pub struct ServiceHandle {
    running: Arc<AtomicBool>,
    served: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl ServiceHandle {
    pub fn start<T: Transport + 'static>(config: &Config, transport: T) -> Result<Self, ServiceError> {
        Self::with_service(MemoryService::from_config(config), transport)
    }

    /// Binds the configured socket and starts serving on it.
    pub fn serve(config: &Config) -> Result<Self, ServiceError> {
        let transport = UnixDatagramTransport::bind(&config.socket_path, Some(config.receive_timeout()))?;
        info!("listening on {}", config.socket_path.display());
        Self::start(config, transport)
    }

    pub fn with_service<T: Transport + 'static>(
        service: MemoryService,
        transport: T,
    ) -> Result<Self, ServiceError> {
        let running = Arc::new(AtomicBool::new(true));
        let served = Arc::new(AtomicU64::new(0));

        let worker = {
            let running = Arc::clone(&running);
            let served = Arc::clone(&served);
            thread::Builder::new()
                .name("memhook-service".to_string())
                .spawn(move || serve_loop(&service, &transport, &running, &served))?
        };

        Ok(Self {
            running,
            served,
            worker: Some(worker),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn requests_served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("service worker panicked");
            }
            info!("service stopped after {} requests", self.requests_served());
        }
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve_loop<T: Transport>(service: &MemoryService, transport: &T, running: &AtomicBool, served: &AtomicU64) {
    while running.load(Ordering::SeqCst) {
        let envelope = match transport.receive() {
            Ok(Some(envelope)) => envelope,
            Ok(None) => continue,
            Err(e) => {
                error!("receive failed, stopping: {}", e);
                running.store(false, Ordering::SeqCst);
                break;
            }
        };

        let Some(endpoint) = envelope.endpoint else {
            warn!(
                "dropping {} byte message from pid {} with no reply address",
                envelope.data.len(),
                envelope.caller.pid
            );
            continue;
        };

        let reply = service.handle_frame(&envelope.caller, &envelope.data);
        served.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = transport.send(&endpoint, &reply) {
            warn!("reply to {} failed: {}", endpoint, e);
        } else {
            debug!("replied to {}", endpoint);
        }
    }
}
