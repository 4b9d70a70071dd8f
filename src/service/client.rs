// Mon Oct 19 2026 - Alex

use crate::service::wire;
use crate::service::{
    Endpoint, MemoryRequest, Reply, ServiceError, Transport, UnixDatagramTransport, MAX_PAYLOAD,
};
use log::{debug, warn};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Controller side of the service: sends one request and waits for the reply
/// with the matching sequence number.
pub struct ServiceClient {
    transport: UnixDatagramTransport,
    server: Endpoint,
    timeout: Duration,
    seq: AtomicU32,
}

impl ServiceClient {
    /// Binds a reply socket at `local` and targets the service at `server`.
    pub fn connect<P: AsRef<Path>, Q: AsRef<Path>>(
        server: P,
        local: Q,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let poll = timeout.min(Duration::from_millis(100)).max(Duration::from_millis(1));
        Ok(Self {
            transport: UnixDatagramTransport::bind(local, Some(poll))?,
            server: Endpoint::new(server),
            timeout,
            seq: AtomicU32::new(1),
        })
    }

    pub fn request(&self, request: &MemoryRequest) -> Result<Reply, ServiceError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let frame = wire::encode_request(seq, std::process::id(), request);
        self.transport.send(&self.server, &frame)?;
        debug!("sent {:?} as seq {}", request, seq);

        let deadline = Instant::now() + self.timeout;
        while Instant::now() < deadline {
            let Some(envelope) = self.transport.receive()? else {
                continue;
            };
            match wire::decode_reply(&envelope.data) {
                Ok((header, reply)) if header.seq == seq => return Ok(reply),
                Ok((header, _)) => debug!("ignoring stale reply seq {}", header.seq),
                Err(e) => warn!("ignoring bad reply: {}", e),
            }
        }
        Err(ServiceError::Timeout)
    }

    pub fn read_virtual(&self, address: u64, length: usize) -> Result<Vec<u8>, ServiceError> {
        check_length(length)?;
        self.expect_ok(&MemoryRequest::read_virtual(address, length))
    }

    pub fn write_virtual(&self, address: u64, data: &[u8]) -> Result<(), ServiceError> {
        self.expect_ok(&MemoryRequest::write_virtual(address, data)?).map(|_| ())
    }

    pub fn read_physical(&self, address: u64, length: usize) -> Result<Vec<u8>, ServiceError> {
        check_length(length)?;
        self.expect_ok(&MemoryRequest::read_physical(address, length))
    }

    pub fn write_physical(&self, address: u64, data: &[u8]) -> Result<(), ServiceError> {
        self.expect_ok(&MemoryRequest::write_physical(address, data)?).map(|_| ())
    }

    fn expect_ok(&self, request: &MemoryRequest) -> Result<Vec<u8>, ServiceError> {
        let reply = self.request(request)?;
        if reply.is_ok() {
            return Ok(reply.data);
        }
        match reply.kind() {
            Some(kind) => Err(ServiceError::Remote(kind)),
            None => Err(ServiceError::Malformed(format!("unknown status {}", reply.status))),
        }
    }
}

fn check_length(length: usize) -> Result<(), ServiceError> {
    if length > MAX_PAYLOAD {
        return Err(ServiceError::PayloadTooLarge {
            length: length as u64,
            max: MAX_PAYLOAD,
        });
    }
    Ok(())
}
