// Mon Oct 19 2026 - Alex

use crate::error::ErrorKind;
use crate::memory::MemoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Malformed frame: {0}")]
    Malformed(String),
    #[error("Unknown operation {0}")]
    UnknownOperation(u32),
    #[error("Payload of {length} bytes exceeds {max}")]
    PayloadTooLarge { length: u64, max: usize },
    #[error("Caller {pid} lacks the required privilege")]
    PermissionDenied { pid: i32 },
    #[error("Physical mapping failed: {0}")]
    PhysicalMapping(MemoryError),
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
    #[error("Service replied with {0}")]
    Remote(ErrorKind),
    #[error("Timed out waiting for a reply")]
    Timeout,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) | Self::UnknownOperation(_) => ErrorKind::InvalidArgument,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::PhysicalMapping(_) => ErrorKind::OutOfMemory,
            Self::Memory(e) => e.kind(),
            Self::Remote(kind) => *kind,
            Self::Timeout | Self::Io(_) => ErrorKind::Fault,
        }
    }
}
