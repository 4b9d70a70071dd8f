// Mon Oct 19 2026 - Alex

use crate::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Null address")]
    NullAddress,
    #[error("Fault accessing {len} bytes at 0x{address:x}")]
    Fault { address: u64, len: usize },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("Region not found for address 0x{0:x}")]
    RegionNotFound(u64),
    #[error("Address range overflows")]
    InvalidRange,
    #[error("Malformed memory map line: {0}")]
    MalformedMap(String),
}

impl MemoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            Self::Io(_) => ErrorKind::Fault,
            Self::NullAddress | Self::InvalidRange | Self::MalformedMap(_) => ErrorKind::InvalidArgument,
            Self::Fault { .. } | Self::RegionNotFound(_) => ErrorKind::Fault,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::ResourceExhausted(_) => ErrorKind::OutOfMemory,
        }
    }

    pub(crate) fn last_os(context: &str) -> Self {
        let err = std::io::Error::last_os_error();
        Self::Io(std::io::Error::new(err.kind(), format!("{}: {}", context, err)))
    }
}
