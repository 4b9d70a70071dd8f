// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryError};

pub trait MemoryReader: Send + Sync {
    /// Fills `buf` from `addr`; either every byte is copied or the call fails.
    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError>;

    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        self.read_into(addr, &mut buf)?;
        Ok(buf)
    }
}

pub trait MemoryWriter: Send + Sync {
    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<(), MemoryError>;
}

/// Virtual address space of a target context.
pub trait VirtualMemory: MemoryReader + MemoryWriter {}

impl<T: MemoryReader + MemoryWriter> VirtualMemory for T {}
