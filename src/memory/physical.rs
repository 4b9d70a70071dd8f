// Mon Oct 19 2026 - Alex

use crate::memory::{page_size, Address, MemoryError};
use log::debug;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const DEFAULT_PHYSICAL_DEVICE: &str = "/dev/mem";

pub trait PhysicalMapper: Send + Sync {
    /// Maps `[address, address + length)` for the lifetime of the returned
    /// window. The mapping is torn down when the window is dropped.
    fn map(&self, address: Address, length: usize, writable: bool) -> Result<PhysicalWindow, MemoryError>;
}

enum Backing {
    Empty,
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

pub struct PhysicalWindow {
    backing: Backing,
    address: Address,
    offset: usize,
    len: usize,
}

impl PhysicalWindow {
    fn empty(address: Address) -> Self {
        Self {
            backing: Backing::Empty,
            address,
            offset: 0,
            len: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        let range = self.offset..self.offset + self.len;
        match &self.backing {
            Backing::Empty => &[],
            Backing::ReadOnly(map) => &map[range],
            Backing::ReadWrite(map) => &map[range],
        }
    }

    pub fn as_mut_slice(&mut self) -> Result<&mut [u8], MemoryError> {
        let range = self.offset..self.offset + self.len;
        match &mut self.backing {
            Backing::Empty => Ok(&mut []),
            Backing::ReadOnly(_) => Err(MemoryError::PermissionDenied(format!(
                "window at {} is mapped read-only",
                self.address
            ))),
            Backing::ReadWrite(map) => Ok(&mut map[range]),
        }
    }

    pub fn flush(&self) -> Result<(), MemoryError> {
        if let Backing::ReadWrite(map) = &self.backing {
            map.flush()?;
        }
        Ok(())
    }
}

/// Maps physical ranges through a memory device such as `/dev/mem`, or any
/// file standing in for physical memory.
pub struct DevMemMapper {
    path: PathBuf,
    limit: Option<u64>,
    page_size: usize,
}

impl DevMemMapper {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            limit: None,
            page_size: page_size(),
        }
    }

    /// Physical addresses at or above `limit` are refused before mapping.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self, writable: bool) -> Result<File, MemoryError> {
        OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&self.path)
            .map_err(|e| MemoryError::ResourceExhausted(format!("open {}: {}", self.path.display(), e)))
    }

    fn effective_limit(&self, file: &File) -> Result<Option<u64>, MemoryError> {
        if let Some(limit) = self.limit {
            return Ok(Some(limit));
        }
        let metadata = file.metadata()?;
        // regular files fault past EOF, device nodes report a zero length
        Ok(if metadata.is_file() { Some(metadata.len()) } else { None })
    }
}

impl Default for DevMemMapper {
    fn default() -> Self {
        Self::new(DEFAULT_PHYSICAL_DEVICE)
    }
}

impl PhysicalMapper for DevMemMapper {
    fn map(&self, address: Address, length: usize, writable: bool) -> Result<PhysicalWindow, MemoryError> {
        let end = address
            .checked_add(length as u64)
            .ok_or_else(|| MemoryError::ResourceExhausted(format!("range at {} overflows", address)))?;
        if length == 0 {
            return Ok(PhysicalWindow::empty(address));
        }

        let file = self.open(writable)?;
        if let Some(limit) = self.effective_limit(&file)? {
            if end.as_u64() > limit {
                return Err(MemoryError::ResourceExhausted(format!(
                    "physical range {}+{} exceeds limit 0x{:x}",
                    address, length, limit
                )));
            }
        }

        let base = address.align_down(self.page_size);
        let offset = (address.as_u64() - base.as_u64()) as usize;
        let mut options = MmapOptions::new();
        options.offset(base.as_u64()).len(offset + length);

        let mapped = |e: std::io::Error| {
            MemoryError::ResourceExhausted(format!("mapping {}+{} failed: {}", address, length, e))
        };
        let backing = if writable {
            Backing::ReadWrite(unsafe { options.map_mut(&file) }.map_err(mapped)?)
        } else {
            Backing::ReadOnly(unsafe { options.map(&file) }.map_err(mapped)?)
        };

        debug!("mapped physical {}+{} (writable: {})", address, length, writable);
        Ok(PhysicalWindow {
            backing,
            address,
            offset,
            len: length,
        })
    }
}
