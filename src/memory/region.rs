// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryRange, Protection};
use std::fmt;

#[derive(Debug, Clone)]
pub struct MemoryRegion {
    range: MemoryRange,
    protection: Protection,
    shared: bool,
    offset: u64,
    file_path: Option<String>,
}

impl MemoryRegion {
    pub fn new(range: MemoryRange, protection: Protection) -> Self {
        Self {
            range,
            protection,
            shared: false,
            offset: 0,
            file_path: None,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_file_path(mut self, path: String) -> Self {
        self.file_path = Some(path);
        self
    }

    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn range(&self) -> &MemoryRange {
        &self.range
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn start(&self) -> Address {
        self.range.start()
    }

    pub fn end(&self) -> Address {
        self.range.end()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.range.contains(addr)
    }

    pub fn is_code(&self) -> bool {
        self.protection.can_execute() && !self.protection.can_write()
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} 0x{:x} {}",
            self.range,
            self.protection,
            self.offset,
            self.file_path.as_deref().unwrap_or("")
        )
    }
}
