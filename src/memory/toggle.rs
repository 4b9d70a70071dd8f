// Mon Oct 19 2026 - Alex

//! Process-wide write enable for executable pages.
//!
//! Only one writable-code scope can be open at a time. The scope flips the
//! covering pages to RWX and puts every page back to the protection recorded
//! in `/proc/self/maps` when the [`WritableCode`] guard is dropped, whichever
//! way the caller leaves.

use crate::memory::{page_size, Address, MemoryError, MemoryMapping, MemoryRange, Protection};
use log::{debug, error};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use std::ptr;
use std::sync::atomic::{fence, Ordering};

static TOGGLE: Lazy<ProtectionToggle> = Lazy::new(ProtectionToggle::new);

pub struct ProtectionToggle {
    lock: Mutex<()>,
    page_size: usize,
}

impl ProtectionToggle {
    fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            page_size: page_size(),
        }
    }

    pub fn global() -> &'static ProtectionToggle {
        &TOGGLE
    }

    /// Opens a writable scope over `region`. Blocks while another scope is
    /// open; calling it again from inside a scope deadlocks.
    pub fn acquire(&self, region: MemoryRange) -> Result<WritableCode<'_>, MemoryError> {
        if region.start().is_null() {
            return Err(MemoryError::NullAddress);
        }
        let guard = self.lock.lock();
        let span = region.page_span(self.page_size)?;

        let map = MemoryMapping::current()?;
        if !map.covers(&span, |_| true) {
            return Err(MemoryError::RegionNotFound(region.start().as_u64()));
        }
        let saved = map
            .overlapping(&span)
            .into_iter()
            .filter_map(|r| r.range().intersection(&span).map(|part| (part, r.protection())))
            .collect();

        let scope = WritableCode {
            _guard: guard,
            region,
            span,
            saved,
        };

        let rc = unsafe {
            libc::mprotect(
                span.start().as_mut_ptr() as *mut libc::c_void,
                span.size() as usize,
                Protection::ReadWriteExecute.to_prot(),
            )
        };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            return Err(MemoryError::PermissionDenied(format!(
                "mprotect {} rwx failed: {}",
                span, err
            )));
        }

        debug!("writable code scope opened over {}", span);
        Ok(scope)
    }

    pub fn with_writable_code<T, E, F>(&self, region: MemoryRange, body: F) -> Result<T, E>
    where
        E: From<MemoryError>,
        F: FnOnce(&mut WritableCode<'_>) -> Result<T, E>,
    {
        let mut scope = self.acquire(region)?;
        body(&mut scope)
    }
}

pub struct WritableCode<'a> {
    _guard: MutexGuard<'a, ()>,
    region: MemoryRange,
    span: MemoryRange,
    saved: Vec<(MemoryRange, Protection)>,
}

impl WritableCode<'_> {
    pub fn region(&self) -> &MemoryRange {
        &self.region
    }

    /// Copies `bytes` to `addr`; the destination must lie inside the region
    /// the scope was opened for.
    ///
    /// # Safety
    ///
    /// Nothing else may be reading or executing the destination bytes, and
    /// no live Rust reference may point into them.
    pub unsafe fn write(&mut self, addr: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        let target = MemoryRange::from_start_size(addr, bytes.len() as u64)?;
        if !self.region.contains_range(&target) {
            return Err(MemoryError::Fault {
                address: addr.as_u64(),
                len: bytes.len(),
            });
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), addr.as_mut_ptr(), bytes.len());
        fence(Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for WritableCode<'_> {
    fn drop(&mut self) {
        for (range, protection) in &self.saved {
            let rc = unsafe {
                libc::mprotect(
                    range.start().as_mut_ptr() as *mut libc::c_void,
                    range.size() as usize,
                    protection.to_prot(),
                )
            };
            if rc != 0 {
                error!(
                    "failed to restore {} on {}: {}",
                    protection,
                    range,
                    std::io::Error::last_os_error()
                );
            }
        }
        debug!("writable code scope closed over {}", self.span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Page {
        base: *mut u8,
        len: usize,
    }

    impl Page {
        fn read_exec() -> Self {
            let len = page_size();
            let base = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    len,
                    libc::PROT_READ | libc::PROT_EXEC,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            assert_ne!(base, libc::MAP_FAILED);
            Self { base: base as *mut u8, len }
        }

        fn protection(&self) -> Protection {
            MemoryMapping::current()
                .unwrap()
                .find_region(Address::from_ptr(self.base as *const u8))
                .unwrap()
                .protection()
        }

        fn range(&self, offset: u64, len: u64) -> MemoryRange {
            MemoryRange::from_start_size(Address::from_ptr(self.base as *const u8) + offset, len).unwrap()
        }
    }

    impl Drop for Page {
        fn drop(&mut self) {
            unsafe {
                libc::munmap(self.base as *mut libc::c_void, self.len);
            }
        }
    }

    #[test]
    fn test_scope_writes_and_restores_protection() {
        let page = Page::read_exec();
        assert_eq!(page.protection(), Protection::ReadExecute);

        {
            let mut scope = ProtectionToggle::global().acquire(page.range(16, 5)).unwrap();
            assert_eq!(page.protection(), Protection::ReadWriteExecute);
            unsafe {
                scope
                    .write(Address::from_ptr(page.base as *const u8) + 16, &[0xE9, 1, 2, 3, 4])
                    .unwrap();
            }
        }

        assert_eq!(page.protection(), Protection::ReadExecute);
        let written = unsafe { std::slice::from_raw_parts(page.base.add(16), 5) };
        assert_eq!(written, &[0xE9, 1, 2, 3, 4]);
    }

    #[test]
    fn test_restores_on_error_path() {
        let page = Page::read_exec();
        let result: Result<(), MemoryError> = ProtectionToggle::global()
            .with_writable_code(page.range(0, 4), |scope| unsafe {
                scope.write(Address::from_ptr(page.base as *const u8) + 2, &[0u8; 8])
            });
        assert!(matches!(result, Err(MemoryError::Fault { .. })));
        assert_eq!(page.protection(), Protection::ReadExecute);
    }

    #[test]
    fn test_unmapped_region_rejected() {
        // below mmap_min_addr, never mapped
        let range = MemoryRange::from_start_size(Address::new(0x1000), 1).unwrap();
        assert!(matches!(
            ProtectionToggle::global().acquire(range),
            Err(MemoryError::RegionNotFound(_))
        ));
    }

    #[test]
    fn test_top_of_address_space_rejected() {
        let last_page = MemoryRange::from_start_size(Address::new(0xFFFF_FFFF_FFFF_F001), 5).unwrap();
        assert!(matches!(
            ProtectionToggle::global().acquire(last_page),
            Err(MemoryError::InvalidRange)
        ));

        let kernel_half = MemoryRange::from_start_size(Address::new(0xFFFF_FFFF_FFFF_E001), 5).unwrap();
        assert!(matches!(
            ProtectionToggle::global().acquire(kernel_half),
            Err(MemoryError::RegionNotFound(_))
        ));
    }

    #[test]
    fn test_null_region_rejected() {
        let range = MemoryRange::from_start_size(Address::null(), 5).unwrap();
        assert!(matches!(
            ProtectionToggle::global().acquire(range),
            Err(MemoryError::NullAddress)
        ));
    }
}
