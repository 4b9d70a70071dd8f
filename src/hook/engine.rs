// Mon Oct 19 2026 - Alex

use crate::hook::{jmp_rel32, prologue, HookError, Trampoline, PATCH_WIDTH};
use crate::memory::{Address, MemoryError, MemoryMapping, MemoryRange, ProtectionToggle};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;

/// Bytes inspected when checking a prologue; enough for the longest
/// instruction that can start inside the patch.
const PROLOGUE_WINDOW: usize = PATCH_WIDTH + 15;

/// Targets currently patched by any engine in the process. Holding the lock
/// serializes every install and remove.
static ENGINE_LOCK: Lazy<Mutex<HashSet<u64>>> = Lazy::new(|| Mutex::new(HashSet::new()));

pub struct HookDescriptor {
    original: Address,
    replacement: Address,
    trampoline: Option<Trampoline>,
}

impl HookDescriptor {
    /// A descriptor that has not been installed.
    pub fn new(original: Address, replacement: Address) -> Self {
        Self {
            original,
            replacement,
            trampoline: None,
        }
    }

    pub fn original_address(&self) -> Address {
        self.original
    }

    pub fn replacement_address(&self) -> Address {
        self.replacement
    }

    /// Entry point that runs the original function.
    pub fn trampoline_entry(&self) -> Option<Address> {
        self.trampoline.as_ref().map(|t| t.entry())
    }

    pub fn trampoline_size(&self) -> usize {
        self.trampoline.as_ref().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_installed(&self) -> bool {
        self.trampoline.is_some()
    }
}

impl fmt::Debug for HookDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDescriptor")
            .field("original", &self.original)
            .field("replacement", &self.replacement)
            .field("trampoline", &self.trampoline_entry())
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl Drop for HookDescriptor {
    fn drop(&mut self) {
        if let Some(trampoline) = self.trampoline.take() {
            // the patch still jumps away and the replacement may call through
            warn!(
                "descriptor for {} dropped while installed; trampoline {} leaked",
                self.original,
                trampoline.entry()
            );
            trampoline.leak();
        }
    }
}

pub struct HookEngine {
    verify_prologue: bool,
}

impl HookEngine {
    pub fn new() -> Self {
        Self {
            verify_prologue: true,
        }
    }

    pub fn with_prologue_check(mut self, enabled: bool) -> Self {
        self.verify_prologue = enabled;
        self
    }

    /// Redirects `target` to `replacement`.
    ///
    /// # Safety
    ///
    /// `target` must be the entry of a function whose first bytes no thread
    /// is executing, and `replacement` must have the same signature and ABI.
    pub unsafe fn install(&self, target: Address, replacement: Address) -> Result<HookDescriptor, HookError> {
        if target.is_null() || replacement.is_null() {
            return Err(HookError::InvalidArgument("null hook address".to_string()));
        }
        if target == replacement {
            return Err(HookError::InvalidArgument(format!(
                "{} cannot be redirected to itself",
                target
            )));
        }

        let mut installed = ENGINE_LOCK.lock();
        if installed.contains(&target.as_u64()) {
            return Err(HookError::InvalidState(format!("{} is already hooked", target)));
        }
        let patch = MemoryRange::from_start_size(target, PATCH_WIDTH as u64)?;
        let map = MemoryMapping::current()?;
        if !map.covers(&patch, |p| p.can_read()) {
            return Err(MemoryError::Fault {
                address: target.as_u64(),
                len: PATCH_WIDTH,
            }
            .into());
        }

        let code = std::slice::from_raw_parts(target.as_ptr(), readable_window(&map, target));
        if self.verify_prologue {
            prologue::check_displaced(code, PATCH_WIDTH).map_err(|reason| HookError::UnsafePrologue {
                address: target.as_u64(),
                reason,
            })?;
        }

        let rel = patch.end().rel32_to(replacement).ok_or_else(|| {
            HookError::InvalidArgument(format!(
                "replacement {} is out of rel32 reach from {}",
                replacement, target
            ))
        })?;

        let mut displaced = [0u8; PATCH_WIDTH];
        displaced.copy_from_slice(&code[..PATCH_WIDTH]);
        let trampoline = Trampoline::allocate_near(target, displaced)?;

        let jump = jmp_rel32(rel);
        write_code(patch, &jump)?;
        if read_code(target) != jump {
            write_code(patch, &displaced)?;
            return Err(MemoryError::Fault {
                address: target.as_u64(),
                len: PATCH_WIDTH,
            }
            .into());
        }
        installed.insert(target.as_u64());

        info!(
            "hooked {} -> {} (trampoline {})",
            target,
            replacement,
            trampoline.entry()
        );
        Ok(HookDescriptor {
            original: target,
            replacement,
            trampoline: Some(trampoline),
        })
    }

    /// Restores the original bytes and releases the trampoline.
    ///
    /// # Safety
    ///
    /// No thread may be executing inside the trampoline or the patched bytes.
    pub unsafe fn remove(&self, descriptor: &mut HookDescriptor) -> Result<(), HookError> {
        let mut installed = ENGINE_LOCK.lock();
        let displaced = match descriptor.trampoline.as_ref() {
            Some(trampoline) => *trampoline.displaced(),
            None => {
                return Err(HookError::InvalidState(format!(
                    "hook on {} is not installed",
                    descriptor.original
                )))
            }
        };

        let patch = MemoryRange::from_start_size(descriptor.original, PATCH_WIDTH as u64)?;
        write_code(patch, &displaced)?;
        descriptor.trampoline = None;
        installed.remove(&descriptor.original.as_u64());

        info!("unhooked {}", descriptor.original);
        Ok(())
    }
}

impl Default for HookEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn readable_window(map: &MemoryMapping, target: Address) -> usize {
    let mut len = PROLOGUE_WINDOW;
    while len > PATCH_WIDTH {
        match MemoryRange::from_start_size(target, len as u64) {
            Ok(range) if map.covers(&range, |p| p.can_read()) => break,
            _ => len -= 1,
        }
    }
    len
}

/// Callers hold `ENGINE_LOCK` and own the patch bytes.
unsafe fn write_code(patch: MemoryRange, bytes: &[u8]) -> Result<(), MemoryError> {
    ProtectionToggle::global()
        .with_writable_code(patch, |scope| unsafe { scope.write(patch.start(), bytes) })?;
    debug!("wrote {} bytes at {}", bytes.len(), patch.start());
    Ok(())
}

unsafe fn read_code(at: Address) -> [u8; PATCH_WIDTH] {
    std::ptr::read_volatile(at.as_ptr() as *const [u8; PATCH_WIDTH])
}
