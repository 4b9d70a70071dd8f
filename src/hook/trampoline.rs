// Mon Oct 19 2026 - Alex

use crate::hook::{HookError, JMP_REL32_OPCODE, PATCH_WIDTH, TRAMPOLINE_LEN};
use crate::memory::{page_size, Address, MemoryError, MemoryMapping, MemoryRange, Protection};
use log::{debug, trace};
use std::ptr;

/// How many free gaps are tried before giving up on a near allocation.
const MAX_CANDIDATES: usize = 64;

/// Executable copy of the displaced prologue followed by a jump back into the
/// original function.
#[derive(Debug)]
pub struct Trampoline {
    base: Address,
    map_len: usize,
    displaced: [u8; PATCH_WIDTH],
}

impl Trampoline {
    /// Allocates a trampoline within rel32 reach of `target` and fills it
    /// with `displaced` plus `jmp target+PATCH_WIDTH`.
    pub fn allocate_near(target: Address, displaced: [u8; PATCH_WIDTH]) -> Result<Self, HookError> {
        let page = page_size();
        let resume = target
            .checked_add(PATCH_WIDTH as u64)
            .ok_or_else(|| HookError::InvalidArgument(format!("target {} overflows", target)))?;

        let map = MemoryMapping::current()?;
        for candidate in candidates(&map, target, page) {
            let Some(base) = map_fixed(candidate, page) else {
                continue;
            };

            let back = match (base + TRAMPOLINE_LEN as u64).rel32_to(resume) {
                Some(rel) => rel,
                None => {
                    unmap(base, page);
                    continue;
                }
            };

            let mut code = [0u8; TRAMPOLINE_LEN];
            code[..PATCH_WIDTH].copy_from_slice(&displaced);
            code[PATCH_WIDTH] = JMP_REL32_OPCODE;
            code[PATCH_WIDTH + 1..].copy_from_slice(&back.to_le_bytes());

            let trampoline = Self {
                base,
                map_len: page,
                displaced,
            };
            unsafe {
                ptr::copy_nonoverlapping(code.as_ptr(), base.as_mut_ptr(), code.len());
            }
            trampoline.seal()?;

            debug!(
                "trampoline for {} at {} (distance {:+})",
                target,
                base,
                target.distance_to(base)
            );
            return Ok(trampoline);
        }

        Err(HookError::OutOfMemory(format!(
            "no free page within rel32 reach of {}",
            target
        )))
    }

    fn seal(&self) -> Result<(), MemoryError> {
        let rc = unsafe {
            libc::mprotect(
                self.base.as_mut_ptr() as *mut libc::c_void,
                self.map_len,
                Protection::ReadExecute.to_prot(),
            )
        };
        if rc != 0 {
            return Err(MemoryError::last_os("sealing trampoline"));
        }
        Ok(())
    }

    pub fn entry(&self) -> Address {
        self.base
    }

    pub fn len(&self) -> usize {
        TRAMPOLINE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The original bytes that the patch replaced.
    pub fn displaced(&self) -> &[u8; PATCH_WIDTH] {
        &self.displaced
    }

    /// Gives up ownership of the mapping without unmapping it.
    pub fn leak(self) {
        std::mem::forget(self);
    }
}

impl Drop for Trampoline {
    fn drop(&mut self) {
        unmap(self.base, self.map_len);
    }
}

/// Page-aligned addresses inside free gaps, nearest to `target` first.
fn candidates(map: &MemoryMapping, target: Address, page: usize) -> Vec<Address> {
    let reach = i32::MAX as u64 - 2 * page as u64;
    let low = Address::new(target.as_u64().saturating_sub(reach)).align_up(page);
    let high = Address::new(target.as_u64().saturating_add(reach)).align_down(page);
    let window = match MemoryRange::new(low, high) {
        Ok(window) => window,
        Err(_) => return Vec::new(),
    };

    let mut found: Vec<Address> = map
        .free_gaps()
        .iter()
        .filter_map(|gap| gap.intersection(&window))
        .filter_map(|gap| {
            let start = gap.start().align_up(page);
            let end = gap.end().align_down(page);
            if end.as_u64() < start.as_u64() + page as u64 {
                return None;
            }
            if end <= target {
                Some(end - page as u64)
            } else {
                Some(start)
            }
        })
        .collect();

    found.sort_by_key(|addr| target.distance_to(*addr).unsigned_abs());
    found.truncate(MAX_CANDIDATES);
    trace!("{} trampoline candidates near {}", found.len(), target);
    found
}

fn map_fixed(hint: Address, len: usize) -> Option<Address> {
    let base = unsafe {
        libc::mmap(
            hint.as_mut_ptr() as *mut libc::c_void,
            len,
            Protection::ReadWrite.to_prot(),
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED_NOREPLACE,
            -1,
            0,
        )
    };
    if base == libc::MAP_FAILED {
        return None;
    }
    let base = Address::from_ptr(base as *const u8);
    // kernels without MAP_FIXED_NOREPLACE treat the address as a hint
    if base != hint {
        unmap(base, len);
        return None;
    }
    Some(base)
}

fn unmap(base: Address, len: usize) {
    unsafe {
        libc::munmap(base.as_mut_ptr() as *mut libc::c_void, len);
    }
}
