// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryWriter};
use libc::{c_void, iovec, pid_t};
use std::io;

/// Boundary-checked access to the virtual memory of one process.
///
/// Copies go through `process_vm_readv`/`process_vm_writev`, so an address
/// that is unmapped or lacks the needed permission in the target comes back
/// as [`MemoryError::Fault`] instead of being dereferenced.
#[derive(Debug, Clone, Copy)]
pub struct ProcessMemory {
    pid: pid_t,
}

impl ProcessMemory {
    pub fn attach(pid: pid_t) -> Self {
        Self { pid }
    }

    pub fn current() -> Self {
        Self::attach(std::process::id() as pid_t)
    }

    pub fn pid(&self) -> pid_t {
        self.pid
    }

    fn transfer_error(&self, addr: Address, len: usize, err: io::Error) -> MemoryError {
        match err.raw_os_error() {
            Some(libc::EPERM) => MemoryError::PermissionDenied(format!(
                "no access to the address space of pid {}",
                self.pid
            )),
            Some(libc::ENOMEM) => MemoryError::ResourceExhausted(err.to_string()),
            _ => MemoryError::Fault {
                address: addr.as_u64(),
                len,
            },
        }
    }
}

impl MemoryReader for ProcessMemory {
    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        if buf.is_empty() {
            return Ok(());
        }
        let local = iovec {
            iov_base: buf.as_mut_ptr() as *mut c_void,
            iov_len: buf.len(),
        };
        let remote = iovec {
            iov_base: addr.as_mut_ptr() as *mut c_void,
            iov_len: buf.len(),
        };
        let copied = unsafe { libc::process_vm_readv(self.pid, &local, 1, &remote, 1, 0) };
        if copied < 0 {
            return Err(self.transfer_error(addr, buf.len(), io::Error::last_os_error()));
        }
        if copied as usize != buf.len() {
            return Err(MemoryError::Fault {
                address: addr.as_u64(),
                len: buf.len(),
            });
        }
        Ok(())
    }
}

impl MemoryWriter for ProcessMemory {
    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        if data.is_empty() {
            return Ok(());
        }
        let local = iovec {
            iov_base: data.as_ptr() as *mut c_void,
            iov_len: data.len(),
        };
        let remote = iovec {
            iov_base: addr.as_mut_ptr() as *mut c_void,
            iov_len: data.len(),
        };
        let copied = unsafe { libc::process_vm_writev(self.pid, &local, 1, &remote, 1, 0) };
        if copied < 0 {
            return Err(self.transfer_error(addr, data.len(), io::Error::last_os_error()));
        }
        if copied as usize != data.len() {
            // partial writes leave the first `copied` bytes modified
            return Err(MemoryError::Fault {
                address: addr.as_u64(),
                len: data.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_own_process() {
        let mut target = vec![0u8; 13];
        let memory = ProcessMemory::current();
        let addr = Address::from_ptr(target.as_mut_ptr() as *const u8);

        memory.write_bytes(addr, b"Hello Kernel!").unwrap();
        assert_eq!(memory.read_bytes(addr, 13).unwrap(), b"Hello Kernel!");
        assert_eq!(&target[..], b"Hello Kernel!");
    }

    #[test]
    fn test_unmapped_address_faults() {
        let memory = ProcessMemory::current();
        let err = memory.read_bytes(Address::new(0x1000), 16).unwrap_err();
        assert!(matches!(err, MemoryError::Fault { address: 0x1000, len: 16 }));

        let err = memory.write_bytes(Address::new(0x8), b"x").unwrap_err();
        assert!(matches!(err, MemoryError::Fault { .. }));
    }

    #[test]
    fn test_empty_transfer_is_noop() {
        let memory = ProcessMemory::current();
        assert!(memory.read_bytes(Address::new(0x1000), 0).unwrap().is_empty());
        assert!(memory.write_bytes(Address::new(0x1000), &[]).is_ok());
    }
}
