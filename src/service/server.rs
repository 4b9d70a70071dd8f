// Mon Oct 19 2026 - Alex

use crate::config::Config;
use crate::memory::{Address, DevMemMapper, PhysicalMapper, ProcessMemory, VirtualMemory};
use crate::service::wire::{self, FrameHeader};
use crate::service::{
    Caller, MemoryRequest, Operation, PrivilegePolicy, Reply, ServiceError, MAX_PAYLOAD,
};
use bytes::Bytes;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Validates and executes memory requests. Dispatches are serialized.
pub struct MemoryService {
    memory: Arc<dyn VirtualMemory>,
    mapper: Arc<dyn PhysicalMapper>,
    policy: Box<dyn PrivilegePolicy>,
    dispatch: Mutex<()>,
}

impl MemoryService {
    pub fn new(
        memory: Arc<dyn VirtualMemory>,
        mapper: Arc<dyn PhysicalMapper>,
        policy: Box<dyn PrivilegePolicy>,
    ) -> Self {
        Self {
            memory,
            mapper,
            policy,
            dispatch: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let memory = match config.target_pid {
            Some(pid) => ProcessMemory::attach(pid),
            None => ProcessMemory::current(),
        };
        let mut mapper = DevMemMapper::new(&config.physical_device);
        if let Some(limit) = config.physical_limit {
            mapper = mapper.with_limit(limit);
        }
        let policy = config.privilege.policy();

        info!(
            "memory service for pid {} (physical {}, policy {})",
            memory.pid(),
            mapper.path().display(),
            policy.name()
        );
        Self::new(Arc::new(memory), Arc::new(mapper), policy)
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Runs one request. Read results land in `request.payload` and in the
    /// reply data.
    pub fn handle(&self, caller: &Caller, request: &mut MemoryRequest) -> Reply {
        let _dispatch = self.dispatch.lock();
        match self.dispatch(caller, request) {
            Ok(data) => {
                debug!(
                    "{} {} bytes at 0x{:x} for pid {}",
                    request.op, request.length, request.address, caller.pid
                );
                Reply::ok(data)
            }
            Err(e) => {
                warn!("{:?} from pid {} rejected: {}", request, caller.pid, e);
                Reply::error(e.kind())
            }
        }
    }

    fn dispatch(&self, caller: &Caller, request: &mut MemoryRequest) -> Result<Vec<u8>, ServiceError> {
        if !self.policy.is_privileged(caller) {
            return Err(ServiceError::PermissionDenied { pid: caller.pid });
        }
        if request.length > MAX_PAYLOAD as u64 {
            return Err(ServiceError::PayloadTooLarge {
                length: request.length,
                max: MAX_PAYLOAD,
            });
        }

        let len = request.length as usize;
        let address = Address::new(request.address);
        let buffer = &mut request.payload[..len];

        match request.op {
            Operation::VirtualRead => {
                self.memory.read_into(address, buffer)?;
                Ok(buffer.to_vec())
            }
            Operation::VirtualWrite => {
                self.memory.write_bytes(address, buffer)?;
                Ok(Vec::new())
            }
            Operation::PhysicalRead => {
                let window = self
                    .mapper
                    .map(address, len, false)
                    .map_err(ServiceError::PhysicalMapping)?;
                buffer.copy_from_slice(window.as_slice());
                Ok(buffer.to_vec())
            }
            Operation::PhysicalWrite => {
                let mut window = self
                    .mapper
                    .map(address, len, true)
                    .map_err(ServiceError::PhysicalMapping)?;
                window.as_mut_slice()?.copy_from_slice(buffer);
                window.flush()?;
                Ok(Vec::new())
            }
        }
    }

    /// Decodes a request frame, runs it and encodes the reply. Frames that
    /// cannot be decoded get an `InvalidArgument` reply.
    pub fn handle_frame(&self, caller: &Caller, frame: &[u8]) -> Bytes {
        match wire::decode_request(frame) {
            Ok((header, mut request)) => {
                let reply = self.handle(caller, &mut request);
                wire::encode_reply(header.seq, header.endpoint, &reply)
            }
            Err(e) => {
                warn!("bad frame from pid {}: {}", caller.pid, e);
                let (seq, endpoint) = match FrameHeader::decode(frame) {
                    Ok(header) => (header.seq, header.endpoint),
                    Err(_) => (0, 0),
                };
                wire::encode_reply(seq, endpoint, &Reply::error(e.kind()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::MemoryError;
    use crate::service::{AllowAll, CapabilityPolicy};
    use std::fs;
    use std::path::PathBuf;

    struct BackingFile {
        path: PathBuf,
    }

    impl BackingFile {
        fn new(tag: &str, len: usize) -> Self {
            let path = std::env::temp_dir().join(format!("memhook-server-{}-{}", tag, std::process::id()));
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            fs::write(&path, data).unwrap();
            Self { path }
        }
    }

    impl Drop for BackingFile {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    struct DenyAll;

    impl PrivilegePolicy for DenyAll {
        fn name(&self) -> &str {
            "deny-all"
        }

        fn is_privileged(&self, _caller: &Caller) -> bool {
            false
        }
    }

    struct ExplodingMemory;

    impl crate::memory::MemoryReader for ExplodingMemory {
        fn read_into(&self, _addr: Address, _buf: &mut [u8]) -> Result<(), MemoryError> {
            panic!("memory touched")
        }
    }

    impl crate::memory::MemoryWriter for ExplodingMemory {
        fn write_bytes(&self, _addr: Address, _data: &[u8]) -> Result<(), MemoryError> {
            panic!("memory touched")
        }
    }

    fn service(policy: Box<dyn PrivilegePolicy>, backing: &BackingFile) -> MemoryService {
        MemoryService::new(
            Arc::new(ProcessMemory::current()),
            Arc::new(DevMemMapper::new(&backing.path)),
            policy,
        )
    }

    #[test]
    fn test_virtual_round_trip() {
        let backing = BackingFile::new("virtual", 4096);
        let service = service(Box::new(AllowAll), &backing);
        let caller = Caller::current();
        let mut buffer = [0u8; 16];
        let address = buffer.as_mut_ptr() as u64;

        let mut write = MemoryRequest::write_virtual(address, b"Hello Kernel!").unwrap();
        assert!(service.handle(&caller, &mut write).is_ok());

        let mut read = MemoryRequest::read_virtual(address, 13);
        let reply = service.handle(&caller, &mut read);
        assert!(reply.is_ok());
        assert_eq!(reply.data, b"Hello Kernel!");
        assert_eq!(read.data(), b"Hello Kernel!");
        assert_eq!(unsafe { std::ptr::read_volatile(&buffer) }[..13], *b"Hello Kernel!");
    }

    #[test]
    fn test_oversize_leaves_memory_untouched() {
        let backing = BackingFile::new("oversize", 4096);
        let service = service(Box::new(AllowAll), &backing);
        let target = [0x5Au8; 8];
        let mut request = MemoryRequest::write_virtual(target.as_ptr() as u64, &[0u8; 8]).unwrap();
        request.length = MAX_PAYLOAD as u64 + 1;

        let reply = service.handle(&Caller::current(), &mut request);
        assert_eq!(reply.kind(), Some(ErrorKind::PayloadTooLarge));
        assert_eq!(unsafe { std::ptr::read_volatile(&target) }, [0x5A; 8]);
    }

    #[test]
    fn test_privilege_checked_before_anything() {
        let service = MemoryService::new(
            Arc::new(ExplodingMemory),
            Arc::new(DevMemMapper::new("/nonexistent/memhook")),
            Box::new(DenyAll),
        );
        let caller = Caller::current();
        for op in [
            Operation::VirtualRead,
            Operation::VirtualWrite,
            Operation::PhysicalRead,
            Operation::PhysicalWrite,
        ] {
            for length in [4, MAX_PAYLOAD as u64 + 1] {
                let mut request = MemoryRequest::new(op, 0x1000, length);
                let reply = service.handle(&caller, &mut request);
                assert_eq!(reply.kind(), Some(ErrorKind::PermissionDenied));
            }
        }
    }

    #[test]
    fn test_anonymous_caller_denied_by_capability_policy() {
        let backing = BackingFile::new("anon", 4096);
        let service = service(Box::new(CapabilityPolicy::new()), &backing);
        let mut request = MemoryRequest::read_virtual(0x1000, 4);
        let reply = service.handle(&Caller::anonymous(), &mut request);
        assert_eq!(reply.status, ErrorKind::PermissionDenied.code());
    }

    #[test]
    fn test_bad_virtual_address_faults() {
        let backing = BackingFile::new("fault", 4096);
        let service = service(Box::new(AllowAll), &backing);
        let mut request = MemoryRequest::read_virtual(0x8, 16);
        let reply = service.handle(&Caller::current(), &mut request);
        assert_eq!(reply.kind(), Some(ErrorKind::Fault));
        assert!(reply.data.is_empty());
    }

    #[test]
    fn test_physical_read_and_write() {
        let backing = BackingFile::new("physical", 8192);
        let service = service(Box::new(AllowAll), &backing);
        let caller = Caller::current();

        let mut read = MemoryRequest::read_physical(5000, 4);
        let reply = service.handle(&caller, &mut read);
        assert!(reply.is_ok());
        let expected: Vec<u8> = (5000..5004).map(|i| (i % 251) as u8).collect();
        assert_eq!(reply.data, expected);

        let mut write = MemoryRequest::write_physical(4094, b"edge").unwrap();
        assert!(service.handle(&caller, &mut write).is_ok());
        let contents = fs::read(&backing.path).unwrap();
        assert_eq!(&contents[4094..4098], b"edge");
    }

    #[test]
    fn test_physical_out_of_range_is_out_of_memory() {
        let backing = BackingFile::new("range", 4096);
        let service = service(Box::new(AllowAll), &backing);
        let mut request = MemoryRequest::read_physical(1 << 40, 16);
        let reply = service.handle(&Caller::current(), &mut request);
        assert_eq!(reply.kind(), Some(ErrorKind::OutOfMemory));
    }

    #[test]
    fn test_frame_handling() {
        let backing = BackingFile::new("frame", 4096);
        let service = service(Box::new(AllowAll), &backing);
        let value = 0xDEAD_BEEFu32;
        let request = MemoryRequest::read_virtual(&value as *const u32 as u64, 4);

        let reply = service.handle_frame(&Caller::current(), &wire::encode_request(11, 5, &request));
        let (header, reply) = wire::decode_reply(&reply).unwrap();
        assert_eq!(header.seq, 11);
        assert_eq!(header.endpoint, 5);
        assert_eq!(reply.data, value.to_ne_bytes());

        let reply = service.handle_frame(&Caller::current(), b"junk");
        let (_, reply) = wire::decode_reply(&reply).unwrap();
        assert_eq!(reply.kind(), Some(ErrorKind::InvalidArgument));
    }
}
