// Mon Oct 19 2026 - Alex

use crate::error::ErrorKind;
use crate::service::ServiceError;
use std::fmt;

/// Largest transfer a single request may carry.
pub const MAX_PAYLOAD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    VirtualRead = 0,
    VirtualWrite = 1,
    PhysicalRead = 2,
    PhysicalWrite = 3,
}

impl Operation {
    pub fn is_write(self) -> bool {
        matches!(self, Self::VirtualWrite | Self::PhysicalWrite)
    }

    pub fn is_physical(self) -> bool {
        matches!(self, Self::PhysicalRead | Self::PhysicalWrite)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::VirtualRead => "virtual-read",
            Self::VirtualWrite => "virtual-write",
            Self::PhysicalRead => "physical-read",
            Self::PhysicalWrite => "physical-write",
        }
    }
}

impl TryFrom<u32> for Operation {
    type Error = ServiceError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::VirtualRead),
            1 => Ok(Self::VirtualWrite),
            2 => Ok(Self::PhysicalRead),
            3 => Ok(Self::PhysicalWrite),
            other => Err(ServiceError::UnknownOperation(other)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct MemoryRequest {
    pub op: Operation,
    pub address: u64,
    pub length: u64,
    pub payload: [u8; MAX_PAYLOAD],
}

impl MemoryRequest {
    pub fn new(op: Operation, address: u64, length: u64) -> Self {
        Self {
            op,
            address,
            length,
            payload: [0u8; MAX_PAYLOAD],
        }
    }

    pub fn read_virtual(address: u64, length: usize) -> Self {
        Self::new(Operation::VirtualRead, address, length as u64)
    }

    pub fn read_physical(address: u64, length: usize) -> Self {
        Self::new(Operation::PhysicalRead, address, length as u64)
    }

    pub fn write_virtual(address: u64, data: &[u8]) -> Result<Self, ServiceError> {
        Self::with_data(Operation::VirtualWrite, address, data)
    }

    pub fn write_physical(address: u64, data: &[u8]) -> Result<Self, ServiceError> {
        Self::with_data(Operation::PhysicalWrite, address, data)
    }

    fn with_data(op: Operation, address: u64, data: &[u8]) -> Result<Self, ServiceError> {
        if data.len() > MAX_PAYLOAD {
            return Err(ServiceError::PayloadTooLarge {
                length: data.len() as u64,
                max: MAX_PAYLOAD,
            });
        }
        let mut request = Self::new(op, address, data.len() as u64);
        request.payload[..data.len()].copy_from_slice(data);
        Ok(request)
    }

    /// The meaningful prefix of the payload, clamped to its capacity.
    pub fn data(&self) -> &[u8] {
        let len = (self.length as usize).min(MAX_PAYLOAD);
        &self.payload[..len]
    }
}

impl fmt::Debug for MemoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRequest")
            .field("op", &self.op)
            .field("address", &format_args!("0x{:x}", self.address))
            .field("length", &self.length)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: i32,
    pub data: Vec<u8>,
}

impl Reply {
    pub fn ok(data: Vec<u8>) -> Self {
        Self { status: 0, data }
    }

    pub fn error(kind: ErrorKind) -> Self {
        Self {
            status: kind.code(),
            data: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    /// `None` for success or an unrecognised status.
    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_code(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_tags() {
        for (tag, op) in [
            (0, Operation::VirtualRead),
            (1, Operation::VirtualWrite),
            (2, Operation::PhysicalRead),
            (3, Operation::PhysicalWrite),
        ] {
            assert_eq!(Operation::try_from(tag).unwrap(), op);
            assert_eq!(op as u32, tag);
        }
        assert!(matches!(Operation::try_from(4), Err(ServiceError::UnknownOperation(4))));
        assert!(Operation::PhysicalWrite.is_write() && Operation::PhysicalWrite.is_physical());
        assert!(!Operation::VirtualRead.is_write());
    }

    #[test]
    fn test_write_request_copies_data() {
        let request = MemoryRequest::write_virtual(0x1000, b"Hello Kernel!").unwrap();
        assert_eq!(request.length, 13);
        assert_eq!(request.data(), b"Hello Kernel!");
        assert!(request.payload[13..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_oversize_write_rejected() {
        let err = MemoryRequest::write_physical(0, &[0u8; MAX_PAYLOAD + 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
    }

    #[test]
    fn test_data_is_clamped() {
        let request = MemoryRequest::read_virtual(0, 4096);
        assert_eq!(request.data().len(), MAX_PAYLOAD);
    }

    #[test]
    fn test_reply_kind() {
        assert!(Reply::ok(vec![1]).is_ok());
        assert_eq!(Reply::ok(Vec::new()).kind(), None);
        assert_eq!(Reply::error(ErrorKind::Fault).status, -14);
        assert_eq!(Reply::error(ErrorKind::Fault).kind(), Some(ErrorKind::Fault));
    }
}
