// Mon Oct 19 2026 - Alex

use crate::error::ErrorKind;
use crate::memory::MemoryError;
use crate::symbol::SymbolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unsafe prologue at 0x{address:x}: {reason}")]
    UnsafePrologue { address: u64, reason: String },
    #[error("Out of memory: {0}")]
    OutOfMemory(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
    #[error("Symbol error: {0}")]
    Symbol(#[from] SymbolError),
}

impl HookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::UnsafePrologue { .. } => ErrorKind::InvalidArgument,
            Self::OutOfMemory(_) => ErrorKind::OutOfMemory,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Memory(e) => e.kind(),
            Self::Symbol(e) => e.kind(),
        }
    }
}
