// Mon Oct 19 2026 - Alex

#[cfg(not(target_os = "linux"))]
compile_error!("memhook only supports Linux");

pub mod config;
pub mod error;
#[cfg(target_arch = "x86_64")]
pub mod hook;
pub mod memory;
pub mod service;
pub mod symbol;
pub mod ui;

pub use config::Config;
pub use error::ErrorKind;
#[cfg(target_arch = "x86_64")]
pub use hook::{HookDescriptor, HookEngine, HookError, HookRegistry};
pub use memory::{Address, MemoryError, ProtectionToggle};
pub use service::{MemoryRequest, MemoryService, Operation, Reply, ServiceClient, ServiceError, ServiceHandle};
pub use symbol::{SymbolError, SymbolResolver};
