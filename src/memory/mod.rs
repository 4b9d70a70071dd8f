// Mon Oct 19 2026 - Alex

pub mod address;
pub mod error;
pub mod mapping;
pub mod physical;
pub mod process;
pub mod protection;
pub mod range;
pub mod region;
pub mod toggle;
pub mod traits;

pub use address::Address;
pub use error::MemoryError;
pub use mapping::MemoryMapping;
pub use physical::{DevMemMapper, PhysicalMapper, PhysicalWindow};
pub use process::ProcessMemory;
pub use protection::Protection;
pub use range::MemoryRange;
pub use region::MemoryRegion;
pub use toggle::{ProtectionToggle, WritableCode};
pub use traits::{MemoryReader, MemoryWriter, VirtualMemory};

pub fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        size if size > 0 => size as usize,
        _ => 4096,
    }
}
