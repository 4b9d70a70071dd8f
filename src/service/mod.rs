// Mon Oct 19 2026 - Alex

//! Privileged memory access over a datagram channel.
//!
//! A controller sends one fixed-size request per message; the service checks
//! the sender's privilege, then the length, performs the read or write against
//! virtual or physical memory and answers the sending endpoint with a status.

pub mod client;
pub mod error;
pub mod handle;
pub mod privilege;
pub mod request;
pub mod server;
pub mod transport;
pub mod wire;

pub use client::ServiceClient;
pub use error::ServiceError;
pub use handle::ServiceHandle;
pub use privilege::{AllowAll, CapabilityPolicy, Caller, PrivilegeMode, PrivilegePolicy, CAP_SYS_ADMIN};
pub use request::{MemoryRequest, Operation, Reply, MAX_PAYLOAD};
pub use server::MemoryService;
pub use transport::{Endpoint, Envelope, Transport, UnixDatagramTransport};
