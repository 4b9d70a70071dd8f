// Mon Oct 19 2026 - Alex

//! Inline function hooks for x86-64.
//!
//! A hook overwrites the first [`PATCH_WIDTH`] bytes of a function with a
//! `jmp rel32` to the replacement. The overwritten bytes are moved into a
//! trampoline that ends with a jump back to the rest of the original, so the
//! replacement can still call through.

pub mod engine;
pub mod error;
pub mod prologue;
pub mod registry;
pub mod trampoline;

pub use engine::{HookDescriptor, HookEngine};
pub use error::HookError;
pub use registry::HookRegistry;
pub use trampoline::Trampoline;

pub const JMP_REL32_OPCODE: u8 = 0xE9;
pub const JMP_REL32_LEN: usize = 5;
pub const PATCH_WIDTH: usize = JMP_REL32_LEN;
pub const TRAMPOLINE_LEN: usize = PATCH_WIDTH + JMP_REL32_LEN;

pub fn jmp_rel32(rel: i32) -> [u8; JMP_REL32_LEN] {
    let mut code = [0u8; JMP_REL32_LEN];
    code[0] = JMP_REL32_OPCODE;
    code[1..].copy_from_slice(&rel.to_le_bytes());
    code
}
