// Mon Oct 19 2026 - Alex

pub mod cache;
pub mod error;
pub mod image;
pub mod resolver;

pub use cache::SymbolCache;
pub use error::SymbolError;
pub use image::ImageSymbols;
pub use resolver::{DynamicSymbols, SymbolResolver, SymbolSource};
