// Mon Oct 19 2026 - Alex

use crate::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Symbol not found: {0}")]
    NotFound(String),
    #[error("Invalid symbol name: {0:?}")]
    InvalidName(String),
    #[error("Invalid image {path}: {reason}")]
    InvalidImage { path: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SymbolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Io(_) => ErrorKind::NotFound,
            Self::InvalidName(_) | Self::InvalidImage { .. } => ErrorKind::InvalidArgument,
        }
    }
}
