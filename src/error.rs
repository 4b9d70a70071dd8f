// Mon Oct 19 2026 - Alex

use std::fmt;

/// Failure classes shared by every subsystem. The numeric codes are the
/// negated errno values that travel in a reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    PayloadTooLarge,
    PermissionDenied,
    OutOfMemory,
    Fault,
    NotFound,
    InvalidState,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::InvalidArgument,
        ErrorKind::PayloadTooLarge,
        ErrorKind::PermissionDenied,
        ErrorKind::OutOfMemory,
        ErrorKind::Fault,
        ErrorKind::NotFound,
        ErrorKind::InvalidState,
    ];

    pub fn code(self) -> i32 {
        match self {
            Self::InvalidArgument => -libc::EINVAL,
            Self::PayloadTooLarge => -libc::EMSGSIZE,
            Self::PermissionDenied => -libc::EPERM,
            Self::OutOfMemory => -libc::ENOMEM,
            Self::Fault => -libc::EFAULT,
            Self::NotFound => -libc::ENOENT,
            Self::InvalidState => -libc::EALREADY,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::PayloadTooLarge => "payload too large",
            Self::PermissionDenied => "permission denied",
            Self::OutOfMemory => "out of memory",
            Self::Fault => "fault",
            Self::NotFound => "not found",
            Self::InvalidState => "invalid state",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
