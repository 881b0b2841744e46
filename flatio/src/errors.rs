// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for BlockDevice operations.
pub type BlockIOResult<T = ()> = core::result::Result<T, BlockIOError>;

/// Error type for BlockDevice operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIOError {
    Other(&'static str),
    /// Block index beyond the device.
    OutOfBounds,
    Unsupported,
    /// Malformed request (buffer length, image geometry...).
    Invalid(&'static str),
    /// Device was closed.
    Closed,
    /// Host I/O failure.
    #[cfg(feature = "std")]
    Io(std::io::ErrorKind),
}

impl BlockIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockIOError::Other(msg) => msg,
            BlockIOError::OutOfBounds => "Out of bounds",
            BlockIOError::Unsupported => "Unsupported operation",
            BlockIOError::Invalid(msg) => msg,
            BlockIOError::Closed => "Device closed",
            #[cfg(feature = "std")]
            BlockIOError::Io(_) => "Host I/O error",
        }
    }
}

impl From<&'static str> for BlockIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        BlockIOError::Other(msg)
    }
}

impl fmt::Display for BlockIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        #[cfg(feature = "std")]
        if let BlockIOError::Io(kind) = self {
            write!(f, " ({kind})")?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for BlockIOError {
    #[cold]
    #[inline(never)]
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => BlockIOError::OutOfBounds,
            kind => BlockIOError::Io(kind),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BlockIOError {}
