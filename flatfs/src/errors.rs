// SPDX-License-Identifier: MIT

use core::fmt;

pub use flatio::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAllocatorError {
    /// No free data block left.
    OutOfBlocks,
    /// Data-relative index outside the allocation table.
    InvalidBlock(u16),
    /// A chain runs into a free entry.
    BrokenChain(u16),
    LoopDetected,
    /// `extend` called on a block that does not end its chain.
    NotChainTail(u16),
    Other(&'static str),
}

impl FsAllocatorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsAllocatorError::OutOfBlocks => "Out of blocks",
            FsAllocatorError::InvalidBlock(_) => "Invalid block in allocation chain",
            FsAllocatorError::BrokenChain(_) => "Allocation chain runs into a free block",
            FsAllocatorError::LoopDetected => "Loop detected in allocation chain",
            FsAllocatorError::NotChainTail(_) => "Block is not the tail of its chain",
            FsAllocatorError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsAllocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            FsAllocatorError::InvalidBlock(b)
            | FsAllocatorError::BrokenChain(b)
            | FsAllocatorError::NotChainTail(b) => write!(f, " (block: {b})"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFormatterError {
    IO(BlockIOError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsFormatterError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsFormatterError::IO(_) => "IO error",
            FsFormatterError::Invalid(msg) => msg,
            FsFormatterError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsFormatterError::IO(e) => Some(FsError::Device(*e)),
            _ => None,
        }
    }
}

impl fmt::Display for FsFormatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsCheckerError {
    IO(BlockIOError),
    Allocator(FsAllocatorError),
    Invalid(&'static str),
    Other(&'static str),
}

impl FsCheckerError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsCheckerError::IO(_) => "IO error",
            FsCheckerError::Allocator(_) => "Allocator error",
            FsCheckerError::Invalid(msg) => msg,
            FsCheckerError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsCheckerError::IO(e) => Some(FsError::Device(*e)),
            FsCheckerError::Allocator(e) => Some(FsError::from(*e)),
            _ => None,
        }
    }
}

impl fmt::Display for FsCheckerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

/// Top-level error.
///
/// One variant per failure class a volume operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// The block device failed an open/read/write/close.
    Device(BlockIOError),
    /// Superblock or on-disk structure is not a valid volume.
    Format(&'static str),
    /// Malformed name, buffer, length or handle.
    InvalidArgument(&'static str),
    /// Unknown file name or closed handle.
    NotFound(&'static str),
    /// Directory, open file table or data region is full.
    ResourceExhausted(&'static str),
    /// Operation not allowed in the current volume state.
    State(&'static str),
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::Device(e) => e.msg(),
            FsError::Format(msg)
            | FsError::InvalidArgument(msg)
            | FsError::NotFound(msg)
            | FsError::ResourceExhausted(msg)
            | FsError::State(msg) => msg,
        }
    }

    /// Short class label, stable across messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FsError::Device(_) => "device error",
            FsError::Format(_) => "format error",
            FsError::InvalidArgument(_) => "invalid argument",
            FsError::NotFound(_) => "not found",
            FsError::ResourceExhausted(_) => "resource exhausted",
            FsError::State(_) => "state error",
        }
    }

    pub fn source(&self) -> Option<FsError> {
        None
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::Device(e) => write!(f, "{}: {e}", self.kind()),
            _ => write!(f, "{}: {}", self.kind(), self.msg()),
        }
    }
}

impl From<FsAllocatorError> for FsError {
    #[inline]
    fn from(e: FsAllocatorError) -> Self {
        match e {
            FsAllocatorError::OutOfBlocks => FsError::ResourceExhausted("no free data block"),
            other => FsError::Format(other.msg()),
        }
    }
}

impl From<FsFormatterError> for FsError {
    #[inline]
    fn from(e: FsFormatterError) -> Self {
        match e {
            FsFormatterError::IO(io) => FsError::Device(io),
            FsFormatterError::Invalid(msg) => FsError::InvalidArgument(msg),
            FsFormatterError::Other(msg) => FsError::Format(msg),
        }
    }
}

impl From<FsCheckerError> for FsError {
    #[inline]
    fn from(e: FsCheckerError) -> Self {
        match e {
            FsCheckerError::IO(io) => FsError::Device(io),
            FsCheckerError::Allocator(a) => a.into(),
            FsCheckerError::Invalid(msg) | FsCheckerError::Other(msg) => FsError::Format(msg),
        }
    }
}

// === type Fs*Result ===

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsAllocatorResult<T = ()> = Result<T, FsAllocatorError>;
pub type FsFormatterResult<T = ()> = Result<T, FsFormatterError>;
pub type FsCheckerResult<T = ()> = Result<T, FsCheckerError>;

crate::fs_error_wiring! {
    str_into => [
        FsAllocatorError,
        FsFormatterError,
        FsCheckerError,
    ],
    sub => {
        BlockIOError     => [ FsFormatterError::IO, FsCheckerError::IO, FsError::Device ],
        FsAllocatorError => [ FsCheckerError::Allocator ],
    },
    std_error => [
        FsError,
        FsAllocatorError,
        FsFormatterError,
        FsCheckerError,
    ],
}
