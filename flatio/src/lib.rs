// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod errors;
pub mod stats;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod file;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::BlockDevice;
    pub use super::BlockDeviceExt;
    pub use super::BlockDeviceStructExt;
    pub use super::errors::*;
    pub use super::stats::*;
    pub use super::{BLOCK_SIZE, Block};

    #[cfg(feature = "mem")]
    pub use super::mem::MemBlockDevice;

    #[cfg(feature = "std")]
    pub use super::file::{FileBlockDevice, StdBlockDevice};
}

pub use errors::*;

// Constants

/// Fixed size of one device block, in bytes.
///
/// Every transfer between the filesystem and the device moves exactly one
/// block (or a whole number of them through [`BlockDeviceExt`]).
pub const BLOCK_SIZE: usize = 4096;

/// One block worth of bytes. Also the shape of every scratch buffer.
pub type Block = [u8; BLOCK_SIZE];

// Traits

/// Block device abstraction trait.
///
/// Block-granular counterpart of a disk: indices are validated by the
/// implementation itself, out-of-range access fails with
/// [`BlockIOError::OutOfBounds`].
/// Implementations may target RAM, image files, real block devices, etc.
pub trait BlockDevice {
    /// Number of blocks exposed by the device.
    fn block_count(&self) -> u64;

    /// Reads block `index` into `buf`.
    fn read_block(&mut self, index: u64, buf: &mut Block) -> BlockIOResult;

    /// Writes `buf` to block `index`.
    fn write_block(&mut self, index: u64, buf: &Block) -> BlockIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> BlockIOResult;

    /// Releases the device. Further block access fails with [`BlockIOError::Closed`].
    ///
    /// The default implementation only flushes.
    fn close(&mut self) -> BlockIOResult {
        self.flush()
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    #[inline]
    fn block_count(&self) -> u64 {
        (**self).block_count()
    }

    #[inline]
    fn read_block(&mut self, index: u64, buf: &mut Block) -> BlockIOResult {
        (**self).read_block(index, buf)
    }

    #[inline]
    fn write_block(&mut self, index: u64, buf: &Block) -> BlockIOResult {
        (**self).write_block(index, buf)
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        (**self).flush()
    }

    #[inline]
    fn close(&mut self) -> BlockIOResult {
        (**self).close()
    }
}

/// Extension helpers for BlockDevice.
///
/// Provides multi-block transfers over a contiguous run of blocks:
/// - read/write of a byte buffer spanning several blocks
/// - zero fill of a block range
pub trait BlockDeviceExt: BlockDevice {
    /// Reads `buf.len() / BLOCK_SIZE` consecutive blocks starting at `start`.
    ///
    /// # Errors
    /// Returns `BlockIOError::Invalid` if `buf.len()` is not a multiple of [`BLOCK_SIZE`].
    fn read_blocks(&mut self, start: u64, buf: &mut [u8]) -> BlockIOResult {
        if !buf.len().is_multiple_of(BLOCK_SIZE) {
            return Err(BlockIOError::Invalid("read_blocks: buffer length mismatch"));
        }
        for (i, chunk) in buf.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            let block: &mut Block = chunk
                .try_into()
                .map_err(|_| BlockIOError::Invalid("read_blocks: chunk size"))?;
            self.read_block(start + i as u64, block)?;
        }
        Ok(())
    }

    /// Writes `buf` over `buf.len() / BLOCK_SIZE` consecutive blocks starting at `start`.
    ///
    /// # Errors
    /// Returns `BlockIOError::Invalid` if `buf.len()` is not a multiple of [`BLOCK_SIZE`].
    fn write_blocks(&mut self, start: u64, buf: &[u8]) -> BlockIOResult {
        if !buf.len().is_multiple_of(BLOCK_SIZE) {
            return Err(BlockIOError::Invalid(
                "write_blocks: buffer length mismatch",
            ));
        }
        for (i, chunk) in buf.chunks_exact(BLOCK_SIZE).enumerate() {
            let block: &Block = chunk
                .try_into()
                .map_err(|_| BlockIOError::Invalid("write_blocks: chunk size"))?;
            self.write_block(start + i as u64, block)?;
        }
        Ok(())
    }

    /// Fills `count` blocks starting at `start` with zeroes.
    fn zero_blocks(&mut self, start: u64, count: u64) -> BlockIOResult {
        const ZERO_BLOCK: Block = [0u8; BLOCK_SIZE];
        for index in start..start + count {
            self.write_block(index, &ZERO_BLOCK)?;
        }
        Ok(())
    }
}

impl<T: BlockDevice + ?Sized> BlockDeviceExt for T {}

/// Extension trait for reading and writing structs using zerocopy.
///
/// A struct always sits at the start of its block; the rest of the block is padding.
pub trait BlockDeviceStructExt: BlockDevice {
    /// Reads a struct of type `T` from the start of block `index`.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        index: u64,
    ) -> BlockIOResult<T> {
        assert!(
            core::mem::size_of::<T>() <= BLOCK_SIZE,
            "read_struct: type too large"
        );
        let mut buf = [0u8; BLOCK_SIZE];
        self.read_block(index, &mut buf)?;
        T::read_from_prefix(&buf)
            .map(|(val, _)| val)
            .map_err(|_| BlockIOError::Other("read_struct failed"))
    }

    /// Writes `val` at the start of block `index`, zero padding the remainder.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::Immutable>(
        &mut self,
        index: u64,
        val: &T,
    ) -> BlockIOResult {
        let bytes = val.as_bytes();
        if bytes.len() > BLOCK_SIZE {
            return Err(BlockIOError::Invalid("write_struct: type too large"));
        }
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        self.write_block(index, &buf)
    }
}

impl<T: BlockDevice + ?Sized> BlockDeviceStructExt for T {}

/// Bounds check shared by the backends.
#[inline]
pub(crate) fn check_index(index: u64, block_count: u64) -> BlockIOResult {
    if index >= block_count {
        return Err(BlockIOError::OutOfBounds);
    }
    Ok(())
}
