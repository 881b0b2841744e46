// SPDX-License-Identifier: MIT

use crate::{BLOCK_SIZE, Block, BlockDevice, BlockIOError, BlockIOResult, check_index};

/// In-memory implementation of `BlockDevice`.
///
/// Useful for tests, RAM-backed volumes, virtual disks.
/// Trailing bytes that do not fill a whole block are not addressable.
#[derive(Debug)]
pub struct MemBlockDevice<'a> {
    buffer: &'a mut [u8],
    block_count: u64,
    closed: bool,
}

impl<'a> MemBlockDevice<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let block_count = (buffer.len() / BLOCK_SIZE) as u64;
        Self {
            buffer,
            block_count,
            closed: false,
        }
    }

    /// Raw view of the backing buffer.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer
    }

    #[inline]
    fn check(&self, index: u64) -> BlockIOResult<usize> {
        if self.closed {
            return Err(BlockIOError::Closed);
        }
        check_index(index, self.block_count)?;
        Ok(index as usize * BLOCK_SIZE)
    }
}

impl<'a> BlockDevice for MemBlockDevice<'a> {
    #[inline]
    fn block_count(&self) -> u64 {
        self.block_count
    }

    #[inline(always)]
    fn read_block(&mut self, index: u64, buf: &mut Block) -> BlockIOResult {
        let off = self.check(index)?;
        buf.copy_from_slice(&self.buffer[off..off + BLOCK_SIZE]);
        Ok(())
    }

    #[inline(always)]
    fn write_block(&mut self, index: u64, buf: &Block) -> BlockIOResult {
        let off = self.check(index)?;
        self.buffer[off..off + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        if self.closed {
            return Err(BlockIOError::Closed);
        }
        Ok(())
    }

    #[inline]
    fn close(&mut self) -> BlockIOResult {
        self.closed = true;
        Ok(())
    }
}
