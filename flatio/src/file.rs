// SPDX-License-Identifier: MIT

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{BLOCK_SIZE, Block, BlockDevice, BlockIOError, BlockIOResult, check_index};

/// `BlockDevice` over any seekable byte stream (image file, cursor...).
///
/// The stream length must be a whole number of blocks.
#[derive(Debug)]
pub struct StdBlockDevice<T: Read + Write + Seek> {
    io: Option<T>,
    block_count: u64,
}

/// Disk image backed device.
pub type FileBlockDevice = StdBlockDevice<File>;

impl<T: Read + Write + Seek> StdBlockDevice<T> {
    /// Wraps `io`, measuring its length to derive the block count.
    pub fn new(mut io: T) -> BlockIOResult<Self> {
        let len = io.seek(SeekFrom::End(0))?;
        if !len.is_multiple_of(BLOCK_SIZE as u64) {
            return Err(BlockIOError::Invalid(
                "image size is not a multiple of the block size",
            ));
        }
        Ok(Self {
            io: Some(io),
            block_count: len / BLOCK_SIZE as u64,
        })
    }

    /// Gives back the underlying stream, if the device was not closed.
    pub fn into_inner(self) -> Option<T> {
        self.io
    }

    #[inline]
    fn seek_to(&mut self, index: u64) -> BlockIOResult<&mut T> {
        check_index(index, self.block_count)?;
        let io = self.io.as_mut().ok_or(BlockIOError::Closed)?;
        io.seek(SeekFrom::Start(index * BLOCK_SIZE as u64))?;
        Ok(io)
    }
}

impl StdBlockDevice<File> {
    /// Opens an existing disk image for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> BlockIOResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let dev = Self::new(file)?;
        log::debug!(
            "opened {} ({} blocks)",
            path.as_ref().display(),
            dev.block_count
        );
        Ok(dev)
    }

    /// Creates (or truncates) a zero-filled disk image of `block_count` blocks.
    pub fn create<P: AsRef<Path>>(path: P, block_count: u64) -> BlockIOResult<Self> {
        let len = block_count
            .checked_mul(BLOCK_SIZE as u64)
            .ok_or(BlockIOError::OutOfBounds)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len(len)?;
        log::debug!(
            "created {} ({} blocks)",
            path.as_ref().display(),
            block_count
        );
        Self::new(file)
    }
}

impl<T: Read + Write + Seek> BlockDevice for StdBlockDevice<T> {
    #[inline]
    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn read_block(&mut self, index: u64, buf: &mut Block) -> BlockIOResult {
        self.seek_to(index)?.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: u64, buf: &Block) -> BlockIOResult {
        self.seek_to(index)?.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        self.io.as_mut().ok_or(BlockIOError::Closed)?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> BlockIOResult {
        let mut io = self.io.take().ok_or(BlockIOError::Closed)?;
        io.flush()?;
        Ok(())
    }
}
