// SPDX-License-Identifier: MIT

//! Byte-range read/write engine.
//!
//! Maps a cursor and a caller buffer onto block-granular device transfers.
//! Whole blocks move straight between the caller buffer and the device;
//! partial blocks go through one block-sized scratch buffer.

use flatio::prelude::*;

use crate::{
    ensure,
    errors::*,
    handles::FileHandle,
    volume::MountedVolume,
};

/// Handle errors surface as `InvalidArgument` on the data path.
#[inline]
fn data_path_handle(e: FsError) -> FsError {
    match e {
        FsError::NotFound(_) | FsError::InvalidArgument(_) => {
            FsError::InvalidArgument("invalid file handle")
        }
        other => other,
    }
}

const SHORT_CHAIN: FsError = FsError::Format("allocation chain shorter than file size");

impl<D: BlockDevice> MountedVolume<D> {
    pub(crate) fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> FsResult<usize> {
        let MountedVolume {
            dev,
            meta,
            fat,
            dir,
            files,
        } = self;

        let file = files.get_mut(handle).map_err(data_path_handle)?;
        ensure!(!buf.is_empty(), FsError::InvalidArgument("empty buffer"));
        let entry = dir.lookup(&file.name)?;

        let cursor = file.cursor;
        let Some(first) = entry.first_block else {
            return Ok(0);
        };
        if cursor >= entry.size {
            return Ok(0);
        }
        let want = buf.len().min((entry.size - cursor) as usize);

        let seek = fat.chain_block_for_offset(first, cursor)?;
        ensure!(!seek.is_short(cursor), SHORT_CHAIN);

        let mut scratch: Block = [0u8; BLOCK_SIZE];
        let mut block = seek.block;
        let mut pos = cursor as usize;
        let mut done = 0usize;

        loop {
            let off = pos % BLOCK_SIZE;
            let n = (BLOCK_SIZE - off).min(want - done);
            let index = meta.data_block_index(block);
            let dst = &mut buf[done..done + n];

            match dst.first_chunk_mut::<BLOCK_SIZE>() {
                Some(whole) => dev.read_block(index, whole)?,
                None => {
                    dev.read_block(index, &mut scratch)?;
                    dst.copy_from_slice(&scratch[off..off + n]);
                }
            }
            log::trace!("read {n} byte(s) from data block {block}");

            done += n;
            pos += n;
            if done == want {
                break;
            }
            block = fat.next(block)?.ok_or(SHORT_CHAIN)?;
        }

        file.cursor = pos as u32;
        Ok(done)
    }

    pub(crate) fn write(&mut self, handle: FileHandle, data: &[u8]) -> FsResult<usize> {
        let MountedVolume {
            dev,
            meta,
            fat,
            dir,
            files,
        } = self;

        let file = files.get_mut(handle).map_err(data_path_handle)?;
        ensure!(!data.is_empty(), FsError::InvalidArgument("empty buffer"));
        let entry = dir.lookup_mut(&file.name)?;

        let cursor = file.cursor;
        // A block allocated by this call holds stale bytes and is never read back
        let mut fresh = false;

        let first = match entry.first_block {
            Some(b) => b,
            None => match fat.allocate_first_fit() {
                Ok(b) => {
                    entry.first_block = Some(b);
                    fresh = true;
                    b
                }
                Err(FsAllocatorError::OutOfBlocks) => {
                    log::warn!("write to {:?}: no free data block", entry.name);
                    return Ok(0);
                }
                Err(e) => return Err(e.into()),
            },
        };

        let seek = fat.chain_block_for_offset(first, cursor)?;
        let mut block = seek.block;
        if seek.is_short(cursor) {
            // Only a cursor sitting on a block boundary at end of file may
            // step past the last block.
            let target = cursor / BLOCK_SIZE as u32;
            ensure!(
                seek.index + 1 == target && cursor == entry.size,
                SHORT_CHAIN
            );
            block = match fat.extend(block) {
                Ok(b) => b,
                Err(FsAllocatorError::OutOfBlocks) => {
                    log::warn!("write to {:?}: no free data block", entry.name);
                    return Ok(0);
                }
                Err(e) => return Err(e.into()),
            };
            fresh = true;
        }

        let mut scratch: Block = [0u8; BLOCK_SIZE];
        let mut pos = cursor as usize;
        let mut done = 0usize;

        loop {
            let off = pos % BLOCK_SIZE;
            let n = (BLOCK_SIZE - off).min(data.len() - done);
            let index = meta.data_block_index(block);
            let src = &data[done..done + n];

            match src.first_chunk::<BLOCK_SIZE>() {
                Some(whole) => dev.write_block(index, whole)?,
                None => {
                    if fresh {
                        scratch.fill(0);
                    } else {
                        dev.read_block(index, &mut scratch)?;
                    }
                    scratch[off..off + n].copy_from_slice(src);
                    dev.write_block(index, &scratch)?;
                }
            }
            log::trace!("wrote {n} byte(s) to data block {block}");

            done += n;
            pos += n;
            if done == data.len() {
                break;
            }

            match fat.next(block)? {
                Some(next) => {
                    block = next;
                    fresh = false;
                }
                None => match fat.extend(block) {
                    Ok(next) => {
                        block = next;
                        fresh = true;
                    }
                    Err(FsAllocatorError::OutOfBlocks) => {
                        log::warn!(
                            "short write to {:?}: {done} of {} byte(s), data region full",
                            entry.name,
                            data.len()
                        );
                        break;
                    }
                    Err(e) => return Err(e.into()),
                },
            }
        }

        entry.size = entry.size.max(pos as u32);
        file.cursor = pos as u32;
        Ok(done)
    }
}
