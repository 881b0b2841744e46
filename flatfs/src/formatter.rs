// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec;

use flatio::prelude::*;

use crate::{
    constant::*, directory::Directory, ensure, errors::*, fat::AllocationTable, meta::VolumeMeta,
};

/// Prepares an empty filesystem on a device.
///
/// The formatter must perform a *full format* if `full_format` is `true`,
/// or a quick format otherwise.
pub trait FsFormatter {
    #[must_use = "format result must be checked for errors"]
    fn format(&mut self, full_format: bool) -> FsFormatterResult;
}

/// Formatter for flat volumes:
/// - superblock describing `meta`
/// - allocation table with only the reserved entry in use
/// - empty directory
///
/// A full format also zeroes the data region.
pub struct Formatter<'a, D: BlockDevice + ?Sized> {
    dev: &'a mut D,
    meta: &'a VolumeMeta,
}

impl<'a, D: BlockDevice + ?Sized> Formatter<'a, D> {
    pub fn new(dev: &'a mut D, meta: &'a VolumeMeta) -> Self {
        Self { dev, meta }
    }

    fn write_superblock(&mut self) -> FsFormatterResult {
        self.dev
            .write_struct(FLAT_SUPERBLOCK_INDEX, &self.meta.to_superblock())?;
        Ok(())
    }

    fn write_fat_region(&mut self) -> FsFormatterResult {
        let mut buf = vec![0u8; self.meta.fat_blocks as usize * BLOCK_SIZE];
        AllocationTable::new(self.meta.data_blocks).write_bytes(&mut buf);
        self.dev.write_blocks(self.meta.fat_block_index(0), &buf)?;
        Ok(())
    }

    fn write_directory(&mut self) -> FsFormatterResult {
        let mut block = [0u8; BLOCK_SIZE];
        Directory::new().write_block(&mut block);
        self.dev.write_block(self.meta.dir_index as u64, &block)?;
        Ok(())
    }
}

impl<'a, D: BlockDevice + ?Sized> FsFormatter for Formatter<'a, D> {
    fn format(&mut self, full_format: bool) -> FsFormatterResult {
        ensure!(
            self.dev.block_count() == self.meta.total_blocks as u64,
            FsFormatterError::Invalid("device size does not match the volume geometry")
        );

        self.write_superblock()?;
        self.write_fat_region()?;
        self.write_directory()?;
        if full_format {
            self.dev
                .zero_blocks(self.meta.data_start as u64, self.meta.data_blocks as u64)?;
        }
        self.dev.flush()?;

        log::debug!(
            "formatted {} blocks ({} data, {} table)",
            self.meta.total_blocks,
            self.meta.data_blocks,
            self.meta.fat_blocks
        );
        Ok(())
    }
}
