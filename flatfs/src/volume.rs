// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{vec, vec::Vec};

use core::fmt;

use flatio::prelude::*;

use crate::{
    checker::{CheckOptions, VerifyReport, check_volume},
    constant::*,
    directory::{DirListing, Directory},
    ensure,
    errors::*,
    fat::AllocationTable,
    handles::{FileHandle, OpenFileTable},
    meta::VolumeMeta,
    types::FlatSuperblock,
};

/// Usage report returned by [`Volume::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_blocks: u16,
    pub fat_blocks: u8,
    pub dir_index: u16,
    pub data_start: u16,
    pub data_blocks: u16,
    pub free_data_blocks: u16,
    pub free_dir_slots: u16,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FS Info:")?;
        writeln!(f, "total_blk_count={}", self.total_blocks)?;
        writeln!(f, "fat_blk_count={}", self.fat_blocks)?;
        writeln!(f, "rdir_blk={}", self.dir_index)?;
        writeln!(f, "data_blk={}", self.data_start)?;
        writeln!(f, "data_blk_count={}", self.data_blocks)?;
        writeln!(
            f,
            "fat_free_ratio={}/{}",
            self.free_data_blocks, self.data_blocks
        )?;
        write!(f, "rdir_free_ratio={}/{}", self.free_dir_slots, FLAT_MAX_FILES)
    }
}

/// Reads and validates superblock, allocation table and directory.
pub(crate) fn load_metadata<D: BlockDevice + ?Sized>(
    dev: &mut D,
) -> FsResult<(VolumeMeta, AllocationTable, Directory)> {
    let sb: FlatSuperblock = dev.read_struct(FLAT_SUPERBLOCK_INDEX)?;
    let meta = VolumeMeta::from_superblock(&sb, dev.block_count())?;

    let mut fat_bytes = vec![0u8; meta.fat_blocks as usize * BLOCK_SIZE];
    dev.read_blocks(meta.fat_block_index(0), &mut fat_bytes)?;
    let fat = AllocationTable::from_bytes(&fat_bytes, meta.data_blocks)?;

    let mut block = [0u8; BLOCK_SIZE];
    dev.read_block(meta.dir_index as u64, &mut block)?;
    let dir = Directory::from_block(&block)?;

    Ok((meta, fat, dir))
}

/// Everything held while a device is mounted.
#[derive(Debug)]
pub(crate) struct MountedVolume<D: BlockDevice> {
    pub(crate) dev: D,
    pub(crate) meta: VolumeMeta,
    pub(crate) fat: AllocationTable,
    pub(crate) dir: Directory,
    pub(crate) files: OpenFileTable,
}

impl<D: BlockDevice> MountedVolume<D> {
    fn load(mut dev: D) -> Result<Self, (FsError, D)> {
        match load_metadata(&mut dev) {
            Ok((meta, fat, dir)) => Ok(Self {
                dev,
                meta,
                fat,
                dir,
                files: OpenFileTable::new(),
            }),
            Err(e) => Err((e, dev)),
        }
    }

    /// Writes the allocation table and the directory back to the device.
    fn store_metadata(&mut self) -> FsResult {
        let mut fat_bytes = vec![0u8; self.meta.fat_blocks as usize * BLOCK_SIZE];
        self.fat.write_bytes(&mut fat_bytes);
        self.dev
            .write_blocks(self.meta.fat_block_index(0), &fat_bytes)?;

        let mut block = [0u8; BLOCK_SIZE];
        self.dir.write_block(&mut block);
        self.dev.write_block(self.meta.dir_index as u64, &block)?;
        self.dev.flush()?;
        Ok(())
    }

    pub(crate) fn info(&self) -> VolumeInfo {
        VolumeInfo {
            total_blocks: self.meta.total_blocks,
            fat_blocks: self.meta.fat_blocks,
            dir_index: self.meta.dir_index,
            data_start: self.meta.data_start,
            data_blocks: self.meta.data_blocks,
            free_data_blocks: self.fat.free_count() as u16,
            free_dir_slots: self.dir.free_slots() as u16,
        }
    }
}

/// A single flat volume over a block device.
///
/// The volume starts unmounted. [`Volume::mount`] takes ownership of the
/// device and [`Volume::unmount`] gives it back; every other operation
/// requires a mounted volume and fails with [`FsError::State`] otherwise.
///
/// All metadata lives in memory while mounted and only reaches the device
/// on unmount. File data is written through on every [`Volume::write`].
#[derive(Debug)]
pub struct Volume<D: BlockDevice> {
    mounted: Option<MountedVolume<D>>,
}

impl<D: BlockDevice> Default for Volume<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: BlockDevice> Volume<D> {
    pub const fn new() -> Self {
        Self { mounted: None }
    }

    /// Convenience constructor: a volume already mounted on `dev`.
    pub fn with_device(dev: D) -> FsResult<Self> {
        let mut vol = Self::new();
        vol.mount(dev)?;
        Ok(vol)
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    #[inline]
    pub(crate) fn mounted(&self) -> FsResult<&MountedVolume<D>> {
        self.mounted
            .as_ref()
            .ok_or(FsError::State("volume is not mounted"))
    }

    #[inline]
    pub(crate) fn mounted_mut(&mut self) -> FsResult<&mut MountedVolume<D>> {
        self.mounted
            .as_mut()
            .ok_or(FsError::State("volume is not mounted"))
    }

    /// Mounts `dev`.
    ///
    /// On failure the device is closed and dropped, nothing is kept.
    pub fn mount(&mut self, dev: D) -> FsResult {
        ensure!(
            self.mounted.is_none(),
            FsError::State("volume is already mounted")
        );
        match MountedVolume::load(dev) {
            Ok(m) => {
                log::debug!(
                    "mounted volume: {} data blocks, {} files",
                    m.meta.data_blocks,
                    m.dir.len()
                );
                self.mounted = Some(m);
                Ok(())
            }
            Err((e, mut dev)) => {
                log::debug!("mount failed: {e}");
                if let Err(close_err) = dev.close() {
                    log::warn!("closing device after failed mount: {close_err}");
                }
                Err(e)
            }
        }
    }

    /// Flushes metadata, closes the device and hands it back.
    ///
    /// Fails with [`FsError::State`] while any handle is open. A device
    /// error leaves the volume mounted.
    pub fn unmount(&mut self) -> FsResult<D> {
        let m = self.mounted_mut()?;
        ensure!(
            m.files.is_empty(),
            FsError::State("files are still open")
        );
        m.store_metadata()?;
        m.dev.close()?;

        let m = self
            .mounted
            .take()
            .ok_or(FsError::State("volume is not mounted"))?;
        log::debug!("unmounted volume");
        Ok(m.dev)
    }

    pub fn info(&self) -> FsResult<VolumeInfo> {
        Ok(self.mounted()?.info())
    }

    pub fn meta(&self) -> FsResult<VolumeMeta> {
        Ok(self.mounted()?.meta)
    }

    /// Device currently mounted, for inspection.
    pub fn device(&self) -> FsResult<&D> {
        Ok(&self.mounted()?.dev)
    }

    pub fn device_mut(&mut self) -> FsResult<&mut D> {
        Ok(&mut self.mounted_mut()?.dev)
    }

    /// Creates an empty file.
    pub fn create(&mut self, name: &str) -> FsResult {
        let m = self.mounted_mut()?;
        let slot = m.dir.create(name)?;
        log::debug!("created {name:?} in slot {slot}");
        Ok(())
    }

    /// Removes a file and releases its blocks.
    pub fn delete(&mut self, name: &str) -> FsResult {
        let m = self.mounted_mut()?;
        let first = m.dir.lookup(name)?.first_block;
        ensure!(!m.files.is_open(name), FsError::State("file is open"));

        let freed = match first {
            Some(block) => m.fat.free_chain(block)?,
            None => 0,
        };
        m.dir.delete(name)?;
        log::debug!("deleted {name:?}, {freed} block(s) released");
        Ok(())
    }

    pub fn list(&self) -> FsResult<Vec<DirListing>> {
        Ok(self.mounted()?.dir.list())
    }

    /// Size and first block of `name`, without opening it.
    pub fn stat(&self, name: &str) -> FsResult<DirListing> {
        let e = self.mounted()?.dir.lookup(name)?;
        Ok(DirListing {
            name: e.name.clone(),
            size: e.size,
            first_block: e.first_block,
        })
    }

    pub fn open(&mut self, name: &str) -> FsResult<FileHandle> {
        let m = self.mounted_mut()?;
        m.dir.lookup(name)?;
        let handle = m.files.open(name)?;
        log::trace!("opened {name:?} as {handle}");
        Ok(handle)
    }

    pub fn close(&mut self, handle: FileHandle) -> FsResult {
        self.mounted_mut()?.files.close(handle)?;
        log::trace!("closed {handle}");
        Ok(())
    }

    /// Current size of the file behind `handle`.
    pub fn size(&self, handle: FileHandle) -> FsResult<u32> {
        let m = self.mounted()?;
        let file = m.files.get(handle)?;
        Ok(m.dir.lookup(&file.name)?.size)
    }

    /// Moves the cursor of `handle`. `offset` may equal the size, not exceed it.
    pub fn seek(&mut self, handle: FileHandle, offset: u32) -> FsResult {
        let size = self.size(handle)?;
        ensure!(
            offset <= size,
            FsError::State("seek beyond end of file")
        );
        self.mounted_mut()?.files.get_mut(handle)?.cursor = offset;
        Ok(())
    }

    /// Cursor position of `handle`.
    pub fn tell(&self, handle: FileHandle) -> FsResult<u32> {
        Ok(self.mounted()?.files.get(handle)?.cursor)
    }

    /// Reads from the cursor into `buf`, returning the bytes transferred.
    ///
    /// Returns 0 at end of file.
    pub fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> FsResult<usize> {
        self.mounted_mut()?.read(handle, buf)
    }

    /// Writes `data` at the cursor, returning the bytes transferred.
    ///
    /// A full data region ends the write early without an error.
    pub fn write(&mut self, handle: FileHandle, data: &[u8]) -> FsResult<usize> {
        self.mounted_mut()?.write(handle, data)
    }

    /// Consistency check of the in-memory metadata.
    pub fn check(&self, opts: &CheckOptions) -> FsResult<VerifyReport> {
        let m = self.mounted()?;
        Ok(check_volume(&m.meta, &m.fat, &m.dir, opts))
    }
}

#[cfg(feature = "std")]
impl Volume<FileBlockDevice> {
    /// Opens the disk image at `path` and mounts it.
    pub fn mount_path<P: AsRef<std::path::Path>>(&mut self, path: P) -> FsResult {
        ensure!(
            self.mounted.is_none(),
            FsError::State("volume is already mounted")
        );
        let dev = FileBlockDevice::open(path)?;
        self.mount(dev)
    }
}
