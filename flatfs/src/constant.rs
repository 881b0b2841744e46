// SPDX-License-Identifier: MIT

pub use flatio::BLOCK_SIZE;

// === Superblock ===

pub const FLAT_SIGNATURE: &[u8; 8] = b"ECS150FS";
pub const FLAT_SUPERBLOCK_INDEX: u64 = 0;

// === Allocation table ===

pub const FLAT_FAT_ENTRY_SIZE: usize = 2;
pub const FLAT_FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / FLAT_FAT_ENTRY_SIZE;
pub const FLAT_FAT_FREE: u16 = 0x0000;
pub const FLAT_FAT_EOC: u16 = 0xFFFF;
/// Entry 0 is never handed out, a zero link would read as Free.
pub const FLAT_FAT_RESERVED: u16 = 0;
pub const FLAT_FIRST_DATA_BLOCK: u16 = 1;
/// Largest data region addressable without colliding with the EOC marker.
pub const FLAT_MAX_DATA_BLOCKS: u16 = FLAT_FAT_EOC - 1;
pub const FLAT_MAX_FAT_BLOCKS: usize = (FLAT_MAX_DATA_BLOCKS as usize).div_ceil(FLAT_FAT_ENTRIES_PER_BLOCK);

// === Directory ===

pub const FLAT_MAX_FILES: usize = 128;
pub const FLAT_DIR_ENTRY_SIZE: usize = 32;
pub const FLAT_FILENAME_LEN: usize = 16;
/// The on-disk name field is NUL terminated.
pub const FLAT_MAX_NAME_LEN: usize = FLAT_FILENAME_LEN - 1;
pub const FLAT_DIR_PADDING: usize = 10;

// === Open file table ===

pub const FLAT_MAX_OPEN_FILES: usize = 32;

const _: () = assert!(FLAT_MAX_FILES * FLAT_DIR_ENTRY_SIZE <= BLOCK_SIZE);
