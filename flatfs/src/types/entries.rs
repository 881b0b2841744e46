// SPDX-License-Identifier: MIT

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::constant::*;

/// One 32-byte directory slot as stored on disk.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct RawDirEntry {
    pub filename: [u8; FLAT_FILENAME_LEN],
    pub size: U32,
    pub first_block: U16,
    pub padding: [u8; FLAT_DIR_PADDING],
}

impl RawDirEntry {
    pub const EMPTY: Self = Self {
        filename: [0; FLAT_FILENAME_LEN],
        size: U32::ZERO,
        first_block: U16::ZERO,
        padding: [0; FLAT_DIR_PADDING],
    };

    pub fn new(name: &str, size: u32, first_block: Option<u16>) -> Self {
        let mut filename = [0u8; FLAT_FILENAME_LEN];
        let bytes = name.as_bytes();
        let n = bytes.len().min(FLAT_MAX_NAME_LEN);
        filename[..n].copy_from_slice(&bytes[..n]);
        Self {
            filename,
            size: U32::new(size),
            first_block: U16::new(first_block.unwrap_or(FLAT_FAT_EOC)),
            padding: [0; FLAT_DIR_PADDING],
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.filename[0] == 0
    }

    /// Name bytes up to the first NUL.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .filename
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FLAT_FILENAME_LEN);
        &self.filename[..end]
    }

    /// `None` when the slot carries the EOC marker.
    #[inline]
    pub fn first_block(&self) -> Option<u16> {
        match self.first_block.get() {
            FLAT_FAT_EOC => None,
            b => Some(b),
        }
    }
}

const _: () = assert!(core::mem::size_of::<RawDirEntry>() == FLAT_DIR_ENTRY_SIZE);

/// Whole directory block.
pub type RawDirBlock = [RawDirEntry; FLAT_MAX_FILES];
