// SPDX-License-Identifier: MIT

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{constant::*, meta::VolumeMeta};

/// Block 0 of a volume. Everything after `fat_blocks` is zero padding.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FlatSuperblock {
    pub signature: [u8; 8],
    pub total_blocks: U16,
    pub dir_index: U16,
    pub data_start: U16,
    pub data_blocks: U16,
    pub fat_blocks: u8,
}

impl FlatSuperblock {
    pub fn from_meta(meta: &VolumeMeta) -> Self {
        Self {
            signature: *FLAT_SIGNATURE,
            total_blocks: U16::new(meta.total_blocks),
            dir_index: U16::new(meta.dir_index),
            data_start: U16::new(meta.data_start),
            data_blocks: U16::new(meta.data_blocks),
            fat_blocks: meta.fat_blocks,
        }
    }

    #[inline]
    pub fn has_signature(&self) -> bool {
        &self.signature == FLAT_SIGNATURE
    }
}
