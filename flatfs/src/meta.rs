// SPDX-License-Identifier: MIT

use crate::{bail, constant::*, ensure, errors::*, types::FlatSuperblock};

/// Volume geometry, as described by the superblock.
///
/// Block 0 is the superblock, blocks `1..=fat_blocks` hold the allocation
/// table, `dir_index` the directory and `data_start..total_blocks` the data
/// region. Data blocks are addressed relative to `data_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeMeta {
    pub total_blocks: u16,
    pub dir_index: u16,
    pub data_start: u16,
    pub data_blocks: u16,
    pub fat_blocks: u8,
}

/// Blocks needed by an allocation table covering `data_blocks` entries.
#[inline]
pub fn fat_blocks_for(data_blocks: u32) -> u32 {
    (data_blocks * FLAT_FAT_ENTRY_SIZE as u32).div_ceil(BLOCK_SIZE as u32)
}

impl VolumeMeta {
    /// Geometry for a data region of `data_blocks` blocks.
    pub fn new(data_blocks: u16) -> FsResult<Self> {
        ensure!(
            data_blocks >= 1,
            FsError::InvalidArgument("volume needs at least one data block")
        );
        ensure!(
            data_blocks <= FLAT_MAX_DATA_BLOCKS,
            FsError::InvalidArgument("too many data blocks")
        );

        let fat_blocks = fat_blocks_for(data_blocks as u32);
        let dir_index = fat_blocks + 1;
        let data_start = dir_index + 1;
        let total = data_start + data_blocks as u32;
        ensure!(
            total <= u16::MAX as u32,
            FsError::InvalidArgument("volume exceeds the addressable block count")
        );

        Ok(Self {
            total_blocks: total as u16,
            dir_index: dir_index as u16,
            data_start: data_start as u16,
            data_blocks,
            fat_blocks: fat_blocks as u8,
        })
    }

    /// Largest geometry that fits in a device of `total_blocks` blocks.
    ///
    /// The result may leave a trailing block unused when no data block count
    /// fills the device exactly; check `total_blocks` against the device.
    pub fn for_device_blocks(total_blocks: u64) -> FsResult<Self> {
        ensure!(
            total_blocks >= 4,
            FsError::InvalidArgument("device too small for a volume")
        );
        let budget = total_blocks.min(u16::MAX as u64) as u32 - 2;

        // Underestimate, then grow while the table still fits
        let mut data = budget - fat_blocks_for(budget);
        while data < FLAT_MAX_DATA_BLOCKS as u32 {
            let next = data + 1;
            if next + fat_blocks_for(next) > budget {
                break;
            }
            data = next;
        }
        Self::new(data as u16)
    }

    /// Validates a superblock read from a device of `device_blocks` blocks.
    pub fn from_superblock(sb: &FlatSuperblock, device_blocks: u64) -> FsResult<Self> {
        ensure!(sb.has_signature(), FsError::Format("bad signature"));

        let total = sb.total_blocks.get();
        if total as u64 != device_blocks {
            log::debug!("superblock total {total}, device reports {device_blocks}");
            bail!(FsError::Format("block count does not match the device"));
        }

        let data_blocks = sb.data_blocks.get();
        ensure!(
            (1..=FLAT_MAX_DATA_BLOCKS).contains(&data_blocks),
            FsError::Format("invalid data block count")
        );

        let expected = Self::new(data_blocks).map_err(|_| FsError::Format("invalid geometry"))?;
        ensure!(
            sb.fat_blocks == expected.fat_blocks,
            FsError::Format("allocation table size does not match the data block count")
        );
        ensure!(
            sb.dir_index.get() == expected.dir_index,
            FsError::Format("directory index out of place")
        );
        ensure!(
            sb.data_start.get() == expected.data_start,
            FsError::Format("data region out of place")
        );
        ensure!(
            total == expected.total_blocks,
            FsError::Format("total block count does not match the layout")
        );

        Ok(expected)
    }

    #[inline]
    pub fn to_superblock(&self) -> FlatSuperblock {
        FlatSuperblock::from_meta(self)
    }

    /// Device index of allocation table block `i`.
    #[inline]
    pub fn fat_block_index(&self, i: usize) -> u64 {
        1 + i as u64
    }

    /// Device index of the data block at data-relative index `block`.
    #[inline]
    pub fn data_block_index(&self, block: u16) -> u64 {
        self.data_start as u64 + block as u64
    }

    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.total_blocks as u64 * BLOCK_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::FromZeros;

    #[test]
    fn test_geometry() {
        let m = VolumeMeta::new(1).unwrap();
        assert_eq!(
            (m.fat_blocks, m.dir_index, m.data_start, m.total_blocks),
            (1, 2, 3, 4)
        );

        let m = VolumeMeta::new(2048).unwrap();
        assert_eq!(m.fat_blocks, 1);
        let m = VolumeMeta::new(2049).unwrap();
        assert_eq!(m.fat_blocks, 2);
        assert_eq!(m.total_blocks, 2049 + 4);
    }

    #[test]
    fn test_rejects_bad_counts() {
        assert!(matches!(
            VolumeMeta::new(0),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            VolumeMeta::new(0xFFFF),
            Err(FsError::InvalidArgument(_))
        ));
        // 0xFFFE data blocks plus metadata overflow a u16 total
        assert!(VolumeMeta::new(0xFFFE).is_err());
        assert!(VolumeMeta::new(65501).is_ok());
    }

    #[test]
    fn test_for_device_blocks() {
        let m = VolumeMeta::for_device_blocks(4).unwrap();
        assert_eq!(m.data_blocks, 1);

        let m = VolumeMeta::for_device_blocks(8198).unwrap();
        assert_eq!(m.data_blocks, 8192);
        assert_eq!(m.total_blocks, 8198);

        // 2049 data blocks would need a second table block
        let m = VolumeMeta::for_device_blocks(2052).unwrap();
        assert_eq!(m.data_blocks, 2048);
        assert_eq!(m.total_blocks, 2051);

        assert!(VolumeMeta::for_device_blocks(3).is_err());
    }

    #[test]
    fn test_superblock_validation() {
        let meta = VolumeMeta::new(100).unwrap();
        let sb = meta.to_superblock();
        assert_eq!(
            VolumeMeta::from_superblock(&sb, meta.total_blocks as u64).unwrap(),
            meta
        );

        assert!(matches!(
            VolumeMeta::from_superblock(&sb, meta.total_blocks as u64 + 1),
            Err(FsError::Format(_))
        ));

        let mut bad = sb;
        bad.signature[0] = b'X';
        assert!(matches!(
            VolumeMeta::from_superblock(&bad, meta.total_blocks as u64),
            Err(FsError::Format(_))
        ));

        let mut bad = sb;
        bad.fat_blocks = 2;
        assert!(VolumeMeta::from_superblock(&bad, meta.total_blocks as u64).is_err());

        let mut bad = sb;
        bad.data_start.set(meta.data_start + 1);
        assert!(VolumeMeta::from_superblock(&bad, meta.total_blocks as u64).is_err());

        let zeroed = FlatSuperblock::new_zeroed();
        assert!(VolumeMeta::from_superblock(&zeroed, 0).is_err());
    }
}
