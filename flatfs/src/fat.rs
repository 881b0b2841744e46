// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{vec, vec::Vec};

use crate::{constant::*, errors::*};

/// Decoded allocation table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    Free,
    /// Data-relative index of the next block in the chain.
    Next(u16),
    EndOfChain,
}

impl FatEntry {
    #[inline]
    pub fn decode(raw: u16) -> Self {
        match raw {
            FLAT_FAT_FREE => FatEntry::Free,
            FLAT_FAT_EOC => FatEntry::EndOfChain,
            next => FatEntry::Next(next),
        }
    }

    #[inline]
    pub fn encode(self) -> u16 {
        match self {
            FatEntry::Free => FLAT_FAT_FREE,
            FatEntry::Next(next) => next,
            FatEntry::EndOfChain => FLAT_FAT_EOC,
        }
    }
}

/// Result of [`AllocationTable::chain_block_for_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSeek {
    /// Block reached by the walk.
    pub block: u16,
    /// Position of `block` within the chain (0 for the head).
    pub index: u32,
}

impl ChainSeek {
    /// True when the chain ended before the requested offset.
    #[inline]
    pub fn is_short(&self, byte_offset: u32) -> bool {
        self.index < byte_offset / BLOCK_SIZE as u32
    }
}

/// In-memory allocation table, one raw entry per data block.
///
/// Entries are kept in their on-disk encoding and decoded at the API edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable {
    entries: Vec<u16>,
}

impl AllocationTable {
    /// Fresh table: everything free except the reserved entry.
    pub fn new(data_blocks: u16) -> Self {
        let mut entries = vec![FLAT_FAT_FREE; data_blocks as usize];
        if let Some(first) = entries.first_mut() {
            *first = FLAT_FAT_EOC;
        }
        Self { entries }
    }

    /// Decodes the first `data_blocks` little-endian entries of `bytes`.
    pub fn from_bytes(bytes: &[u8], data_blocks: u16) -> FsAllocatorResult<Self> {
        let n = data_blocks as usize;
        if bytes.len() < n * FLAT_FAT_ENTRY_SIZE {
            return Err(FsAllocatorError::Other("allocation table bytes too short"));
        }
        let entries = bytes
            .chunks_exact(FLAT_FAT_ENTRY_SIZE)
            .take(n)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(Self { entries })
    }

    /// Encodes the table into `out`, zeroing whatever follows the last entry.
    pub fn write_bytes(&self, out: &mut [u8]) {
        out.fill(0);
        for (chunk, raw) in out
            .chunks_exact_mut(FLAT_FAT_ENTRY_SIZE)
            .zip(self.entries.iter())
        {
            chunk.copy_from_slice(&raw.to_le_bytes());
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn check(&self, block: u16) -> FsAllocatorResult<usize> {
        let i = block as usize;
        if i >= self.entries.len() {
            return Err(FsAllocatorError::InvalidBlock(block));
        }
        Ok(i)
    }

    /// True for a block a chain may legally contain.
    #[inline]
    pub fn is_data_block(&self, block: u16) -> bool {
        block >= FLAT_FIRST_DATA_BLOCK && (block as usize) < self.entries.len()
    }

    pub fn entry(&self, block: u16) -> FsAllocatorResult<FatEntry> {
        let i = self.check(block)?;
        Ok(FatEntry::decode(self.entries[i]))
    }

    pub fn set(&mut self, block: u16, entry: FatEntry) -> FsAllocatorResult {
        let i = self.check(block)?;
        self.entries[i] = entry.encode();
        Ok(())
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|&&e| e == FLAT_FAT_FREE).count()
    }

    /// Lowest free data block, reserved entry excluded.
    pub fn find_first_free(&self) -> Option<u16> {
        self.entries
            .iter()
            .enumerate()
            .skip(FLAT_FIRST_DATA_BLOCK as usize)
            .find(|(_, e)| **e == FLAT_FAT_FREE)
            .map(|(i, _)| i as u16)
    }

    /// First-fit allocation. The block is returned marked as end of chain.
    ///
    /// Linear in the number of data blocks.
    pub fn allocate_first_fit(&mut self) -> FsAllocatorResult<u16> {
        let block = self
            .find_first_free()
            .ok_or(FsAllocatorError::OutOfBlocks)?;
        self.entries[block as usize] = FLAT_FAT_EOC;
        log::trace!("allocated data block {block}");
        Ok(block)
    }

    /// Successor of `block`, `None` at the end of its chain.
    pub fn next(&self, block: u16) -> FsAllocatorResult<Option<u16>> {
        match self.entry(block)? {
            FatEntry::EndOfChain => Ok(None),
            FatEntry::Next(n) if self.is_data_block(n) => Ok(Some(n)),
            FatEntry::Next(n) => Err(FsAllocatorError::InvalidBlock(n)),
            FatEntry::Free => Err(FsAllocatorError::BrokenChain(block)),
        }
    }

    /// Walks the chain starting at `start`.
    #[inline]
    pub fn chain(&self, start: u16) -> ChainCursor<'_> {
        ChainCursor::new(self, start)
    }

    /// Collects and validates a full chain.
    pub fn collect_chain(&self, start: u16) -> FsAllocatorResult<Vec<u16>> {
        self.chain(start).collect()
    }

    /// Releases every block of the chain starting at `start`.
    ///
    /// The chain is validated first, a corrupt chain leaves the table untouched.
    /// Returns the number of freed blocks.
    pub fn free_chain(&mut self, start: u16) -> FsAllocatorResult<usize> {
        let blocks = self.collect_chain(start)?;
        for &b in &blocks {
            self.entries[b as usize] = FLAT_FAT_FREE;
        }
        log::trace!("freed {} block(s) from chain at {start}", blocks.len());
        Ok(blocks.len())
    }

    /// Appends one block after `tail`, which must end its chain.
    ///
    /// On failure the table is unchanged.
    pub fn extend(&mut self, tail: u16) -> FsAllocatorResult<u16> {
        if !self.is_data_block(tail) {
            return Err(FsAllocatorError::InvalidBlock(tail));
        }
        if self.entry(tail)? != FatEntry::EndOfChain {
            return Err(FsAllocatorError::NotChainTail(tail));
        }
        let new = self.allocate_first_fit()?;
        self.entries[tail as usize] = new;
        Ok(new)
    }

    /// Block of the chain at `start` holding `byte_offset`.
    ///
    /// When the chain ends first, the last block is returned; compare
    /// [`ChainSeek::index`] with the wanted position to detect it.
    pub fn chain_block_for_offset(
        &self,
        start: u16,
        byte_offset: u32,
    ) -> FsAllocatorResult<ChainSeek> {
        let target = byte_offset / BLOCK_SIZE as u32;
        let mut seek = ChainSeek {
            block: start,
            index: 0,
        };
        for (i, block) in self.chain(start).enumerate() {
            seek = ChainSeek {
                block: block?,
                index: i as u32,
            };
            if seek.index == target {
                break;
            }
        }
        Ok(seek)
    }

    /// Raw view, used by the checker.
    #[inline]
    pub(crate) fn raw(&self) -> &[u16] {
        &self.entries
    }
}

/// Iterator over the blocks of one chain.
///
/// Stops after the end-of-chain block, on the first error, or once more
/// blocks were visited than the table holds.
#[derive(Debug)]
pub struct ChainCursor<'a> {
    table: &'a AllocationTable,
    current: Option<u16>,
    seen: usize,
}

impl<'a> ChainCursor<'a> {
    pub fn new(table: &'a AllocationTable, start: u16) -> Self {
        Self {
            table,
            current: Some(start),
            seen: 0,
        }
    }
}

impl Iterator for ChainCursor<'_> {
    type Item = FsAllocatorResult<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.current.take()?;
        self.seen += 1;
        if self.seen > self.table.len() {
            return Some(Err(FsAllocatorError::LoopDetected));
        }
        if !self.table.is_data_block(block) {
            return Some(Err(FsAllocatorError::InvalidBlock(block)));
        }
        match self.table.next(block) {
            Ok(next) => {
                self.current = next;
                Some(Ok(block))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
