// SPDX-License-Identifier: MIT

use crate::{Block, BlockDevice, BlockIOResult};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub writes: u64,
    pub flushes: u64,

    // Access pattern (a block following the previously touched one)
    pub sequential_reads: u64,
    pub sequential_writes: u64,

    // Highest block index touched, useful to spot runaway chains
    pub max_index: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }

    /// Total bytes moved in either direction.
    #[inline]
    pub fn bytes(&self) -> u64 {
        (self.reads + self.writes) * crate::BLOCK_SIZE as u64
    }
}

/// Transparent instrumentation wrapper.
pub struct IOCounter<'a, D: BlockDevice + ?Sized> {
    inner: &'a mut D,
    pub stats: IoStats,
    last: Option<u64>,
}

impl<'a, D: BlockDevice + ?Sized> IOCounter<'a, D> {
    #[inline]
    pub fn new(inner: &'a mut D) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
            last: None,
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut D {
        self.inner
    }

    #[inline]
    fn track(&mut self, index: u64) -> bool {
        let sequential = self.last.is_some_and(|prev| index == prev + 1);
        self.last = Some(index);
        self.stats.max_index = self.stats.max_index.max(index);
        sequential
    }
}

impl<'a, D: BlockDevice + ?Sized> BlockDevice for IOCounter<'a, D> {
    #[inline]
    fn block_count(&self) -> u64 {
        self.inner.block_count()
    }

    #[inline]
    fn read_block(&mut self, index: u64, buf: &mut Block) -> BlockIOResult {
        if self.track(index) {
            self.stats.sequential_reads += 1;
        }
        self.stats.reads += 1;
        self.inner.read_block(index, buf)
    }

    #[inline]
    fn write_block(&mut self, index: u64, buf: &Block) -> BlockIOResult {
        if self.track(index) {
            self.stats.sequential_writes += 1;
        }
        self.stats.writes += 1;
        self.inner.write_block(index, buf)
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }

    #[inline]
    fn close(&mut self) -> BlockIOResult {
        self.inner.close()
    }
}
