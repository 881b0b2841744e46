// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec, vec::Vec};

use core::fmt;

use flatio::Block;
use zerocopy::{FromBytes, IntoBytes};

use crate::{bail, constant::*, ensure, errors::*, types::*};

/// In-memory directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub size: u32,
    /// `None` until the first write allocates a block.
    pub first_block: Option<u16>,
}

impl DirEntry {
    fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            size: 0,
            first_block: None,
        }
    }
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub name: String,
    pub size: u32,
    pub first_block: Option<u16>,
}

impl fmt::Display for DirListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file: {}, size: {}, data_blk: {}",
            self.name,
            self.size,
            self.first_block.unwrap_or(FLAT_FAT_EOC)
        )
    }
}

/// Checks a file name against the on-disk name field.
pub fn validate_name(name: &str) -> FsResult {
    ensure!(!name.is_empty(), FsError::InvalidArgument("empty file name"));
    ensure!(
        name.len() <= FLAT_MAX_NAME_LEN,
        FsError::InvalidArgument("file name too long")
    );
    ensure!(
        !name.as_bytes().contains(&0),
        FsError::InvalidArgument("file name contains NUL")
    );
    Ok(())
}

/// Fixed-capacity flat directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    slots: Vec<Option<DirEntry>>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory {
    pub fn new() -> Self {
        Self {
            slots: vec![None; FLAT_MAX_FILES],
        }
    }

    /// Decodes the directory block.
    pub fn from_block(block: &Block) -> FsResult<Self> {
        let raw = RawDirBlock::ref_from_prefix(block.as_slice())
            .map(|(raw, _)| raw)
            .map_err(|_| FsError::Format("directory block too short"))?;

        let mut slots = Vec::with_capacity(FLAT_MAX_FILES);
        for entry in raw.iter() {
            if entry.is_free() {
                slots.push(None);
                continue;
            }
            let name = core::str::from_utf8(entry.name_bytes())
                .map_err(|_| FsError::Format("file name is not valid UTF-8"))?;
            if entry.name_bytes().len() > FLAT_MAX_NAME_LEN {
                bail!(FsError::Format("file name is not NUL terminated"));
            }
            slots.push(Some(DirEntry {
                name: name.into(),
                size: entry.size.get(),
                first_block: entry.first_block(),
            }));
        }
        Ok(Self { slots })
    }

    /// Encodes the directory into `block`. Padding is written as zeroes.
    pub fn write_block(&self, block: &mut Block) {
        block.fill(0);
        for (slot, out) in self
            .slots
            .iter()
            .zip(block.chunks_exact_mut(FLAT_DIR_ENTRY_SIZE))
        {
            let raw = match slot {
                Some(e) => RawDirEntry::new(&e.name, e.size, e.first_block),
                None => RawDirEntry::EMPTY,
            };
            out.copy_from_slice(raw.as_bytes());
        }
    }

    /// Inserts an empty file in the first free slot and returns that slot.
    pub fn create(&mut self, name: &str) -> FsResult<usize> {
        validate_name(name)?;
        ensure!(
            self.position(name).is_none(),
            FsError::InvalidArgument("file already exists")
        );
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::ResourceExhausted("directory is full"))?;
        self.slots[slot] = Some(DirEntry::new(name));
        Ok(slot)
    }

    /// Clears the slot holding `name` and hands back its entry.
    pub fn delete(&mut self, name: &str) -> FsResult<DirEntry> {
        let slot = self
            .position(name)
            .ok_or(FsError::NotFound("no such file"))?;
        self.slots[slot]
            .take()
            .ok_or(FsError::NotFound("no such file"))
    }

    pub fn lookup(&self, name: &str) -> FsResult<&DirEntry> {
        self.slots
            .iter()
            .flatten()
            .find(|e| e.name == name)
            .ok_or(FsError::NotFound("no such file"))
    }

    pub fn lookup_mut(&mut self, name: &str) -> FsResult<&mut DirEntry> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|e| e.name == name)
            .ok_or(FsError::NotFound("no such file"))
    }

    /// Occupied slots, in slot order.
    pub fn list(&self) -> Vec<DirListing> {
        self.entries()
            .map(|e| DirListing {
                name: e.name.clone(),
                size: e.size,
                first_block: e.first_block,
            })
            .collect()
    }

    #[inline]
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.slots.iter().flatten()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn free_slots(&self) -> usize {
        FLAT_MAX_FILES - self.len()
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|e| e.name == name))
    }
}
