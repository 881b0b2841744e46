// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec, vec::Vec};

use core::fmt;

use crate::{constant::*, errors::*};

/// Opaque handle on an open file, valid for the mount that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    /// Rebuilds a handle from its raw slot number.
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd{}", self.0)
    }
}

/// State carried by an open handle. The file is referenced by name only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub name: String,
    pub cursor: u32,
}

#[derive(Debug, Clone)]
pub struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; FLAT_MAX_OPEN_FILES],
        }
    }

    /// Binds a new handle to `name` with its cursor at 0.
    ///
    /// The caller checks that `name` exists.
    pub fn open(&mut self, name: &str) -> FsResult<FileHandle> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::ResourceExhausted("too many open files"))?;
        self.slots[slot] = Some(OpenFile {
            name: name.into(),
            cursor: 0,
        });
        Ok(FileHandle(slot))
    }

    pub fn close(&mut self, handle: FileHandle) -> FsResult<OpenFile> {
        self.slot_mut(handle)?
            .take()
            .ok_or(FsError::NotFound("handle is not open"))
    }

    /// Out-of-range handles are `InvalidArgument`, closed ones `NotFound`.
    pub fn get(&self, handle: FileHandle) -> FsResult<&OpenFile> {
        self.slots
            .get(handle.0)
            .ok_or(FsError::InvalidArgument("handle out of range"))?
            .as_ref()
            .ok_or(FsError::NotFound("handle is not open"))
    }

    pub fn get_mut(&mut self, handle: FileHandle) -> FsResult<&mut OpenFile> {
        self.slot_mut(handle)?
            .as_mut()
            .ok_or(FsError::NotFound("handle is not open"))
    }

    #[inline]
    fn slot_mut(&mut self, handle: FileHandle) -> FsResult<&mut Option<OpenFile>> {
        self.slots
            .get_mut(handle.0)
            .ok_or(FsError::InvalidArgument("handle out of range"))
    }

    /// True if any handle references `name`.
    pub fn is_open(&self, name: &str) -> bool {
        self.slots.iter().flatten().any(|f| f.name == name)
    }

    #[inline]
    pub fn open_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.open_count() == 0
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_open_close() {
        let mut t = OpenFileTable::new();
        let a = t.open("a").unwrap();
        let b = t.open("a").unwrap();
        assert_ne!(a, b);
        assert!(t.is_open("a"));
        assert_eq!(t.open_count(), 2);

        t.close(a).unwrap();
        assert!(t.is_open("a"));
        t.close(b).unwrap();
        assert!(!t.is_open("a"));
        assert!(t.is_empty());
    }

    #[test]
    fn test_handle_errors() {
        let mut t = OpenFileTable::new();
        let h = t.open("a").unwrap();
        t.close(h).unwrap();

        assert!(matches!(t.close(h), Err(FsError::NotFound(_))));
        assert!(matches!(t.get(h), Err(FsError::NotFound(_))));

        let bogus = FileHandle::from_raw(FLAT_MAX_OPEN_FILES);
        assert!(matches!(t.get(bogus), Err(FsError::InvalidArgument(_))));
        assert!(matches!(t.close(bogus), Err(FsError::InvalidArgument(_))));
    }

    #[test]
    fn test_table_full() {
        let mut t = OpenFileTable::new();
        let handles: Vec<_> = (0..FLAT_MAX_OPEN_FILES)
            .map(|_| t.open("f").unwrap())
            .collect();
        assert!(matches!(t.open("f"), Err(FsError::ResourceExhausted(_))));
        t.get_mut(handles[3]).unwrap().cursor = 9;
        assert_eq!(t.get(handles[3]).unwrap().cursor, 9);

        // Released slot is handed out again
        t.close(handles[5]).unwrap();
        assert_eq!(t.open("g").unwrap(), handles[5]);
    }
}
