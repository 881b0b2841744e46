// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

mod macros;

pub mod checker;
pub mod constant;
pub mod directory;
pub mod errors;
pub mod fat;
pub mod formatter;
pub mod handles;
mod io;
pub mod meta;
pub mod types;
pub mod volume;

pub use checker::{CheckOptions, VerifyPhases, VerifyReport, check_device};
pub use directory::DirListing;
pub use errors::*;
pub use formatter::{Formatter, FsFormatter};
pub use handles::FileHandle;
pub use meta::VolumeMeta;
pub use volume::{Volume, VolumeInfo};

/// Everything needed to format, mount and use a volume.
pub mod prelude {
    pub use crate::checker::*;
    pub use crate::constant::*;
    pub use crate::directory::{DirEntry, DirListing, Directory};
    pub use crate::errors::*;
    pub use crate::fat::{AllocationTable, ChainSeek, FatEntry};
    pub use crate::formatter::{Formatter, FsFormatter};
    pub use crate::handles::FileHandle;
    pub use crate::meta::VolumeMeta;
    pub use crate::volume::{Volume, VolumeInfo};
}
