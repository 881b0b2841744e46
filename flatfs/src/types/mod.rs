// SPDX-License-Identifier: MIT

mod entries;
mod superblock;

pub use entries::*;
pub use superblock::*;
