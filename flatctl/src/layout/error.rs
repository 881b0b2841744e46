// SPDX-License-Identifier: MIT

use core::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum LayoutError {
    SizeTooLarge(u64, u64),
    SizeTooSmall(u64, u64),
    InvalidConfig(&'static str),
    InvalidName(String),
    DuplicateName(String),
    TooManyFiles(usize, usize),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::SizeTooLarge(need, have) => {
                write!(f, "content needs {need} data blocks, volume has {have}")
            }
            LayoutError::SizeTooSmall(size, min) => {
                write!(f, "volume of {size} bytes is below the minimum of {min} bytes")
            }
            LayoutError::InvalidConfig(msg) => write!(f, "Invalid config: {msg}"),
            LayoutError::InvalidName(name) => write!(f, "Invalid file name {name:?}"),
            LayoutError::DuplicateName(name) => write!(f, "Duplicate file name {name:?}"),
            LayoutError::TooManyFiles(n, max) => {
                write!(f, "{n} files listed, the directory holds {max}")
            }
        }
    }
}

impl std::error::Error for LayoutError {}
