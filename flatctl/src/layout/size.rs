// SPDX-License-Identifier: MIT

use serde::{Deserialize, Deserializer};
use std::{fmt, fs, path::Path};

use crate::utils::pretty_bytes;

/// A byte size written as `"512K"`, `"4M"`, `"1G"` or a plain byte count.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Size(pub u64);

impl Size {
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SizeVisitor;

        impl<'de> serde::de::Visitor<'de> for SizeVisitor {
            type Value = Size;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a size string like '512K', '4M', '1G' or a byte count")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                parse_size(value).map(Size).map_err(|_| {
                    E::custom(format!(
                        "Invalid size format '{value}'. Use K, M or G suffix."
                    ))
                })
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(value)
                    .map(Size)
                    .map_err(|_| E::custom("size must not be negative"))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Size(value))
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty_bytes(self.0))
    }
}

impl std::str::FromStr for Size {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_size(s).map(Size)
    }
}

/// Parses a size with an optional binary K/M/G suffix into bytes.
pub fn parse_size(size: &str) -> anyhow::Result<u64> {
    let lower = size.trim().to_lowercase();
    let (num, shift) = if let Some(num) = lower.strip_suffix('k') {
        (num, 10)
    } else if let Some(num) = lower.strip_suffix('m') {
        (num, 20)
    } else if let Some(num) = lower.strip_suffix('g') {
        (num, 30)
    } else {
        (lower.as_str(), 0)
    };
    let n = num
        .trim()
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("Unknown size format '{}'", size))?;
    n.checked_mul(1u64 << shift)
        .ok_or_else(|| anyhow::anyhow!("Size '{}' is too large", size))
}

pub fn file_len<P: AsRef<Path>>(path: P) -> anyhow::Result<u64> {
    let meta = fs::metadata(path.as_ref())?;
    if !meta.is_file() {
        anyhow::bail!("'{}' is not a regular file", path.as_ref().display());
    }
    Ok(meta.len())
}
