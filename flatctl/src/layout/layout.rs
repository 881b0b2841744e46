// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use flatfs::{constant::*, directory::validate_name, meta::VolumeMeta};
use flatio::BLOCK_SIZE;

use crate::layout::{error::LayoutError, size::*};

/// Volume image description read from a TOML file.
///
/// ```toml
/// [volume]
/// size = "4M"          # or data_blocks = 1000
///
/// [[files]]
/// name = "readme.txt"
/// source = "docs/README"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    #[serde(skip)]
    pub base_dir: PathBuf,
    pub volume: VolumeSection,
    #[serde(default)]
    pub files: Vec<FileSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeSection {
    pub data_blocks: Option<u16>,
    pub size: Option<Size>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSection {
    pub name: String,
    pub source: PathBuf,
}

impl Layout {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut layout = Self::parse(&content)?;
        layout.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .canonicalize()?;
        Ok(layout)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Geometry described by the `[volume]` section.
    pub fn meta(&self) -> anyhow::Result<VolumeMeta> {
        let meta = match (self.volume.data_blocks, self.volume.size) {
            (Some(n), None) => VolumeMeta::new(n)?,
            (None, Some(size)) => {
                // Superblock, one table block, directory and one data block
                let min = 4 * BLOCK_SIZE as u64;
                if size.bytes() < min {
                    return Err(LayoutError::SizeTooSmall(size.bytes(), min).into());
                }
                VolumeMeta::for_device_blocks(size.bytes() / BLOCK_SIZE as u64)?
            }
            (Some(_), Some(_)) => {
                return Err(LayoutError::InvalidConfig(
                    "set either volume.data_blocks or volume.size, not both",
                )
                .into());
            }
            (None, None) => {
                return Err(LayoutError::InvalidConfig(
                    "volume.data_blocks or volume.size is required",
                )
                .into());
            }
        };
        Ok(meta)
    }

    pub fn source_path(&self, file: &FileSection) -> PathBuf {
        self.base_dir.join(&file.source)
    }

    /// Checks names, file count and that every source fits in the volume.
    pub fn validate(&self) -> anyhow::Result<VolumeMeta> {
        let meta = self.meta()?;

        if self.files.len() > FLAT_MAX_FILES {
            return Err(LayoutError::TooManyFiles(self.files.len(), FLAT_MAX_FILES).into());
        }

        let mut names = BTreeSet::new();
        for f in &self.files {
            if validate_name(&f.name).is_err() {
                return Err(LayoutError::InvalidName(f.name.clone()).into());
            }
            if !names.insert(f.name.as_str()) {
                return Err(LayoutError::DuplicateName(f.name.clone()).into());
            }
        }

        let mut needed = 0u64;
        for f in &self.files {
            let len = file_len(self.source_path(f))?;
            if len > u32::MAX as u64 {
                return Err(LayoutError::InvalidConfig("source file exceeds 4 GiB").into());
            }
            needed += len.div_ceil(BLOCK_SIZE as u64);
        }
        // Entry 0 is reserved
        let usable = meta.data_blocks as u64 - 1;
        if needed > usable {
            return Err(LayoutError::SizeTooLarge(needed, usable).into());
        }

        crate::log_verbose!(
            "Layout: {} file(s), {} of {} data blocks",
            self.files.len(),
            needed,
            usable
        );
        Ok(meta)
    }
}

impl core::fmt::Display for Layout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "\n  ┌─────┬─────────────────┬──────────────────────────────────┐")?;
        writeln!(f, "  | Id  | Name            | Source                           |")?;
        writeln!(f, "  ├─────┼─────────────────┼──────────────────────────────────┤")?;
        for (i, file) in self.files.iter().enumerate() {
            let src = file.source.display().to_string();
            writeln!(
                f,
                "  | {i:<3} | {n:<15} | {s:<32} |",
                n = file.name,
                s = src
                    .char_indices()
                    .rev()
                    .nth(31)
                    .map_or(src.as_str(), |(i, _)| &src[i..]),
            )?;
        }
        writeln!(f, "  └─────┴─────────────────┴──────────────────────────────────┘")
    }
}
