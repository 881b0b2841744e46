// SPDX-License-Identifier: MIT

use anyhow::Context;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

use flatfs::prelude::*;
use flatio::prelude::*;

use crate::layout::Layout;
use crate::utils;

pub type ImageVolume = Volume<FileBlockDevice>;

/// Creates a zero-filled image sized for `meta` and formats it.
pub fn create(output: &Path, meta: &VolumeMeta) -> anyhow::Result<()> {
    let mut dev = FileBlockDevice::create(output, meta.total_blocks as u64)
        .with_context(|| format!("cannot create '{}'", output.display()))?;
    Formatter::new(&mut dev, meta).format(false)?;
    dev.close()?;
    crate::log_verbose!(
        "Formatted '{}': {} blocks, {} data blocks",
        output.display(),
        meta.total_blocks,
        meta.data_blocks
    );
    Ok(())
}

pub fn mount(disk: &Path) -> anyhow::Result<ImageVolume> {
    let mut vol = Volume::new();
    vol.mount_path(disk)
        .with_context(|| format!("cannot mount '{}'", disk.display()))?;
    Ok(vol)
}

/// Persists metadata; the image file is closed by the unmount.
pub fn unmount(mut vol: ImageVolume) -> anyhow::Result<()> {
    vol.unmount()?;
    Ok(())
}

/// Mounts `disk`, runs `f` and unmounts, persisting metadata changes.
pub fn with_volume<T>(
    disk: &Path,
    f: impl FnOnce(&mut ImageVolume) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let mut vol = mount(disk)?;
    match f(&mut vol) {
        Ok(v) => {
            unmount(vol)?;
            Ok(v)
        }
        Err(e) => {
            if let Err(ue) = vol.unmount() {
                log::warn!("unmount after failure: {ue}");
            }
            Err(e)
        }
    }
}

/// Copies a host file into the volume under `name`.
///
/// A copy that runs out of space is removed again.
pub fn add_file(vol: &mut ImageVolume, source: &Path, name: &str) -> anyhow::Result<u64> {
    let mut reader =
        File::open(source).with_context(|| format!("cannot open '{}'", source.display()))?;
    let total = reader.metadata()?.len();

    vol.create(name)?;
    let h = vol.open(name)?;
    let copied = utils::copy_with_progress(&mut reader, vol, h, total, name);
    vol.close(h)?;

    match copied {
        Ok(n) => Ok(n),
        Err(e) => {
            vol.delete(name)?;
            Err(e.context(format!("cannot add '{name}'")))
        }
    }
}

/// Builds a complete image from a validated layout.
pub fn build(layout: &Layout, output: &Path) -> anyhow::Result<VolumeMeta> {
    let t0 = Instant::now();
    let meta = layout.validate()?;
    create(output, &meta)?;

    with_volume(output, |vol| {
        for file in &layout.files {
            let src = layout.source_path(file);
            let n = add_file(vol, &src, &file.name)?;
            crate::log_verbose!("Added '{}' ({})", file.name, utils::pretty_bytes(n));
        }
        Ok(())
    })?;

    crate::log_info!(
        "Built '{}' ({}) in {:.2?}",
        output.display(),
        utils::pretty_bytes(meta.size_bytes()),
        t0.elapsed()
    );
    Ok(meta)
}

/// Runs the offline checker on an unmounted image.
pub fn check(disk: &Path, opt: &CheckOptions) -> anyhow::Result<VerifyReport> {
    let mut dev = FileBlockDevice::open(disk)
        .with_context(|| format!("cannot open '{}'", disk.display()))?;
    let rep = check_device(&mut dev, opt)?;
    dev.close()?;
    Ok(rep)
}
