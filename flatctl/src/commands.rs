// SPDX-License-Identifier: MIT

use colored::Colorize;
use std::io::Write;
use std::path::Path;

use flatfs::checker::{ReportDisplayOpts, Severity};
use flatfs::prelude::*;

use crate::image;
use crate::layout::{Layout, Size};
use crate::utils::{self, LogLevel};

pub fn mkfs(disk: &Path, data_blocks: Option<u16>, size: Option<Size>) -> anyhow::Result<()> {
    let meta = match (data_blocks, size) {
        (Some(n), _) => VolumeMeta::new(n)?,
        (None, Some(size)) => {
            VolumeMeta::for_device_blocks(size.bytes() / flatio::BLOCK_SIZE as u64)?
        }
        (None, None) => anyhow::bail!("either --data-blocks or --size is required"),
    };
    image::create(disk, &meta)?;
    crate::log_info!(
        "{} '{}' ({} data blocks, {})",
        "Formatted".green(),
        disk.display(),
        meta.data_blocks,
        utils::pretty_bytes(meta.size_bytes())
    );
    Ok(())
}

pub fn info(disk: &Path) -> anyhow::Result<()> {
    let info = image::with_volume(disk, |vol| Ok(vol.info()?))?;
    println!("{info}");
    Ok(())
}

pub fn ls(disk: &Path) -> anyhow::Result<()> {
    let list = image::with_volume(disk, |vol| Ok(vol.list()?))?;
    println!("FS Ls:");
    for entry in list {
        println!("{entry}");
    }
    Ok(())
}

pub fn add(disk: &Path, source: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let name = match name {
        Some(n) => n.to_string(),
        None => source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("cannot derive a name from '{}'", source.display()))?
            .to_string(),
    };
    let n = image::with_volume(disk, |vol| image::add_file(vol, source, &name))?;
    crate::log_info!("{} '{}' ({})", "Added".green(), name, utils::pretty_bytes(n));
    Ok(())
}

/// Streams the content of `name` to `out`.
pub fn cat_to<W: Write>(disk: &Path, name: &str, out: &mut W) -> anyhow::Result<u64> {
    image::with_volume(disk, |vol| {
        let h = vol.open(name)?;
        let mut buf = vec![0u8; 16 * flatio::BLOCK_SIZE];
        let mut total = 0u64;
        let res = loop {
            match vol.read(h, &mut buf) {
                Ok(0) => break Ok(total),
                Ok(n) => {
                    if let Err(e) = out.write_all(&buf[..n]) {
                        break Err(e.into());
                    }
                    total += n as u64;
                }
                Err(e) => break Err(e.into()),
            }
        };
        vol.close(h)?;
        res
    })
}

pub fn cat(disk: &Path, name: &str) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    cat_to(disk, name, &mut lock)?;
    lock.flush()?;
    Ok(())
}

pub fn stat(disk: &Path, name: &str) -> anyhow::Result<()> {
    let listing = image::with_volume(disk, |vol| Ok(vol.stat(name)?))?;
    println!("{listing}");
    crate::log_verbose!(
        "{} byte(s) in {} block(s)",
        utils::sep_u64(listing.size as u64),
        (listing.size as usize).div_ceil(flatio::BLOCK_SIZE)
    );
    Ok(())
}

pub fn rm(disk: &Path, name: &str) -> anyhow::Result<()> {
    image::with_volume(disk, |vol| Ok(vol.delete(name)?))?;
    crate::log_info!("{} '{}'", "Removed".green(), name);
    Ok(())
}

pub fn check(disk: &Path, fail_fast: bool) -> anyhow::Result<()> {
    let opt = CheckOptions {
        phases: VerifyPhases::ALL,
        fail_fast,
    };
    let rep = image::check(disk, &opt)?;
    let min_level = if utils::log_level() == LogLevel::Verbose {
        Severity::Info
    } else {
        Severity::Warn
    };
    print!(
        "{}",
        rep.display_with(ReportDisplayOpts {
            min_level,
            prefix: "  ",
            show_summary: true,
            ..Default::default()
        })
    );

    if rep.ok() {
        crate::log_info!("{} {}", disk.display(), "clean".green().bold());
        Ok(())
    } else {
        crate::log_normal!("{} {}", disk.display(), "has errors".red().bold());
        anyhow::bail!("{} error(s) found", rep.count(Severity::Error))
    }
}

pub fn build(layout_path: &Path, output: &Path) -> anyhow::Result<()> {
    let layout = Layout::from_file(layout_path)?;
    crate::log_info!("Layout '{}'", layout_path.display());
    if utils::log_level() != LogLevel::Quiet {
        print!("{layout}");
    }
    crate::log_info!("Writing disk image to: {}", output.display());
    image::build(&layout, output)?;

    let rep = image::check(output, &CheckOptions::default())?;
    if !rep.ok() {
        anyhow::bail!("built image failed verification:\n{}", rep.warn_and_errors());
    }
    crate::log_info!("{}", "Verified".green());
    Ok(())
}
