// SPDX-License-Identifier: MIT

use std::io::Read;

use flatfs::{FileHandle, Volume};
use flatio::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Streams `reader` into an open volume file, starting at its cursor.
///
/// Fails if the volume runs out of data blocks before the reader is drained.
pub fn copy_with_progress<R: Read, D: BlockDevice>(
    reader: &mut R,
    vol: &mut Volume<D>,
    handle: FileHandle,
    total_size: u64,
    message: &str,
) -> anyhow::Result<u64> {
    let pb = if crate::utils::log_level() == crate::utils::LogLevel::Quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total_size)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.white}] {bytes}/{total_bytes} (ETA {eta_precise}) {msg}")?
            .progress_chars("█░░"),
    );
    pb.set_message(message.to_string());

    // Sixteen blocks per chunk keeps the write engine on its direct path
    let mut buffer = vec![0u8; 16 * BLOCK_SIZE];
    let mut copied = 0u64;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }

        let written = vol.write(handle, &buffer[..n])?;
        copied += written as u64;
        pb.inc(written as u64);
        if written < n {
            pb.abandon();
            anyhow::bail!(
                "volume is full after {} of {} bytes",
                copied,
                total_size
            );
        }
    }

    pb.finish_and_clear();
    Ok(copied)
}
