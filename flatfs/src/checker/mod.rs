// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{collections::BTreeSet, format, vec, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeSet;

use flatio::prelude::*;

use crate::{
    constant::*,
    directory::{Directory, validate_name},
    errors::*,
    fat::{AllocationTable, FatEntry},
    meta::VolumeMeta,
    volume::load_metadata,
};

mod types;

pub use types::*;

/// Offline consistency checker over the in-memory metadata of a volume.
///
/// Phases:
/// - `GEOMETRY`: table length, reserved entry, links in range
/// - `DIRECTORY`: names valid and unique, first blocks in range
/// - `CHAIN`: every file chain terminated, loop-free and long enough
/// - `CROSSREF`: no block shared by two files, no lost allocated block
pub struct VolumeChecker<'a> {
    meta: &'a VolumeMeta,
    fat: &'a AllocationTable,
    dir: &'a Directory,
}

impl<'a> VolumeChecker<'a> {
    pub fn new(meta: &'a VolumeMeta, fat: &'a AllocationTable, dir: &'a Directory) -> Self {
        Self { meta, fat, dir }
    }

    pub fn check_with(&self, opt: &CheckOptions) -> VerifyReport {
        let mut rep = VerifyReport::default();
        self.run_phase(opt, &mut rep, VerifyPhases::GEOMETRY, Self::check_geometry);
        self.run_phase(opt, &mut rep, VerifyPhases::DIRECTORY, Self::check_directory);
        self.run_phase(opt, &mut rep, VerifyPhases::CHAIN, Self::check_chain);
        self.run_phase(opt, &mut rep, VerifyPhases::CROSSREF, Self::check_cross_reference);

        rep.push(Finding::info(
            "SUMMARY",
            format!(
                "files={} free_blocks={}/{} free_slots={}/{}",
                self.dir.len(),
                self.fat.free_count(),
                self.meta.data_blocks,
                self.dir.free_slots(),
                FLAT_MAX_FILES
            ),
        ));
        rep
    }

    #[inline]
    pub fn check_all(&self) -> VerifyReport {
        self.check_with(&CheckOptions::default())
    }

    fn run_phase<F>(&self, opt: &CheckOptions, rep: &mut VerifyReport, phase: VerifyPhases, f: F)
    where
        F: Fn(&Self, &mut VerifyReport),
    {
        if !opt.phases.contains(phase) {
            return;
        }
        if opt.fail_fast && rep.has_error() {
            return;
        }
        f(self, rep);
    }

    fn check_geometry(&self, rep: &mut VerifyReport) {
        if self.fat.len() != self.meta.data_blocks as usize {
            rep.push(Finding::err(
                "FAT_LEN",
                format!(
                    "allocation table holds {} entries for {} data blocks",
                    self.fat.len(),
                    self.meta.data_blocks
                ),
            ));
        }

        if self.fat.entry(FLAT_FAT_RESERVED) != Ok(FatEntry::EndOfChain) {
            rep.push(Finding::err(
                "FAT_RESERVED",
                "reserved entry 0 is not marked end of chain",
            ));
        }

        for (i, &raw) in self.fat.raw().iter().enumerate().skip(1) {
            if let FatEntry::Next(n) = FatEntry::decode(raw)
                && !self.fat.is_data_block(n)
            {
                rep.push(Finding::err(
                    "FAT_RANGE",
                    format!("entry {i} links to out-of-range block {n}"),
                ));
            }
        }
    }

    fn check_directory(&self, rep: &mut VerifyReport) {
        let mut seen = BTreeSet::new();
        for e in self.dir.entries() {
            if validate_name(&e.name).is_err() {
                rep.push(Finding::err("DIR_NAME", format!("invalid name {:?}", e.name)));
            }
            if !seen.insert(e.name.as_str()) {
                rep.push(Finding::err("DIR_DUP", format!("duplicate name {:?}", e.name)));
            }
            match e.first_block {
                None if e.size > 0 => rep.push(Finding::err(
                    "DIR_SIZE",
                    format!("{:?} has {} bytes but no data block", e.name, e.size),
                )),
                Some(b) if !self.fat.is_data_block(b) => rep.push(Finding::err(
                    "DIR_FIRST",
                    format!("{:?} starts at out-of-range block {b}", e.name),
                )),
                _ => {}
            }
        }
    }

    fn check_chain(&self, rep: &mut VerifyReport) {
        for e in self.dir.entries() {
            let Some(first) = e.first_block else {
                continue;
            };
            let chain = match self.fat.collect_chain(first) {
                Ok(chain) => chain,
                Err(err) => {
                    rep.push(Finding::err("CHAIN", format!("{:?}: {err}", e.name)));
                    continue;
                }
            };

            let needed = (e.size as usize).div_ceil(BLOCK_SIZE).max(1);
            if chain.len() < needed {
                rep.push(Finding::err(
                    "CHAIN_SHORT",
                    format!(
                        "{:?}: {} block(s) for {} bytes",
                        e.name,
                        chain.len(),
                        e.size
                    ),
                ));
            } else if chain.len() > needed {
                rep.push(Finding::warn(
                    "CHAIN_LONG",
                    format!(
                        "{:?}: {} block(s) allocated, {} in use",
                        e.name,
                        chain.len(),
                        needed
                    ),
                ));
            }
        }
    }

    fn check_cross_reference(&self, rep: &mut VerifyReport) {
        let mut owner: Vec<Option<&str>> = vec![None; self.fat.len()];

        for e in self.dir.entries() {
            let Some(first) = e.first_block else {
                continue;
            };
            // Broken chains are reported by the chain phase
            let Ok(chain) = self.fat.collect_chain(first) else {
                continue;
            };
            for b in chain {
                match owner[b as usize] {
                    Some(other) => rep.push(Finding::err(
                        "CROSS_LINK",
                        format!("block {b} shared by {other:?} and {:?}", e.name),
                    )),
                    None => owner[b as usize] = Some(e.name.as_str()),
                }
            }
        }

        let lost: Vec<usize> = self
            .fat
            .raw()
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(i, raw)| **raw != FLAT_FAT_FREE && owner[*i].is_none())
            .map(|(i, _)| i)
            .collect();
        if !lost.is_empty() {
            rep.push(Finding::warn(
                "LOST_BLOCKS",
                format!(
                    "{} allocated block(s) not reachable from the directory (first: {})",
                    lost.len(),
                    lost[0]
                ),
            ));
        }
    }
}

/// Runs the checker over already loaded metadata.
pub fn check_volume(
    meta: &VolumeMeta,
    fat: &AllocationTable,
    dir: &Directory,
    opt: &CheckOptions,
) -> VerifyReport {
    VolumeChecker::new(meta, fat, dir).check_with(opt)
}

/// Loads the metadata of an unmounted device and checks it.
///
/// A superblock or directory that cannot be decoded is reported as a
/// finding; device failures are returned as errors.
pub fn check_device<D: BlockDevice + ?Sized>(
    dev: &mut D,
    opt: &CheckOptions,
) -> FsCheckerResult<VerifyReport> {
    match load_metadata(dev) {
        Ok((meta, fat, dir)) => Ok(check_volume(&meta, &fat, &dir, opt)),
        Err(FsError::Device(e)) => Err(FsCheckerError::IO(e)),
        Err(e) => {
            let mut rep = VerifyReport::default();
            rep.push(Finding::err("SUPERBLOCK", format!("{e}")));
            Ok(rep)
        }
    }
}
