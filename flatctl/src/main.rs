// SPDX-License-Identifier: MIT

mod commands;
mod image;
mod layout;
mod utils;

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::layout::Size;
use crate::utils::LogLevel;

#[derive(Parser)]
#[command(name = "flatctl", version, about = "Flat filesystem image tool", long_about = None)]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print details and library debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and format an empty disk image
    #[command(group(ArgGroup::new("geometry").required(true).args(["data_blocks", "size"])))]
    Mkfs {
        disk: PathBuf,
        /// Number of data blocks
        #[arg(long)]
        data_blocks: Option<u16>,
        /// Image size (e.g. 512K, 4M); the largest geometry that fits is used
        #[arg(long)]
        size: Option<Size>,
    },
    /// Print the volume report
    Info { disk: PathBuf },
    /// List files
    Ls { disk: PathBuf },
    /// Copy a host file into the volume
    Add {
        disk: PathBuf,
        source: PathBuf,
        /// Name inside the volume, defaults to the host file name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Write a file's content to stdout
    Cat { disk: PathBuf, name: String },
    /// Show one directory entry
    Stat { disk: PathBuf, name: String },
    /// Delete a file
    Rm { disk: PathBuf, name: String },
    /// Verify volume consistency
    Check {
        disk: PathBuf,
        /// Stop after the first phase reporting an error
        #[arg(long)]
        fail_fast: bool,
    },
    /// Build a disk image from layout.toml
    Build {
        /// Layout path
        #[arg(short, long, default_value = "layout.toml")]
        layout: PathBuf,
        /// Output path
        #[arg(short, long, default_value = "flat.img")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init_logging(LogLevel::from_flags(cli.quiet, cli.verbose));

    match cli.command {
        Commands::Mkfs {
            disk,
            data_blocks,
            size,
        } => commands::mkfs(&disk, data_blocks, size)?,
        Commands::Info { disk } => commands::info(&disk)?,
        Commands::Ls { disk } => commands::ls(&disk)?,
        Commands::Add { disk, source, name } => commands::add(&disk, &source, name.as_deref())?,
        Commands::Cat { disk, name } => commands::cat(&disk, &name)?,
        Commands::Stat { disk, name } => commands::stat(&disk, &name)?,
        Commands::Rm { disk, name } => commands::rm(&disk, &name)?,
        Commands::Check { disk, fail_fast } => commands::check(&disk, fail_fast)?,
        Commands::Build { layout, output } => commands::build(&layout, &output)?,
    }

    Ok(())
}
