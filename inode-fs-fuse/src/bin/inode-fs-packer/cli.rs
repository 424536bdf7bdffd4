use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pack every regular file of a directory into a fresh image
    Pack {
        /// Source directory
        #[arg(long, short)]
        source: PathBuf,

        /// Output image
        #[arg(long, short)]
        image: PathBuf,

        /// Image size in sectors
        #[arg(long, default_value_t = 16 * 2048)]
        sectors: usize,

        /// Sectors reserved at the start of the image
        #[arg(long, default_value_t = 1)]
        reserved: usize,
    },

    /// Copy the content of an inode to stdout
    Cat {
        #[arg(long, short)]
        image: PathBuf,

        /// Sector of the inode
        #[arg(long)]
        sector: u32,
    },

    /// Show kind and size of an inode
    Stat {
        #[arg(long, short)]
        image: PathBuf,

        /// Sector of the inode
        #[arg(long)]
        sector: u32,
    },
}
