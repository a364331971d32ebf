use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Disk image holding the volume
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the image and format a fresh volume on it
    Mkfs {
        /// Number of data blocks, at most 8192
        #[arg(long, short, default_value_t = 8192)]
        data_blocks: usize,
    },

    /// Show the volume layout and free space
    Info,

    /// List the files in the root directory
    Ls,

    /// Copy a host file into the volume
    Add {
        host_file: PathBuf,

        /// Name inside the volume, defaults to the host file name
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Remove a file
    Rm { name: String },

    /// Print a file to stdout
    Cat { name: String },

    /// Show the size of a file
    Stat { name: String },
}
