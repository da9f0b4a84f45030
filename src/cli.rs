//! Command-line interface for the stickerlab binary
//!
//! Headless maintenance commands over a JSON store: render a single
//! sticker to PNG, export a pack bundle, drop orphaned sticker records.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Sticker composition engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON store file
    #[arg(
        short = 's',
        long = "store",
        value_name = "FILE",
        default_value = "stickerlab.json",
        global = true
    )]
    pub store: PathBuf,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one sticker to a PNG file
    Render {
        /// Sticker id
        #[arg(value_name = "STICKER_ID")]
        sticker: Uuid,

        /// Output file (default: <STICKER_ID>.png)
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Export a pack as a bundle directory (meta.json plus rendered PNGs)
    Export {
        /// Pack id (may be omitted when the store holds exactly one pack)
        #[arg(value_name = "PACK_ID")]
        pack: Option<Uuid>,

        /// Directory the bundle folder is created in
        #[arg(short = 'o', long = "out", value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },

    /// Delete sticker records that no pack references
    Clean,
}
