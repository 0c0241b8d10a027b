use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Painter asset tasks: inspect, validate and build QGF images and QFF fonts")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// QGF image tasks.
    Qgf {
        #[command(subcommand)]
        cmd: QgfCmd,
    },

    /// QFF font tasks.
    Qff {
        #[command(subcommand)]
        cmd: QffCmd,
    },

    /// Raw RLE encode/decode of arbitrary files.
    Rle {
        #[command(subcommand)]
        cmd: RleCmd,
    },
}

#[derive(Subcommand)]
pub enum QgfCmd {
    /// Print the descriptor and per-frame layout.
    Info {
        path: PathBuf,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Validate one or more files; fails if any is malformed.
    Validate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Build a QGF file from a JSON manifest.
    ///
    /// Usage:
    ///   cargo run -p xtask -- qgf encode logo.json -o logo.qgf
    Encode {
        manifest: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum QffCmd {
    /// Print the descriptor and glyph tables.
    Info {
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },

    Validate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Build a QFF file from a JSON manifest.
    Encode {
        manifest: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum RleCmd {
    Encode {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    Decode {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}
