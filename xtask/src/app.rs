use anyhow::Result;

use crate::cli::{Cmd, QffCmd, QgfCmd, RleCmd};
use crate::tasks::{qff, qgf, rle};

pub fn run(cli: crate::cli::Cli) -> Result<()> {
    match cli.cmd {
        Cmd::Qgf { cmd } => match cmd {
            QgfCmd::Info { path, json } => qgf::info(&path, json),
            QgfCmd::Validate { paths } => qgf::validate(&paths),
            QgfCmd::Encode { manifest, output } => qgf::encode(&manifest, &output),
        },
        Cmd::Qff { cmd } => match cmd {
            QffCmd::Info { path, json } => qff::info(&path, json),
            QffCmd::Validate { paths } => qff::validate(&paths),
            QffCmd::Encode { manifest, output } => qff::encode(&manifest, &output),
        },
        Cmd::Rle { cmd } => match cmd {
            RleCmd::Encode { input, output } => rle::encode(&input, &output),
            RleCmd::Decode { input, output } => rle::decode(&input, &output),
        },
    }
}
