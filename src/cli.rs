//! Command-line surface (spec's ambient A3), adapted from the
//! teacher's `command_line_options`.
use std::path::PathBuf;

use clap::Parser;

use crate::parameters::Override;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CommandLineOptions {
    /// `--set key/sub:value`, repeatable.
    #[clap(long = "set", multiple_occurrences = true)]
    pub parameter_overrides: Vec<Override>,
    #[clap(long)]
    pub parameter_file: PathBuf,
    #[clap(short, parse(from_occurrences))]
    pub verbosity: usize,
}
