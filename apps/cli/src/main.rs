//! sitecorpus CLI: turn archived website captures into per-site text corpora.
//!
//! Routes every captured HTML page to the registered site or subsection it
//! belongs to and appends its prose to one document per site key.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
