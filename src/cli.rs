use clap::Parser;
use std::path::PathBuf;

/// Split an ebook into chapter texts and narrate them as an audiobook
#[derive(Parser, Debug)]
#[command(name = "ebook2audio", version, about)]
pub struct Cli {
    /// YAML configuration file describing the input book, output layout and speech settings
    pub configfile: PathBuf,
}
