mod chapter_writer;
mod cli;
mod config;
mod converter;
mod cut;
mod epub_reader;
mod html_reader;
mod metadata;
mod narration;
mod pdf_reader;
mod reader;
mod sentences;
mod speech;
mod text;
mod video;
mod wav;

use crate::config::LogLevel;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = config::load_config(&cli.configfile)?;
    init_tracing(config.log_level);
    converter::convert(&config)
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(filter))
        .init();
}
