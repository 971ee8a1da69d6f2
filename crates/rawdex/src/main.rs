//! Rawdex CLI - index a tree of camera RAW photographs into SQLite.
//!
//! Every `.ORF` file below the image root is decoded; its EXIF metadata, the
//! rank from an optional DxO sidecar and a JPEG preview go into one row of the
//! `image` table.
//!
//! # Usage
//!
//! ```bash
//! # Index into an existing catalogue
//! rawdex --image-root ~/Pictures --database catalogue.db
//!
//! # Use the directory above each file as its project, creating the table
//! rawdex --image-root ~/Pictures --database catalogue.db \
//!     --project-name-from-parent 1 --create-schema
//! ```

use clap::Parser;

mod cli;
mod logging;

/// Rawdex - index camera RAW photographs into a SQLite catalogue.
#[derive(Parser, Debug)]
#[command(name = "rawdex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,

    #[command(flatten)]
    index: cli::index::IndexArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli::index::load_config(&cli.index)?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Rawdex v{}", rawdex_core::VERSION);

    cli::index::execute(cli.index, config).await
}
