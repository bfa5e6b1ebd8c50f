//! Command-line interface parsing for nfratings
//!
//! The binary drives the ratings pipeline against page snapshots, since there
//! is no live browser page to attach to.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Streaming-page ratings overlay: IMDb and Rotten Tomatoes badges
#[derive(Parser, Debug)]
#[command(name = "nfratings")]
#[command(about = "IMDb and Rotten Tomatoes ratings badges for streaming title pages")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Look up ratings for a title and print the badge text
    Lookup {
        /// Title as shown on the page
        title: String,
    },
    /// Run one detection pass over a JSON page snapshot
    ///
    /// Extracts the shown title, fetches its ratings and injects the badge,
    /// then prints the badge text.
    Render {
        /// Page snapshot to read
        page: PathBuf,

        /// Write the updated page snapshot here
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Log filter used when `RUST_LOG` is not set
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "nfratings=debug,info"
    } else {
        "nfratings=info,warn"
    }
}
