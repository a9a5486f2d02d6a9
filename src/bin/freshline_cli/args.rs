//! Command-line surface for `freshline_cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "freshline_cli", version, about = "Trigger freshline cache revalidation", long_about = None)]
pub struct Cli {
    /// Site base URL, e.g. <https://example.com>
    #[arg(long, env = "FRESHLINE_SITE_URL")]
    pub site: Option<String>,

    /// Path to file containing the shared secret (takes precedence over env)
    #[arg(long, env = "FRESHLINE_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// Shared secret from env (CLI flag intentionally disabled to avoid shell history leaks)
    #[arg(hide = true, env = "FRESHLINE_SECRET")]
    pub secret_env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Revalidate one or more tags
    Revalidate(RevalidateArgs),
    /// List the tags the server accepts
    Tags,
}

#[derive(Parser, Debug)]
pub struct RevalidateArgs {
    /// Tags to revalidate
    #[arg(required = true, num_args = 1..)]
    pub tags: Vec<String>,
}
