//! freshline_cli: trigger tag revalidation from deploy hooks and scripts.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;

use clap::Parser;
use freshline::domain::tags::{TAG_SET_VERSION, TagRegistry};

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tags => print_tags(),
        Commands::Revalidate(ref cmd) => {
            let ctx = build_ctx_from_cli(&cli)?;
            let response = ctx.revalidate(cmd.tags.clone()).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            for warning in &response.warnings {
                eprintln!("warning: {warning}");
            }
        }
    }

    Ok(())
}

fn print_tags() {
    println!("# tag set v{TAG_SET_VERSION}");
    for tag in TagRegistry::new().allowed_tags() {
        println!("{tag}");
    }
}
