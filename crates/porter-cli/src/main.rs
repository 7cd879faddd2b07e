//! porter - port review comments onto later revisions of a change

use anyhow::Result;
use clap::Parser;
use std::env;

use porter_cli::cli::commands::run_port;
use porter_cli::cli::{Cli, Commands};
use porter_cli::logging;
use porter_cli::output::OutputFormat;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    let workspace_root = env::current_dir()?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Commands::Port(args) => {
            run_port(&args, &workspace_root, format)?;
        }
    }

    Ok(())
}
