//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};
use porter_core::ConflictPolicyKind;
use std::path::PathBuf;

pub mod commands;

/// Port review comments onto later revisions of a change
#[derive(Parser, Debug)]
#[command(name = "porter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format: text (default) or JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr (filter with RUST_LOG)
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Port a change's comments onto one of its revisions
    Port(PortArgs),
}

#[derive(clap::Args, Debug)]
pub struct PortArgs {
    /// Change manifest (JSON) listing revision commits and comments
    #[arg(long)]
    pub manifest: PathBuf,

    /// Revision number to port comments onto
    #[arg(long)]
    pub target: u32,

    /// Repository holding the revision commits (default: current directory)
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// What to do with ranges touched by the diff (default: $PORTER_CONFLICT_POLICY or best)
    #[arg(long, value_enum)]
    pub policy: Option<ConflictPolicyKind>,

    /// Only port comments of unresolved threads
    #[arg(long)]
    pub unresolved_only: bool,

    /// Do not follow copied files
    #[arg(long)]
    pub no_copies: bool,

    /// Port the manifest's draft comments instead of published ones
    #[arg(long)]
    pub drafts: bool,
}
