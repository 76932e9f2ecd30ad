use crate::command::Command;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[arg(long, default_value = "./polkahub.toml")]
    pub config: PathBuf,

    /// Overrides `storage_dir` from the config
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}
