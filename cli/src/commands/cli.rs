use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "netsentinel", version, about = "Network device fleet inspector")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.netsentinel/config.toml / ./netsentinel.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect from every device in the inventory, analyse and archive the run.
    Run(RunArgs),
    /// Inspect archived runs.
    Runs(RunsArgs),
    /// Check the inference endpoint and list usable models.
    Models,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Inventory file (TOML).
    #[arg(long, short = 'i')]
    pub inventory: PathBuf,

    /// Model to use; defaults to the configured one, then the first available match.
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub collect_concurrency: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub analyze_concurrency: Option<u32>,

    #[arg(long)]
    pub collect_retries: Option<u32>,

    #[arg(long)]
    pub analyze_retries: Option<u32>,

    /// Overall run deadline; reaching it cancels the run cooperatively.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    /// Print the composite report to stdout when the run finishes.
    #[arg(long, default_value_t = false)]
    pub print_report: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub command: RunsCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RunsCommand {
    /// Archived runs, oldest first.
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// One archived run.
    Show(ShowArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ShowArgs {
    pub run_id: String,

    /// Print the composite report only.
    #[arg(long, group = "format")]
    pub report: bool,

    /// Print the full record as JSON.
    #[arg(long, group = "format")]
    pub json: bool,
}
