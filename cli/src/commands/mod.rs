pub mod cli;
pub mod models;
pub mod run;
pub mod runs;

use netsentinel_core::config::AppConfig;

use crate::error::CliError;

pub async fn dispatch(cmd: cli::Commands, cfg: &AppConfig) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Run(args) => run::handle_run(args, cfg).await,
        cli::Commands::Runs(args) => runs::handle_runs(args, cfg).await,
        cli::Commands::Models => models::handle_models(cfg).await,
    }
}
