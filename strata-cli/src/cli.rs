use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strata_configuration::Config;
use tracing::debug;

use crate::stats::StatsArgs;

#[derive(Parser)]
#[command(name = "strata", version, about = "Inspect data kept in a strata store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[command(flatten)]
    pub args: GlobalArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every counter of a stats hash.
    #[command(name = "stats")]
    Stats(StatsArgs),
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// YAML configuration file. Built-in defaults are used when unset.
    #[arg(long, short, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn load(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                Ok(Config::from_file(path)?)
            }
            None => Ok(Config::default()),
        }
    }
}
