use clap::Subcommand;

use super::config::ConfigArgs;
use super::run::RunArgs;
use super::selectors::SelectorsArgs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan and execute a goal, printing the run result as JSON
    Run(RunArgs),

    /// List cached selectors for an origin
    Selectors(SelectorsArgs),

    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}
