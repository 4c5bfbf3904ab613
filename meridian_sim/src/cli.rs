// meridian_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Meridian: a GNSS/INS sensor-stream simulator.
///
/// This struct defines the command-line arguments for any binary that runs
/// the Meridian simulation library.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/flight.toml")]
    pub scenario: PathBuf,

    /// Overrides the scenario's trial count.
    #[arg(long)]
    pub trials: Option<usize>,

    /// Series names to render after the run (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub plot: Vec<String>,

    /// List the scenarios found under the scenario directory and exit.
    #[arg(long, default_value_t = false)]
    pub list_scenarios: bool,

    /// Where `--list-scenarios` looks for scenario files.
    #[arg(long, default_value = "assets/scenarios")]
    pub scenario_dir: PathBuf,
}
