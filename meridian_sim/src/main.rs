// meridian_sim/src/main.rs

use clap::Parser;
use tracing::{error, info};

use meridian_core::engine::TrialSelector;
use meridian_core::error::SimError;
use meridian_sim::cli::Cli;
use meridian_sim::config::{load_scenario, scenario_catalog};
use meridian_sim::plot::PlottersBackend;

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    if cli.list_scenarios {
        for scenario in scenario_catalog(&cli.scenario_dir) {
            println!("{}", scenario.display());
        }
        return Ok(());
    }

    let config = load_scenario(&cli.scenario)?;
    let base_dir = cli.scenario.parent().unwrap_or_else(|| ".".as_ref());
    let seed = config.simulation.seed.unwrap_or_else(rand::random);
    let trials = cli.trials.unwrap_or(config.simulation.trials);
    info!(scenario = %cli.scenario.display(), seed, trials, "loaded scenario");

    let mut engine = config.build_engine(base_dir, seed)?;
    engine.run(trials)?;

    println!("available results:");
    for (name, description) in engine.results() {
        println!("  {name:12} {description}");
    }

    if !cli.plot.is_empty() {
        let names: Vec<&str> = cli.plot.iter().map(String::as_str).collect();
        let mut backend = PlottersBackend::new(&config.simulation.output_dir)?;
        engine.plot(&names, TrialSelector::All, &mut backend)?;
    }
    Ok(())
}
