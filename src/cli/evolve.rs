//! Evolve command implementation.

use super::output::{JsonBatchResult, format_csv, format_text};
use super::progress::Progress;
use super::{CliError, OutputFormat, Problem};
use sprig::events::SharedListener;
use sprig::gp::{EvolutionConfig, Evolver};
use sprig::stats::StatsCollector;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Arguments of the `evolve` command.
#[derive(clap::Args, Debug)]
pub(crate) struct EvolveArgs {
    /// Problem to solve
    #[arg(value_enum)]
    problem: Problem,

    /// Number of parity inputs
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=16))]
    bits: u8,

    /// JSON configuration file (default: built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Population size (overrides the config)
    #[arg(short, long)]
    population: Option<usize>,

    /// Generations per run (overrides the config)
    #[arg(short, long)]
    generations: Option<usize>,

    /// Independent runs (overrides the config)
    #[arg(short, long)]
    runs: Option<usize>,

    /// Output format: text, json, or csv
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Show progress bar
    #[arg(long)]
    progress: bool,

    /// Save the best program as JSON
    #[arg(long)]
    save: Option<PathBuf>,
}

impl EvolveArgs {
    /// Load the configuration and apply flag overrides.
    fn resolve_config(&self) -> Result<EvolutionConfig, CliError> {
        // A config file is taken as written, including a null target.
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => EvolutionConfig {
                target_fitness: Some(self.problem.target()),
                ..EvolutionConfig::default()
            },
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(population) = self.population {
            config.population_size = population;
        }
        if let Some(generations) = self.generations {
            config.generations = generations;
        }
        if let Some(runs) = self.runs {
            config.runs = runs;
        }
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<EvolutionConfig, CliError> {
    let text = fs::read_to_string(path).map_err(|e| CliError::io(format!("Failed to read {}", path.display()), e))?;
    serde_json::from_str(&text).map_err(|e| CliError::json(format!("Failed to parse {}", path.display()), e))
}

/// Execute the evolve command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a file cannot be
/// read or written, or no run completes.
pub(crate) fn execute(args: &EvolveArgs) -> Result<(), CliError> {
    let config = args.resolve_config()?;
    let (syntax, fitness) = args.problem.build(usize::from(args.bits))?;
    let (runs, generations, objective) = (config.runs, config.generations, config.objective);
    log::info!("evolving {:?} with {} primitives", args.problem, syntax.primitives().len());

    let mut evolver = Evolver::new(config, syntax, fitness)?;
    let stats = StatsCollector::attach(evolver.events_mut(), objective)?;
    let progress = if args.progress {
        let progress = Rc::new(RefCell::new(Progress::new(runs, generations)));
        let shared: SharedListener = progress.clone();
        evolver.events_mut().subscribe_all(&Progress::KINDS, &shared)?;
        Some(progress)
    } else {
        None
    };

    let batch = evolver.run_batch()?;
    if let Some(progress) = progress {
        progress.borrow().finish();
    }

    let Some(best) = batch.best() else {
        let reasons: Vec<String> = batch.failures.iter().map(ToString::to_string).collect();
        return Err(CliError::NoResult(reasons.join("; ")));
    };

    if let Some(path) = &args.save {
        let json = serde_json::to_string_pretty(&best.best)
            .map_err(|e| CliError::json("JSON serialization failed", e))?;
        fs::write(path, json).map_err(|e| CliError::io(format!("Failed to write {}", path.display()), e))?;
    }

    let stats = stats.borrow();
    match args.format {
        OutputFormat::Text => print!("{}", format_text(&batch)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonBatchResult::from_batch(&batch, &stats))
                .map_err(|e| CliError::json("JSON serialization failed", e))?;
            println!("{json}");
        }
        OutputFormat::Csv => print!("{}", format_csv(stats.generations())),
    }

    Ok(())
}
