//! Output formatting utilities for CLI.

use serde::Serialize;
use sprig::gp::{BatchResult, RunResult};
use sprig::stats::{GenerationRecord, StatsCollector};
use std::fmt::Write;

/// JSON-serializable batch result.
#[derive(Debug, Serialize)]
pub(super) struct JsonBatchResult<'a> {
    /// Index of the best run (null if every run failed).
    best_run: Option<usize>,
    /// Completed runs.
    runs: Vec<JsonRunResult>,
    /// Messages of failed runs.
    failures: Vec<String>,
    /// Per-generation statistics.
    history: &'a [GenerationRecord],
}

/// JSON-serializable run result.
#[derive(Debug, Serialize)]
pub(super) struct JsonRunResult {
    /// Run index.
    run: usize,
    /// Generations bred.
    generations: usize,
    /// Wall-clock seconds.
    elapsed_secs: f64,
    /// Criterion that ended the run.
    stopped_by: String,
    /// Best fitness found.
    best_fitness: Option<f64>,
    /// Best program, rendered.
    best_program: String,
}

impl JsonRunResult {
    fn from_run(result: &RunResult) -> Self {
        Self {
            run: result.run,
            generations: result.generations,
            elapsed_secs: result.elapsed.as_secs_f64(),
            stopped_by: result.stopped_by.clone(),
            best_fitness: result.best.fitness(),
            best_program: result.best.to_string(),
        }
    }
}

impl<'a> JsonBatchResult<'a> {
    /// Create from a batch and the statistics gathered during it.
    pub(super) fn from_batch(batch: &BatchResult, stats: &'a StatsCollector) -> Self {
        Self {
            best_run: batch.best().map(|r| r.run),
            runs: batch.runs.iter().map(JsonRunResult::from_run).collect(),
            failures: batch.failures.iter().map(ToString::to_string).collect(),
            history: stats.generations(),
        }
    }
}

/// Format a batch result as human-readable text.
pub(super) fn format_text(batch: &BatchResult) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Evolution Results ({} runs)", batch.runs.len() + batch.failures.len());
    output.push_str("========================================\n\n");

    for result in &batch.runs {
        let _ = writeln!(
            output,
            "  Run {}: fitness {} after {} generations in {:.2}s ({})",
            result.run,
            format_fitness(result.best.fitness()),
            result.generations,
            result.elapsed.as_secs_f64(),
            result.stopped_by
        );
    }
    for failure in &batch.failures {
        let _ = writeln!(output, "  {failure}");
    }

    if let Some(best) = batch.best() {
        let _ = writeln!(output, "\nBest (run {}): {}", best.run, format_fitness(best.best.fitness()));
        let _ = writeln!(output, "  Program: {}", best.best);
        let _ = writeln!(output, "  Size: {} nodes, depth {}", best.best.size(), best.best.depth());
    }

    output
}

fn format_fitness(fitness: Option<f64>) -> String {
    fitness.map_or_else(|| "-".to_string(), |f| format!("{f:.4}"))
}

/// Format per-generation statistics as CSV.
pub(super) fn format_csv(history: &[GenerationRecord]) -> String {
    let mut output = String::new();

    // Header
    output.push_str("run,generation,best,worst,mean,std_dev,mean_depth,mean_size,diversity\n");

    // Data rows
    for record in history {
        let _ = writeln!(
            output,
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.2},{:.2},{:.4}",
            record.run,
            record.generation,
            record.fitness.best,
            record.fitness.worst,
            record.fitness.mean,
            record.fitness.std_dev,
            record.mean_depth,
            record.mean_size,
            record.diversity
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig::gp::Objective;
    use sprig::stats::FitnessSummary;

    #[test]
    fn test_csv_has_header_and_rows() {
        let record = GenerationRecord {
            run: 1,
            generation: 2,
            fitness: FitnessSummary::from_fitness(&[1.0, 3.0], Objective::Minimise),
            mean_depth: 2.5,
            mean_size: 7.0,
            diversity: 0.5,
        };
        let csv = format_csv(&[record]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("run,generation,best"));
        assert_eq!(lines[1], "1,2,1.000000,3.000000,2.000000,1.000000,2.50,7.00,0.5000");
    }

    #[test]
    fn test_missing_fitness_renders_dash() {
        assert_eq!(format_fitness(None), "-");
        assert_eq!(format_fitness(Some(0.5)), "0.5000");
    }
}
