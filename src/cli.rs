//! CLI command implementations for Sprig.

pub(crate) mod evolve;

mod output;
mod problems;
mod progress;

use clap::ValueEnum;

pub(crate) use problems::Problem;

/// Output format for the `evolve` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// Per-generation statistics as CSV.
    Csv,
}

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Reading or writing a file failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// The underlying error.
        source: std::io::Error,
    },
    /// A JSON document could not be read or written.
    #[error("{context}: {source}")]
    Json {
        /// What was being done.
        context: String,
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The engine rejected the configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] sprig::ConfigError),
    /// Every run of the batch failed.
    #[error("no run completed: {0}")]
    NoResult(String),
}

impl CliError {
    /// Wrap an I/O error with context.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap a JSON error with context.
    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

/// Print the default configuration as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub(crate) fn print_default_config() -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(&sprig::gp::EvolutionConfig::default())
        .map_err(|e| CliError::json("JSON serialization failed", e))?;
    println!("{json}");
    Ok(())
}
