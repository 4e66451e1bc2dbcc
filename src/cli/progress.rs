//! Progress bar driven by engine events.

use indicatif::{ProgressBar, ProgressStyle};
use sprig::{Event, EventKind, Listener};

/// Advances a progress bar by one step per evaluated generation.
#[derive(Debug)]
pub(crate) struct Progress {
    bar: ProgressBar,
    steps_per_run: u64,
}

impl Progress {
    /// Event kinds the bar reacts to.
    pub(crate) const KINDS: [EventKind; 2] = [EventKind::GenerationEnd, EventKind::RunEnd];

    /// Create a bar for `runs` runs of up to `generations` generations each.
    pub(crate) fn new(runs: usize, generations: usize) -> Self {
        let steps_per_run = generations as u64 + 1;
        let bar = ProgressBar::new(runs as u64 * steps_per_run);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} generations {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        Self { bar, steps_per_run }
    }

    /// Close the bar.
    pub(crate) fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl Listener for Progress {
    fn notify(&mut self, event: &Event<'_>) {
        match *event {
            Event::GenerationEnd { run, generation, .. } => {
                self.bar.inc(1);
                self.bar.set_message(format!("(run {run}, generation {generation})"));
            }
            // Runs that stop early skip their remaining steps.
            Event::RunEnd { run, .. } => self.bar.set_position((run as u64 + 1) * self.steps_per_run),
            _ => {}
        }
    }
}
