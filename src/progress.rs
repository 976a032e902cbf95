//! Progress rendering for assignment runs.

use assignment::{AssignmentOutcome, BatchReport, CostCenterId, ProgressCallback};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One progress bar per cost center group
pub struct AssignProgress {
    hidden: bool,
    bar: Option<ProgressBar>,
}

impl AssignProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            hidden: quiet,
            bar: None,
        }
    }

    /// Finish the current bar, if any
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }

    fn print(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None if !self.hidden => println!("{}", line),
            None => {}
        }
    }
}

impl ProgressCallback for AssignProgress {
    fn on_group_start(&mut self, cost_center: &CostCenterId, users: usize, batches: usize) {
        self.finish();

        let bar = if self.hidden {
            ProgressBar::with_draw_target(Some(users as u64), ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new(users as u64)
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.set_message(format!("{} ({} batches)", cost_center, batches));
        self.bar = Some(bar);
    }

    fn on_outcome(&mut self, _outcome: &AssignmentOutcome) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&mut self, report: &BatchReport) {
        if let Some(error) = &report.transport_error {
            self.print(format!(
                "{} Batch {}/{} for {} failed: {}",
                "✗".red(),
                report.index,
                report.total_batches,
                report.cost_center_id,
                error
            ));
        } else if report.failed > 0 {
            self.print(format!(
                "{} Batch {}/{} for {}: {} of {} users rejected",
                "⚠".yellow(),
                report.index,
                report.total_batches,
                report.cost_center_id,
                report.failed,
                report.size
            ));
        }
    }
}

impl Drop for AssignProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
