use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use cybench_core::ErrorCategory;
use cybench_core::runner::{BenchmarkResult, ProgressFn, ProgressReport};

use super::{OutputFormatter, script_lines};

const BAR_RESOLUTION: u64 = 1000;

/// Terminal output: a stderr progress bar during the run, a human summary
/// on stdout at the end.
pub(crate) struct InteractiveOutput {
    bar: ProgressBar,
}

impl InteractiveOutput {
    pub(crate) fn new() -> Self {
        let bar =
            ProgressBar::with_draw_target(Some(BAR_RESOLUTION), ProgressDrawTarget::stderr_with_hz(5));
        bar.set_style(
            ProgressStyle::with_template("[{bar:40}] {percent:>3}% {msg}")
                .unwrap_or_else(|err| panic!("invalid progress template: {err}")),
        );
        Self { bar }
    }
}

impl OutputFormatter for InteractiveOutput {
    fn benchmark_start(&self, database: &str, address: &str) {
        if database.is_empty() {
            eprintln!("benchmarking {address}");
        } else {
            eprintln!("benchmarking {address} (database '{database}')");
        }
    }

    fn progress(&self) -> Option<ProgressFn> {
        let bar = self.bar.clone();
        Some(Arc::new(move |report: &ProgressReport| {
            let position = (report.completeness.clamp(0.0, 1.0) * BAR_RESOLUTION as f64) as u64;
            bar.set_position(position);
            bar.set_message(format!("{:.1} tx/s", report.tx_per_sec));
        }))
    }

    fn report(&self, result: &BenchmarkResult) {
        self.bar.finish_and_clear();

        let database = if result.database.is_empty() {
            "<default>"
        } else {
            &result.database
        };
        println!("database: {database}");
        println!("scenario:{}", result.scenario);
        println!("duration: {:.1}s", result.elapsed.as_secs_f64());
        println!();

        println!("succeeded: {}", result.total_succeeded());
        println!("failed:    {}", result.total_failed());
        let failures = result.failures_by_category();
        for category in ErrorCategory::ALL {
            let count = failures.get(&category).copied().unwrap_or(0);
            println!("  {:<14} {count}", format!("{category}:"));
        }
        println!();

        println!(
            "{:<32} {:>10} {:>8} {:>9} {:>9} {:>9} {:>9} {:>9} {:>10}",
            "script", "succeeded", "failed", "p50 ms", "p95 ms", "p99 ms", "max ms", "mean ms",
            "tx/s"
        );
        for line in script_lines(result) {
            println!(
                "{:<32} {:>10} {:>8} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>10.1}",
                line.name,
                line.succeeded,
                line.failed,
                line.p50_ms,
                line.p95_ms,
                line.p99_ms,
                line.max_ms,
                line.mean_ms,
                line.tx_per_sec,
            );
        }
    }

    fn error(&self, message: &str) {
        // Keep the message above the bar instead of letting the redraw eat it.
        self.bar.suspend(|| eprintln!("{message}"));
    }
}
