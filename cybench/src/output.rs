use std::io::IsTerminal;

use cybench_core::runner::{BenchmarkResult, ProgressFn};

use crate::cli::OutputFormat;

mod csv;
mod interactive;

pub(crate) trait OutputFormatter: Send + Sync {
    fn benchmark_start(&self, database: &str, address: &str);
    fn progress(&self) -> Option<ProgressFn>;
    fn report(&self, result: &BenchmarkResult);
    fn error(&self, message: &str);
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Interactive => Box::new(interactive::InteractiveOutput::new()),
        OutputFormat::Csv => Box::new(csv::CsvOutput),
        OutputFormat::Auto => {
            if std::io::stderr().is_terminal() {
                Box::new(interactive::InteractiveOutput::new())
            } else {
                Box::new(csv::CsvOutput)
            }
        }
    }
}

/// Per-script digest shared by both formatters. Latencies are milliseconds.
pub(crate) struct ScriptLine {
    pub(crate) name: String,
    pub(crate) succeeded: u64,
    pub(crate) failed: u64,
    pub(crate) p50_ms: f64,
    pub(crate) p95_ms: f64,
    pub(crate) p99_ms: f64,
    pub(crate) max_ms: f64,
    pub(crate) mean_ms: f64,
    pub(crate) tx_per_sec: f64,
}

pub(crate) fn script_lines(result: &BenchmarkResult) -> Vec<ScriptLine> {
    let secs = result.elapsed.as_secs_f64().max(1e-9);
    result
        .scripts
        .iter()
        .map(|(name, stats)| {
            let histogram = &stats.latencies;
            ScriptLine {
                name: name.to_string(),
                succeeded: stats.succeeded,
                failed: stats.failed(),
                p50_ms: histogram.value_at_quantile(0.50) as f64 / 1000.0,
                p95_ms: histogram.value_at_quantile(0.95) as f64 / 1000.0,
                p99_ms: histogram.value_at_quantile(0.99) as f64 / 1000.0,
                max_ms: histogram.max() as f64 / 1000.0,
                mean_ms: histogram.mean() / 1000.0,
                tx_per_sec: stats.succeeded as f64 / secs,
            }
        })
        .collect()
}
