use cybench_core::runner::{BenchmarkResult, ProgressFn};

use super::{OutputFormatter, ScriptLine, script_lines};

/// One line per script per run, no header, no progress. Suitable for
/// redirecting into further tooling.
pub(crate) struct CsvOutput;

impl OutputFormatter for CsvOutput {
    fn benchmark_start(&self, _database: &str, _address: &str) {}

    fn progress(&self) -> Option<ProgressFn> {
        None
    }

    fn report(&self, result: &BenchmarkResult) {
        for line in script_lines(result) {
            println!("{}", csv_line(&line));
        }
        // Category counts go to stderr so stdout stays machine-readable.
        for (category, count) in result.failures_by_category() {
            eprintln!("failed {category}: {count}");
        }
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }
}

fn csv_line(line: &ScriptLine) -> String {
    format!(
        "\"{}\",{},{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3}",
        line.name.replace('"', "\"\""),
        line.succeeded,
        line.failed,
        line.p50_ms,
        line.p95_ms,
        line.p99_ms,
        line.max_ms,
        line.mean_ms,
        line.tx_per_sec,
    )
}
