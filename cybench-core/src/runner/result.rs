use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::client::{ClientError, ErrorCategory};
use crate::runner::recorder::new_latency_histogram;

/// Per-script outcome counters and latency distribution.
#[derive(Debug, Clone)]
pub struct ScriptStats {
    pub succeeded: u64,
    pub failed_by_category: BTreeMap<ErrorCategory, u64>,
    pub latencies: Histogram<u64>,
}

impl Default for ScriptStats {
    fn default() -> Self {
        Self {
            succeeded: 0,
            failed_by_category: BTreeMap::new(),
            latencies: new_latency_histogram(),
        }
    }
}

impl ScriptStats {
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed_by_category.values().sum()
    }

    pub fn merge(&mut self, other: &ScriptStats) {
        self.succeeded += other.succeeded;
        for (category, count) in &other.failed_by_category {
            *self.failed_by_category.entry(*category).or_default() += count;
        }
        let _ = self.latencies.add(&other.latencies);
    }
}

#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub worker_id: u64,
    pub scripts: BTreeMap<Arc<str>, ScriptStats>,
    /// Set when the worker stopped on a fatal error; forces a non-zero exit.
    pub error: Option<ClientError>,
}

impl WorkerResult {
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.scripts.values().map(|stats| stats.succeeded).sum()
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.scripts.values().map(ScriptStats::failed).sum()
    }
}

/// Merged outcome of a benchmark run across all workers.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub database: String,
    pub scenario: String,
    pub elapsed: Duration,
    pub scripts: BTreeMap<Arc<str>, ScriptStats>,
    pub workers: Vec<WorkerResult>,
}

impl BenchmarkResult {
    #[must_use]
    pub fn new(database: &str, scenario: &str) -> Self {
        Self {
            database: database.to_string(),
            scenario: scenario.to_string(),
            elapsed: Duration::ZERO,
            scripts: BTreeMap::new(),
            workers: Vec::new(),
        }
    }

    pub fn add(&mut self, worker: WorkerResult) {
        for (name, stats) in &worker.scripts {
            self.scripts
                .entry(name.clone())
                .or_default()
                .merge(stats);
        }
        self.workers.push(worker);
    }

    #[must_use]
    pub fn total_succeeded(&self) -> u64 {
        self.scripts.values().map(|stats| stats.succeeded).sum()
    }

    #[must_use]
    pub fn total_failed(&self) -> u64 {
        self.scripts.values().map(ScriptStats::failed).sum()
    }

    #[must_use]
    pub fn failures_by_category(&self) -> BTreeMap<ErrorCategory, u64> {
        let mut out = BTreeMap::new();
        for stats in self.scripts.values() {
            for (category, count) in &stats.failed_by_category {
                *out.entry(*category).or_default() += count;
            }
        }
        out
    }

    #[must_use]
    pub fn merged_histogram(&self) -> Histogram<u64> {
        let mut merged = new_latency_histogram();
        for stats in self.scripts.values() {
            let _ = merged.add(&stats.latencies);
        }
        merged
    }
}
