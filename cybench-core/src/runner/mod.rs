mod error;
mod recorder;
mod result;
mod signals;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

pub use error::{Error, Result};
pub use recorder::ResultRecorder;
pub use result::{BenchmarkResult, ScriptStats, WorkerResult};
pub use signals::{StopSignal, install_signal_handler};
pub use worker::Worker;

use crate::client::CypherClient;
use crate::workload::Workload;

/// Non-final, non-destructive view of the run, emitted every progress
/// interval. Reports carry success throughput only.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    /// Fraction of the configured duration already spent, in `[0, 1]`.
    pub completeness: f64,
    pub elapsed: Duration,
    pub total_succeeded: u64,
    /// Successful transactions per second over the last interval.
    pub tx_per_sec: f64,
}

pub type ProgressFn = Arc<dyn Fn(&ProgressReport) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub database: String,
    /// Human-readable restatement of the effective flags, echoed in reports.
    pub scenario: String,
    pub clients: usize,
    /// Total transactions per second across all clients; latency mode only.
    pub rate: f64,
    pub latency_mode: bool,
    pub duration: Duration,
    pub progress_interval: Duration,
}

/// Seconds per transaction per worker for a total rate spread across
/// `clients` workers.
#[must_use]
pub fn pacing_per_client(clients: usize, rate: f64) -> Duration {
    Duration::from_secs_f64(clients as f64 / rate)
}

/// Spawns one worker task per client, waits out the configured duration
/// (emitting progress snapshots along the way), then joins the workers and
/// merges their results.
pub async fn run_benchmark<C: CypherClient>(
    client: Arc<C>,
    workload: &mut Workload,
    config: &BenchmarkConfig,
    stop: Arc<StopSignal>,
    progress: Option<ProgressFn>,
) -> Result<BenchmarkResult> {
    if config.clients == 0 {
        return Err(Error::InvalidClients);
    }
    if config.duration.is_zero() {
        return Err(Error::InvalidDuration);
    }
    if config.latency_mode && !(config.rate.is_finite() && config.rate > 0.0) {
        return Err(Error::InvalidRate);
    }

    let pacing = if config.latency_mode {
        pacing_per_client(config.clients, config.rate)
    } else {
        Duration::ZERO
    };

    let script_names: Vec<Arc<str>> = workload
        .scripts()
        .iter()
        .map(|script| Arc::<str>::from(script.name.as_str()))
        .collect();

    let mut recorders = Vec::with_capacity(config.clients);
    let mut handles = Vec::with_capacity(config.clients);
    for worker_id in 0..config.clients as u64 {
        let recorder = Arc::new(ResultRecorder::new(worker_id, script_names.iter().cloned()));
        recorders.push(recorder.clone());

        let worker = Worker::new(client.clone(), worker_id);
        let client_workload = workload.new_client();
        let database = config.database.clone();
        let stop = stop.clone();
        handles.push(tokio::spawn(async move {
            let result = worker
                .run(
                    client_workload,
                    &database,
                    pacing,
                    Duration::ZERO,
                    stop.clone(),
                    recorder,
                )
                .await;
            if result.error.is_some() {
                // A fatal worker error brings the whole run down.
                stop.raise();
            }
            result
        }));
    }

    let started = Instant::now();
    await_completion(
        &stop,
        started,
        config.duration,
        config.progress_interval,
        &recorders,
        progress.as_ref(),
    )
    .await;
    stop.raise();

    let mut result = BenchmarkResult::new(&config.database, &config.scenario);
    for handle in handles {
        result.add(handle.await?);
    }
    result.elapsed = started.elapsed();
    Ok(result)
}

/// Sleeps out the run in ~100ms increments so the stop signal is observed
/// promptly, snapshotting all recorders at every progress interval. The
/// final stretch under two seconds is slept in one piece.
async fn await_completion(
    stop: &StopSignal,
    started: Instant,
    total: Duration,
    progress_interval: Duration,
    recorders: &[Arc<ResultRecorder>],
    progress: Option<&ProgressFn>,
) {
    let deadline = started + total;
    let mut next_report = started + progress_interval;
    let mut last_succeeded: u64 = 0;
    let mut last_at = started;

    loop {
        if stop.is_raised() {
            return;
        }

        let now = Instant::now();
        let remaining = deadline.saturating_duration_since(now);
        if remaining < Duration::from_secs(2) {
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = stop.raised() => {}
            }
            return;
        }

        if let Some(progress) = progress
            && now >= next_report
        {
            next_report += progress_interval;

            let total_succeeded: u64 = recorders
                .iter()
                .flat_map(|recorder| recorder.progress_snapshot().into_values())
                .map(|stats| stats.succeeded)
                .sum();

            let window = now.saturating_duration_since(last_at).as_secs_f64();
            let delta = total_succeeded.saturating_sub(last_succeeded);
            let tx_per_sec = if window > 0.0 {
                delta as f64 / window
            } else {
                0.0
            };
            last_succeeded = total_succeeded;
            last_at = now;

            let elapsed = now.saturating_duration_since(started);
            (progress)(&ProgressReport {
                completeness: 1.0 - remaining.as_secs_f64() / total.as_secs_f64(),
                elapsed,
                total_succeeded,
                tx_per_sec,
            });
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            _ = stop.raised() => return,
        }
    }
}
