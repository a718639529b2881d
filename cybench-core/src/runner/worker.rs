use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::client::{ClientError, CypherClient, ErrorCategory};
use crate::runner::recorder::ResultRecorder;
use crate::runner::result::WorkerResult;
use crate::runner::signals::StopSignal;
use crate::workload::ClientWorkload;

use cybench_script::UnitOfWork;

const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// One worker drives one session's worth of load for the benchmark's
/// lifetime.
pub struct Worker<C> {
    client: Arc<C>,
    worker_id: u64,
}

impl<C: CypherClient> Worker<C> {
    pub fn new(client: Arc<C>, worker_id: u64) -> Self {
        Self { client, worker_id }
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// Runs until the stop signal is raised or a fatal error occurs.
    ///
    /// With `pacing` zero the loop is open (throughput mode): transactions
    /// run back to back and the sample is evaluation-start to
    /// commit-acknowledged. With a non-zero `pacing` the loop is closed
    /// (latency mode): transaction `k` is scheduled at `start + k*pacing`
    /// and the sample is scheduled-start to completion, so stalls surface
    /// as latency instead of silently shrinking the request count.
    pub async fn run(
        &self,
        mut workload: ClientWorkload,
        database: &str,
        pacing: Duration,
        start_offset: Duration,
        stop: Arc<StopSignal>,
        recorder: Arc<ResultRecorder>,
    ) -> WorkerResult {
        if !start_offset.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(start_offset) => {}
                _ = stop.raised() => return recorder.finish(None),
            }
        }

        let started = Instant::now();
        let mut transaction_index: u64 = 0;
        let mut stderr = std::io::stderr();

        loop {
            if stop.is_raised() {
                break;
            }

            let scheduled_start = if pacing.is_zero() {
                None
            } else {
                Some(started + pacing.mul_f64(transaction_index as f64))
            };
            transaction_index += 1;

            if let Some(scheduled) = scheduled_start {
                // Behind schedule means no sleep; transactions fire
                // immediately until the backlog drains.
                if Instant::now() < scheduled {
                    tokio::select! {
                        _ = tokio::time::sleep_until(scheduled) => {}
                        _ = stop.raised() => break,
                    }
                }
            }

            let measure_from = scheduled_start.unwrap_or_else(Instant::now);

            // Evaluation (including \sleep) is cancellable; the transaction
            // itself runs to its terminal state once started.
            let (script, unit) = tokio::select! {
                next = workload.next(&mut stderr) => next,
                _ = stop.raised() => break,
            };

            let unit = match unit {
                Ok(unit) => unit,
                Err(err) => {
                    recorder.record_failure(&script.name, ErrorCategory::UserSyntax);
                    let error = ClientError::new(ErrorCategory::UserSyntax, err.to_string());
                    return recorder.finish(Some(error));
                }
            };

            match self.execute_with_retry(database, &unit, &stop).await {
                Ok(()) => recorder.record_success(&script.name, measure_from.elapsed()),
                Err(err) if err.category.is_fatal() => {
                    recorder.record_failure(&script.name, err.category);
                    return recorder.finish(Some(err));
                }
                Err(err) => recorder.record_failure(&script.name, err.category),
            }
        }

        recorder.finish(None)
    }

    /// Transient failures retry with exponential backoff as one logical
    /// transaction; only the final outcome is recorded by the caller.
    async fn execute_with_retry(
        &self,
        database: &str,
        unit: &UnitOfWork,
        stop: &StopSignal,
    ) -> Result<(), ClientError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.client.execute(database, unit).await {
                Ok(()) => return Ok(()),
                Err(err)
                    if err.category.is_retryable()
                        && attempt < MAX_ATTEMPTS
                        && !stop.is_raised() =>
                {
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = stop.raised() => {}
                    }
                    backoff *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
