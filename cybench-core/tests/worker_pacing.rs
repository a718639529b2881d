mod support;

use std::sync::Arc;
use std::time::Duration;

use cybench_core::runner::{ResultRecorder, StopSignal, Worker};
use cybench_core::{ClientError, ErrorCategory};

use support::{MockClient, Step};

fn recorder() -> Arc<ResultRecorder> {
    Arc::new(ResultRecorder::new(0, [Arc::<str>::from("t")]))
}

/// Drives a worker against the mock for `run_for` of virtual time, then
/// raises the stop signal and returns its result.
async fn drive_worker(
    client: Arc<MockClient>,
    pacing: Duration,
    run_for: Duration,
) -> cybench_core::runner::WorkerResult {
    let mut workload = support::workload("RETURN 1;");
    let client_workload = workload.new_client();
    let recorder = recorder();
    let stop = Arc::new(StopSignal::new());

    let handle = {
        let stop = stop.clone();
        let recorder = recorder.clone();
        tokio::spawn(async move {
            let worker = Worker::new(client, 0);
            worker
                .run(
                    client_workload,
                    "",
                    pacing,
                    Duration::ZERO,
                    stop,
                    recorder,
                )
                .await
        })
    };

    tokio::time::sleep(run_for).await;
    stop.raise();
    handle.await.expect("worker task should not panic")
}

#[tokio::test(start_paused = true)]
async fn transient_errors_retry_as_one_logical_transaction() {
    let client = Arc::new(MockClient::ok(Duration::from_millis(1)));
    client.enqueue(Step::Fail(ClientError::new(
        ErrorCategory::Transient,
        "deadlock",
    )));
    client.enqueue(Step::Fail(ClientError::new(
        ErrorCategory::Io,
        "connection reset",
    )));

    let result = drive_worker(client.clone(), Duration::ZERO, Duration::from_secs(2)).await;

    // The two scripted failures were absorbed by retries of the first
    // transaction; only successes are recorded.
    assert!(result.succeeded() >= 1);
    assert_eq!(result.failed(), 0);
    assert!(client.calls() >= 3);
    assert!(result.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn cypher_syntax_errors_are_fatal_for_the_worker() {
    let client = Arc::new(MockClient::failing(
        Duration::from_millis(1),
        ClientError::new(ErrorCategory::CypherSyntax, "Invalid input"),
    ));

    let result = drive_worker(client.clone(), Duration::ZERO, Duration::from_secs(2)).await;

    assert_eq!(client.calls(), 1, "fatal errors do not retry");
    assert_eq!(result.succeeded(), 0);
    assert_eq!(result.failed(), 1);
    assert_eq!(
        result.error.as_ref().map(|err| err.category),
        Some(ErrorCategory::CypherSyntax)
    );
}

#[tokio::test(start_paused = true)]
async fn latency_mode_attributes_stalls_to_the_schedule() {
    // One client at 100 tx/s: pacing 10ms. Fifty quick transactions, then a
    // two-second stall, then quick again.
    let client = Arc::new(MockClient::ok(Duration::from_millis(1)));
    for _ in 0..50 {
        client.enqueue(Step::Delay(Duration::from_millis(1)));
    }
    client.enqueue(Step::Delay(Duration::from_secs(2)));

    let result = drive_worker(
        client,
        Duration::from_millis(10),
        Duration::from_secs(6),
    )
    .await;

    let stats = &result.scripts["t"];
    let histogram = &stats.latencies;
    assert!(histogram.len() > 300, "expected a full schedule of samples");

    // The stall lands on scheduled-but-late transactions: the backlog after
    // the stalled transaction drains at 1ms/tx against a 10ms schedule, so
    // roughly a hundred samples exceed one second.
    let p99_us = histogram.value_at_quantile(0.99);
    assert!(
        p99_us >= 1_000_000,
        "p99 must reflect the stall, got {p99_us}µs"
    );
    assert!(histogram.max() >= 1_900_000);

    // Most of the run was on schedule.
    let p50_us = histogram.value_at_quantile(0.50);
    assert!(p50_us < 1_000_000, "p50 should stay modest, got {p50_us}µs");
}

#[tokio::test(start_paused = true)]
async fn unpaced_workers_measure_execution_time_only() {
    let client = Arc::new(MockClient::ok(Duration::from_millis(5)));

    let result = drive_worker(client, Duration::ZERO, Duration::from_secs(2)).await;

    let histogram = &result.scripts["t"].latencies;
    assert!(histogram.len() > 100);
    // Open loop: every sample is the transaction's own execution time.
    assert!(histogram.min() >= 5_000);
    assert!(histogram.max() < 100_000);
}
