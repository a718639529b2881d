mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cybench_core::runner::{
    BenchmarkConfig, ProgressFn, ProgressReport, StopSignal, pacing_per_client, run_benchmark,
};
use cybench_core::{ClientError, ErrorCategory};

use support::MockClient;

fn config(clients: usize, duration: Duration) -> BenchmarkConfig {
    BenchmarkConfig {
        database: String::new(),
        scenario: " -w t".to_string(),
        clients,
        rate: 1.0,
        latency_mode: false,
        duration,
        progress_interval: Duration::from_secs(2),
    }
}

#[test]
fn pacing_spreads_the_total_rate_across_clients() {
    assert_eq!(pacing_per_client(4, 100.0), Duration::from_millis(40));
    assert_eq!(pacing_per_client(1, 100.0), Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn throughput_run_counts_transactions_and_reports_progress() {
    let client = Arc::new(MockClient::ok(Duration::from_millis(1)));
    let mut workload = support::workload("RETURN 1;");
    let stop = Arc::new(StopSignal::new());

    let reports: Arc<Mutex<Vec<ProgressReport>>> = Arc::new(Mutex::new(Vec::new()));
    let progress: ProgressFn = {
        let reports = reports.clone();
        Arc::new(move |report| reports.lock().unwrap().push(report.clone()))
    };

    let result = run_benchmark(
        client.clone(),
        &mut workload,
        &config(2, Duration::from_secs(5)),
        stop,
        Some(progress),
    )
    .await
    .expect("benchmark should run");

    assert_eq!(result.workers.len(), 2);
    assert!(result.total_succeeded() > 0);
    assert_eq!(result.total_failed(), 0);
    assert_eq!(result.total_succeeded(), client.calls());

    let reports = reports.lock().unwrap();
    assert!(!reports.is_empty(), "expected progress reports");
    for report in reports.iter() {
        assert!((0.0..=1.0).contains(&report.completeness));
    }
}

#[tokio::test(start_paused = true)]
async fn constraint_failures_are_counted_but_not_fatal() {
    let client = Arc::new(MockClient::failing(
        Duration::from_millis(1),
        ClientError::new(ErrorCategory::Constraint, "already exists"),
    ));
    let mut workload = support::workload("CREATE (n);");
    let stop = Arc::new(StopSignal::new());

    let result = run_benchmark(
        client,
        &mut workload,
        &config(1, Duration::from_secs(3)),
        stop,
        None,
    )
    .await
    .expect("benchmark should run");

    assert_eq!(result.total_succeeded(), 0);
    assert!(result.total_failed() > 1, "failures should not stop the run");
    assert_eq!(
        result
            .failures_by_category()
            .keys()
            .copied()
            .collect::<Vec<_>>(),
        vec![ErrorCategory::Constraint]
    );
    assert!(result.workers.iter().all(|worker| worker.error.is_none()));
}

#[tokio::test(start_paused = true)]
async fn fatal_auth_error_stops_the_run_early() {
    let client = Arc::new(MockClient::failing(
        Duration::from_millis(1),
        ClientError::new(ErrorCategory::Auth, "unauthorized"),
    ));
    let mut workload = support::workload("RETURN 1;");
    let stop = Arc::new(StopSignal::new());

    let result = run_benchmark(
        client,
        &mut workload,
        &config(1, Duration::from_secs(60)),
        stop.clone(),
        None,
    )
    .await
    .expect("benchmark should run");

    assert!(stop.is_raised());
    assert!(result.elapsed < Duration::from_secs(10), "fatal errors cut the run short");
    assert!(result.workers[0].error.is_some());
    assert_eq!(
        result.workers[0].error.as_ref().map(|err| err.category),
        Some(ErrorCategory::Auth)
    );
    assert!(result.total_failed() > 0);
}

#[tokio::test(start_paused = true)]
async fn raising_the_stop_signal_finalizes_counters() {
    let client = Arc::new(MockClient::ok(Duration::from_millis(1)));
    let mut workload = support::workload("RETURN 1;");
    let stop = Arc::new(StopSignal::new());

    {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stop.raise();
        });
    }

    let result = run_benchmark(
        client.clone(),
        &mut workload,
        &config(2, Duration::from_secs(60)),
        stop,
        None,
    )
    .await
    .expect("benchmark should run");

    assert!(result.elapsed < Duration::from_secs(5));
    assert_eq!(result.workers.len(), 2);
    assert!(result.total_succeeded() > 0);
    assert_eq!(result.total_succeeded(), client.calls());
}
