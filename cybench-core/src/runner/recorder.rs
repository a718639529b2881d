use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use crate::client::{ClientError, ErrorCategory};
use crate::runner::result::{ScriptStats, WorkerResult};

// 1 microsecond to 1 hour at 3 significant figures.
const LATENCY_MIN_US: u64 = 1;
const LATENCY_MAX_US: u64 = 3_600_000_000;
const LATENCY_SIGFIG: u8 = 3;

pub(crate) fn new_latency_histogram() -> Histogram<u64> {
    Histogram::<u64>::new_with_bounds(LATENCY_MIN_US, LATENCY_MAX_US, LATENCY_SIGFIG)
        .unwrap_or_else(|err| panic!("failed to init latency histogram: {err}"))
}

struct ScriptSlot {
    succeeded: AtomicU64,
    failed: [AtomicU64; ErrorCategory::ALL.len()],
    /// Hot-path buffer; the owning worker appends here. Snapshots swap it
    /// out, so the lock is only ever held for a single record or a pointer
    /// swap and the writer never waits behind a histogram copy.
    window: Mutex<Histogram<u64>>,
    /// Accumulated samples drained from `window`; only snapshot readers and
    /// the final drain touch this.
    merged: Mutex<Histogram<u64>>,
}

impl ScriptSlot {
    fn new() -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: Default::default(),
            window: Mutex::new(new_latency_histogram()),
            merged: Mutex::new(new_latency_histogram()),
        }
    }

    fn snapshot(&self) -> ScriptStats {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let mut failed_by_category = BTreeMap::new();
        for category in ErrorCategory::ALL {
            let count = self.failed[category.index()].load(Ordering::Relaxed);
            if count > 0 {
                failed_by_category.insert(category, count);
            }
        }

        let drained = mem::replace(&mut *self.window.lock(), new_latency_histogram());
        let mut merged = self.merged.lock();
        let _ = merged.add(&drained);

        ScriptStats {
            succeeded,
            failed_by_category,
            latencies: merged.clone(),
        }
    }
}

/// Per-worker outcome recorder. Writes are single-threaded by the owning
/// worker; `progress_snapshot` is the only cross-thread read and never
/// stalls the writer.
pub struct ResultRecorder {
    worker_id: u64,
    slots: BTreeMap<Arc<str>, ScriptSlot>,
}

impl ResultRecorder {
    pub fn new(worker_id: u64, script_names: impl IntoIterator<Item = Arc<str>>) -> Self {
        Self {
            worker_id,
            slots: script_names
                .into_iter()
                .map(|name| (name, ScriptSlot::new()))
                .collect(),
        }
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub fn record_success(&self, script: &str, latency: Duration) {
        let Some(slot) = self.slots.get(script) else {
            return;
        };
        slot.succeeded.fetch_add(1, Ordering::Relaxed);
        let micros = (latency.as_micros() as u64).max(1);
        slot.window.lock().saturating_record(micros);
    }

    pub fn record_failure(&self, script: &str, category: ErrorCategory) {
        let Some(slot) = self.slots.get(script) else {
            return;
        };
        slot.failed[category.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Immutable copy of the counters and histograms accumulated so far.
    pub fn progress_snapshot(&self) -> BTreeMap<Arc<str>, ScriptStats> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.snapshot()))
            .collect()
    }

    /// Final drain into a worker result.
    pub fn finish(&self, error: Option<ClientError>) -> WorkerResult {
        WorkerResult {
            worker_id: self.worker_id,
            scripts: self.progress_snapshot(),
            error,
        }
    }
}
