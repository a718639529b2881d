#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cybench_core::{ClientError, CypherClient, Workload};
use cybench_script::{ScriptSet, UnitOfWork, Value};

pub enum Step {
    Delay(Duration),
    Fail(ClientError),
}

/// Scripted in-memory Cypher client. Each call pops the next planned step;
/// once the plan runs dry, calls take `fallback_delay` and resolve to the
/// fallback outcome.
pub struct MockClient {
    plan: Mutex<VecDeque<Step>>,
    fallback_delay: Duration,
    fallback_error: Option<ClientError>,
    calls: AtomicU64,
}

impl MockClient {
    pub fn ok(fallback_delay: Duration) -> Self {
        Self {
            plan: Mutex::new(VecDeque::new()),
            fallback_delay,
            fallback_error: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing(fallback_delay: Duration, error: ClientError) -> Self {
        Self {
            plan: Mutex::new(VecDeque::new()),
            fallback_delay,
            fallback_error: Some(error),
            calls: AtomicU64::new(0),
        }
    }

    pub fn enqueue(&self, step: Step) {
        self.plan.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl CypherClient for MockClient {
    async fn execute(&self, _database: &str, _unit: &UnitOfWork) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let step = self.plan.lock().unwrap().pop_front();
        match step {
            Some(Step::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Some(Step::Fail(error)) => Err(error),
            None => {
                tokio::time::sleep(self.fallback_delay).await;
                match &self.fallback_error {
                    Some(error) => Err(error.clone()),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Single-script workload named `t` with `scale=1` and a fixed seed.
pub fn workload(source: &str) -> Workload {
    let script = cybench_script::parse("t", source, 1)
        .unwrap_or_else(|err| panic!("test script failed to parse: {err}"));
    Workload::new(
        BTreeMap::from([("scale".to_string(), Value::Int(1))]),
        ScriptSet::new(vec![script]),
        1337,
    )
}
