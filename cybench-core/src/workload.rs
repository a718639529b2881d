use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cybench_script::{EvalError, Script, ScriptContext, ScriptSet, UnitOfWork, Value};

/// Top-level workload: user variables, weighted scripts, and the seed
/// source for per-client PRNGs. Built once at startup.
pub struct Workload {
    variables: BTreeMap<String, Value>,
    scripts: Arc<ScriptSet>,
    rng: ChaCha8Rng,
}

impl Workload {
    #[must_use]
    pub fn new(variables: BTreeMap<String, Value>, scripts: ScriptSet, seed: u64) -> Self {
        Self {
            variables,
            scripts: Arc::new(scripts),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn scripts(&self) -> &ScriptSet {
        &self.scripts
    }

    /// Derives a per-client workload. The client's PRNG is seeded from this
    /// workload's next draw, so client streams are deterministic given the
    /// top-level seed and a fixed client count.
    pub fn new_client(&mut self) -> ClientWorkload {
        ClientWorkload {
            variables: self.variables.clone(),
            scripts: self.scripts.clone(),
            rng: ChaCha8Rng::seed_from_u64(self.rng.next_u64()),
        }
    }
}

/// One worker's private view of the workload. Owns its PRNG; shares the
/// immutable scripts.
pub struct ClientWorkload {
    variables: BTreeMap<String, Value>,
    scripts: Arc<ScriptSet>,
    rng: ChaCha8Rng,
}

impl ClientWorkload {
    /// Picks a script by weight and evaluates it into a unit of work. The
    /// evaluation context is fresh per call; `\set` never leaks across
    /// transactions.
    pub async fn next(
        &mut self,
        stderr: &mut (dyn Write + Send),
    ) -> (Arc<Script>, Result<UnitOfWork, EvalError>) {
        let script = self.scripts.pick(&mut self.rng).clone();
        let mut ctx = ScriptContext {
            vars: self.variables.clone(),
            rng: &mut self.rng,
            stderr,
        };
        let unit = script.eval(&mut ctx).await;
        (script, unit)
    }
}
