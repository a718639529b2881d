use std::sync::Arc;

use rand::{Rng, RngCore};

use crate::script::Script;

/// Weighted collection of scripts with an O(log N) pick over precomputed
/// cumulative weights.
#[derive(Debug, Clone)]
pub struct ScriptSet {
    scripts: Vec<Arc<Script>>,
    cumulative: Vec<u64>,
    total: u64,
}

impl ScriptSet {
    /// Weights must be strictly positive and `scripts` non-empty; both are
    /// guaranteed by the parser and the CLI layer.
    #[must_use]
    pub fn new(scripts: Vec<Script>) -> Self {
        let mut cumulative = Vec::with_capacity(scripts.len());
        let mut total: u64 = 0;
        for script in &scripts {
            total += u64::from(script.weight);
            cumulative.push(total);
        }
        Self {
            scripts: scripts.into_iter().map(Arc::new).collect(),
            cumulative,
            total,
        }
    }

    pub fn pick(&self, mut rng: &mut (dyn RngCore + Send)) -> &Arc<Script> {
        let draw = rng.gen_range(0..self.total);
        let index = self.cumulative.partition_point(|&bound| bound <= draw);
        &self.scripts[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Script>> {
        self.scripts.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn script(name: &str, weight: u32) -> Script {
        Script {
            name: name.to_string(),
            weight,
            readonly: false,
            commands: Vec::new(),
        }
    }

    #[test]
    fn single_script_is_always_picked() {
        let set = ScriptSet::new(vec![script("only", 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(set.pick(&mut rng).name, "only");
        }
    }

    #[test]
    fn pick_converges_on_the_weight_distribution() {
        let set = ScriptSet::new(vec![script("a", 1), script("b", 3)]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let draws = 40_000;
        let mut a = 0u64;
        for _ in 0..draws {
            if set.pick(&mut rng).name == "a" {
                a += 1;
            }
        }

        // Expected 1/4 of draws; three sigma of Binomial(40_000, 0.25) is
        // about 260.
        let expected = draws / 4;
        let sigma3 = 260;
        assert!(
            a.abs_diff(expected) <= sigma3,
            "picked a {a} times, expected about {expected}"
        );
    }

    #[test]
    fn even_weights_split_evenly() {
        let set = ScriptSet::new(vec![script("read", 5), script("write", 5)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1337);

        let draws = 10_000;
        let mut read = 0u64;
        for _ in 0..draws {
            if set.pick(&mut rng).name == "read" {
                read += 1;
            }
        }

        // Three sigma of Binomial(10_000, 0.5) is 150.
        assert!(
            read.abs_diff(draws / 2) <= 150,
            "picked read {read} times out of {draws}"
        );
    }
}
