//! Per-target transform contribution tracking
//!
//! Every runner that animates a transform registers with its target's
//! [`RunnerSet`]. The set remembers registration order (composition order for
//! non-commutative matrices) and collapses adjacent finished, unpersisted
//! contributions into placeholder entries so long-lived targets don't
//! accumulate runners without bound.

use motive_core::Matrix;
use tracing::debug;

use crate::runner::RunnerHandle;

/// Reserved key for the seed placeholder; real runner keys are `id + 1` and
/// runner ids start at 1, so 0 never collides.
const SEED_KEY: u64 = 0;

/// One transform contribution: a live runner or a collapsed placeholder
/// carrying only the composed matrix. Both contribute a transform, report
/// done, and can be merged again; the placeholder is always done.
pub enum Tracked {
    Live { id: u64, runner: RunnerHandle },
    Collapsed { key: u64, transforms: Matrix },
}

impl Tracked {
    fn key(&self) -> u64 {
        match self {
            Tracked::Live { id, .. } => id + 1,
            Tracked::Collapsed { key, .. } => *key,
        }
    }

    pub fn transforms(&self) -> Matrix {
        match self {
            Tracked::Live { runner, .. } => runner.borrow().transforms(),
            Tracked::Collapsed { transforms, .. } => *transforms,
        }
    }

    fn done(&self) -> bool {
        match self {
            Tracked::Live { runner, .. } => runner.borrow().is_done(),
            Tracked::Collapsed { .. } => true,
        }
    }

    fn persisted(&self) -> bool {
        match self {
            Tracked::Live { runner, .. } => runner.borrow().is_persisted(),
            Tracked::Collapsed { .. } => false,
        }
    }
}

/// Ordered set of transform contributions for one target.
///
/// Parallel arrays: entries and their keys. Keys are runner `id + 1` so the
/// zero sentinel stays free for the seed placeholder.
#[derive(Default)]
pub struct RunnerSet {
    entries: Vec<Tracked>,
    keys: Vec<u64>,
}

impl RunnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Seed the set so composition is well-defined before any runner has
    /// produced output.
    pub fn seed(&mut self, base: Matrix) {
        self.entries.push(Tracked::Collapsed {
            key: SEED_KEY,
            transforms: base,
        });
        self.keys.push(SEED_KEY);
    }

    /// Register a runner; re-adding the same runner is a no-op.
    pub fn add(&mut self, runner: &RunnerHandle, id: u64) {
        let key = id + 1;
        if self.keys.contains(&key) {
            return;
        }
        self.entries.push(Tracked::Live {
            id,
            runner: runner.clone(),
        });
        self.keys.push(key);
    }

    pub fn contains(&self, id: u64) -> bool {
        self.keys.contains(&(id + 1))
    }

    pub fn remove(&mut self, id: u64) {
        if let Some(i) = self.keys.iter().position(|k| *k == id + 1) {
            self.keys.remove(i);
            self.entries.remove(i);
        }
    }

    /// Net transform for the frame: left-multiplication of every
    /// contribution in registration order.
    pub fn net_transform(&self) -> Matrix {
        let mut net = Matrix::identity();
        for entry in &self.entries {
            net = entry.transforms().multiply(&net);
        }
        net
    }

    /// Collapse adjacent pairs where both contributions are done and
    /// neither is persisted by its ordering facility. The merged placeholder
    /// keeps the later entry's key so lookups by id still resolve, and its
    /// matrix is `later · earlier`.
    pub fn merge(&mut self) {
        let mut i = 1;
        while i < self.entries.len() {
            let mergeable = {
                let earlier = &self.entries[i - 1];
                let later = &self.entries[i];
                earlier.done() && later.done() && !earlier.persisted() && !later.persisted()
            };
            if mergeable {
                let later = self.entries.remove(i);
                self.keys.remove(i);
                let merged = Tracked::Collapsed {
                    key: later.key(),
                    transforms: later.transforms().multiply(&self.entries[i - 1].transforms()),
                };
                self.keys[i - 1] = merged.key();
                self.entries[i - 1] = merged;
                debug!(len = self.len(), "merged adjacent finished runners");
            } else {
                i += 1;
            }
        }
    }

    /// Prune every contribution registered before the runner with `id`,
    /// reseeding with an identity placeholder. Used by absolute transforms,
    /// which overwrite anything earlier anyway. Returns the pruned entries
    /// so the caller can drop their un-run transform queue work.
    pub fn clear_before(&mut self, id: u64) -> Vec<Tracked> {
        let count = match self.keys.iter().position(|k| *k == id + 1) {
            Some(n) if n > 0 => n,
            _ => 1.min(self.keys.len()),
        };
        self.keys.drain(0..count);
        let removed: Vec<Tracked> = self.entries.drain(0..count).collect();
        self.entries.insert(
            0,
            Tracked::Collapsed {
                key: SEED_KEY,
                transforms: Matrix::identity(),
            },
        );
        self.keys.insert(0, SEED_KEY);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collapsed(key: u64, m: Matrix) -> Tracked {
        Tracked::Collapsed { key, transforms: m }
    }

    fn push(set: &mut RunnerSet, entry: Tracked) {
        set.keys.push(entry.key());
        set.entries.push(entry);
    }

    #[test]
    fn test_seed_then_net_transform() {
        let mut set = RunnerSet::new();
        set.seed(Matrix::translate(1.0, 0.0));
        push(&mut set, collapsed(2, Matrix::translate(0.0, 2.0)));
        let net = set.net_transform();
        assert_eq!(net.apply(0.0, 0.0), (1.0, 2.0));
    }

    #[test]
    fn test_net_transform_order() {
        // registration order matters: later contributions are applied last
        let mut set = RunnerSet::new();
        push(&mut set, collapsed(2, Matrix::translate(10.0, 0.0)));
        push(&mut set, collapsed(3, Matrix::scale(2.0, 2.0)));
        // net = scale * translate
        assert_eq!(set.net_transform().apply(0.0, 0.0), (20.0, 0.0));
    }

    #[test]
    fn test_merge_collapses_placeholders() {
        let mut set = RunnerSet::new();
        set.seed(Matrix::identity());
        push(&mut set, collapsed(2, Matrix::translate(5.0, 0.0)));
        push(&mut set, collapsed(3, Matrix::scale(2.0, 1.0)));
        set.merge();
        assert_eq!(set.len(), 1);
        // later id survives
        assert!(set.contains(2));
        // composed matrix equals the original net
        assert_eq!(set.net_transform().apply(0.0, 0.0), (10.0, 0.0));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut set = RunnerSet::new();
        set.seed(Matrix::identity());
        push(&mut set, collapsed(2, Matrix::translate(5.0, 0.0)));
        set.merge();
        let after_first = set.net_transform();
        set.merge();
        assert_eq!(set.len(), 1);
        assert_eq!(set.net_transform(), after_first);
    }

    #[test]
    fn test_clear_before_prunes_and_reseeds() {
        let mut set = RunnerSet::new();
        set.seed(Matrix::translate(9.0, 9.0));
        push(&mut set, collapsed(2, Matrix::translate(1.0, 0.0)));
        push(&mut set, collapsed(3, Matrix::translate(2.0, 0.0)));
        push(&mut set, collapsed(4, Matrix::translate(3.0, 0.0)));
        let removed = set.clear_before(3);
        // seed + runner 2 removed, replaced by a single identity seed
        assert_eq!(removed.len(), 2);
        assert_eq!(set.len(), 3);
        assert!(set.contains(3));
        assert!(set.contains(4));
        assert_eq!(set.net_transform().apply(0.0, 0.0), (5.0, 0.0));
    }
}
