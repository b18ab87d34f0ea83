//! Stake-weighted cluster sampling.
//!
//! A [`ClusterSampler`] is a single forward stream of clusters drawn with
//! replacement, each draw weighted by validator count. It owns its own RNG,
//! so two samplers never share state unless they were seeded identically.
//! A stream cannot be rewound; to replay a sequence, build a fresh sampler
//! from the same seed.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::cluster::Cluster;

/// Randomness source used throughout the simulation.
pub type SimRng = ChaCha8Rng;

/// Build a deterministic RNG from a seed.
#[must_use]
pub fn seeded_rng(seed: u64) -> SimRng {
    SimRng::seed_from_u64(seed)
}

/// Build an RNG seeded from OS entropy.
#[must_use]
pub fn entropy_rng() -> SimRng {
    SimRng::from_entropy()
}

/// Clusters in canonical order together with their cumulative weights.
///
/// Cheap to clone: both arrays are shared.
#[derive(Debug, Clone)]
pub(crate) struct WeightTable {
    clusters: Arc<[Cluster]>,
    cumulative: Arc<[u64]>,
}

impl WeightTable {
    /// Build the table. `clusters` must be non-empty with positive counts.
    pub(crate) fn new(clusters: Vec<Cluster>) -> Self {
        let cumulative: Vec<u64> = clusters
            .iter()
            .scan(0u64, |acc, c| {
                *acc += c.validator_count();
                Some(*acc)
            })
            .collect();
        Self {
            clusters: clusters.into(),
            cumulative: cumulative.into(),
        }
    }

    pub(crate) fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub(crate) fn total(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// One weighted draw, O(log n).
    pub(crate) fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Cluster {
        let ticket = rng.gen_range(0..self.total());
        let index = self.cumulative.partition_point(|&upper| upper <= ticket);
        self.clusters[index]
    }
}

/// Infinite stream of stake-weighted cluster draws.
pub struct ClusterSampler {
    table: WeightTable,
    rng: SimRng,
}

impl ClusterSampler {
    pub(crate) fn new(table: WeightTable, rng: SimRng) -> Self {
        Self { table, rng }
    }

    /// Pull the next cluster from the stream.
    pub fn next_cluster(&mut self) -> Cluster {
        self.table.draw(&mut self.rng)
    }

    /// Pull the next `count` clusters from the stream.
    pub fn take_clusters(&mut self, count: usize) -> Vec<Cluster> {
        self.by_ref().take(count).collect()
    }
}

impl Iterator for ClusterSampler {
    type Item = Cluster;

    fn next(&mut self) -> Option<Cluster> {
        Some(self.next_cluster())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl fmt::Debug for ClusterSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterSampler")
            .field("clusters", &self.table.clusters().len())
            .field("total_validators", &self.table.total())
            .finish_non_exhaustive()
    }
}
