//! Stake distribution over market participants.
//!
//! A [`StakeDistribution`] owns the fixed set of clusters, in canonical order
//! (ascending validator count, ties broken by ascending reputation factor),
//! and the cumulative weight table used for stake-weighted sampling.
//!
//! # Example
//!
//! ```
//! use bribery_sim::domain::{ClusterSpec, StakeDistribution};
//! use rust_decimal_macros::dec;
//!
//! // 5 clusters of size 10 with reputation factor 2, 3 of size 20, 1 of size 100.
//! let dist = StakeDistribution::builder()
//!     .size(20, ClusterSpec::with_reputation(3, dec!(1)))
//!     .size(10, ClusterSpec::with_reputation(5, dec!(2)))
//!     .size(100, ClusterSpec::count(1))
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(dist.clusters().len(), 9);
//! assert_eq!(dist.total_validators(), 210);
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::cluster::{Cluster, ClusterId, Origin};
use super::sampler::{entropy_rng, seeded_rng, ClusterSampler, SimRng, WeightTable};
use crate::error::ConfigError;

/// How many clusters of one size exist, optionally with their own
/// reputation factor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClusterSpec {
    /// Clusters using the distribution's default reputation factor.
    Count(usize),
    /// Clusters with an explicit reputation factor.
    WithReputation {
        count: usize,
        reputation_factor: Decimal,
    },
}

impl ClusterSpec {
    #[must_use]
    pub const fn count(count: usize) -> Self {
        Self::Count(count)
    }

    #[must_use]
    pub const fn with_reputation(count: usize, reputation_factor: Decimal) -> Self {
        Self::WithReputation {
            count,
            reputation_factor,
        }
    }

    const fn cluster_count(&self) -> usize {
        match self {
            Self::Count(count) | Self::WithReputation { count, .. } => *count,
        }
    }
}

impl From<usize> for ClusterSpec {
    fn from(count: usize) -> Self {
        Self::Count(count)
    }
}

impl From<(usize, Decimal)> for ClusterSpec {
    fn from((count, reputation_factor): (usize, Decimal)) -> Self {
        Self::WithReputation {
            count,
            reputation_factor,
        }
    }
}

/// The fixed set of clusters and a reproducible weighted sampler over them.
#[derive(Debug)]
pub struct StakeDistribution {
    table: WeightTable,
    default_sampler: ClusterSampler,
}

impl StakeDistribution {
    /// Start building a distribution from a size → count map.
    #[must_use]
    pub fn builder() -> StakeDistributionBuilder {
        StakeDistributionBuilder::default()
    }

    /// Build from a size → count map with the default reputation factor
    /// of 1 and a seeded default stream.
    pub fn from_map<I>(stake_map: I, seed: u64) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (u64, ClusterSpec)>,
    {
        stake_map
            .into_iter()
            .fold(Self::builder(), |builder, (size, spec)| {
                builder.size(size, spec)
            })
            .seed(seed)
            .build()
    }

    /// All clusters in canonical order.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        self.table.clusters()
    }

    /// Look up a cluster by id.
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.table.clusters().get(id.index())
    }

    /// Sum of validator counts over all clusters.
    #[must_use]
    pub fn total_validators(&self) -> u64 {
        self.table.total()
    }

    /// Fraction of the total stake held by `cluster`.
    #[must_use]
    pub fn stake_fraction(&self, cluster: &Cluster) -> f64 {
        cluster.validator_count() as f64 / self.total_validators() as f64
    }

    /// Create an independent sampler driven by `rng`.
    #[must_use]
    pub fn new_cluster_sampler(&self, rng: SimRng) -> ClusterSampler {
        ClusterSampler::new(self.table.clone(), rng)
    }

    /// Create an independent sampler from a seed.
    #[must_use]
    pub fn seeded_sampler(&self, seed: u64) -> ClusterSampler {
        self.new_cluster_sampler(seeded_rng(seed))
    }

    /// The distribution's own stream. Repeated use continues the same
    /// sequence.
    pub fn default_sampler(&mut self) -> &mut ClusterSampler {
        &mut self.default_sampler
    }

    /// Pull one cluster from the default stream.
    pub fn sample_cluster(&mut self) -> Cluster {
        self.default_sampler.next_cluster()
    }

    /// One weighted draw using a caller-provided RNG.
    pub fn draw(&self, rng: &mut SimRng) -> Cluster {
        self.table.draw(rng)
    }
}

/// Builder for [`StakeDistribution`].
#[derive(Debug, Default)]
pub struct StakeDistributionBuilder {
    sizes: BTreeMap<u64, ClusterSpec>,
    reputation_factor: Option<Decimal>,
    rng: Option<SimRng>,
}

impl StakeDistributionBuilder {
    /// Declare the clusters of one size. A later call for the same size
    /// replaces the earlier one.
    #[must_use]
    pub fn size(mut self, validator_count: u64, spec: impl Into<ClusterSpec>) -> Self {
        self.sizes.insert(validator_count, spec.into());
        self
    }

    /// Reputation factor for sizes declared with a bare count. Defaults to 1.
    #[must_use]
    pub fn reputation_factor(mut self, factor: Decimal) -> Self {
        self.reputation_factor = Some(factor);
        self
    }

    /// Seed the default sampling stream.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(seeded_rng(seed));
        self
    }

    /// Drive the default sampling stream from an existing RNG.
    #[must_use]
    pub fn rng(mut self, rng: SimRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Expand the size map into clusters, sort them into canonical order
    /// and precompute the weight table.
    pub fn build(self) -> Result<StakeDistribution, ConfigError> {
        let default_factor = self.reputation_factor.unwrap_or(Decimal::ONE);
        if default_factor < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "reputation_factor",
                reason: format!("must be non-negative, got {default_factor}"),
            });
        }

        let mut expanded: Vec<(u64, Decimal)> = Vec::new();
        for (&size, spec) in &self.sizes {
            if size == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "size",
                    reason: "cluster size must be positive".into(),
                });
            }
            let factor = match *spec {
                ClusterSpec::Count(_) => default_factor,
                ClusterSpec::WithReputation {
                    reputation_factor, ..
                } => reputation_factor,
            };
            if factor < Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    field: "reputation_factor",
                    reason: format!("size {size} has negative factor {factor}"),
                });
            }
            expanded.extend(std::iter::repeat((size, factor)).take(spec.cluster_count()));
        }

        if expanded.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "stake",
                reason: "distribution must contain at least one cluster".into(),
            });
        }

        expanded.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        let origin = Origin::fresh();
        let clusters: Vec<Cluster> = expanded
            .into_iter()
            .enumerate()
            .map(|(i, (size, factor))| Cluster::new(origin, ClusterId::new(i), size, factor))
            .collect();

        let table = WeightTable::new(clusters);
        debug!(
            clusters = table.clusters().len(),
            total_validators = table.total(),
            "Stake distribution built"
        );

        let rng = self.rng.unwrap_or_else(entropy_rng);
        let default_sampler = ClusterSampler::new(table.clone(), rng);
        Ok(StakeDistribution {
            table,
            default_sampler,
        })
    }
}
