//! Stake distribution configuration.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{ClusterSpec, SimRng, StakeDistribution};
use crate::error::ConfigError;

/// One `[[stake.clusters]]` entry: `count` clusters of `size` validators.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClusterEntry {
    pub size: u64,
    pub count: usize,
    /// Overrides `stake.reputation_factor` for this size.
    #[serde(default)]
    pub reputation_factor: Option<Decimal>,
}

impl ClusterEntry {
    fn spec(&self) -> ClusterSpec {
        match self.reputation_factor {
            Some(factor) => ClusterSpec::with_reputation(self.count, factor),
            None => ClusterSpec::count(self.count),
        }
    }
}

/// `[stake]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StakeConfig {
    /// Reputation factor for entries that do not set their own.
    #[serde(default = "default_reputation_factor")]
    pub reputation_factor: Decimal,
    #[serde(default)]
    pub clusters: Vec<ClusterEntry>,
}

fn default_reputation_factor() -> Decimal {
    Decimal::ONE
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            reputation_factor: default_reputation_factor(),
            clusters: Vec::new(),
        }
    }
}

impl StakeConfig {
    /// Total number of clusters described.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.iter().map(|c| c.count).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clusters.is_empty() {
            return Err(ConfigError::MissingField {
                field: "stake.clusters",
            });
        }

        let mut sizes = BTreeSet::new();
        for entry in &self.clusters {
            if entry.size == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "stake.clusters.size",
                    reason: "cluster size must be positive".into(),
                });
            }
            if entry.count == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "stake.clusters.count",
                    reason: format!("size {} has no clusters", entry.size),
                });
            }
            if !sizes.insert(entry.size) {
                return Err(ConfigError::InvalidValue {
                    field: "stake.clusters.size",
                    reason: format!("size {} is listed more than once", entry.size),
                });
            }
        }
        Ok(())
    }

    /// Build the distribution, driving its default stream from `rng`.
    pub fn build_distribution(&self, rng: SimRng) -> Result<StakeDistribution, ConfigError> {
        self.clusters
            .iter()
            .fold(
                StakeDistribution::builder().reputation_factor(self.reputation_factor),
                |builder, entry| builder.size(entry.size, entry.spec()),
            )
            .rng(rng)
            .build()
    }
}
