//! Simulation configuration loading and validation.
//!
//! An experiment is described by one TOML file:
//!
//! ```toml
//! [stake]
//! reputation_factor = 1
//!
//! [[stake.clusters]]
//! size = 10
//! count = 5
//! reputation_factor = 2
//!
//! [[stake.clusters]]
//! size = 100
//! count = 1
//!
//! [market]
//! epoch_size = 32
//! mechanism = "equal_price"
//!
//! [runner]
//! interest_rate = 0.0001
//!
//! [runner.seeds]
//! master = 7
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::domain::{entropy_rng, seeded_rng};
use crate::error::{ConfigError, Result};
use crate::runner::{Runner, RunnerConfig};

mod logging;
mod market;
mod stake;

pub use logging::LoggingConfig;
pub use market::{InitialBidConfig, MarketConfig, MechanismKind};
pub use stake::{ClusterEntry, StakeConfig};

/// Main simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub stake: StakeConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.stake.validate()?;
        let cluster_count = self.stake.cluster_count();
        self.market.validate(cluster_count)?;
        self.runner.validate()?;

        if let Some(index) = self.runner.initial_last_slot_proposer {
            if index >= cluster_count {
                return Err(ConfigError::InvalidValue {
                    field: "runner.initial_last_slot_proposer",
                    reason: format!("index {index} is out of range for {cluster_count} clusters"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Override the master seed, e.g. from the command line.
    #[must_use]
    pub fn with_master_seed(mut self, seed: u64) -> Self {
        self.runner.seeds.master = Some(seed);
        self
    }

    /// Wire distribution, market and runner together.
    ///
    /// The distribution's default stream is seeded from the master seed
    /// when one is set.
    #[allow(clippy::result_large_err)]
    pub fn build_runner(&self) -> Result<Runner> {
        let rng = self.runner.seeds.master.map_or_else(entropy_rng, seeded_rng);
        let distribution = self.stake.build_distribution(rng)?;
        let market = self.market.build_market(distribution)?;
        Ok(Runner::new(market, self.runner.clone())?)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
