//! Market and mechanism configuration.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::mechanism::{
    BestResponseConfig, EqualPriceConfig, EqualPriceMechanism, PayAsBidConfig, PayAsBidMechanism,
};
use crate::domain::{
    AuctionMechanism, Amount, Bid, ClusterId, Market, StakeDistribution, DEFAULT_EPOCH_SIZE,
};
use crate::error::ConfigError;

/// Which auction mechanism resolves the epochs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismKind {
    #[default]
    EqualPrice,
    PayAsBid,
}

/// One `[[market.initial_bids]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InitialBidConfig {
    /// Index of the cluster in canonical order.
    pub cluster: usize,
    pub willing_to_pay: Amount,
    /// Setting this makes the bid accept bribes above the given margin.
    #[serde(default)]
    pub minimum_gain: Option<Amount>,
    /// Defaults to `willing_to_pay`.
    #[serde(default)]
    pub valuation_of_own_slots: Option<Amount>,
}

impl InitialBidConfig {
    fn bid(&self) -> Bid {
        let mut bid = Bid::new(self.willing_to_pay);
        if let Some(gain) = self.minimum_gain {
            bid = bid.accepting_bribes(gain);
        }
        if let Some(valuation) = self.valuation_of_own_slots {
            bid = bid.with_own_slot_valuation(valuation);
        }
        bid
    }
}

/// `[market]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_epoch_size")]
    pub epoch_size: usize,
    #[serde(default)]
    pub mechanism: MechanismKind,
    #[serde(default = "default_transaction_fee")]
    pub transaction_fee: Amount,
    /// Only used by `equal_price`.
    #[serde(default = "default_reputation_penalty")]
    pub reputation_penalty: Amount,
    #[serde(default)]
    pub best_response: BestResponseConfig,
    #[serde(default)]
    pub pay_for_initial_bids: bool,
    #[serde(default)]
    pub initial_bids: Vec<InitialBidConfig>,
}

const fn default_epoch_size() -> usize {
    DEFAULT_EPOCH_SIZE
}

fn default_transaction_fee() -> Amount {
    EqualPriceConfig::default().transaction_fee
}

fn default_reputation_penalty() -> Amount {
    EqualPriceConfig::default().reputation_penalty
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            epoch_size: default_epoch_size(),
            mechanism: MechanismKind::default(),
            transaction_fee: default_transaction_fee(),
            reputation_penalty: default_reputation_penalty(),
            best_response: BestResponseConfig::default(),
            pay_for_initial_bids: false,
            initial_bids: Vec::new(),
        }
    }
}

impl MarketConfig {
    pub fn validate(&self, cluster_count: usize) -> Result<(), ConfigError> {
        if self.epoch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "market.epoch_size",
                reason: "must be positive".into(),
            });
        }
        for (field, value) in [
            ("market.transaction_fee", self.transaction_fee),
            ("market.reputation_penalty", self.reputation_penalty),
        ] {
            if value < Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must not be negative, got {value}"),
                });
            }
        }
        let mut named = BTreeSet::new();
        for entry in &self.initial_bids {
            if entry.cluster >= cluster_count {
                return Err(ConfigError::InvalidValue {
                    field: "market.initial_bids.cluster",
                    reason: format!(
                        "index {} is out of range for {cluster_count} clusters",
                        entry.cluster
                    ),
                });
            }
            if !named.insert(entry.cluster) {
                return Err(ConfigError::InvalidValue {
                    field: "market.initial_bids.cluster",
                    reason: format!("cluster {} has more than one initial bid", entry.cluster),
                });
            }
        }
        Ok(())
    }

    /// Instantiate the configured mechanism.
    #[must_use]
    pub fn build_mechanism(&self) -> Box<dyn AuctionMechanism> {
        match self.mechanism {
            MechanismKind::EqualPrice => Box::new(EqualPriceMechanism::new(EqualPriceConfig {
                transaction_fee: self.transaction_fee,
                reputation_penalty: self.reputation_penalty,
                best_response: self.best_response.clone(),
            })),
            MechanismKind::PayAsBid => Box::new(PayAsBidMechanism::new(PayAsBidConfig {
                transaction_fee: self.transaction_fee,
            })),
        }
    }

    /// Build the market over `distribution`.
    pub fn build_market(&self, distribution: StakeDistribution) -> Result<Market, ConfigError> {
        let builder = Market::builder(distribution)
            .mechanism(self.build_mechanism())
            .epoch_size(self.epoch_size)
            .pay_for_initial_bids(self.pay_for_initial_bids);

        if self.initial_bids.is_empty() {
            return builder.build();
        }

        let bids: HashMap<ClusterId, Option<Bid>> = self
            .initial_bids
            .iter()
            .map(|entry| (ClusterId::new(entry.cluster), Some(entry.bid())))
            .collect();
        builder.initial_bids(bids).build()
    }
}
