//! The bribery market.
//!
//! A [`Market`] owns the participants' standing bids and balance sheets and
//! delegates auction decisions to a pluggable [`AuctionMechanism`].
//! Participants include clusters that never bid: they are affected by the
//! market all the same, for instance when one of their slots is taken away.
//!
//! # Example
//!
//! ```
//! use bribery_sim::domain::{Bid, ClusterSpec, Market, StakeDistribution};
//! use rust_decimal_macros::dec;
//!
//! let dist = StakeDistribution::from_map([(10, ClusterSpec::count(4))], 1).unwrap();
//! let mut market = Market::builder(dist).epoch_size(2).build().unwrap();
//!
//! let cluster = market.participants()[0];
//! market.place_bid(Some(Bid::new(dec!(5))), &cluster).unwrap();
//! assert!(market.balance_sheet(&cluster).unwrap().participated);
//! ```

use std::collections::HashMap;
use std::fmt;

use tracing::{info, trace};

use super::balance::{Balance, Ledger};
use super::bid::{Bid, BidBook};
use super::cluster::{Cluster, ClusterId};
use super::error::MarketError;
use super::mechanism::{
    AuctionMechanism, AuctionOutcome, AuctionRound, BidCost, BidRevision, EqualPriceMechanism,
    Valuation,
};
use super::money::Amount;
use super::sampler::{ClusterSampler, SimRng};
use super::stake::StakeDistribution;
use crate::error::ConfigError;

/// Number of proposers sampled per side when nothing else is configured.
pub const DEFAULT_EPOCH_SIZE: usize = 32;

/// Largest number of proposers sampled per side.
pub const MAX_EPOCH_SIZE: usize = 1 << 20;

/// The two sampled groups of proposers competing in one auction.
///
/// Neither side is deduplicated: a cluster may appear several times on one
/// side and on both sides at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sides {
    pub reveal: Vec<Cluster>,
    pub miss: Vec<Cluster>,
}

impl Sides {
    /// Draw `epoch_size` reveal-side clusters, then `epoch_size` miss-side
    /// clusters, from one continuous stream.
    pub fn draw(sampler: &mut ClusterSampler, epoch_size: usize) -> Self {
        let reveal = sampler.take_clusters(epoch_size);
        let miss = sampler.take_clusters(epoch_size);
        Self { reveal, miss }
    }
}

/// Bid book, balance sheets and auction mechanism of one simulation.
pub struct Market {
    distribution: StakeDistribution,
    mechanism: Box<dyn AuctionMechanism>,
    bids: BidBook,
    ledger: Ledger,
    epoch_size: usize,
}

impl Market {
    /// Start building a market over `distribution`.
    #[must_use]
    pub fn builder(distribution: StakeDistribution) -> MarketBuilder {
        MarketBuilder::new(distribution)
    }

    /// Every participant, in canonical order.
    #[must_use]
    pub fn participants(&self) -> &[Cluster] {
        self.distribution.clusters()
    }

    #[must_use]
    pub fn distribution(&self) -> &StakeDistribution {
        &self.distribution
    }

    /// Number of proposers sampled per side.
    #[must_use]
    pub fn epoch_size(&self) -> usize {
        self.epoch_size
    }

    #[must_use]
    pub fn mechanism_name(&self) -> &'static str {
        self.mechanism.name()
    }

    /// All standing bids.
    #[must_use]
    pub fn bids(&self) -> &BidBook {
        &self.bids
    }

    /// All balance sheets.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Standing bid of one participant.
    pub fn standing_bid(&self, cluster: &Cluster) -> Result<Option<&Bid>, MarketError> {
        self.check_participant(cluster)?;
        Ok(self.bids.get(cluster.id()))
    }

    /// Balance sheet of one participant.
    pub fn balance_sheet(&self, cluster: &Cluster) -> Result<&Balance, MarketError> {
        self.check_participant(cluster)?;
        self.ledger.get(cluster.id())
    }

    /// The market's own record of `cluster`, which must come from this
    /// market's distribution.
    fn check_participant(&self, cluster: &Cluster) -> Result<Cluster, MarketError> {
        match self.distribution.cluster(cluster.id()) {
            Some(known) if known == cluster && self.bids.contains(cluster.id()) => Ok(*known),
            _ => Err(MarketError::UnknownCluster {
                cluster: cluster.id(),
                participants: self.participants().len(),
            }),
        }
    }

    /// Replace the standing bid of `cluster`; `None` withdraws it.
    ///
    /// The transaction cost is added to the cluster's running costs while
    /// locked capital and reputation are overwritten. Placing any bid marks
    /// the cluster as a participant for good.
    pub fn place_bid(&mut self, bid: Option<Bid>, cluster: &Cluster) -> Result<BidCost, MarketError> {
        self.install_bid(bid, cluster, true)
    }

    fn install_bid(
        &mut self,
        bid: Option<Bid>,
        cluster: &Cluster,
        charge: bool,
    ) -> Result<BidCost, MarketError> {
        let cluster = self.check_participant(cluster)?;
        if let Some(new) = &bid {
            new.validate(cluster.id())?;
        }

        let old = self.bids.replace(cluster.id(), bid)?;
        let cost = self.mechanism.cost_for_bid(old.as_ref(), bid.as_ref());

        let sheet = self.ledger.get_mut(cluster.id())?;
        if bid.is_some() {
            sheet.participated = true;
        }
        if charge {
            sheet.transaction_costs += cost.transaction_cost;
        }
        sheet.capital_locked = cost.capital_locked;
        sheet.reputation = cost.reputation;
        sheet.reputation_factor = cluster.reputation_factor();

        trace!(cluster = %cluster.id(), ?old, new = ?bid, ?cost, "Bid placed");
        Ok(cost)
    }

    /// Cost of replacing `old` with `new` under this market's mechanism.
    #[must_use]
    pub fn cost_for_bid(&self, old: Option<&Bid>, new: Option<&Bid>) -> BidCost {
        self.mechanism.cost_for_bid(old, new)
    }

    /// Best response of `cluster` with every other standing bid fixed.
    ///
    /// Only used to revise bids, never to resolve an auction.
    pub fn best_bid(
        &self,
        cluster: &Cluster,
        valuation: Valuation,
        rng: &mut SimRng,
    ) -> Result<Option<Bid>, MarketError> {
        self.check_participant(cluster)?;
        let revision = BidRevision {
            cluster: *cluster,
            bids: &self.bids,
            distribution: &self.distribution,
            epoch_size: self.epoch_size,
            valuation,
        };
        self.mechanism.best_bid(&revision, rng)
    }

    /// Sample both sides from the distribution's default stream.
    pub fn sample_sides(&mut self) -> Sides {
        let epoch_size = self.epoch_size;
        Sides::draw(self.distribution.default_sampler(), epoch_size)
    }

    /// Draw a single proposer from the distribution's default stream.
    pub fn sample_first_proposer(&mut self) -> Cluster {
        self.distribution.sample_cluster()
    }

    /// Sample both sides from a caller-owned stream.
    pub fn sample_sides_with(&self, sampler: &mut ClusterSampler) -> Sides {
        Sides::draw(sampler, self.epoch_size)
    }

    /// Resolve the auction for `last_slot_proposer`'s slot.
    ///
    /// Every cluster named, on either side or as proposer, must be a
    /// participant.
    pub fn get_auction_winner(
        &self,
        sides: &Sides,
        last_slot_proposer: &Cluster,
        rng: &mut SimRng,
    ) -> Result<AuctionOutcome, MarketError> {
        self.check_participant(last_slot_proposer)?;
        for cluster in sides.reveal.iter().chain(&sides.miss) {
            self.check_participant(cluster)?;
        }

        let round = AuctionRound {
            reveal_side: &sides.reveal,
            miss_side: &sides.miss,
            last_slot_proposer: *last_slot_proposer,
            bids: &self.bids,
        };
        Ok(self.mechanism.decide(&round, rng))
    }

    /// Transfer a bribe between two participants.
    pub fn make_payment(
        &mut self,
        sender: &Cluster,
        receiver: &Cluster,
        amount: Amount,
    ) -> Result<(), MarketError> {
        self.check_participant(sender)?;
        self.check_participant(receiver)?;
        self.ledger.make_payment(sender, receiver, amount)
    }

    /// Charge one period of interest on every balance sheet.
    pub fn accrue_interest(&mut self, interest_rate: Amount) {
        self.ledger.accrue_interest(interest_rate);
    }

    /// Book a net change in slots for one participant.
    pub fn apply_slot_delta(
        &mut self,
        cluster: ClusterId,
        delta: i64,
        slot_value: Amount,
    ) -> Result<(), MarketError> {
        self.ledger.get_mut(cluster)?.apply_slot_delta(delta, slot_value);
        Ok(())
    }
}

impl fmt::Debug for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Market")
            .field("participants", &self.participants().len())
            .field("mechanism", &self.mechanism.name())
            .field("epoch_size", &self.epoch_size)
            .field("active_bids", &self.bids.active())
            .finish_non_exhaustive()
    }
}

type BidFn = Box<dyn FnMut(&Cluster) -> Option<Bid>>;

/// Builder for [`Market`].
pub struct MarketBuilder {
    distribution: StakeDistribution,
    mechanism: Option<Box<dyn AuctionMechanism>>,
    epoch_size: usize,
    initial_bids: Option<HashMap<ClusterId, Option<Bid>>>,
    initial_bid_fn: Option<BidFn>,
    pay_for_initial_bids: bool,
}

impl MarketBuilder {
    fn new(distribution: StakeDistribution) -> Self {
        Self {
            distribution,
            mechanism: None,
            epoch_size: DEFAULT_EPOCH_SIZE,
            initial_bids: None,
            initial_bid_fn: None,
            pay_for_initial_bids: false,
        }
    }

    /// Auction mechanism. Defaults to [`EqualPriceMechanism`].
    #[must_use]
    pub fn mechanism(mut self, mechanism: Box<dyn AuctionMechanism>) -> Self {
        self.mechanism = Some(mechanism);
        self
    }

    /// Proposers sampled per side. Defaults to [`DEFAULT_EPOCH_SIZE`].
    #[must_use]
    pub fn epoch_size(mut self, epoch_size: usize) -> Self {
        self.epoch_size = epoch_size;
        self
    }

    /// Explicit starting bids. Clusters not named start without a bid.
    #[must_use]
    pub fn initial_bids(mut self, bids: HashMap<ClusterId, Option<Bid>>) -> Self {
        self.initial_bids = Some(bids);
        self
    }

    /// Compute each cluster's starting bid.
    #[must_use]
    pub fn initial_bid_fn<F>(mut self, bid_fn: F) -> Self
    where
        F: FnMut(&Cluster) -> Option<Bid> + 'static,
    {
        self.initial_bid_fn = Some(Box::new(bid_fn));
        self
    }

    /// Charge transaction costs for the starting bids. Defaults to false.
    #[must_use]
    pub fn pay_for_initial_bids(mut self, pay: bool) -> Self {
        self.pay_for_initial_bids = pay;
        self
    }

    /// Validate the options and place the starting bids.
    pub fn build(self) -> Result<Market, ConfigError> {
        if self.epoch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "epoch_size",
                reason: "must be positive".into(),
            });
        }
        if self.epoch_size > MAX_EPOCH_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "epoch_size",
                reason: format!("{} exceeds the maximum of {MAX_EPOCH_SIZE}", self.epoch_size),
            });
        }

        let starting_bids: Vec<(Cluster, Option<Bid>)> =
            match (self.initial_bids, self.initial_bid_fn) {
                (Some(_), Some(_)) => {
                    return Err(ConfigError::Conflict {
                        first: "initial_bids",
                        second: "initial_bid_fn",
                    });
                }
                (Some(bids), None) => {
                    let mut named = Vec::with_capacity(bids.len());
                    for (id, bid) in bids {
                        let cluster = self.distribution.cluster(id).copied().ok_or_else(|| {
                            ConfigError::InvalidValue {
                                field: "initial_bids",
                                reason: format!("{id} is not a participant"),
                            }
                        })?;
                        named.push((cluster, bid));
                    }
                    named.sort_by_key(|(cluster, _)| cluster.id());
                    named
                }
                (None, Some(mut bid_fn)) => self
                    .distribution
                    .clusters()
                    .iter()
                    .map(|c| (*c, bid_fn(c)))
                    .collect(),
                (None, None) => Vec::new(),
            };

        let participants = self.distribution.clusters();
        let mut market = Market {
            bids: BidBook::new(participants),
            ledger: Ledger::new(participants),
            mechanism: self
                .mechanism
                .unwrap_or_else(|| Box::new(EqualPriceMechanism::default())),
            epoch_size: self.epoch_size,
            distribution: self.distribution,
        };

        for (cluster, bid) in starting_bids {
            market
                .install_bid(bid, &cluster, self.pay_for_initial_bids)
                .map_err(|e| ConfigError::InvalidValue {
                    field: "initial_bids",
                    reason: e.to_string(),
                })?;
        }

        info!(
            participants = market.participants().len(),
            mechanism = market.mechanism_name(),
            epoch_size = market.epoch_size,
            active_bids = market.bids.active(),
            "Market created"
        );
        Ok(market)
    }
}
