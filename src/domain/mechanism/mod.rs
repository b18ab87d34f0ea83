//! Auction mechanisms deciding "reveal vs. miss".
//!
//! Each epoch the last-slot proposer either reveals its slot or deliberately
//! misses it. Two sampled groups of proposers, the reveal side and the miss
//! side, bid against each other to sway that decision. A mechanism turns
//! the standing bids into a [`Decision`] and a payment schedule.
//!
//! # Architecture
//!
//! Every mechanism implements the [`AuctionMechanism`] trait:
//! - `name()` - Unique identifier for logging/config
//! - `cost_for_bid()` - What placing a bid costs the bidder
//! - `decide()` - Resolve one auction from the standing bids
//! - `best_bid()` - Optional best response for adaptive bidding
//!
//! Available mechanisms:
//! - [`EqualPriceMechanism`] - uniform-price collective bids (reference rule)
//! - [`PayAsBidMechanism`] - summed individual bids

pub mod equal_price;
pub mod pay_as_bid;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub use equal_price::{maximum_bid_by_side, BestResponseConfig, EqualPriceConfig, EqualPriceMechanism};
pub use pay_as_bid::{PayAsBidConfig, PayAsBidMechanism};

use super::bid::{Bid, BidBook};
use super::cluster::{Cluster, ClusterId};
use super::error::MarketError;
use super::money::Amount;
use super::sampler::SimRng;
use super::stake::StakeDistribution;

/// Outcome of one auction for the last slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// The proposer reveals its slot (no-market baseline).
    Reveal,
    /// The proposer intentionally misses its slot.
    Miss,
}

impl Decision {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reveal => "reveal",
            Self::Miss => "miss",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What placing a bid costs, as returned by
/// [`AuctionMechanism::cost_for_bid`].
///
/// `transaction_cost` is added to the bidder's running transaction costs;
/// `capital_locked` and `reputation` overwrite the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BidCost {
    pub transaction_cost: Amount,
    pub capital_locked: Amount,
    pub reputation: Amount,
}

impl BidCost {
    /// No cost at all.
    pub const ZERO: Self = Self {
        transaction_cost: Amount::ZERO,
        capital_locked: Amount::ZERO,
        reputation: Amount::ZERO,
    };
}

/// Inputs to one auction.
#[derive(Debug, Clone, Copy)]
pub struct AuctionRound<'a> {
    pub reveal_side: &'a [Cluster],
    pub miss_side: &'a [Cluster],
    pub last_slot_proposer: Cluster,
    pub bids: &'a BidBook,
}

impl<'a> AuctionRound<'a> {
    /// The proposer's bid, if it can be swayed at all.
    ///
    /// `None` when the proposer has no bid or declines bribes; the auction
    /// is then decided for reveal without payments.
    #[must_use]
    pub fn swayable_proposer_bid(&self) -> Option<&'a Bid> {
        self.bids
            .get(self.last_slot_proposer.id())
            .filter(|bid| bid.willing_to_receive_bribes())
    }

    /// `willing_to_pay` of every cluster on `side` holding a bid, repeats
    /// included.
    #[must_use]
    pub fn side_values(&self, side: &[Cluster]) -> Vec<Amount> {
        side.iter()
            .filter_map(|c| self.bids.get(c.id()))
            .map(Bid::willing_to_pay)
            .collect()
    }

    /// How often the proposer appears on `side`.
    #[must_use]
    pub fn proposer_appearances(&self, side: &[Cluster]) -> usize {
        side.iter().filter(|c| **c == self.last_slot_proposer).count()
    }

    /// Every cluster on the winning side pays its own `willing_to_pay`;
    /// clusters without a bid pay zero.
    #[must_use]
    pub fn winning_side_payments(&self, decision: Decision) -> BTreeMap<ClusterId, Amount> {
        let side = match decision {
            Decision::Reveal => self.reveal_side,
            Decision::Miss => self.miss_side,
        };
        side.iter()
            .map(|c| {
                let amount = self
                    .bids
                    .get(c.id())
                    .map_or(Amount::ZERO, Bid::willing_to_pay);
                (c.id(), amount)
            })
            .collect()
    }
}

/// Decision and payment schedule of one auction.
///
/// Payments only name clusters on the winning side. The runner transfers
/// each of them to the current last-slot proposer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionOutcome {
    pub decision: Decision,
    pub payments: BTreeMap<ClusterId, Amount>,
}

impl AuctionOutcome {
    /// Reveal with no payments: the proposer cannot be swayed.
    #[must_use]
    pub fn unswayed() -> Self {
        Self {
            decision: Decision::Reveal,
            payments: BTreeMap::new(),
        }
    }

    /// Decide `decision` and charge the winning side of `round`.
    #[must_use]
    pub fn settle(round: &AuctionRound<'_>, decision: Decision) -> Self {
        Self {
            decision,
            payments: round.winning_side_payments(decision),
        }
    }

    /// Sum of all payments.
    #[must_use]
    pub fn total_paid(&self) -> Amount {
        self.payments.values().copied().sum()
    }
}

/// Per-epoch economics a best response needs to value a bid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    /// Value of one proposer slot.
    pub slot_value: Amount,
    /// Interest charged per epoch on locked capital.
    pub interest_rate: Amount,
}

/// Inputs to a best-response computation for one cluster.
///
/// All other standing bids are taken as fixed.
#[derive(Debug, Clone, Copy)]
pub struct BidRevision<'a> {
    pub cluster: Cluster,
    pub bids: &'a BidBook,
    pub distribution: &'a StakeDistribution,
    pub epoch_size: usize,
    pub valuation: Valuation,
}

impl BidRevision<'_> {
    /// The revising cluster's current bid.
    #[must_use]
    pub fn current_bid(&self) -> Option<Bid> {
        self.bids.get(self.cluster.id()).copied()
    }
}

/// A market mechanism deciding reveal vs. miss from standing bids.
pub trait AuctionMechanism: Send + Sync {
    /// Unique identifier for this mechanism.
    ///
    /// Used in configuration and logging.
    fn name(&self) -> &'static str;

    /// Cost of replacing `old` with `new`.
    ///
    /// Must return [`BidCost::ZERO`] for `(None, None)` and zero locked
    /// capital whenever `new` is `None`.
    fn cost_for_bid(&self, old: Option<&Bid>, new: Option<&Bid>) -> BidCost;

    /// Resolve one auction.
    fn decide(&self, round: &AuctionRound<'_>, rng: &mut SimRng) -> AuctionOutcome;

    /// Best (or close to best) bid for `revision.cluster` in terms of
    /// expected net gain, assuming every other bid stays as it is.
    ///
    /// Mechanisms without adaptive bidding keep this default, which fails
    /// on first use.
    fn best_bid(&self, revision: &BidRevision<'_>, rng: &mut SimRng) -> Result<Option<Bid>, MarketError> {
        let _ = (revision, rng);
        Err(MarketError::NotImplemented {
            mechanism: self.name(),
            hook: "best_bid",
        })
    }
}
