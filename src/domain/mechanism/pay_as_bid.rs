//! Pay-as-bid auction.
//!
//! A side's collective bid is simply the sum of its members' individual
//! bids, repeats included. The proposer's own-slot valuation is added to a
//! side once for every time the proposer appears on it, since the proposer
//! gets that slot if the side wins. Early exits, the decision rule and the
//! payment schedule match the equal-price mechanism.
//!
//! This mechanism has no adaptive bidding; runs using it should set the
//! revision probability to zero.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::trace;

use super::{AuctionMechanism, AuctionOutcome, AuctionRound, BidCost, Decision};
use crate::domain::bid::Bid;
use crate::domain::cluster::Cluster;
use crate::domain::money::Amount;
use crate::domain::sampler::SimRng;

/// Configuration for the pay-as-bid mechanism.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PayAsBidConfig {
    /// Charged whenever a cluster changes its standing bid.
    #[serde(default = "default_transaction_fee")]
    pub transaction_fee: Amount,
}

fn default_transaction_fee() -> Amount {
    Decimal::ONE
}

impl Default for PayAsBidConfig {
    fn default() -> Self {
        Self {
            transaction_fee: default_transaction_fee(),
        }
    }
}

/// Summed-bid auction.
#[derive(Debug, Clone, Default)]
pub struct PayAsBidMechanism {
    config: PayAsBidConfig,
}

impl PayAsBidMechanism {
    #[must_use]
    pub const fn new(config: PayAsBidConfig) -> Self {
        Self { config }
    }

    fn side_total(round: &AuctionRound<'_>, side: &[Cluster], own_slot: Amount) -> Amount {
        let bids: Amount = round.side_values(side).into_iter().sum();
        bids + own_slot * Decimal::from(round.proposer_appearances(side) as u64)
    }
}

impl AuctionMechanism for PayAsBidMechanism {
    fn name(&self) -> &'static str {
        "pay_as_bid"
    }

    fn cost_for_bid(&self, old: Option<&Bid>, new: Option<&Bid>) -> BidCost {
        BidCost {
            transaction_cost: if old == new {
                Amount::ZERO
            } else {
                self.config.transaction_fee
            },
            capital_locked: new.map_or(Amount::ZERO, Bid::willing_to_pay),
            reputation: Amount::ZERO,
        }
    }

    fn decide(&self, round: &AuctionRound<'_>, _rng: &mut SimRng) -> AuctionOutcome {
        let Some(proposer_bid) = round.swayable_proposer_bid() else {
            return AuctionOutcome::unswayed();
        };

        let own_slot = proposer_bid.valuation_of_own_slots();
        let reveal_total = Self::side_total(round, round.reveal_side, own_slot);
        let miss_total = Self::side_total(round, round.miss_side, own_slot);

        let decision = if reveal_total + proposer_bid.minimum_gain() >= miss_total {
            Decision::Reveal
        } else {
            Decision::Miss
        };
        trace!(%reveal_total, %miss_total, %decision, "Pay-as-bid auction resolved");
        AuctionOutcome::settle(round, decision)
    }
}
