//! Standing bids.
//!
//! A cluster holds at most one standing [`Bid`], which has to express both
//! "I want to bribe" (`willing_to_pay`) and "I can be bribed"
//! (`willing_to_receive_bribes`, `minimum_gain`). `None` in the [`BidBook`]
//! means the cluster has no active bid.

use serde::{Deserialize, Serialize};

use rust_decimal_macros::dec;

use super::cluster::{Cluster, ClusterId};
use super::error::MarketError;
use super::money::Amount;

/// Largest amount a bid may carry.
///
/// Sides hold at most [`MAX_EPOCH_SIZE`](super::MAX_EPOCH_SIZE) clusters, so
/// collective bids and payment totals stay far inside `Decimal`'s range.
pub const MAX_BID_AMOUNT: Amount = dec!(1000000000000000);

/// One cluster's standing bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    willing_to_pay: Amount,
    willing_to_receive_bribes: bool,
    minimum_gain: Amount,
    valuation_of_own_slots: Amount,
}

impl Bid {
    /// A bid that pays up to `willing_to_pay` and refuses bribes.
    ///
    /// The cluster's valuation of its own slots is set equal to what it is
    /// willing to pay for one.
    #[must_use]
    pub const fn new(willing_to_pay: Amount) -> Self {
        Self {
            willing_to_pay,
            willing_to_receive_bribes: false,
            minimum_gain: Amount::ZERO,
            valuation_of_own_slots: willing_to_pay,
        }
    }

    /// Accept bribes when the miss side outbids the reveal side by more than
    /// `minimum_gain`.
    #[must_use]
    pub fn accepting_bribes(mut self, minimum_gain: Amount) -> Self {
        self.willing_to_receive_bribes = true;
        self.minimum_gain = minimum_gain;
        self
    }

    /// Override how much the cluster values keeping its own slot.
    #[must_use]
    pub fn with_own_slot_valuation(mut self, valuation: Amount) -> Self {
        self.valuation_of_own_slots = valuation;
        self
    }

    /// Most this cluster pays per epoch to have its side win.
    #[must_use]
    pub const fn willing_to_pay(&self) -> Amount {
        self.willing_to_pay
    }

    #[must_use]
    pub const fn willing_to_receive_bribes(&self) -> bool {
        self.willing_to_receive_bribes
    }

    /// Margin by which the miss side must beat the reveal side before this
    /// cluster, as last-slot proposer, misses its slot.
    #[must_use]
    pub const fn minimum_gain(&self) -> Amount {
        self.minimum_gain
    }

    #[must_use]
    pub const fn valuation_of_own_slots(&self) -> Amount {
        self.valuation_of_own_slots
    }

    /// Check that every amount lies within `0..=MAX_BID_AMOUNT`.
    pub fn validate(&self, cluster: ClusterId) -> Result<(), MarketError> {
        let fields = [
            ("willing_to_pay", self.willing_to_pay),
            ("minimum_gain", self.minimum_gain),
            ("valuation_of_own_slots", self.valuation_of_own_slots),
        ];
        for (field, value) in fields {
            if value < Amount::ZERO {
                return Err(MarketError::InvalidBid {
                    cluster,
                    field,
                    value,
                });
            }
            if value > MAX_BID_AMOUNT {
                return Err(MarketError::BidTooLarge {
                    cluster,
                    field,
                    value,
                    limit: MAX_BID_AMOUNT,
                });
            }
        }
        Ok(())
    }
}

/// Standing bids of every participant, indexed by cluster id.
///
/// The book always has exactly one entry per participant.
#[derive(Debug, Clone, PartialEq)]
pub struct BidBook {
    bids: Vec<Option<Bid>>,
}

impl BidBook {
    /// An empty book (no active bids) for `clusters`.
    #[must_use]
    pub fn new(clusters: &[Cluster]) -> Self {
        Self {
            bids: vec![None; clusters.len()],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Whether `cluster` has an entry in this book.
    #[must_use]
    pub fn contains(&self, cluster: ClusterId) -> bool {
        cluster.index() < self.bids.len()
    }

    /// Standing bid of `cluster`, `None` if it has none or is unknown.
    #[must_use]
    pub fn get(&self, cluster: ClusterId) -> Option<&Bid> {
        self.bids.get(cluster.index()).and_then(Option::as_ref)
    }

    /// Replace the standing bid of `cluster`, returning the old one.
    pub fn replace(&mut self, cluster: ClusterId, bid: Option<Bid>) -> Result<Option<Bid>, MarketError> {
        let participants = self.bids.len();
        let slot = self
            .bids
            .get_mut(cluster.index())
            .ok_or(MarketError::UnknownCluster {
                cluster,
                participants,
            })?;
        Ok(std::mem::replace(slot, bid))
    }

    /// Copy of this book with one entry swapped, for what-if evaluation.
    #[must_use]
    pub fn with_bid(&self, cluster: ClusterId, bid: Option<Bid>) -> Self {
        let mut book = self.clone();
        if let Some(slot) = book.bids.get_mut(cluster.index()) {
            *slot = bid;
        }
        book
    }

    /// Iterate over `(cluster id, standing bid)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, Option<&Bid>)> {
        self.bids
            .iter()
            .enumerate()
            .map(|(i, b)| (ClusterId::new(i), b.as_ref()))
    }

    /// Number of clusters with an active bid.
    #[must_use]
    pub fn active(&self) -> usize {
        self.bids.iter().filter(|b| b.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClusterSpec, StakeDistribution};
    use rust_decimal_macros::dec;

    #[test]
    fn new_bid_values_own_slots_at_its_price() {
        let bid = Bid::new(dec!(12));
        assert_eq!(bid.valuation_of_own_slots(), dec!(12));
        assert!(!bid.willing_to_receive_bribes());
        assert_eq!(bid.minimum_gain(), dec!(0));
    }

    #[test]
    fn accepting_bribes_sets_margin() {
        let bid = Bid::new(dec!(1)).accepting_bribes(dec!(30)).with_own_slot_valuation(dec!(80));
        assert!(bid.willing_to_receive_bribes());
        assert_eq!(bid.minimum_gain(), dec!(30));
        assert_eq!(bid.valuation_of_own_slots(), dec!(80));
        assert_eq!(bid.willing_to_pay(), dec!(1));
    }

    #[test]
    fn negative_amounts_fail_validation() {
        let id = ClusterId::new(0);
        assert!(Bid::new(dec!(0)).validate(id).is_ok());
        assert_eq!(
            Bid::new(dec!(-1)).validate(id),
            Err(MarketError::InvalidBid {
                cluster: id,
                field: "willing_to_pay",
                value: dec!(-1),
            })
        );
        assert!(Bid::new(dec!(1)).accepting_bribes(dec!(-2)).validate(id).is_err());
    }

    #[test]
    fn amounts_above_the_cap_fail_validation() {
        let id = ClusterId::new(0);
        assert!(Bid::new(MAX_BID_AMOUNT).validate(id).is_ok());

        let huge = Amount::MAX / dec!(2);
        assert_eq!(
            Bid::new(huge).validate(id),
            Err(MarketError::BidTooLarge {
                cluster: id,
                field: "willing_to_pay",
                value: huge,
                limit: MAX_BID_AMOUNT,
            })
        );
        let greedy = Bid::new(dec!(1)).accepting_bribes(MAX_BID_AMOUNT + dec!(1));
        assert!(matches!(
            greedy.validate(id),
            Err(MarketError::BidTooLarge {
                field: "minimum_gain",
                ..
            })
        ));
    }

    #[test]
    fn book_covers_every_participant() {
        let dist = StakeDistribution::from_map([(5, ClusterSpec::count(3))], 0).unwrap();
        let mut book = BidBook::new(dist.clusters());
        assert_eq!(book.len(), 3);
        assert_eq!(book.active(), 0);

        let id = dist.clusters()[1].id();
        assert_eq!(book.replace(id, Some(Bid::new(dec!(4)))).unwrap(), None);
        assert_eq!(book.get(id), Some(&Bid::new(dec!(4))));
        assert_eq!(book.active(), 1);

        let unknown = ClusterId::new(3);
        assert!(!book.contains(unknown));
        assert!(book.replace(unknown, None).is_err());
    }

    #[test]
    fn with_bid_leaves_original_untouched() {
        let dist = StakeDistribution::from_map([(5, ClusterSpec::count(2))], 0).unwrap();
        let book = BidBook::new(dist.clusters());
        let id = dist.clusters()[0].id();
        let what_if = book.with_bid(id, Some(Bid::new(dec!(9))));
        assert_eq!(book.get(id), None);
        assert_eq!(what_if.get(id).map(Bid::willing_to_pay), Some(dec!(9)));
    }
}
