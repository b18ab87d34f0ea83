//! Equal-price auction.
//!
//! Every participant commits to the most it is individually willing to pay.
//! Each side's collective bid is the best revenue it can raise when every
//! payer pays the same price: the top `k` bidders each paying the `k`-th
//! highest individual bid. The proposer's own-slot valuation counts towards
//! the reveal side, and the reveal side also gets the proposer's
//! `minimum_gain` as a head start. Whichever side is ahead wins, and each
//! bidder on that side pays its own `willing_to_pay`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::trace;

use super::{
    AuctionMechanism, AuctionOutcome, AuctionRound, BidCost, BidRevision, Decision,
};
use crate::domain::bid::{Bid, BidBook};
use crate::domain::cluster::Cluster;
use crate::domain::error::MarketError;
use crate::domain::money::Amount;
use crate::domain::sampler::SimRng;

/// Configuration for the equal-price mechanism.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EqualPriceConfig {
    /// Charged whenever a cluster changes its standing bid.
    #[serde(default = "default_transaction_fee")]
    pub transaction_fee: Amount,

    /// Reputation carried while a bid accepts bribes.
    #[serde(default = "default_reputation_penalty")]
    pub reputation_penalty: Amount,

    /// Best-response search settings.
    #[serde(default)]
    pub best_response: BestResponseConfig,
}

fn default_transaction_fee() -> Amount {
    Decimal::ONE
}

fn default_reputation_penalty() -> Amount {
    Decimal::TEN
}

impl Default for EqualPriceConfig {
    fn default() -> Self {
        Self {
            transaction_fee: default_transaction_fee(),
            reputation_penalty: default_reputation_penalty(),
            best_response: BestResponseConfig::default(),
        }
    }
}

/// Monte-Carlo best-response settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BestResponseConfig {
    /// Simulated epochs per evaluation.
    #[serde(default = "default_samples")]
    pub samples: usize,

    /// Epochs a new bid is expected to stand before the next revision.
    #[serde(default = "default_horizon_epochs")]
    pub horizon_epochs: u32,
}

fn default_samples() -> usize {
    64
}

fn default_horizon_epochs() -> u32 {
    101
}

impl Default for BestResponseConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            horizon_epochs: default_horizon_epochs(),
        }
    }
}

/// Price fractions of a slot tried by the best response.
const PRICE_GRID: [Decimal; 5] = [dec!(0), dec!(0.1), dec!(0.25), dec!(0.5), dec!(1)];

/// Minimum-gain fractions of a slot tried for bribe-accepting bids.
const GAIN_GRID: [Decimal; 2] = [dec!(0.25), dec!(1)];

/// Collective bid of one side under the equal-price rule.
///
/// Sorts the individual maxima in descending order and returns the best
/// `value_at_rank_k * k`. An empty side bids zero.
///
/// ```
/// use bribery_sim::domain::mechanism::maximum_bid_by_side;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(maximum_bid_by_side(&[dec!(1), dec!(2), dec!(3), dec!(4)]), dec!(6));
/// ```
#[must_use]
pub fn maximum_bid_by_side(maximum_individual_payments: &[Amount]) -> Amount {
    let mut sorted = maximum_individual_payments.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted
        .iter()
        .zip(1u32..)
        .map(|(price, payers)| *price * Decimal::from(payers))
        .max()
        .unwrap_or(Amount::ZERO)
}

/// Reference mechanism: equal-price collective bids.
#[derive(Debug, Clone, Default)]
pub struct EqualPriceMechanism {
    config: EqualPriceConfig,
}

/// One simulated epoch used to score candidate bids.
struct Scenario {
    proposer: Cluster,
    reveal_side: Vec<Cluster>,
    miss_side: Vec<Cluster>,
}

impl EqualPriceMechanism {
    /// Create a new mechanism with the given configuration.
    #[must_use]
    pub const fn new(config: EqualPriceConfig) -> Self {
        Self { config }
    }

    /// Get the mechanism configuration.
    #[must_use]
    pub const fn config(&self) -> &EqualPriceConfig {
        &self.config
    }

    /// Decide one auction. Deterministic; needs no randomness.
    #[must_use]
    pub fn resolve(&self, round: &AuctionRound<'_>) -> AuctionOutcome {
        let Some(proposer_bid) = round.swayable_proposer_bid() else {
            return AuctionOutcome::unswayed();
        };

        let mut reveal_values = round.side_values(round.reveal_side);
        reveal_values.push(proposer_bid.valuation_of_own_slots());
        let reveal_bid = maximum_bid_by_side(&reveal_values);
        let miss_bid = maximum_bid_by_side(&round.side_values(round.miss_side));

        let decision = if reveal_bid + proposer_bid.minimum_gain() >= miss_bid {
            Decision::Reveal
        } else {
            Decision::Miss
        };
        trace!(
            proposer = %round.last_slot_proposer.id(),
            %reveal_bid,
            %miss_bid,
            minimum_gain = %proposer_bid.minimum_gain(),
            %decision,
            "Equal-price auction resolved"
        );
        AuctionOutcome::settle(round, decision)
    }

    fn candidates(&self, current: Option<Bid>, slot_value: Amount) -> Vec<Option<Bid>> {
        let mut candidates = vec![current, None];
        for price in PRICE_GRID {
            let pay_only = Bid::new(price * slot_value);
            candidates.push(Some(pay_only));
            for gain in GAIN_GRID {
                candidates.push(Some(pay_only.accepting_bribes(gain * slot_value)));
            }
        }
        candidates.dedup();
        candidates
    }

    fn sample_scenarios(&self, revision: &BidRevision<'_>, rng: &mut SimRng) -> Vec<Scenario> {
        let dist = revision.distribution;
        (0..self.config.best_response.samples)
            .map(|_| Scenario {
                proposer: dist.draw(rng),
                reveal_side: (0..revision.epoch_size).map(|_| dist.draw(rng)).collect(),
                miss_side: (0..revision.epoch_size).map(|_| dist.draw(rng)).collect(),
            })
            .collect()
    }

    /// Net gain of `cluster` in one scenario under `bids`.
    fn scenario_gain(
        &self,
        cluster: &Cluster,
        scenario: &Scenario,
        bids: &BidBook,
        slot_value: Amount,
    ) -> Amount {
        let round = AuctionRound {
            reveal_side: &scenario.reveal_side,
            miss_side: &scenario.miss_side,
            last_slot_proposer: scenario.proposer,
            bids,
        };
        let outcome = self.resolve(&round);

        let mut gain = outcome
            .payments
            .get(&cluster.id())
            .map_or(Amount::ZERO, |paid| -*paid);
        let is_proposer = scenario.proposer == *cluster;
        if is_proposer {
            gain += outcome.total_paid();
        }
        if outcome.decision == Decision::Miss {
            let gained = scenario.miss_side.iter().filter(|c| *c == cluster).count() as i64
                - scenario.reveal_side.iter().filter(|c| *c == cluster).count() as i64
                - i64::from(is_proposer);
            gain += Decimal::from(gained) * slot_value;
        }
        gain
    }
}

impl AuctionMechanism for EqualPriceMechanism {
    fn name(&self) -> &'static str {
        "equal_price"
    }

    fn cost_for_bid(&self, old: Option<&Bid>, new: Option<&Bid>) -> BidCost {
        let transaction_cost = if old == new {
            Amount::ZERO
        } else {
            self.config.transaction_fee
        };
        let capital_locked = new.map_or(Amount::ZERO, Bid::willing_to_pay);
        let reputation = match new {
            Some(bid) if bid.willing_to_receive_bribes() => self.config.reputation_penalty,
            _ => Amount::ZERO,
        };
        BidCost {
            transaction_cost,
            capital_locked,
            reputation,
        }
    }

    fn decide(&self, round: &AuctionRound<'_>, _rng: &mut SimRng) -> AuctionOutcome {
        self.resolve(round)
    }

    /// Score a grid of candidate bids against the same simulated epochs and
    /// keep the one with the highest expected net gain over the revision
    /// horizon. The current bid wins ties.
    fn best_bid(&self, revision: &BidRevision<'_>, rng: &mut SimRng) -> Result<Option<Bid>, MarketError> {
        let current = revision.current_bid();
        if self.config.best_response.samples == 0 {
            return Ok(current);
        }

        let cluster = revision.cluster;
        let slot_value = revision.valuation.slot_value;
        let horizon = Decimal::from(self.config.best_response.horizon_epochs);
        let samples = Decimal::from(self.config.best_response.samples as u64);
        let scenarios = self.sample_scenarios(revision, rng);

        let mut best: Option<(Option<Bid>, Amount)> = None;
        for candidate in self.candidates(current, slot_value) {
            if let Some(bid) = &candidate {
                bid.validate(cluster.id())?;
            }
            let bids = revision.bids.with_bid(cluster.id(), candidate);
            let total: Amount = scenarios
                .iter()
                .map(|s| self.scenario_gain(&cluster, s, &bids, slot_value))
                .sum();

            let cost = self.cost_for_bid(current.as_ref(), candidate.as_ref());
            let objective = total / samples * horizon
                - cost.transaction_cost
                - cost.reputation * cluster.reputation_factor()
                - cost.capital_locked * revision.valuation.interest_rate * horizon;

            if best.as_ref().map_or(true, |(_, score)| objective > *score) {
                best = Some((candidate, objective));
            }
        }

        let choice = best.and_then(|(bid, _)| bid);
        trace!(cluster = %cluster.id(), ?choice, "Best response computed");
        Ok(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mechanism::Valuation;
    use crate::domain::sampler::seeded_rng;
    use crate::domain::{ClusterSpec, StakeDistribution};

    fn distribution(n: usize) -> StakeDistribution {
        StakeDistribution::from_map([(10, ClusterSpec::count(n))], 5).unwrap()
    }

    #[test]
    fn maximum_bid_picks_best_uniform_price() {
        assert_eq!(maximum_bid_by_side(&[dec!(1), dec!(2), dec!(3), dec!(4)]), dec!(6));
        assert_eq!(maximum_bid_by_side(&[dec!(1), dec!(1), dec!(1), dec!(1)]), dec!(4));
        assert_eq!(maximum_bid_by_side(&[dec!(1.0), dec!(2.0), dec!(2.0)]), dec!(4.0));
    }

    #[test]
    fn maximum_bid_of_empty_side_is_zero() {
        assert_eq!(maximum_bid_by_side(&[]), dec!(0));
    }

    #[test]
    fn single_high_bidder_beats_many_small() {
        assert_eq!(maximum_bid_by_side(&[dec!(1), dec!(1), dec!(10)]), dec!(10));
    }

    #[test]
    fn proposer_without_bid_reveals() {
        let dist = distribution(3);
        let c = dist.clusters();
        let mut bids = BidBook::new(c);
        bids.replace(c[1].id(), Some(Bid::new(dec!(500)))).unwrap();

        let round = AuctionRound {
            reveal_side: &[],
            miss_side: &[c[1]],
            last_slot_proposer: c[0],
            bids: &bids,
        };
        let outcome = EqualPriceMechanism::default().resolve(&round);
        assert_eq!(outcome, AuctionOutcome::unswayed());
    }

    #[test]
    fn miss_side_wins_when_it_outbids_reveal_plus_margin() {
        let dist = distribution(4);
        let c = dist.clusters();
        let mut bids = BidBook::new(c);
        bids.replace(c[0].id(), Some(Bid::new(dec!(10)).accepting_bribes(dec!(5))))
            .unwrap();
        bids.replace(c[1].id(), Some(Bid::new(dec!(8)))).unwrap();
        bids.replace(c[2].id(), Some(Bid::new(dec!(20)))).unwrap();
        bids.replace(c[3].id(), Some(Bid::new(dec!(20)))).unwrap();

        // reveal: {8, own slot 10} -> max(10, 16) = 16, plus margin 5 = 21
        // miss: {20, 20} -> 40
        let reveal = [c[1]];
        let miss = [c[2], c[3]];
        let round = AuctionRound {
            reveal_side: &reveal,
            miss_side: &miss,
            last_slot_proposer: c[0],
            bids: &bids,
        };
        let outcome = EqualPriceMechanism::default().resolve(&round);
        assert_eq!(outcome.decision, Decision::Miss);
        assert_eq!(outcome.total_paid(), dec!(40));
        assert!(!outcome.payments.contains_key(&c[1].id()));
    }

    #[test]
    fn ties_go_to_reveal() {
        let dist = distribution(2);
        let c = dist.clusters();
        let mut bids = BidBook::new(c);
        bids.replace(c[0].id(), Some(Bid::new(dec!(0)).accepting_bribes(dec!(0))))
            .unwrap();
        bids.replace(c[1].id(), Some(Bid::new(dec!(0)))).unwrap();

        let miss = [c[1]];
        let round = AuctionRound {
            reveal_side: &[],
            miss_side: &miss,
            last_slot_proposer: c[0],
            bids: &bids,
        };
        let outcome = EqualPriceMechanism::default().resolve(&round);
        assert_eq!(outcome.decision, Decision::Reveal);
        assert!(outcome.payments.is_empty());
    }

    #[test]
    fn cost_for_bid_contract() {
        let mechanism = EqualPriceMechanism::default();
        assert_eq!(mechanism.cost_for_bid(None, None), BidCost::ZERO);

        let bid = Bid::new(dec!(30)).accepting_bribes(dec!(5));
        let placed = mechanism.cost_for_bid(None, Some(&bid));
        assert_eq!(placed.transaction_cost, dec!(1));
        assert_eq!(placed.capital_locked, dec!(30));
        assert_eq!(placed.reputation, dec!(10));

        let unchanged = mechanism.cost_for_bid(Some(&bid), Some(&bid));
        assert_eq!(unchanged.transaction_cost, dec!(0));

        let withdrawn = mechanism.cost_for_bid(Some(&bid), None);
        assert_eq!(withdrawn.capital_locked, dec!(0));
        assert_eq!(withdrawn.reputation, dec!(0));
    }

    #[test]
    fn best_bid_with_no_samples_keeps_current() {
        let dist = distribution(3);
        let mut bids = BidBook::new(dist.clusters());
        let cluster = dist.clusters()[0];
        bids.replace(cluster.id(), Some(Bid::new(dec!(7)))).unwrap();

        let mechanism = EqualPriceMechanism::new(EqualPriceConfig {
            best_response: BestResponseConfig {
                samples: 0,
                horizon_epochs: 10,
            },
            ..EqualPriceConfig::default()
        });
        let revision = BidRevision {
            cluster,
            bids: &bids,
            distribution: &dist,
            epoch_size: 4,
            valuation: Valuation {
                slot_value: dec!(100),
                interest_rate: dec!(0.01),
            },
        };
        let bid = mechanism.best_bid(&revision, &mut seeded_rng(1)).unwrap();
        assert_eq!(bid, Some(Bid::new(dec!(7))));
    }

    #[test]
    fn best_bid_in_idle_market_stays_out() {
        // Nobody else bids, so no bid can ever change an outcome; any
        // candidate other than "no bid" only adds costs.
        let dist = distribution(5);
        let bids = BidBook::new(dist.clusters());
        let revision = BidRevision {
            cluster: dist.clusters()[2],
            bids: &bids,
            distribution: &dist,
            epoch_size: 4,
            valuation: Valuation {
                slot_value: dec!(100),
                interest_rate: dec!(0.01),
            },
        };
        let bid = EqualPriceMechanism::default()
            .best_bid(&revision, &mut seeded_rng(8))
            .unwrap();
        assert_eq!(bid, None);
    }

    #[test]
    fn best_bid_is_reproducible() {
        let dist = distribution(6);
        let mut bids = BidBook::new(dist.clusters());
        for (i, c) in dist.clusters().iter().enumerate() {
            let bid = Bid::new(Decimal::from(i as u64 * 10)).accepting_bribes(dec!(20));
            bids.replace(c.id(), Some(bid)).unwrap();
        }
        let revision = BidRevision {
            cluster: dist.clusters()[1],
            bids: &bids,
            distribution: &dist,
            epoch_size: 3,
            valuation: Valuation {
                slot_value: dec!(100),
                interest_rate: dec!(0),
            },
        };
        let mechanism = EqualPriceMechanism::default();
        let a = mechanism.best_bid(&revision, &mut seeded_rng(77)).unwrap();
        let b = mechanism.best_bid(&revision, &mut seeded_rng(77)).unwrap();
        assert_eq!(a, b);
    }
}
