//! Epoch-by-epoch simulation driver.
//!
//! The [`Runner`] owns a [`Market`] and the proposer pointer and advances the
//! simulation one epoch per [`Runner::process_epoch`] call. Callers drive the
//! loop; there is no terminal state.
//!
//! Every epoch runs the same fixed sequence:
//! 1. accrue capital interest on every balance sheet,
//! 2. sample the reveal and miss sides,
//! 3. resolve the auction for the current last-slot proposer,
//! 4. transfer the bribes to that proposer,
//! 5. compute the net slot deltas against a no-market baseline,
//! 6. book those deltas at the configured slot value,
//! 7. move the proposer pointer to the last cluster of the winning side,
//! 8. pick the clusters that revise their bids,
//! 9. compute all revised bids against the current book, then place them.

use std::collections::BTreeMap;

use rand::{Rng, RngCore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::domain::{
    entropy_rng, seeded_rng, Amount, Bid, Cluster, ClusterId, ClusterSampler, Decision, Market,
    MarketError, Sides, SimRng, Valuation, MAX_BID_AMOUNT,
};
use crate::error::ConfigError;

/// Slot value used when nothing else is configured.
pub const DEFAULT_PROPOSER_SLOT_VALUE: Decimal = dec!(100);

/// Chance per epoch that a given cluster revises its bid.
pub const DEFAULT_REVISION_PROBABILITY: f64 = 1.0 / 101.0;

/// Seeds for the independent randomness streams of a run.
///
/// An explicit per-stream seed always wins. Streams without one derive their
/// seed from `master`; without a master they fall back to entropy, except
/// side sampling which then uses the distribution's own default stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub master: Option<u64>,
    /// Side sampling and the initial proposer draw.
    #[serde(default)]
    pub sampling: Option<u64>,
    /// Selection of revising clusters.
    #[serde(default)]
    pub revision: Option<u64>,
    /// Best-response simulations.
    #[serde(default)]
    pub best_response: Option<u64>,
    /// Passed to the mechanism when resolving auctions.
    #[serde(default)]
    pub auction: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamSeeds {
    sampling: Option<u64>,
    revision: Option<u64>,
    best_response: Option<u64>,
    auction: Option<u64>,
}

impl SeedConfig {
    /// Seeds every stream from one master seed.
    #[must_use]
    pub fn from_master(master: u64) -> Self {
        Self {
            master: Some(master),
            ..Self::default()
        }
    }

    fn resolve(&self) -> StreamSeeds {
        let derived = self.master.map(|master| {
            let mut rng = seeded_rng(master);
            [rng.next_u64(), rng.next_u64(), rng.next_u64(), rng.next_u64()]
        });
        let pick = |explicit: Option<u64>, index: usize| explicit.or(derived.map(|d| d[index]));

        StreamSeeds {
            sampling: pick(self.sampling, 0),
            revision: pick(self.revision, 1),
            best_response: pick(self.best_response, 2),
            auction: pick(self.auction, 3),
        }
    }
}

fn stream(seed: Option<u64>) -> SimRng {
    seed.map_or_else(entropy_rng, seeded_rng)
}

fn default_proposer_slot_value() -> Amount {
    DEFAULT_PROPOSER_SLOT_VALUE
}

fn default_revision_probability() -> f64 {
    DEFAULT_REVISION_PROBABILITY
}

/// Runner options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunnerConfig {
    /// Interest charged per epoch on locked capital. Required.
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    /// Value credited or debited per slot gained or lost.
    #[serde(default = "default_proposer_slot_value")]
    pub proposer_slot_value: Amount,
    #[serde(default = "default_revision_probability")]
    pub revision_probability: f64,
    /// Index of the first last-slot proposer; drawn at random when unset.
    #[serde(default)]
    pub initial_last_slot_proposer: Option<usize>,
    #[serde(default)]
    pub seeds: SeedConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interest_rate: None,
            proposer_slot_value: DEFAULT_PROPOSER_SLOT_VALUE,
            revision_probability: DEFAULT_REVISION_PROBABILITY,
            initial_last_slot_proposer: None,
            seeds: SeedConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Defaults for everything but the interest rate.
    #[must_use]
    pub fn with_interest_rate(interest_rate: Decimal) -> Self {
        Self {
            interest_rate: Some(interest_rate),
            ..Self::default()
        }
    }

    /// The configured interest rate, which has no default.
    pub fn interest_rate(&self) -> Result<Decimal, ConfigError> {
        self.interest_rate.ok_or(ConfigError::MissingField {
            field: "interest_rate",
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interest_rate()? < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "interest_rate",
                reason: "must not be negative".into(),
            });
        }
        if self.proposer_slot_value < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "proposer_slot_value",
                reason: "must not be negative".into(),
            });
        }
        if self.proposer_slot_value > MAX_BID_AMOUNT {
            return Err(ConfigError::InvalidValue {
                field: "proposer_slot_value",
                reason: format!("must not exceed {MAX_BID_AMOUNT}"),
            });
        }
        if !(0.0..=1.0).contains(&self.revision_probability) {
            return Err(ConfigError::InvalidValue {
                field: "revision_probability",
                reason: format!("{} is not within [0, 1]", self.revision_probability),
            });
        }
        Ok(())
    }
}

/// What happened in one epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochReport {
    /// Zero-based epoch number.
    pub epoch: u64,
    pub proposer: ClusterId,
    pub decision: Decision,
    /// Sum of all bribes transferred to the proposer.
    pub bribes_paid: Amount,
    /// Number of clusters that paid a non-zero bribe.
    pub payment_count: usize,
    /// Net slots gained (positive) or lost (negative) per cluster.
    pub slot_deltas: BTreeMap<ClusterId, i64>,
    pub next_proposer: ClusterId,
    /// Clusters that revised their bid at the end of the epoch.
    pub revised: Vec<ClusterId>,
}

/// Drives a [`Market`] one epoch at a time.
#[derive(Debug)]
pub struct Runner {
    market: Market,
    config: RunnerConfig,
    interest_rate: Decimal,
    last_slot_proposer: Cluster,
    epoch: u64,
    sides_sampler: Option<ClusterSampler>,
    revision_rng: SimRng,
    best_response_rng: SimRng,
    auction_rng: SimRng,
}

impl Runner {
    /// Validate `config` and set up the randomness streams.
    pub fn new(mut market: Market, config: RunnerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let interest_rate = config.interest_rate()?;
        let seeds = config.seeds.resolve();

        let mut sides_sampler = seeds
            .sampling
            .map(|seed| market.distribution().seeded_sampler(seed));

        let last_slot_proposer = match config.initial_last_slot_proposer {
            Some(index) => *market.participants().get(index).ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "initial_last_slot_proposer",
                    reason: format!(
                        "index {index} is out of range for {} participants",
                        market.participants().len()
                    ),
                }
            })?,
            None => match sides_sampler.as_mut() {
                Some(sampler) => sampler.next_cluster(),
                None => market.sample_first_proposer(),
            },
        };

        info!(
            participants = market.participants().len(),
            mechanism = market.mechanism_name(),
            %interest_rate,
            slot_value = %config.proposer_slot_value,
            revision_probability = config.revision_probability,
            proposer = %last_slot_proposer.id(),
            "Runner initialized"
        );

        Ok(Self {
            market,
            interest_rate,
            last_slot_proposer,
            epoch: 0,
            sides_sampler,
            revision_rng: stream(seeds.revision),
            best_response_rng: stream(seeds.best_response),
            auction_rng: stream(seeds.auction),
            config,
        })
    }

    #[must_use]
    pub fn market(&self) -> &Market {
        &self.market
    }

    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Number of epochs processed so far.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn last_slot_proposer(&self) -> Cluster {
        self.last_slot_proposer
    }

    /// Value each of `proposers` gains from proposing its slot.
    ///
    /// Slot deltas are booked at these values. Every slot is currently worth
    /// the configured constant.
    #[must_use]
    pub fn proposer_slot_gains(&self, proposers: &[Cluster]) -> Vec<Amount> {
        vec![self.config.proposer_slot_value; proposers.len()]
    }

    fn participant(&self, id: ClusterId) -> Result<Cluster, MarketError> {
        self.market
            .distribution()
            .cluster(id)
            .copied()
            .ok_or(MarketError::UnknownCluster {
                cluster: id,
                participants: self.market.participants().len(),
            })
    }

    fn valuation(&self) -> Valuation {
        Valuation {
            slot_value: self.config.proposer_slot_value,
            interest_rate: self.interest_rate,
        }
    }

    fn sample_sides(&mut self) -> Sides {
        match self.sides_sampler.as_mut() {
            Some(sampler) => self.market.sample_sides_with(sampler),
            None => self.market.sample_sides(),
        }
    }

    /// Advance the simulation by exactly one epoch.
    ///
    /// An error leaves the run in an unspecified state and must end it.
    pub fn process_epoch(&mut self) -> Result<EpochReport, MarketError> {
        let proposer = self.last_slot_proposer;

        self.market.accrue_interest(self.interest_rate);

        let sides = self.sample_sides();
        let outcome = self
            .market
            .get_auction_winner(&sides, &proposer, &mut self.auction_rng)?;

        let mut payment_count = 0;
        for (&payer, &amount) in &outcome.payments {
            // Winning-side clusters without a bid owe nothing and may never
            // have entered the market.
            if amount.is_zero() {
                continue;
            }
            let sender = self.participant(payer)?;
            self.market.make_payment(&sender, &proposer, amount)?;
            payment_count += 1;
        }

        let (slot_deltas, next_proposer) = slot_deltas(&sides, &proposer, outcome.decision);

        let changed = slot_deltas
            .keys()
            .map(|&id| self.participant(id))
            .collect::<Result<Vec<_>, _>>()?;
        let gains = self.proposer_slot_gains(&changed);
        for ((cluster, gain), &delta) in changed.iter().zip(gains).zip(slot_deltas.values()) {
            self.market.apply_slot_delta(cluster.id(), delta, gain)?;
        }

        self.last_slot_proposer = next_proposer;

        let revised = self.revise_bids()?;

        let report = EpochReport {
            epoch: self.epoch,
            proposer: proposer.id(),
            decision: outcome.decision,
            bribes_paid: outcome.total_paid(),
            payment_count,
            slot_deltas,
            next_proposer: next_proposer.id(),
            revised,
        };
        debug!(
            epoch = report.epoch,
            proposer = %report.proposer,
            decision = %report.decision,
            bribes = %report.bribes_paid,
            next_proposer = %report.next_proposer,
            revisions = report.revised.len(),
            "Epoch processed"
        );

        self.epoch += 1;
        Ok(report)
    }

    fn revise_bids(&mut self) -> Result<Vec<ClusterId>, MarketError> {
        let probability = self.config.revision_probability;
        let selected: Vec<Cluster> = self
            .market
            .participants()
            .iter()
            .filter(|_| self.revision_rng.gen_bool(probability))
            .copied()
            .collect();

        let valuation = self.valuation();
        let mut revisions: Vec<(Cluster, Option<Bid>)> = Vec::with_capacity(selected.len());
        for cluster in selected {
            let bid = self
                .market
                .best_bid(&cluster, valuation, &mut self.best_response_rng)?;
            revisions.push((cluster, bid));
        }

        let mut revised = Vec::with_capacity(revisions.len());
        for (cluster, bid) in revisions {
            trace!(cluster = %cluster.id(), ?bid, "Revising bid");
            self.market.place_bid(bid, &cluster)?;
            revised.push(cluster.id());
        }
        Ok(revised)
    }
}

/// Net slot changes against a no-market baseline, and the next proposer.
///
/// A miss costs the proposer its slot, gives every miss-side cluster one
/// extra slot and takes one from every reveal-side cluster. A reveal
/// changes nothing. Zero net changes are dropped.
fn slot_deltas(
    sides: &Sides,
    proposer: &Cluster,
    decision: Decision,
) -> (BTreeMap<ClusterId, i64>, Cluster) {
    let mut deltas = BTreeMap::new();
    let winning_side = match decision {
        Decision::Reveal => &sides.reveal,
        Decision::Miss => {
            *deltas.entry(proposer.id()).or_insert(0) -= 1;
            for cluster in &sides.miss {
                *deltas.entry(cluster.id()).or_insert(0) += 1;
            }
            for cluster in &sides.reveal {
                *deltas.entry(cluster.id()).or_insert(0) -= 1;
            }
            &sides.miss
        }
    };
    deltas.retain(|_, delta| *delta != 0);

    let next = winning_side.last().copied().unwrap_or(*proposer);
    (deltas, next)
}
