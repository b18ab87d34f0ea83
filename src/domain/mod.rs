//! Simulation domain: stake, bids, balance sheets and the auction market.

mod balance;
mod bid;
mod cluster;
mod market;
mod money;
mod sampler;
mod stake;

pub mod error;
pub mod mechanism;

// Participants and stake
pub use cluster::{Cluster, ClusterId};
pub use sampler::{entropy_rng, seeded_rng, ClusterSampler, SimRng};
pub use stake::{ClusterSpec, StakeDistribution, StakeDistributionBuilder};

// Bids and accounting
pub use balance::{Balance, Ledger};
pub use bid::{Bid, BidBook, MAX_BID_AMOUNT};
pub use money::Amount;

// Market
pub use error::MarketError;
pub use market::{Market, MarketBuilder, Sides, DEFAULT_EPOCH_SIZE, MAX_EPOCH_SIZE};
pub use mechanism::{
    AuctionMechanism, AuctionOutcome, AuctionRound, BidCost, BidRevision, Decision,
    EqualPriceMechanism, PayAsBidMechanism, Valuation,
};
