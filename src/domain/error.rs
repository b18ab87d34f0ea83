//! Market contract violations.
//!
//! These errors signal that a caller broke the usage contract of the market
//! (naming a cluster that is not a participant, moving money between clusters
//! that never entered the market) or that a mechanism was asked for a hook it
//! does not provide. They are terminal for the current run; every variant
//! carries the offending cluster or value so a misconfigured experiment can be
//! diagnosed from the message alone.
//!
//! # Examples
//!
//! ```
//! use bribery_sim::domain::error::MarketError;
//! use bribery_sim::domain::{ClusterSpec, Ledger, StakeDistribution};
//! use rust_decimal_macros::dec;
//!
//! let dist = StakeDistribution::builder()
//!     .size(10, ClusterSpec::count(2))
//!     .seed(1)
//!     .build()
//!     .unwrap();
//! let clusters = dist.clusters();
//! let mut ledger = Ledger::new(clusters);
//!
//! // Neither cluster has ever placed a bid.
//! let result = ledger.make_payment(&clusters[0], &clusters[1], dec!(5));
//! assert!(matches!(result, Err(MarketError::NotParticipating { .. })));
//! ```

use thiserror::Error;

use super::cluster::ClusterId;
use super::money::Amount;

/// Errors raised when the market's usage contract is violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    /// A cluster was named that is not a participant of this market.
    #[error("{cluster} is not a participant of this market ({participants} participants)")]
    UnknownCluster {
        /// The offending cluster.
        cluster: ClusterId,
        /// Number of participants the market actually has.
        participants: usize,
    },

    /// A payment was attempted involving a cluster that never placed a bid.
    #[error("payment of {amount} from {sender} to {receiver}: {cluster} never participated")]
    NotParticipating {
        sender: ClusterId,
        receiver: ClusterId,
        amount: Amount,
        /// The party that has not participated.
        cluster: ClusterId,
    },

    /// Payments move money in one direction only.
    #[error("payment from {sender} to {receiver} must be non-negative, got {amount}")]
    NegativePayment {
        sender: ClusterId,
        receiver: ClusterId,
        amount: Amount,
    },

    /// A bid carried a negative amount.
    #[error("invalid bid for {cluster}: {field} must be non-negative, got {value}")]
    InvalidBid {
        cluster: ClusterId,
        field: &'static str,
        value: Amount,
    },

    /// A bid amount too large to aggregate over a side without overflow.
    #[error("invalid bid for {cluster}: {field} must not exceed {limit}, got {value}")]
    BidTooLarge {
        cluster: ClusterId,
        field: &'static str,
        value: Amount,
        limit: Amount,
    },

    /// A mechanism was asked for a hook it does not implement.
    #[error("mechanism '{mechanism}' does not implement {hook}")]
    NotImplemented {
        mechanism: &'static str,
        hook: &'static str,
    },
}
