//! Bribery-sim - Epoch-by-epoch simulation of a bribery market.
//!
//! In every epoch the proposer of the last slot decides whether to reveal
//! its block or to miss the slot on purpose. Two groups of proposers,
//! sampled by stake, bid against each other to sway that decision. This
//! crate tracks how such a market redistributes money and slots between
//! validator clusters.
//!
//! # Architecture
//!
//! The crate uses a mechanism pattern for pluggable auction rules:
//!
//! - **`domain::mechanism`** - Pluggable auction mechanisms
//!   - `EqualPriceMechanism` - uniform-price collective bids with a Monte-Carlo best response
//!   - `PayAsBidMechanism` - summed individual bids, no adaptive bidding
//!
//! - **`domain::Market`** - Bid book, balance sheets and the auction contract
//! - **`runner::Runner`** - The epoch state machine driving a market
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Clusters, stake sampling, bids, balances and the market
//! - [`domain::mechanism`] - Mechanism trait and implementations
//! - [`runner`] - Epoch-by-epoch simulation driver
//! - [`error`] - Error types for the crate
//! - [`cli`] - Command-line front end
//!
//! # Example
//!
//! ```
//! use bribery_sim::domain::{ClusterSpec, Market, StakeDistribution};
//! use bribery_sim::runner::{Runner, RunnerConfig, SeedConfig};
//! use rust_decimal_macros::dec;
//!
//! let dist = StakeDistribution::builder()
//!     .size(10, ClusterSpec::count(5))
//!     .size(100, ClusterSpec::count(1))
//!     .seed(1)
//!     .build()
//!     .unwrap();
//! let market = Market::builder(dist).epoch_size(4).build().unwrap();
//!
//! let config = RunnerConfig {
//!     seeds: SeedConfig::from_master(7),
//!     ..RunnerConfig::with_interest_rate(dec!(0.001))
//! };
//! let mut runner = Runner::new(market, config).unwrap();
//! let report = runner.process_epoch().unwrap();
//! assert_eq!(report.epoch, 0);
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod runner;
