use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bribery_sim::domain::mechanism::{BestResponseConfig, EqualPriceConfig};
use bribery_sim::domain::{
    Bid, Cluster, ClusterSpec, EqualPriceMechanism, Market, StakeDistribution,
};
use bribery_sim::runner::{RunnerConfig, SeedConfig};

/// `{20: (3, 1), 10: (5, 2), 100: 1}`: nine clusters, 210 validators.
pub fn reference_distribution(seed: u64) -> StakeDistribution {
    StakeDistribution::builder()
        .size(20, ClusterSpec::with_reputation(3, dec!(1)))
        .size(10, ClusterSpec::with_reputation(5, dec!(2)))
        .size(100, ClusterSpec::count(1))
        .seed(seed)
        .build()
        .expect("reference distribution")
}

/// Every cluster bids its validator count, accepts any bribe and puts no
/// value on its own slot, so the side with the larger collective bid wins.
pub fn bribable_bid(cluster: &Cluster) -> Option<Bid> {
    Some(
        Bid::new(Decimal::from(cluster.validator_count()))
            .accepting_bribes(dec!(0))
            .with_own_slot_valuation(dec!(0)),
    )
}

/// A market where misses actually happen.
pub fn bribable_market(epoch_size: usize) -> Market {
    Market::builder(reference_distribution(3))
        .epoch_size(epoch_size)
        .initial_bid_fn(bribable_bid)
        .build()
        .expect("bribable market")
}

/// Equal-price mechanism with a cheap best response.
pub fn quick_equal_price() -> Box<EqualPriceMechanism> {
    Box::new(EqualPriceMechanism::new(EqualPriceConfig {
        best_response: BestResponseConfig {
            samples: 8,
            horizon_epochs: 20,
        },
        ..EqualPriceConfig::default()
    }))
}

/// Fixed seeds, no revisions.
pub fn static_runner_config(seed: u64) -> RunnerConfig {
    RunnerConfig {
        revision_probability: 0.0,
        seeds: SeedConfig::from_master(seed),
        ..RunnerConfig::with_interest_rate(dec!(0.001))
    }
}
