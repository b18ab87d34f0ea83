//! Handler for the `run` command.

use tabled::{Table, Tabled};
use tracing::info;

use crate::cli::{output, RunArgs};
use crate::config::Config;
use crate::domain::{Balance, Cluster, Decision, Market};
use crate::error::Result;

#[derive(Tabled)]
struct BalanceRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Size")]
    size: u64,
    #[tabled(rename = "Bid")]
    bid: String,
    #[tabled(rename = "Paid")]
    paid: String,
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "Capital")]
    capital_cost: String,
    #[tabled(rename = "Fees")]
    transaction_costs: String,
    #[tabled(rename = "Slots +")]
    slot_earnings: String,
    #[tabled(rename = "Slots -")]
    slot_costs: String,
    #[tabled(rename = "Reputation")]
    reputation_cost: String,
    #[tabled(rename = "Total")]
    total: String,
}

impl BalanceRow {
    fn new(market: &Market, cluster: &Cluster, sheet: &Balance) -> Self {
        let bid = match market.bids().get(cluster.id()) {
            Some(bid) if bid.willing_to_receive_bribes() => format!(
                "{} (bribable > {})",
                bid.willing_to_pay().round_dp(2),
                bid.minimum_gain().round_dp(2)
            ),
            Some(bid) => bid.willing_to_pay().round_dp(2).to_string(),
            None if sheet.participated => "withdrawn".into(),
            None => "-".into(),
        };
        Self {
            cluster: cluster.id().to_string(),
            size: cluster.validator_count(),
            bid,
            paid: sheet.paid.round_dp(2).to_string(),
            received: sheet.received.round_dp(2).to_string(),
            capital_cost: sheet.capital_cost.round_dp(2).to_string(),
            transaction_costs: sheet.transaction_costs.round_dp(2).to_string(),
            slot_earnings: sheet.extra_slot_earnings.round_dp(2).to_string(),
            slot_costs: sheet.extra_slot_costs.round_dp(2).to_string(),
            reputation_cost: sheet.reputation_cost().round_dp(2).to_string(),
            total: sheet.total_balance().round_dp(2).to_string(),
        }
    }
}

/// Execute the run command.
pub fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    // Apply CLI overrides
    if let Some(seed) = args.seed {
        config = config.with_master_seed(seed);
    }
    config.logging = config
        .logging
        .with_overrides(args.log_level.as_deref(), args.json_logs);

    config.init_logging();
    info!(config = %args.config.display(), epochs = args.epochs, "bribery-sim starting");

    let mut runner = config.build_runner()?;

    let mut misses = 0u64;
    let mut revisions = 0usize;
    for _ in 0..args.epochs {
        let report = runner.process_epoch()?;
        if report.decision == Decision::Miss {
            misses += 1;
        }
        revisions += report.revised.len();
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    info!(epochs = runner.epoch(), misses, revisions, "bribery-sim finished");
    if args.json {
        return Ok(());
    }

    let market = runner.market();
    output::section("Simulation");
    output::key_value("Mechanism", market.mechanism_name());
    output::key_value("Epochs", runner.epoch());
    output::key_value("Missed slots", misses);
    output::key_value("Bid revisions", revisions);
    output::key_value("Active bids", market.bids().active());

    output::section("Balance sheets");
    let mut rows = Vec::with_capacity(market.participants().len());
    for cluster in market.participants() {
        let sheet = market.balance_sheet(cluster)?;
        rows.push(BalanceRow::new(market, cluster, sheet));
    }
    output::table(&Table::new(rows).to_string());
    println!();
    output::key_value("Market total", market.ledger().total().round_dp(2));
    println!();

    Ok(())
}
