//! Handler for the `check` command.

use std::path::Path;

use crate::cli::output;
use crate::config::Config;
use crate::error::Result;

/// Validate a configuration file without running anything.
pub fn execute<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());

    let config = Config::load(path)?;
    output::ok("Configuration file is valid");

    let validators: u64 = config
        .stake
        .clusters
        .iter()
        .map(|c| c.size * c.count as u64)
        .sum();

    output::section("Summary");
    output::key_value("Clusters", config.stake.cluster_count());
    output::key_value("Validators", validators);
    output::key_value("Mechanism", format!("{:?}", config.market.mechanism));
    output::key_value("Epoch size", config.market.epoch_size);
    output::key_value("Initial bids", config.market.initial_bids.len());
    output::key_value("Interest rate", config.runner.interest_rate()?);
    output::key_value("Slot value", config.runner.proposer_slot_value);
    output::key_value("Revision probability", config.runner.revision_probability);
    match config.runner.seeds.master {
        Some(seed) => output::key_value("Master seed", seed),
        None => output::key_value("Master seed", "entropy"),
    }
    println!();

    Ok(())
}
