use std::io::Write;

use tempfile::NamedTempFile;

/// A complete experiment: the reference distribution, two initial bids on
/// the largest clusters and a fixed master seed.
pub const SAMPLE_CONFIG: &str = r#"
[logging]
level = "warn"
format = "pretty"

[stake]
reputation_factor = 1

[[stake.clusters]]
size = 20
count = 3

[[stake.clusters]]
size = 10
count = 5
reputation_factor = 2

[[stake.clusters]]
size = 100
count = 1

[market]
epoch_size = 4
mechanism = "equal_price"
transaction_fee = 1
reputation_penalty = 10

[market.best_response]
samples = 8
horizon_epochs = 20

[[market.initial_bids]]
cluster = 8
willing_to_pay = 30
minimum_gain = 5

[[market.initial_bids]]
cluster = 7
willing_to_pay = 12

[runner]
interest_rate = 0.0001
proposer_slot_value = 100
revision_probability = 0.05

[runner.seeds]
master = 11
"#;

pub fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}
