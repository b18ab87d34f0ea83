mod support;

use bribery_sim::config::{Config, MechanismKind};
use bribery_sim::error::{ConfigError, Error};
use rust_decimal_macros::dec;

use support::config::{write_temp_config, SAMPLE_CONFIG};

#[test]
fn sample_config_loads_from_disk() {
    let file = write_temp_config(SAMPLE_CONFIG);
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.stake.cluster_count(), 9);
    assert_eq!(config.market.epoch_size, 4);
    assert_eq!(config.market.mechanism, MechanismKind::EqualPrice);
    assert_eq!(config.market.best_response.samples, 8);
    assert_eq!(config.market.initial_bids.len(), 2);
    assert_eq!(config.runner.interest_rate, Some(dec!(0.0001)));
    assert_eq!(config.runner.seeds.master, Some(11));
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn sample_config_builds_a_runnable_simulation() {
    let config = Config::parse_toml(SAMPLE_CONFIG).unwrap();
    let mut runner = config.build_runner().unwrap();

    let market = runner.market();
    assert_eq!(market.participants().len(), 9);
    assert_eq!(market.bids().active(), 2);
    let big = market.participants()[8];
    assert!(market.standing_bid(&big).unwrap().unwrap().willing_to_receive_bribes());

    for _ in 0..20 {
        runner.process_epoch().unwrap();
    }
    assert_eq!(runner.epoch(), 20);
}

#[test]
fn same_config_and_seed_reproduce_a_run() {
    let config = Config::parse_toml(SAMPLE_CONFIG).unwrap();
    let mut a = config.build_runner().unwrap();
    let mut b = config.build_runner().unwrap();
    for _ in 0..30 {
        assert_eq!(a.process_epoch().unwrap(), b.process_epoch().unwrap());
    }
}

#[test]
fn missing_interest_rate_is_rejected() {
    let content = SAMPLE_CONFIG.replace("interest_rate = 0.0001\n", "");
    let file = write_temp_config(&content);

    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::MissingField {
            field: "interest_rate",
        })) => {}
        Err(err) => panic!("Expected missing interest rate error, got {err}"),
        Ok(_) => panic!("Expected a config without interest rate to be rejected"),
    }
}

#[test]
fn duplicate_sizes_are_rejected() {
    let content = SAMPLE_CONFIG.replace("size = 100", "size = 20");
    let result = Config::parse_toml(&content);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "stake.clusters.size",
            ..
        }))
    ));
}

#[test]
fn zero_epoch_size_is_rejected() {
    let content = SAMPLE_CONFIG.replace("epoch_size = 4", "epoch_size = 0");
    let result = Config::parse_toml(&content);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "market.epoch_size",
            ..
        }))
    ));
}

#[test]
fn initial_bid_for_unknown_cluster_is_rejected() {
    let content = SAMPLE_CONFIG.replace("cluster = 8", "cluster = 12");
    let result = Config::parse_toml(&content);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "market.initial_bids.cluster",
            ..
        }))
    ));
}

#[test]
fn second_initial_bid_for_one_cluster_is_rejected() {
    let content = SAMPLE_CONFIG.replace("cluster = 7", "cluster = 8");
    let result = Config::parse_toml(&content);
    match result {
        Err(Error::Config(ConfigError::InvalidValue { field, reason })) => {
            assert_eq!(field, "market.initial_bids.cluster");
            assert!(reason.contains("more than one"), "{reason}");
        }
        other => panic!("expected a duplicate initial bid error, got {other:?}"),
    }
}

#[test]
fn oversized_initial_bid_fails_to_build() {
    let content = SAMPLE_CONFIG.replace("willing_to_pay = 30", "willing_to_pay = 9000000000000000000");
    let config = Config::parse_toml(&content).unwrap();
    assert!(matches!(
        config.build_runner(),
        Err(Error::Config(ConfigError::InvalidValue {
            field: "initial_bids",
            ..
        }))
    ));
}

#[test]
fn missing_file_is_a_read_error() {
    let result = Config::load("/nonexistent/bribery-sim/config.toml");
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn pay_as_bid_can_be_selected() {
    let content = SAMPLE_CONFIG
        .replace("mechanism = \"equal_price\"", "mechanism = \"pay_as_bid\"")
        .replace("revision_probability = 0.05", "revision_probability = 0.0");
    let config = Config::parse_toml(&content).unwrap();
    let mut runner = config.build_runner().unwrap();

    assert_eq!(runner.market().mechanism_name(), "pay_as_bid");
    for _ in 0..10 {
        runner.process_epoch().unwrap();
    }
}
