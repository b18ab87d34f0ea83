mod support;

use std::collections::HashMap;

use bribery_sim::domain::{
    Bid, Decision, Market, MarketError, PayAsBidMechanism, Sides,
};
use bribery_sim::domain::seeded_rng;
use bribery_sim::error::ConfigError;
use rust_decimal_macros::dec;

use support::market::{bribable_market, reference_distribution};

#[test]
fn market_covers_exactly_the_participants() {
    let market = Market::builder(reference_distribution(0)).build().unwrap();

    assert_eq!(market.bids().len(), 9);
    assert_eq!(market.ledger().len(), 9);
    let ids: Vec<_> = market.ledger().iter().map(|(id, _)| id).collect();
    let expected: Vec<_> = market.participants().iter().map(|c| c.id()).collect();
    assert_eq!(ids, expected);

    for (_, sheet) in market.ledger().iter() {
        assert!(!sheet.participated);
        assert_eq!(sheet.paid, dec!(0));
        assert_eq!(sheet.received, dec!(0));
        assert_eq!(sheet.capital_locked, dec!(0));
        assert_eq!(sheet.capital_cost, dec!(0));
        assert_eq!(sheet.transaction_costs, dec!(0));
        assert_eq!(sheet.extra_slot_earnings, dec!(0));
        assert_eq!(sheet.extra_slot_costs, dec!(0));
        assert_eq!(sheet.reputation, dec!(0));
    }
}

#[test]
fn default_epoch_size_is_32() {
    let mut market = Market::builder(reference_distribution(0)).build().unwrap();
    assert_eq!(market.epoch_size(), 32);
    let sides = market.sample_sides();
    assert_eq!(sides.reveal.len(), 32);
    assert_eq!(sides.miss.len(), 32);
}

#[test]
fn proposer_declining_bribes_always_reveals() {
    let mut market = bribable_market(8);
    let proposer = market.participants()[0];
    market.place_bid(Some(Bid::new(dec!(1))), &proposer).unwrap();

    let mut sampler = market.distribution().seeded_sampler(17);
    let mut rng = seeded_rng(0);
    for _ in 0..200 {
        let sides = market.sample_sides_with(&mut sampler);
        let outcome = market.get_auction_winner(&sides, &proposer, &mut rng).unwrap();
        assert_eq!(outcome.decision, Decision::Reveal);
        assert!(outcome.payments.is_empty());
    }
}

#[test]
fn proposer_without_bid_always_reveals() {
    let mut market = bribable_market(8);
    let proposer = market.participants()[2];
    market.place_bid(None, &proposer).unwrap();

    let mut sampler = market.distribution().seeded_sampler(4);
    for _ in 0..50 {
        let sides = market.sample_sides_with(&mut sampler);
        let outcome = market
            .get_auction_winner(&sides, &proposer, &mut seeded_rng(1))
            .unwrap();
        assert_eq!(outcome.decision, Decision::Reveal);
        assert!(outcome.payments.is_empty());
    }
}

#[test]
fn bribable_proposer_follows_the_larger_side() {
    let market = bribable_market(2);
    let c = market.participants();
    let proposer = c[0];

    // reveal: 10, 10 -> 20 (plus the proposer's zero own-slot value)
    // miss: 100, 20 -> max(100, 2 * 20) = 100
    let sides = Sides {
        reveal: vec![c[1], c[2]],
        miss: vec![c[5], c[8]],
    };
    let outcome = market
        .get_auction_winner(&sides, &proposer, &mut seeded_rng(0))
        .unwrap();
    assert_eq!(outcome.decision, Decision::Miss);
    assert_eq!(outcome.payments.len(), 2);
    assert_eq!(outcome.payments[&c[8].id()], dec!(100));
    assert_eq!(outcome.payments[&c[5].id()], dec!(20));
}

#[test]
fn payments_require_participation() {
    let mut market = Market::builder(reference_distribution(0)).build().unwrap();
    let c = market.participants().to_vec();
    market.place_bid(Some(Bid::new(dec!(5))), &c[0]).unwrap();

    let result = market.make_payment(&c[0], &c[1], dec!(5));
    assert!(matches!(
        result,
        Err(MarketError::NotParticipating { cluster, .. }) if cluster == c[1].id()
    ));

    market.place_bid(Some(Bid::new(dec!(1))), &c[1]).unwrap();
    market.make_payment(&c[0], &c[1], dec!(5)).unwrap();
    assert_eq!(market.balance_sheet(&c[0]).unwrap().paid, dec!(5));
    assert_eq!(market.balance_sheet(&c[1]).unwrap().received, dec!(5));

    assert!(matches!(
        market.make_payment(&c[0], &c[1], dec!(-1)),
        Err(MarketError::NegativePayment { .. })
    ));
}

#[test]
fn place_bid_books_costs() {
    let mut market = Market::builder(reference_distribution(0)).build().unwrap();
    let cluster = market.participants()[0];

    let cost = market
        .place_bid(Some(Bid::new(dec!(25)).accepting_bribes(dec!(3))), &cluster)
        .unwrap();
    assert_eq!(cost.transaction_cost, dec!(1));
    assert_eq!(cost.capital_locked, dec!(25));
    assert_eq!(cost.reputation, dec!(10));

    // Same bid again: nothing changes, so no fee.
    let repeat = market
        .place_bid(Some(Bid::new(dec!(25)).accepting_bribes(dec!(3))), &cluster)
        .unwrap();
    assert_eq!(repeat.transaction_cost, dec!(0));

    let sheet = market.balance_sheet(&cluster).unwrap();
    assert_eq!(sheet.transaction_costs, dec!(1));
    assert_eq!(sheet.reputation, dec!(10));
    // size-10 clusters carry a reputation factor of 2
    assert_eq!(sheet.reputation_cost(), dec!(20));
    assert_eq!(sheet.total_balance(), dec!(-21));
}

#[test]
fn cost_contract_holds_for_both_mechanisms() {
    let equal_price = Market::builder(reference_distribution(0)).build().unwrap();
    let pay_as_bid = Market::builder(reference_distribution(0))
        .mechanism(Box::new(PayAsBidMechanism::default()))
        .build()
        .unwrap();
    let bid = Bid::new(dec!(4));

    for market in [&equal_price, &pay_as_bid] {
        let none = market.cost_for_bid(None, None);
        assert_eq!(none.transaction_cost, dec!(0));
        assert_eq!(none.capital_locked, dec!(0));
        assert_eq!(none.reputation, dec!(0));
        assert_eq!(market.cost_for_bid(Some(&bid), None).capital_locked, dec!(0));
    }
}

#[test]
fn explicit_and_generated_initial_bids_conflict() {
    let result = Market::builder(reference_distribution(0))
        .initial_bids(HashMap::new())
        .initial_bid_fn(|_| None)
        .build();
    assert!(matches!(result, Err(ConfigError::Conflict { .. })));
}

#[test]
fn explicit_initial_bids_are_installed() {
    let dist = reference_distribution(0);
    let big = dist.clusters()[8];
    let market = Market::builder(dist)
        .initial_bids(HashMap::from([(big.id(), Some(Bid::new(dec!(7))))]))
        .build()
        .unwrap();

    assert_eq!(market.bids().active(), 1);
    assert_eq!(market.standing_bid(&big).unwrap(), Some(&Bid::new(dec!(7))));
    assert_eq!(market.balance_sheet(&big).unwrap().transaction_costs, dec!(0));
}
