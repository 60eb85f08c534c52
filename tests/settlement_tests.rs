//! Settlement scenarios end to end through the store.
//!
//! Skipped orders must leave the stored records byte-for-byte unchanged.

use character_market::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn lufy() -> Ticker {
    Ticker::from("LUFY")
}

fn store_with(cash: Decimal, price: Decimal) -> (InMemoryStore, AccountId) {
    let mut market = MarketState::new();
    market.seed_ticker(lufy(), Price::new_unchecked(price), Timestamp::from_millis(0));
    market.seed_ticker(Ticker::from("ZORO"), Price::new_unchecked(dec!(50)), Timestamp::from_millis(0));
    let store = InMemoryStore::new(market, 5);
    let id = AccountId::from("alice");
    store.insert_account(Account::new(id.clone(), Cash::new(cash)));
    (store, id)
}

// serialized snapshot of both records
fn snapshot(store: &InMemoryStore, id: &AccountId) -> (String, String) {
    (
        serde_json::to_string(&store.account(id).unwrap()).unwrap(),
        serde_json::to_string(&store.market().unwrap()).unwrap(),
    )
}

#[test]
fn buy_at_100_moves_price_to_100_60() {
    let (store, id) = store_with(dec!(10000), dec!(100));
    let result = settle(&store, &id, &TradeOrder::buy(lufy(), 25), Timestamp::from_millis(1), &ImpactParams::default())
        .unwrap();

    let record = result.record().unwrap();
    assert_eq!(record.price_after.value(), dec!(100.60));
    assert_eq!(record.total.value(), dec!(2500));
    assert_eq!(store.market().unwrap().price(&lufy()).unwrap().value(), dec!(100.60));
}

#[test]
fn huge_buy_is_clamped_to_five_percent() {
    let (store, id) = store_with(dec!(1_000_000), dec!(10));
    let result = settle(
        &store,
        &id,
        &TradeOrder::buy(lufy(), 10_000),
        Timestamp::from_millis(1),
        &ImpactParams::default(),
    )
    .unwrap();

    let record = result.record().unwrap();
    // raw impact would be 10 * 0.012 * 10 = 1.20, capped at 0.50
    assert_eq!(record.price_after.value(), dec!(10.50));
    assert_eq!(record.price_per_share.value(), dec!(10));
    assert_eq!(store.account(&id).unwrap().cash.value(), dec!(900_000));
}

#[test]
fn unaffordable_buy_changes_nothing() {
    let (store, id) = store_with(dec!(29.99), dec!(30));
    let before = snapshot(&store, &id);
    let version = store.market_version();

    let result = settle(&store, &id, &TradeOrder::buy(lufy(), 1), Timestamp::from_millis(1), &ImpactParams::default())
        .unwrap();

    assert_eq!(result, Settlement::Skipped(SkipReason::InsufficientFunds));
    assert_eq!(snapshot(&store, &id), before);
    assert_eq!(store.market_version(), version);
}

#[test]
fn overselling_changes_nothing() {
    let (store, id) = store_with(dec!(1000), dec!(10));
    let params = ImpactParams::default();
    settle(&store, &id, &TradeOrder::buy(lufy(), 3), Timestamp::from_millis(1), &params).unwrap();
    let before = snapshot(&store, &id);

    let result = settle(&store, &id, &TradeOrder::sell(lufy(), 4), Timestamp::from_millis(2), &params).unwrap();

    assert_eq!(result, Settlement::Skipped(SkipReason::InsufficientShares));
    assert_eq!(snapshot(&store, &id), before);
}

#[test]
fn selling_unheld_ticker_changes_nothing() {
    let (store, id) = store_with(dec!(1000), dec!(10));
    let before = snapshot(&store, &id);

    let result = settle(
        &store,
        &id,
        &TradeOrder::sell(Ticker::from("ZORO"), 1),
        Timestamp::from_millis(1),
        &ImpactParams::default(),
    )
    .unwrap();

    assert_eq!(result, Settlement::Skipped(SkipReason::InsufficientShares));
    assert_eq!(snapshot(&store, &id), before);
}

#[test]
fn halted_skip_is_idempotent() {
    let (store, id) = store_with(dec!(1000), dec!(10));
    store.set_halted(true).unwrap();
    let before = snapshot(&store, &id);
    let params = ImpactParams::default();

    for i in 0..5 {
        let buy = settle(&store, &id, &TradeOrder::buy(lufy(), 2), Timestamp::from_millis(i), &params).unwrap();
        let sell = settle(&store, &id, &TradeOrder::sell(lufy(), 1), Timestamp::from_millis(i), &params).unwrap();
        assert_eq!(buy, Settlement::Skipped(SkipReason::MarketHalted));
        assert_eq!(sell, Settlement::Skipped(SkipReason::MarketHalted));
    }

    assert_eq!(snapshot(&store, &id), before);
}

#[test]
fn round_trip_keeps_price_history_in_step() {
    let (store, id) = store_with(dec!(5000), dec!(40));
    let params = ImpactParams::default();

    let buy = settle(&store, &id, &TradeOrder::buy(lufy(), 16), Timestamp::from_millis(10), &params).unwrap();
    let sell = settle(&store, &id, &TradeOrder::sell(lufy(), 6), Timestamp::from_millis(20), &params).unwrap();

    let market = store.market().unwrap();
    let history = market.history(&lufy());
    assert_eq!(history.len(), 3);
    assert_eq!(history.last().map(|p| p.price), market.price(&lufy()));
    assert_eq!(buy.record().map(|r| r.price_after), Some(history[1].price));
    assert_eq!(sell.record().map(|r| r.price_after), Some(history[2].price));

    let account = store.account(&id).unwrap();
    assert_eq!(account.shares(&lufy()), 10);
    assert_eq!(account.transaction_log.len(), 2);
    // 16 bought for 640, 10 of 16 kept
    assert_eq!(account.cost_basis[&lufy()].value(), dec!(400));
}

#[test]
fn portfolio_uses_pre_trade_prices() {
    let (store, id) = store_with(dec!(1000), dec!(20));
    let params = ImpactParams::default();

    let result = settle(&store, &id, &TradeOrder::buy(lufy(), 10), Timestamp::from_millis(1), &params).unwrap();
    let record = result.record().unwrap();

    // 800 cash + 10 shares at the pre-trade 20.00
    assert_eq!(record.portfolio_after.value(), dec!(1000));
    assert!(record.price_after.value() > dec!(20));
}

#[test]
fn empty_crew_bot_holds() {
    let mut market = MarketState::new();
    market.seed_ticker(lufy(), Price::new_unchecked(dec!(10)), Timestamp::from_millis(0));

    let mut crews = BTreeMap::new();
    crews.insert("marines".to_string(), vec![Ticker::from("GARP"), Ticker::from("KOBY")]);
    let crews = CrewDirectory::new(crews);

    for personality in Personality::ALL {
        let bot = Account::new_bot(AccountId::from("bot"), Cash::new(dec!(10_000)), personality).with_crew("marines");
        let mut rng = ScriptedRandom::new([0.0]);
        let order = decide(&bot, &market, &crews, false, Timestamp::from_millis(1), &mut rng);
        assert_eq!(order, Order::Hold);
        assert_eq!(rng.consumed(), 0);
    }
}
