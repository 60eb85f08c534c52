//! Character market bot runner.
//!
//! Seeds a demo market with a handful of tickers and one bot per personality,
//! then drives the bot scheduler until Ctrl-C.

use character_market::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut config = GameConfig::fast().from_env()?;
    config.crews = demo_crews();

    let store = Arc::new(InMemoryStore::new(demo_market(), config.store.max_attempts));
    for account in demo_bots() {
        store.insert_account(account);
    }

    info!(
        tickers = store.market()?.tickers().count(),
        bots = store.bot_accounts()?.len(),
        interval_secs = config.scheduler.interval_secs,
        "demo market seeded"
    );

    let mut scheduler = BotScheduler::new(Arc::clone(&store), config, StdRng::from_entropy());
    scheduler.run(shutdown_signal()).await;

    for bot in store.bot_accounts()? {
        info!(
            bot = %bot.id,
            personality = ?bot.bot_personality,
            cash = %bot.cash,
            portfolio = %bot.portfolio_value,
            trades = bot.total_trades,
            "final standing"
        );
    }
    let market = store.market()?;
    for (ticker, price) in &market.prices {
        info!(%ticker, %price, history = market.history(ticker).len(), "closing price");
    }

    Ok(())
}

fn demo_market() -> MarketState {
    let opened = Timestamp::now();
    let mut market = MarketState::new();
    for (symbol, price) in [
        ("LUFY", dec!(120.00)),
        ("ZORO", dec!(95.50)),
        ("NAMI", dec!(64.25)),
        ("USOP", dec!(18.40)),
        ("SANJ", dec!(72.10)),
        ("GARP", dec!(140.00)),
        ("KOBY", dec!(6.75)),
    ] {
        market.seed_ticker(Ticker::from(symbol), Price::new_unchecked(price), opened);
    }
    market
}

fn demo_crews() -> BTreeMap<String, Vec<Ticker>> {
    let mut crews = BTreeMap::new();
    crews.insert(
        "strawhats".to_string(),
        ["LUFY", "ZORO", "NAMI", "USOP", "SANJ"].map(Ticker::from).to_vec(),
    );
    crews.insert("marines".to_string(), ["GARP", "KOBY"].map(Ticker::from).to_vec());
    crews
}

fn demo_bots() -> Vec<Account> {
    Personality::ALL
        .iter()
        .enumerate()
        .map(|(i, personality)| {
            let bot = Account::new_bot(
                AccountId::new(format!("bot_{}", personality.tag())),
                Cash::new(dec!(5000)),
                *personality,
            );
            match i % 3 {
                0 => bot.with_crew("strawhats"),
                1 => bot.with_crew("marines"),
                _ => bot,
            }
        })
        .collect()
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(%err, "cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
