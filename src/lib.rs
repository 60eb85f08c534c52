// character-market: fictional character stock market core.
// price impact, atomic trade settlement, and the scheduled trading bots.
// pricing and settlement are deterministic; all randomness lives in bot/.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Ticker, AccountId, Side, Price, Cash, Timestamp
//   2.x  order.rs: Hold / Trade orders
//   3.x  bot/: personalities, random source, crews, decision policy
//   4.x  pricing.rs: square root price impact, clamp and floor
//   5.x  store.rs: transactional document store, optimistic retries
//   7.x  config.rs: impact constants, scheduler cadence, env overrides
//   9.x  settlement.rs: one order against one account and the market
//   10.x account.rs: cash, holdings, cost basis, trade log
//   11.x events.rs: round outcome events for audit
//   12.x market.rs: prices, price history, halt flag, trends
//   13.x scheduler.rs: bot rounds, jitter, history recorder

// core ledger modules
pub mod account;
pub mod market;
pub mod order;
pub mod pricing;
pub mod settlement;
pub mod store;
pub mod types;

// bots
pub mod bot;
pub mod scheduler;

// integration modules
pub mod config;
pub mod events;

// re exports for convenience
pub use account::*;
pub use bot::{decide, CrewDirectory, Personality, RandomSource, ScriptedRandom};
pub use config::*;
pub use events::*;
pub use market::*;
pub use order::*;
pub use pricing::*;
pub use scheduler::{record_price_history, BotScheduler, RoundReport, SchedulerError};
pub use settlement::*;
pub use store::*;
pub use types::*;
