//! Bot scheduler.
//!
//! Every interval a small random cohort of bot accounts wakes up, one bot at a
//! time: fresh reads, a decision, and at most one settled trade. Rounds are
//! skipped outright during the maintenance window or while the market is halted.
//!
//! A round is bounded by `max_round_secs`. When the bound hits, the bots that
//! have not acted yet are dropped; trades already settled stay settled.

use crate::bot::{decide, shuffle, CrewDirectory, RandomSource};
use crate::config::GameConfig;
use crate::events::{
    BotFailedEvent, BotHeldEvent, EventCollector, EventPayload, OrderSkippedEvent,
    PriceHistoryRecordedEvent, RoundCompletedEvent, RoundSkipReason, RoundSkippedEvent,
    TradeSettledEvent,
};
use crate::order::Order;
use crate::settlement::{settle, Settlement, SettlementError};
use crate::store::{MarketStore, StoreError, TxOutcome};
use crate::types::{AccountId, Timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What one round did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    pub started_at: Option<Timestamp>,
    pub boosted: bool,
    /// Bots that acted, in the order they acted.
    pub cohort: Vec<AccountId>,
    pub trades: usize,
    pub holds: usize,
    pub skips: usize,
    pub failures: usize,
    /// Set when the whole round stood down.
    pub skipped: Option<RoundSkipReason>,
}

impl RoundReport {
    fn skipped(started_at: Timestamp, reason: RoundSkipReason) -> Self {
        Self {
            started_at: Some(started_at),
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Round exceeded {limit_secs}s and was cut short")]
    TimedOut { limit_secs: u64 },
}

enum BotOutcome {
    Traded,
    Held,
    Skipped,
}

pub struct BotScheduler<S: MarketStore, R: RandomSource> {
    store: Arc<S>,
    config: GameConfig,
    crews: CrewDirectory,
    rng: R,
    events: EventCollector,
}

impl<S: MarketStore, R: RandomSource> BotScheduler<S, R> {
    pub fn new(store: Arc<S>, config: GameConfig, rng: R) -> Self {
        let crews = CrewDirectory::new(config.crews.clone());
        Self {
            store,
            config,
            crews,
            rng,
            events: EventCollector::default(),
        }
    }

    pub fn with_events(mut self, events: EventCollector) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn events(&self) -> &EventCollector {
        &self.events
    }

    /// Run one bounded round as of wall-clock time `now`.
    pub async fn run_round_at(&mut self, now: DateTime<Utc>) -> Result<RoundReport, SchedulerError> {
        let limit = self.config.scheduler.max_round();
        match tokio::time::timeout(limit, self.round(now)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(limit_secs = limit.as_secs(), "bot round timed out, remaining cohort dropped");
                Err(SchedulerError::TimedOut {
                    limit_secs: limit.as_secs(),
                })
            }
        }
    }

    pub async fn run_round(&mut self) -> Result<RoundReport, SchedulerError> {
        self.run_round_at(Utc::now()).await
    }

    /// Append the current price of every ticker to its history.
    pub fn record_price_history(&mut self, now: Timestamp) -> Result<usize, StoreError> {
        let tickers = record_price_history(self.store.as_ref(), now)?;
        self.events.record(
            now,
            EventPayload::PriceHistoryRecorded(PriceHistoryRecordedEvent { tickers }),
        );
        Ok(tickers)
    }

    /// Run rounds on the configured interval until `shutdown` resolves.
    /// A price history point is recorded after every round that was not
    /// stood down for a halt or maintenance.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.config.scheduler.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.scheduler.interval_secs,
            max_round_secs = self.config.scheduler.max_round_secs,
            "bot scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown during round, remaining cohort dropped");
                    break;
                }
                result = self.run_round() => {
                    let stood_down = match result {
                        Ok(report) if report.skipped.is_none() => {
                            info!(
                                cohort = report.cohort.len(),
                                trades = report.trades,
                                holds = report.holds,
                                skips = report.skips,
                                failures = report.failures,
                                "bot round complete"
                            );
                            false
                        }
                        Ok(report) => {
                            info!(reason = ?report.skipped, "bot round skipped");
                            matches!(
                                report.skipped,
                                Some(RoundSkipReason::MarketHalted | RoundSkipReason::Maintenance)
                            )
                        }
                        Err(err) => {
                            error!(%err, "bot round failed");
                            false
                        }
                    };

                    // a halted market record stays untouched
                    if !stood_down {
                        if let Err(err) = self.record_price_history(Timestamp::now()) {
                            warn!(%err, "price history not recorded");
                        }
                    }
                }
            }
        }

        info!("bot scheduler stopped");
    }

    async fn round(&mut self, now: DateTime<Utc>) -> Result<RoundReport, SchedulerError> {
        let started_at = Timestamp::from_datetime(now);
        let scheduler = self.config.scheduler.clone();

        if scheduler.in_maintenance(now) {
            return Ok(self.skip_round(started_at, RoundSkipReason::Maintenance));
        }
        if self.store.market()?.is_halted() {
            return Ok(self.skip_round(started_at, RoundSkipReason::MarketHalted));
        }

        let jitter = self.rng.inclusive(0, scheduler.max_start_jitter_secs);
        tokio::time::sleep(Duration::from_secs(jitter)).await;
        let clock = Instant::now();

        let mut bots = self.store.bot_accounts()?;
        if bots.is_empty() {
            return Ok(self.skip_round(started_at, RoundSkipReason::NoBots));
        }

        let boosted = scheduler.is_boosted(now);
        let (lo, hi) = scheduler.cohort_bounds(boosted);
        let size = (self.rng.inclusive(lo as u64, hi as u64) as usize).min(bots.len());
        shuffle(&mut bots, &mut self.rng);
        bots.truncate(size);

        let mut report = RoundReport {
            started_at: Some(started_at),
            boosted,
            ..RoundReport::default()
        };
        debug!(cohort = size, boosted, jitter_secs = jitter, "bot round starting");

        for (i, bot) in bots.iter().enumerate() {
            let elapsed_ms = jitter
                .saturating_mul(1000)
                .saturating_add(u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX));
            let at = started_at.plus_millis(i64::try_from(elapsed_ms).unwrap_or(i64::MAX));
            report.cohort.push(bot.id.clone());

            match self.act(&bot.id, boosted, at) {
                Ok(BotOutcome::Traded) => report.trades += 1,
                Ok(BotOutcome::Held) => report.holds += 1,
                Ok(BotOutcome::Skipped) => report.skips += 1,
                Err(err) => {
                    warn!(bot = %bot.id, %err, "bot failed, continuing round");
                    self.events.record(
                        at,
                        EventPayload::BotFailed(BotFailedEvent {
                            account_id: bot.id.clone(),
                            error: err.to_string(),
                        }),
                    );
                    report.failures += 1;
                }
            }

            if i + 1 < bots.len() {
                let gap = self
                    .rng
                    .inclusive(scheduler.min_bot_gap_secs, scheduler.max_bot_gap_secs);
                tokio::time::sleep(Duration::from_secs(gap)).await;
            }
        }

        self.events.record(
            started_at,
            EventPayload::RoundCompleted(RoundCompletedEvent {
                cohort: report.cohort.len(),
                trades: report.trades,
                holds: report.holds,
                skips: report.skips,
                failures: report.failures,
            }),
        );
        Ok(report)
    }

    // one bot: fresh reads, decide, settle
    fn act(&mut self, id: &AccountId, boosted: bool, at: Timestamp) -> Result<BotOutcome, SettlementError> {
        let market = self.store.market()?;
        let account = self.store.account(id)?;

        let order = match decide(&account, &market, &self.crews, boosted, at, &mut self.rng) {
            Order::Hold => {
                debug!(bot = %id, "bot holds");
                self.events.record(
                    at,
                    EventPayload::BotHeld(BotHeldEvent {
                        account_id: id.clone(),
                    }),
                );
                return Ok(BotOutcome::Held);
            }
            Order::Trade(order) => order,
        };

        match settle(self.store.as_ref(), id, &order, at, &self.config.impact)? {
            Settlement::Applied(record) => {
                info!(bot = %id, order = %order, price = %record.price_per_share, "bot traded");
                self.events.record(
                    at,
                    EventPayload::TradeSettled(TradeSettledEvent {
                        account_id: id.clone(),
                        record,
                    }),
                );
                Ok(BotOutcome::Traded)
            }
            Settlement::Skipped(reason) => {
                self.events.record(
                    at,
                    EventPayload::OrderSkipped(OrderSkippedEvent {
                        account_id: id.clone(),
                        order,
                        reason,
                    }),
                );
                Ok(BotOutcome::Skipped)
            }
        }
    }

    fn skip_round(&mut self, started_at: Timestamp, reason: RoundSkipReason) -> RoundReport {
        info!(?reason, "bot round skipped");
        self.events
            .record(started_at, EventPayload::RoundSkipped(RoundSkippedEvent { reason }));
        RoundReport::skipped(started_at, reason)
    }
}

/// Append one history point per ticker in a single market transaction.
pub fn record_price_history<S: MarketStore + ?Sized>(store: &S, now: Timestamp) -> Result<usize, StoreError> {
    store.transact_market(|market| TxOutcome::Commit(market.record_history(now)))
}
