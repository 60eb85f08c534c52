// 7.0 config.rs: all settings in one place. impact constants, bot schedule, store retries, crews.
// 7.1 the impact constants are the single source of truth. settlement and any price preview
// must both go through ImpactParams::default() so they quote identical prices.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, TimeZone, Utc, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::types::Ticker;

pub const BASE_IMPACT: Decimal = dec!(0.012);
pub const BASE_LIQUIDITY: Decimal = dec!(100);
pub const MIN_PRICE: Decimal = dec!(0.01);
pub const MAX_PRICE_CHANGE_PERCENT: Decimal = dec!(0.05);
pub const TRANSACTION_LOG_LIMIT: usize = 100;

/** 7.2: price impact model. sqrt impact, clamped per trade, floored price */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactParams {
    pub base_impact: Decimal,
    pub liquidity: Decimal,
    pub min_price: Decimal,
    pub max_change_fraction: Decimal,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            base_impact: BASE_IMPACT,
            liquidity: BASE_LIQUIDITY,
            min_price: MIN_PRICE,
            max_change_fraction: MAX_PRICE_CHANGE_PERCENT,
        }
    }
}

// Weekly window during which the bot scheduler stands down. Times are UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub duration_minutes: i64,
}

impl MaintenanceWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let days_back = (now.weekday().num_days_from_monday() + 7
            - self.weekday.num_days_from_monday())
            % 7;
        let day = now.date_naive() - ChronoDuration::days(days_back as i64);
        let mut start = Utc.from_utc_datetime(&day.and_time(self.start));
        // same weekday but the window hasn't opened yet: last week's window may still be running
        if start > now {
            start = start - ChronoDuration::days(7);
        }
        now < start + ChronoDuration::minutes(self.duration_minutes)
    }
}

/** 7.3: bot scheduler cadence, jitter and cohort sizes */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    // Time between rounds
    pub interval_secs: u64,
    // Hard ceiling on one round, jitter included
    pub max_round_secs: u64,
    // Random delay before a round starts, uniform in [0, max]
    pub max_start_jitter_secs: u64,
    // Random pause between consecutive bots, uniform in [min, max]
    pub min_bot_gap_secs: u64,
    pub max_bot_gap_secs: u64,
    // Cohort size bounds on a normal day
    pub min_cohort: usize,
    pub max_cohort: usize,
    // Cohort size bounds on the boosted day
    pub boosted_min_cohort: usize,
    pub boosted_max_cohort: usize,
    // Weekly content day with more bot volume
    pub boosted_weekday: Weekday,
    pub maintenance: Option<MaintenanceWindow>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 180,   // every 3 minutes
            max_round_secs: 540,  // 9 minutes
            max_start_jitter_secs: 90,
            min_bot_gap_secs: 5,
            max_bot_gap_secs: 45,
            min_cohort: 1,
            max_cohort: 3,
            boosted_min_cohort: 3,
            boosted_max_cohort: 5,
            boosted_weekday: Weekday::Thu,
            maintenance: None,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_round(&self) -> Duration {
        Duration::from_secs(self.max_round_secs)
    }

    pub fn is_boosted(&self, now: DateTime<Utc>) -> bool {
        now.weekday() == self.boosted_weekday
    }

    pub fn in_maintenance(&self, now: DateTime<Utc>) -> bool {
        self.maintenance.as_ref().is_some_and(|w| w.contains(now))
    }

    pub fn cohort_bounds(&self, boosted: bool) -> (usize, usize) {
        if boosted {
            (self.boosted_min_cohort, self.boosted_max_cohort)
        } else {
            (self.min_cohort, self.max_cohort)
        }
    }
}

// Optimistic transaction retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

// The complete game configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub impact: ImpactParams,
    pub scheduler: SchedulerConfig,
    pub store: StoreConfig,
    // crew name -> member tickers
    pub crews: BTreeMap<String, Vec<Ticker>>,
}

impl GameConfig {
    // Short gaps for local runs and demos
    pub fn fast() -> Self {
        let mut config = Self::default();
        config.scheduler.interval_secs = 10;
        config.scheduler.max_round_secs = 9;
        config.scheduler.max_start_jitter_secs = 1;
        config.scheduler.min_bot_gap_secs = 0;
        config.scheduler.max_bot_gap_secs = 1;
        config
    }

    // Overlay environment variables on top of self
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_parse::<u64>("BOT_INTERVAL_SECS")? {
            self.scheduler.interval_secs = v;
        }
        if let Some(v) = env_parse::<u64>("BOT_MAX_ROUND_SECS")? {
            self.scheduler.max_round_secs = v;
        }
        if let Some(v) = env_parse::<u64>("BOT_MAX_START_JITTER_SECS")? {
            self.scheduler.max_start_jitter_secs = v;
        }
        if let Some(v) = env_parse::<Weekday>("BOT_BOOSTED_WEEKDAY")? {
            self.scheduler.boosted_weekday = v;
        }
        if let Some(v) = env_parse::<u32>("STORE_MAX_ATTEMPTS")? {
            self.store.max_attempts = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let impact = &self.impact;
        if impact.base_impact <= Decimal::ZERO || impact.liquidity <= Decimal::ZERO {
            return Err(ConfigError::InvalidImpact {
                reason: "base impact and liquidity must be positive".to_string(),
            });
        }
        if impact.min_price <= Decimal::ZERO {
            return Err(ConfigError::InvalidImpact {
                reason: "min price must be positive".to_string(),
            });
        }
        if impact.max_change_fraction <= Decimal::ZERO || impact.max_change_fraction >= Decimal::ONE {
            return Err(ConfigError::InvalidImpact {
                reason: "max change must be between 0 and 1".to_string(),
            });
        }

        let s = &self.scheduler;
        if s.interval_secs == 0 {
            return Err(ConfigError::InvalidScheduler {
                reason: "interval must be positive".to_string(),
            });
        }
        // a round must leave room for at least one bot and one gap
        if s.max_start_jitter_secs.saturating_add(s.max_bot_gap_secs) >= s.max_round_secs {
            return Err(ConfigError::InvalidScheduler {
                reason: "start jitter plus bot gap must fit inside max round".to_string(),
            });
        }
        if s.min_bot_gap_secs > s.max_bot_gap_secs {
            return Err(ConfigError::InvalidScheduler {
                reason: "min bot gap exceeds max".to_string(),
            });
        }
        if s.min_cohort == 0 || s.min_cohort > s.max_cohort || s.boosted_min_cohort > s.boosted_max_cohort {
            return Err(ConfigError::InvalidScheduler {
                reason: "cohort bounds must be 1 <= min <= max".to_string(),
            });
        }
        if let Some(window) = &s.maintenance {
            if window.duration_minutes <= 0 || window.duration_minutes >= 7 * 24 * 60 {
                return Err(ConfigError::InvalidScheduler {
                    reason: "maintenance window must be shorter than a week".to_string(),
                });
            }
        }

        if self.store.max_attempts == 0 {
            return Err(ConfigError::InvalidStore {
                reason: "need at least one transaction attempt".to_string(),
            });
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw }),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid impact params: {reason}")]
    InvalidImpact { reason: String },

    #[error("invalid scheduler config: {reason}")]
    InvalidScheduler { reason: String },

    #[error("invalid store config: {reason}")]
    InvalidStore { reason: String },

    #[error("cannot parse {var}={value}")]
    InvalidEnv { var: &'static str, value: String },
}
