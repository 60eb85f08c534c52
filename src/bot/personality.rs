//! Bot personalities.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Dual-timescale trend follower, more aggressive on boosted days.
    MarketFollower,
    Momentum,
    Contrarian,
    Hodler,
    Daytrader,
    Random,
    /// Dumps falling positions without hesitation.
    Panic,
    Swing,
    Balanced,
}

impl Personality {
    pub const ALL: [Personality; 9] = [
        Personality::MarketFollower,
        Personality::Momentum,
        Personality::Contrarian,
        Personality::Hodler,
        Personality::Daytrader,
        Personality::Random,
        Personality::Panic,
        Personality::Swing,
        Personality::Balanced,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Personality::MarketFollower => "market_follower",
            Personality::Momentum => "momentum",
            Personality::Contrarian => "contrarian",
            Personality::Hodler => "hodler",
            Personality::Daytrader => "daytrader",
            Personality::Random => "random",
            Personality::Panic => "panic",
            Personality::Swing => "swing",
            Personality::Balanced => "balanced",
        }
    }

    /// Lenient parse for stored tags. Unknown tags trade as `Balanced`.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or(Personality::Balanced)
    }
}

impl FromStr for Personality {
    type Err = UnknownPersonality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Personality::ALL
            .into_iter()
            .find(|p| p.tag() == normalized)
            .ok_or_else(|| UnknownPersonality(s.to_string()))
    }
}

// stored records may carry tags this build doesn't know
impl<'de> Deserialize<'de> for Personality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Personality::from_tag(&tag))
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bot personality {0:?}")]
pub struct UnknownPersonality(pub String);
