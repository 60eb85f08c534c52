// 3.0 bot/: synthetic traders. a closed set of personalities, each a policy over the same
// trend data. decide() is the single entry point; all randomness comes in through RandomSource.

mod personality;
mod policy;
mod random;
mod universe;

pub use personality::Personality;
pub use policy::{decide, DEFAULT_LOOKBACK_MINUTES};
pub use random::{RandomSource, ScriptedRandom};
pub(crate) use random::shuffle;
pub use universe::CrewDirectory;
