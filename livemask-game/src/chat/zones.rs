//! Position-based danger zones of the chat feed.
//!
//! Index 0 is the oldest message, so threats drift toward the flashing zone as
//! newer messages push them up the log.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::ChatCfg;
use crate::numbers::usize_to_f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Flashing,
    Red,
    Neutral,
}

/// Zone of the message at `index` in a log of `len` messages.
#[must_use]
pub fn zone_of(index: usize, len: usize, cfg: &ChatCfg) -> Zone {
    if len == 0 || index >= len {
        return Zone::Neutral;
    }
    let i = usize_to_f64(index);
    if i < usize_to_f64(len) * cfg.flashing_zone_ratio {
        return Zone::Flashing;
    }
    if len > 1 && i / usize_to_f64(len - 1) < cfg.red_zone_ratio {
        return Zone::Red;
    }
    Zone::Neutral
}

/// Normalized position in the log: 0 for the oldest message, 1 for the newest.
#[must_use]
pub fn position_ratio(index: usize, len: usize) -> f64 {
    if len <= 1 {
        return 1.0;
    }
    usize_to_f64(index.min(len - 1)) / usize_to_f64(len - 1)
}

/// How far a message has scrolled toward the old end: 0 for the newest, 1 for the oldest.
///
/// A lone message is also the newest one and reads 0.
#[must_use]
pub fn age_ratio(index: usize, len: usize) -> f64 {
    if len <= 1 {
        return 0.0;
    }
    1.0 - position_ratio(index, len)
}

/// Outcome of one classification pass over the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneReport {
    /// An unmasked threat currently sits in the flashing zone.
    pub has_flashing: bool,
    /// An unmasked threat currently sits in the red zone.
    pub has_red: bool,
    pub newly_flashing: SmallVec<[u64; 4]>,
    pub newly_red: SmallVec<[u64; 4]>,
}

impl ZoneReport {
    #[must_use]
    pub fn penalties_fired(&self) -> usize {
        self.newly_flashing.len() + self.newly_red.len()
    }
}
