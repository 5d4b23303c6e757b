//! Per-frame stepping of zones, smoothness, viewer growth, and emotional drift.
use serde::{Deserialize, Serialize};

use crate::chat::{ChatFeed, ZoneReport};
use crate::config::EmotionalCfg;
use crate::economy::Meters;
use crate::numbers::{round_ms, u64_to_f64};
use crate::rng::RandomSource;

/// What one frame did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub dt_ms: u64,
    pub zones: ZoneReport,
    pub external_danger: bool,
    pub fluctuated: bool,
}

#[derive(Debug, Clone)]
pub struct TickDriver {
    cfg: EmotionalCfg,
    last_frame_ms: Option<u64>,
    fluctuation_elapsed_ms: u64,
    next_fluctuation_ms: Option<u64>,
}

impl TickDriver {
    #[must_use]
    pub const fn new(cfg: EmotionalCfg) -> Self {
        Self {
            cfg,
            last_frame_ms: None,
            fluctuation_elapsed_ms: 0,
            next_fluctuation_ms: None,
        }
    }

    /// Forget the previous frame so the next tick starts with `dt = 0`.
    pub fn reset(&mut self) {
        self.last_frame_ms = None;
        self.fluctuation_elapsed_ms = 0;
        self.next_fluctuation_ms = None;
    }

    #[must_use]
    pub const fn last_frame_ms(&self) -> Option<u64> {
        self.last_frame_ms
    }

    /// Advance one frame at timestamp `now_ms`.
    ///
    /// `external_danger` is true while any threat machine sits in its danger
    /// window; it counts as flashing pressure for the smoothness update.
    pub fn tick(
        &mut self,
        now_ms: u64,
        chat: &mut ChatFeed,
        external_danger: bool,
        meters: &mut dyn Meters,
        rng: &mut dyn RandomSource,
    ) -> TickReport {
        let dt_ms = self
            .last_frame_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        self.last_frame_ms = Some(now_ms);

        let zones = chat.classify_zones(meters);
        meters.update_smoothness(dt_ms, zones.has_flashing || external_danger, zones.has_red);
        meters.update_viewers(dt_ms);

        let interval = match self.next_fluctuation_ms {
            Some(interval) => interval,
            None => {
                let interval = self.roll_interval(rng);
                self.next_fluctuation_ms = Some(interval);
                interval
            }
        };
        self.fluctuation_elapsed_ms = self.fluctuation_elapsed_ms.saturating_add(dt_ms);
        let fluctuated = self.fluctuation_elapsed_ms >= interval;
        if fluctuated {
            meters.fluctuate_emotional_value(rng.next_unit());
            self.fluctuation_elapsed_ms = 0;
            self.next_fluctuation_ms = Some(self.roll_interval(rng));
        }

        TickReport {
            dt_ms,
            zones,
            external_danger,
            fluctuated,
        }
    }

    fn roll_interval(&self, rng: &mut dyn RandomSource) -> u64 {
        let base = u64_to_f64(self.cfg.fluctuation_interval_ms);
        round_ms(base * rng.in_band(self.cfg.fluctuation_jitter)).max(1)
    }
}
