//! Economy meters: emotional value, viewers, smoothness, and run counters.
//!
//! Every mutating operation is a no-op unless the phase is
//! [`GamePhase::Playing`]. Emotional value reaching zero moves the phase to
//! [`GamePhase::GameOver`], which freezes the meters until the next
//! [`Economy::begin`].
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::GameConfig;
use crate::numbers::{ms_to_secs, u64_to_f64};
use crate::threats::ThreatChannel;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GamePhase {
    #[default]
    Menu,
    Playing,
    GameOver,
}

/// Stream smoothness meta-state driving passive viewer growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Smoothness {
    Smooth,
    #[default]
    Normal,
    Laggy,
}

/// Sentiment tag carried by normal chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Sentiment {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl Sentiment {
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
            Self::Positive => 1.0,
        }
    }
}

/// Side effects the session turns into sounds after each callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EconomyEvent {
    Hurt,
    GameOver,
}

pub type EconomyEvents = SmallVec<[EconomyEvent; 4]>;

/// Meter operations shared by every component that mutates the economy.
pub trait Meters {
    fn phase(&self) -> GamePhase;

    fn is_playing(&self) -> bool {
        self.phase() == GamePhase::Playing
    }

    fn emotional_value(&self) -> f64;
    fn viewers(&self) -> f64;
    fn smoothness(&self) -> Smoothness;
    /// Milliseconds since the run started, 0 outside a run.
    fn elapsed_ms(&self) -> u64;

    fn apply_sentiment(&mut self, sentiment: Sentiment);
    fn penalize_threat_red(&mut self);
    fn penalize_threat_flash(&mut self);
    /// A chat threat scrolled off the feed unmasked.
    fn missed_threat(&mut self);
    /// A threat machine entered its danger window.
    fn penalize_channel_danger(&mut self, channel: ThreatChannel);
    /// A threat machine's danger window elapsed uncensored.
    fn missed_channel_threat(&mut self, channel: ThreatChannel);
    fn drain_channel_danger(&mut self, channel: ThreatChannel, secs: f64);
    /// Clean censor of a threat machine occurrence.
    fn count_masked_threat(&mut self);
    /// Correct mask of a chat threat. `age_ratio` is 0 at the newest visible
    /// message and 1 at the oldest; masks in the older half earn a recovery bonus.
    fn mask_threat(&mut self, age_ratio: f64);
    fn false_positive(&mut self);
    fn record_reaction(&mut self, reaction_ms: u64);

    fn update_smoothness(&mut self, dt_ms: u64, has_flashing: bool, has_red: bool);
    fn update_viewers(&mut self, dt_ms: u64);
    /// Nudge emotional value by a random amount; `unit` is a roll in `[0, 1)`.
    fn fluctuate_emotional_value(&mut self, unit: f64);
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunCounters {
    pub threats_masked: u32,
    pub threats_expired: u32,
    pub false_positives: u32,
    pub reaction_samples: u32,
    pub reaction_total_ms: u64,
}

/// Read-only view of the meters for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomySnapshot {
    pub phase: GamePhase,
    pub emotional_value: f64,
    pub emotional_max: f64,
    pub viewers: f64,
    pub peak_viewers: f64,
    pub smoothness: Smoothness,
    pub counters: RunCounters,
    pub start_time_ms: Option<u64>,
    pub end_time_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Economy {
    cfg: GameConfig,
    phase: GamePhase,
    clock_ms: u64,
    emotional_value: f64,
    viewers: f64,
    peak_viewers: f64,
    smoothness: Smoothness,
    clean_ms: u64,
    counters: RunCounters,
    start_time_ms: Option<u64>,
    end_time_ms: Option<u64>,
    events: EconomyEvents,
}

impl Economy {
    #[must_use]
    pub fn new(cfg: GameConfig) -> Self {
        let emotional_value = cfg.emotional.initial;
        let viewers = cfg.viewers.initial;
        Self {
            cfg,
            phase: GamePhase::Menu,
            clock_ms: 0,
            emotional_value,
            viewers,
            peak_viewers: viewers,
            smoothness: Smoothness::Normal,
            clean_ms: 0,
            counters: RunCounters::default(),
            start_time_ms: None,
            end_time_ms: None,
            events: EconomyEvents::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.cfg
    }

    /// Reset every meter and enter the playing phase at `now_ms`.
    pub fn begin(&mut self, now_ms: u64) {
        let cfg = self.cfg.clone();
        *self = Self::new(cfg);
        self.clock_ms = now_ms;
        self.start_time_ms = Some(now_ms);
        self.phase = GamePhase::Playing;
    }

    /// Back to the menu with fresh meters.
    pub fn reset(&mut self) {
        let cfg = self.cfg.clone();
        let clock_ms = self.clock_ms;
        *self = Self::new(cfg);
        self.clock_ms = clock_ms;
    }

    /// Keep the internal clock in step with the session loop.
    pub fn sync_clock(&mut self, now_ms: u64) {
        self.clock_ms = self.clock_ms.max(now_ms);
    }

    /// Record the end time and enter the terminal phase. Only legal while playing.
    pub fn game_over(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.end_time_ms = Some(self.clock_ms);
        self.events.push(EconomyEvent::GameOver);
        log::info!(
            "game over after {:.1}s (viewers {:.0}, masked {}, expired {})",
            self.survival_secs(),
            self.viewers,
            self.counters.threats_masked,
            self.counters.threats_expired
        );
    }

    /// Leave the playing phase without a game over, e.g. when the host stops the run.
    pub fn halt(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.phase = GamePhase::Menu;
        self.end_time_ms = Some(self.clock_ms);
    }

    /// Drain side effects produced since the last call.
    pub fn take_events(&mut self) -> EconomyEvents {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub const fn counters(&self) -> RunCounters {
        self.counters
    }

    #[must_use]
    pub const fn peak_viewers(&self) -> f64 {
        self.peak_viewers
    }

    #[must_use]
    pub const fn clean_ms(&self) -> u64 {
        self.clean_ms
    }

    #[must_use]
    pub const fn start_time_ms(&self) -> Option<u64> {
        self.start_time_ms
    }

    #[must_use]
    pub const fn end_time_ms(&self) -> Option<u64> {
        self.end_time_ms
    }

    /// Seconds survived: up to the end time once over, up to now while playing.
    #[must_use]
    pub fn survival_secs(&self) -> f64 {
        let Some(start) = self.start_time_ms else {
            return 0.0;
        };
        let end = self.end_time_ms.unwrap_or(self.clock_ms);
        ms_to_secs(end.saturating_sub(start))
    }

    /// Masked share of all resolved threats plus false positives, as a percentage.
    #[must_use]
    pub fn accuracy_pct(&self) -> f64 {
        let c = self.counters;
        let attempts = c.threats_masked + c.threats_expired + c.false_positives;
        if attempts == 0 {
            return 100.0;
        }
        f64::from(c.threats_masked) / f64::from(attempts) * 100.0
    }

    /// Mean reaction time over masked chat threats.
    #[must_use]
    pub fn average_reaction_ms(&self) -> Option<f64> {
        let c = self.counters;
        if c.reaction_samples == 0 {
            return None;
        }
        Some(u64_to_f64(c.reaction_total_ms) / f64::from(c.reaction_samples))
    }

    #[must_use]
    pub fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            phase: self.phase,
            emotional_value: self.emotional_value,
            emotional_max: self.cfg.emotional.max,
            viewers: self.viewers,
            peak_viewers: self.peak_viewers,
            smoothness: self.smoothness,
            counters: self.counters,
            start_time_ms: self.start_time_ms,
            end_time_ms: self.end_time_ms,
        }
    }

    fn add_emotional(&mut self, delta: f64) {
        self.emotional_value = (self.emotional_value + delta).clamp(0.0, self.cfg.emotional.max);
        self.check_game_over();
    }

    fn hurt(&mut self, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        self.events.push(EconomyEvent::Hurt);
        self.add_emotional(-amount);
    }

    fn add_viewers(&mut self, delta: f64) {
        self.viewers = (self.viewers + delta).max(0.0);
        self.peak_viewers = self.peak_viewers.max(self.viewers);
    }

    fn force_laggy(&mut self) {
        self.smoothness = Smoothness::Laggy;
        self.clean_ms = 0;
    }

    fn check_game_over(&mut self) {
        if self.emotional_value <= 0.0 {
            self.game_over();
        }
    }
}

impl Meters for Economy {
    fn phase(&self) -> GamePhase {
        self.phase
    }

    fn emotional_value(&self) -> f64 {
        self.emotional_value
    }

    fn viewers(&self) -> f64 {
        self.viewers
    }

    fn smoothness(&self) -> Smoothness {
        self.smoothness
    }

    fn elapsed_ms(&self) -> u64 {
        match (self.phase, self.start_time_ms) {
            (GamePhase::Playing, Some(start)) => self.clock_ms.saturating_sub(start),
            _ => 0,
        }
    }

    fn apply_sentiment(&mut self, sentiment: Sentiment) {
        if !self.is_playing() {
            return;
        }
        self.add_emotional(sentiment.value() * self.cfg.emotional.sentiment_weight);
    }

    fn penalize_threat_red(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.hurt(self.cfg.emotional.red_penalty);
    }

    fn penalize_threat_flash(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.hurt(self.cfg.emotional.flash_penalty);
    }

    fn missed_threat(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.counters.threats_expired += 1;
        self.add_viewers(-self.cfg.viewers.miss_penalty);
        self.force_laggy();
        self.hurt(self.cfg.emotional.miss_penalty);
    }

    fn penalize_channel_danger(&mut self, channel: ThreatChannel) {
        if !self.is_playing() {
            return;
        }
        self.hurt(self.cfg.machine(channel).danger_emotional_penalty);
    }

    fn missed_channel_threat(&mut self, channel: ThreatChannel) {
        if !self.is_playing() {
            return;
        }
        let (emotional, viewers) = {
            let machine = self.cfg.machine(channel);
            (machine.miss_emotional_penalty, machine.miss_viewer_penalty)
        };
        self.counters.threats_expired += 1;
        self.add_viewers(-viewers);
        self.force_laggy();
        self.hurt(emotional);
    }

    fn drain_channel_danger(&mut self, channel: ThreatChannel, secs: f64) {
        if !self.is_playing() {
            return;
        }
        let Some(drain) = self.cfg.machine(channel).drain.clone() else {
            return;
        };
        self.add_viewers(-drain.viewers_per_sec * secs);
        self.add_emotional(-drain.emotional_per_sec * secs);
    }

    fn count_masked_threat(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.counters.threats_masked += 1;
    }

    fn mask_threat(&mut self, age_ratio: f64) {
        if !self.is_playing() {
            return;
        }
        self.counters.threats_masked += 1;
        if age_ratio > 0.5 {
            let earliness = ((age_ratio - 0.5) / 0.5).min(1.0);
            self.add_emotional(self.cfg.emotional.early_mask_recovery * earliness);
        }
    }

    fn false_positive(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.counters.false_positives += 1;
        self.add_viewers(-self.cfg.viewers.false_positive_penalty);
        self.hurt(self.cfg.emotional.false_positive_penalty);
    }

    fn record_reaction(&mut self, reaction_ms: u64) {
        if !self.is_playing() {
            return;
        }
        self.counters.reaction_samples += 1;
        self.counters.reaction_total_ms = self.counters.reaction_total_ms.saturating_add(reaction_ms);
    }

    fn update_smoothness(&mut self, dt_ms: u64, has_flashing: bool, has_red: bool) {
        if !self.is_playing() {
            return;
        }
        let previous = self.smoothness;
        if has_flashing {
            self.force_laggy();
        } else if has_red {
            self.smoothness = Smoothness::Normal;
            self.clean_ms = 0;
        } else {
            match self.smoothness {
                Smoothness::Laggy => {
                    self.smoothness = Smoothness::Normal;
                    self.clean_ms = 0;
                }
                Smoothness::Normal => {
                    self.clean_ms = self.clean_ms.saturating_add(dt_ms);
                    if self.clean_ms >= self.cfg.smoothness.normal_to_smooth_ms {
                        self.smoothness = Smoothness::Smooth;
                    }
                }
                Smoothness::Smooth => {}
            }
        }
        if previous != self.smoothness {
            log::debug!("smoothness {previous:?} -> {:?}", self.smoothness);
        }
    }

    fn update_viewers(&mut self, dt_ms: u64) {
        if !self.is_playing() {
            return;
        }
        let rate = match self.smoothness {
            Smoothness::Smooth => self.cfg.viewers.rate_smooth,
            Smoothness::Normal => self.cfg.viewers.rate_normal,
            Smoothness::Laggy => self.cfg.viewers.rate_laggy,
        };
        self.add_viewers(rate * ms_to_secs(dt_ms));
    }

    fn fluctuate_emotional_value(&mut self, unit: f64) {
        if !self.is_playing() {
            return;
        }
        let delta = self.cfg.emotional.fluctuation_range.lerp(unit);
        self.add_emotional(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> Economy {
        let mut economy = Economy::new(GameConfig::default());
        economy.begin(0);
        economy
    }

    #[test]
    fn sentiment_is_clamped_to_max() {
        let mut economy = playing();
        economy.apply_sentiment(Sentiment::Positive);
        assert!((economy.emotional_value() - 100.0).abs() < f64::EPSILON);
        economy.apply_sentiment(Sentiment::Negative);
        assert!((economy.emotional_value() - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mutations_ignored_outside_playing() {
        let mut economy = Economy::new(GameConfig::default());
        economy.penalize_threat_flash();
        economy.missed_threat();
        economy.update_viewers(10_000);
        assert!((economy.emotional_value() - 100.0).abs() < f64::EPSILON);
        assert_eq!(economy.counters(), RunCounters::default());
        assert!((economy.viewers() - 1_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reaching_zero_is_terminal() {
        let mut economy = playing();
        economy.sync_clock(12_000);
        for _ in 0..25 {
            economy.penalize_threat_flash();
        }
        assert_eq!(economy.phase(), GamePhase::GameOver);
        assert!(economy.emotional_value().abs() < f64::EPSILON);
        assert_eq!(economy.end_time_ms(), Some(12_000));
        let events = economy.take_events();
        assert_eq!(
            events.iter().filter(|e| **e == EconomyEvent::GameOver).count(),
            1
        );

        economy.apply_sentiment(Sentiment::Positive);
        economy.count_masked_threat();
        assert!(economy.emotional_value().abs() < f64::EPSILON);
        assert_eq!(economy.counters().threats_masked, 0);
        assert!((economy.survival_secs() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn missed_threat_applies_flat_penalties() {
        let mut economy = playing();
        economy.missed_threat();
        assert!((economy.emotional_value() - 95.0).abs() < f64::EPSILON);
        assert!((economy.viewers() - 950.0).abs() < f64::EPSILON);
        assert_eq!(economy.smoothness(), Smoothness::Laggy);
        assert_eq!(economy.counters().threats_expired, 1);
    }

    #[test]
    fn channel_payouts_follow_config() {
        let mut economy = playing();
        economy.penalize_channel_danger(ThreatChannel::InfoLeak);
        assert!((economy.emotional_value() - 95.0).abs() < f64::EPSILON);
        economy.missed_channel_threat(ThreatChannel::InfoLeak);
        assert!((economy.emotional_value() - 87.0).abs() < f64::EPSILON);
        assert!((economy.viewers() - 920.0).abs() < f64::EPSILON);

        economy.drain_channel_danger(ThreatChannel::Misbehavior, 0.5);
        assert!((economy.emotional_value() - 86.0).abs() < 1e-9);
        assert!((economy.viewers() - 915.0).abs() < 1e-9);
        economy.drain_channel_danger(ThreatChannel::InfoLeak, 1.0);
        assert!((economy.viewers() - 915.0).abs() < 1e-9);
    }

    #[test]
    fn early_mask_recovery_scales_linearly() {
        let mut economy = playing();
        economy.missed_threat();
        let base = economy.emotional_value();

        economy.mask_threat(0.5);
        assert!((economy.emotional_value() - base).abs() < f64::EPSILON);
        economy.mask_threat(0.75);
        assert!((economy.emotional_value() - (base + 1.0)).abs() < 1e-9);
        economy.mask_threat(1.0);
        assert!((economy.emotional_value() - (base + 3.0)).abs() < 1e-9);
        economy.mask_threat(0.2);
        assert_eq!(economy.counters().threats_masked, 4);
    }

    #[test]
    fn smoothness_state_machine() {
        let mut economy = playing();
        economy.update_smoothness(16, true, false);
        assert_eq!(economy.smoothness(), Smoothness::Laggy);
        economy.update_smoothness(16, false, true);
        assert_eq!(economy.smoothness(), Smoothness::Normal);

        economy.update_smoothness(3_000, false, false);
        assert_eq!(economy.smoothness(), Smoothness::Normal);
        economy.update_smoothness(500, false, true);
        assert_eq!(economy.clean_ms(), 0);
        economy.update_smoothness(3_999, false, false);
        assert_eq!(economy.smoothness(), Smoothness::Normal);
        economy.update_smoothness(1, false, false);
        assert_eq!(economy.smoothness(), Smoothness::Smooth);

        economy.update_smoothness(16, false, true);
        assert_eq!(economy.smoothness(), Smoothness::Normal);
        economy.update_smoothness(16, false, false);
        economy.update_smoothness(16, true, false);
        assert_eq!(economy.smoothness(), Smoothness::Laggy);
    }

    #[test]
    fn viewers_follow_smoothness_rate_and_track_peak() {
        let mut economy = playing();
        economy.update_viewers(2_000);
        assert!((economy.viewers() - 1_002.0).abs() < 1e-9);
        economy.update_smoothness(0, true, false);
        economy.update_viewers(10_000);
        assert!((economy.viewers() - 982.0).abs() < 1e-9);
        assert!((economy.peak_viewers() - 1_002.0).abs() < 1e-9);
    }

    #[test]
    fn viewers_never_negative() {
        let mut economy = playing();
        for _ in 0..40 {
            economy.false_positive();
            economy.apply_sentiment(Sentiment::Positive);
            economy.apply_sentiment(Sentiment::Positive);
            economy.apply_sentiment(Sentiment::Positive);
            economy.apply_sentiment(Sentiment::Positive);
            economy.apply_sentiment(Sentiment::Positive);
        }
        economy.update_smoothness(0, true, false);
        economy.update_viewers(1_000_000);
        assert!(economy.viewers() >= 0.0);
        assert_eq!(economy.counters().false_positives, 40);
    }

    #[test]
    fn fluctuation_stays_within_range() {
        let mut economy = playing();
        economy.missed_threat();
        let base = economy.emotional_value();
        economy.fluctuate_emotional_value(0.0);
        assert!((economy.emotional_value() - (base - 0.5)).abs() < 1e-9);
        economy.fluctuate_emotional_value(1.0);
        assert!((economy.emotional_value() - base).abs() < 1e-9);
    }

    #[test]
    fn accuracy_and_reaction_stats() {
        let mut economy = playing();
        assert!((economy.accuracy_pct() - 100.0).abs() < f64::EPSILON);
        economy.mask_threat(0.0);
        economy.mask_threat(0.0);
        economy.mask_threat(0.0);
        economy.missed_threat();
        assert!((economy.accuracy_pct() - 75.0).abs() < 1e-9);
        assert!(economy.average_reaction_ms().is_none());
        economy.record_reaction(400);
        economy.record_reaction(800);
        assert!((economy.average_reaction_ms().unwrap_or_default() - 600.0).abs() < 1e-9);
    }
}
