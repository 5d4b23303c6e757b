//! Bounded chat log with spawn scheduling and danger-zone escalation.
mod catalog;
pub mod zones;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::config::{ChatCfg, GameConfig, ViewerCfg};
use crate::context::Ctx;
use crate::economy::{Meters, Sentiment};
use crate::numbers::{ms_to_secs, round_ms};
use crate::rng::RandomSource;
use crate::timers::{TimerEvent, TimerHandle, TimerQueue};

pub use zones::{Zone, ZoneReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatCategory {
    HateSpeech,
    Dox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    Normal { sentiment: Sentiment },
    Threat { category: ThreatCategory },
}

/// Transient feedback flag raised on a message after a mask attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pulse {
    Correct,
    FalsePositive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub username: String,
    pub color: String,
    pub text: String,
    pub kind: MessageKind,
    pub spawned_at_ms: u64,
    pub is_masked: bool,
    pub red_triggered: bool,
    pub flash_triggered: bool,
    pub false_positive: bool,
    pub correct_mask: bool,
}

impl ChatMessage {
    #[must_use]
    pub const fn is_threat(&self) -> bool {
        matches!(self.kind, MessageKind::Threat { .. })
    }

    #[must_use]
    pub const fn is_live_threat(&self) -> bool {
        self.is_threat() && !self.is_masked
    }

    #[must_use]
    pub const fn sentiment(&self) -> Option<Sentiment> {
        match self.kind {
            MessageKind::Normal { sentiment } => Some(sentiment),
            MessageKind::Threat { .. } => None,
        }
    }

    fn set_pulse(&mut self, pulse: Pulse, on: bool) {
        match pulse {
            Pulse::Correct => self.correct_mask = on,
            Pulse::FalsePositive => self.false_positive = on,
        }
    }
}

/// Ordered chat log, oldest first, capped at `max_messages`.
#[derive(Debug, Clone)]
pub struct ChatFeed {
    cfg: ChatCfg,
    viewers_cfg: ViewerCfg,
    messages: VecDeque<ChatMessage>,
    next_id: u64,
    running: bool,
    normal_timer: Option<TimerHandle>,
    threat_timer: Option<TimerHandle>,
    pulse_timers: HashMap<(u64, Pulse), TimerHandle>,
}

impl ChatFeed {
    #[must_use]
    pub fn new(cfg: &GameConfig) -> Self {
        Self {
            cfg: cfg.chat.clone(),
            viewers_cfg: cfg.viewers.clone(),
            messages: VecDeque::with_capacity(cfg.chat.max_messages + 1),
            next_id: 0,
            running: false,
            normal_timer: None,
            threat_timer: None,
            pulse_timers: HashMap::new(),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn message(&self, id: u64) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Ids of threats still waiting to be masked, oldest first.
    pub fn live_threat_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.messages
            .iter()
            .filter(|m| m.is_live_threat())
            .map(|m| m.id)
    }

    /// Seed the log with quiet messages and start both spawners.
    pub fn start(&mut self, ctx: &mut Ctx<'_>) {
        self.stop(ctx.timers);
        self.running = true;
        let now = ctx.timers.now_ms();
        for _ in 0..self.cfg.seed_messages {
            let message = self.create_normal(now, ctx.rng);
            self.messages.push_back(message);
        }
        self.trim(ctx.meters);
        self.schedule_normal(ctx);
        self.schedule_threat(ctx);
    }

    /// Cancel every spawner and pulse timer. The log is kept, minus any pulse
    /// whose clearing timer was cancelled.
    pub fn stop(&mut self, timers: &mut TimerQueue) {
        self.running = false;
        timers.cancel_slot(&mut self.normal_timer);
        timers.cancel_slot(&mut self.threat_timer);
        for ((id, pulse), handle) in self.pulse_timers.drain() {
            timers.cancel(handle);
            if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
                message.set_pulse(pulse, false);
            }
        }
    }

    /// Stop and empty the log.
    pub fn clear(&mut self, timers: &mut TimerQueue) {
        self.stop(timers);
        self.messages.clear();
    }

    /// Append a normal message, apply its sentiment, and trim.
    pub fn add_normal_message(&mut self, ctx: &mut Ctx<'_>) -> u64 {
        let message = self.create_normal(ctx.timers.now_ms(), ctx.rng);
        let id = message.id;
        let sentiment = message.sentiment().unwrap_or_default();
        self.messages.push_back(message);
        ctx.meters.apply_sentiment(sentiment);
        self.trim(ctx.meters);
        id
    }

    /// Append a threat message and trim. Zone classification happens on the next tick.
    pub fn add_threat_message(&mut self, ctx: &mut Ctx<'_>) -> u64 {
        let now = ctx.timers.now_ms();
        let rng = &mut *ctx.rng;
        let (text, category) = catalog::pick_weighted(catalog::THREAT_LINES, |l| l.weight, rng)
            .map_or(("", ThreatCategory::HateSpeech), |l| (l.text, l.category));
        let message = self.build(now, text, MessageKind::Threat { category }, rng);
        let id = message.id;
        log::debug!("threat {id} spawned ({category:?})");
        self.messages.push_back(message);
        self.trim(ctx.meters);
        id
    }

    /// Enforce the length cap, oldest first. Each evicted unmasked threat is one miss.
    pub fn trim(&mut self, meters: &mut dyn Meters) -> usize {
        let mut expired = 0;
        while self.messages.len() > self.cfg.max_messages {
            let Some(evicted) = self.messages.pop_front() else {
                break;
            };
            if evicted.is_live_threat() {
                expired += 1;
                log::debug!("threat {} scrolled off unmasked", evicted.id);
                meters.missed_threat();
            }
        }
        expired
    }

    /// Mark a message masked. Returns its spawn time, or `None` if unknown or already masked.
    pub fn mask_message(&mut self, id: u64) -> Option<u64> {
        let message = self.messages.iter_mut().find(|m| m.id == id)?;
        if message.is_masked {
            return None;
        }
        message.is_masked = true;
        Some(message.spawned_at_ms)
    }

    pub fn flag_correct_mask(&mut self, id: u64, timers: &mut TimerQueue) -> bool {
        self.raise_pulse(id, Pulse::Correct, timers)
    }

    pub fn flag_false_positive(&mut self, id: u64, timers: &mut TimerQueue) -> bool {
        self.raise_pulse(id, Pulse::FalsePositive, timers)
    }

    fn raise_pulse(&mut self, id: u64, pulse: Pulse, timers: &mut TimerQueue) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        message.set_pulse(pulse, true);
        if let Some(previous) = self.pulse_timers.remove(&(id, pulse)) {
            timers.cancel(previous);
        }
        let handle = timers.schedule(
            self.cfg.pulse_ms,
            TimerEvent::ClearPulse {
                message_id: id,
                pulse,
            },
        );
        self.pulse_timers.insert((id, pulse), handle);
        true
    }

    /// Normalized position of a message: 0 oldest, 1 newest.
    #[must_use]
    pub fn position_ratio(&self, id: u64) -> Option<f64> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(zones::position_ratio(index, self.messages.len()))
    }

    /// Age of a message in the visible feed: 0 newest, 1 oldest.
    #[must_use]
    pub fn age_ratio(&self, id: u64) -> Option<f64> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(zones::age_ratio(index, self.messages.len()))
    }

    /// Classify unmasked threats into zones, firing each one-time penalty at most once.
    pub fn classify_zones(&mut self, meters: &mut dyn Meters) -> ZoneReport {
        let len = self.messages.len();
        let mut report = ZoneReport::default();
        for (index, message) in self.messages.iter_mut().enumerate() {
            if !message.is_live_threat() {
                continue;
            }
            match zones::zone_of(index, len, &self.cfg) {
                Zone::Flashing => {
                    report.has_flashing = true;
                    if !message.flash_triggered {
                        message.flash_triggered = true;
                        message.red_triggered = true;
                        report.newly_flashing.push(message.id);
                        meters.penalize_threat_flash();
                    }
                }
                Zone::Red => {
                    report.has_red = true;
                    if !message.red_triggered {
                        message.red_triggered = true;
                        report.newly_red.push(message.id);
                        meters.penalize_threat_red();
                    }
                }
                Zone::Neutral => {}
            }
        }
        report
    }

    /// Dispatch a fired chat timer. Events with a stale handle are ignored.
    pub fn on_timer(&mut self, handle: TimerHandle, event: TimerEvent, ctx: &mut Ctx<'_>) {
        match event {
            TimerEvent::ChatNormal => {
                if self.normal_timer != Some(handle) {
                    return;
                }
                self.normal_timer = None;
                if self.running && ctx.meters.is_playing() {
                    self.add_normal_message(ctx);
                    self.schedule_normal(ctx);
                }
            }
            TimerEvent::ChatThreat => {
                if self.threat_timer != Some(handle) {
                    return;
                }
                self.threat_timer = None;
                if self.running && ctx.meters.is_playing() {
                    self.add_threat_message(ctx);
                    self.schedule_threat(ctx);
                }
            }
            TimerEvent::ClearPulse { message_id, pulse } => {
                if self.pulse_timers.get(&(message_id, pulse)) != Some(&handle) {
                    return;
                }
                self.pulse_timers.remove(&(message_id, pulse));
                if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    message.set_pulse(pulse, false);
                }
            }
            TimerEvent::Threat { .. } => {}
        }
    }

    /// Delay until the next normal message at the given viewer count.
    #[must_use]
    pub fn normal_interval_ms(&self, viewers: f64, unit: f64) -> f64 {
        self.cfg.normal_interval_ms.lerp(unit) / self.viewers_cfg.speed_multiplier(viewers)
    }

    /// Delay until the next threat message at the given viewer count and elapsed time.
    #[must_use]
    pub fn threat_interval_ms(&self, viewers: f64, elapsed_secs: f64, unit: f64) -> f64 {
        let speed = self.viewers_cfg.speed_multiplier(viewers);
        let ratio = self.cfg.threat_ratio(elapsed_secs);
        let interval = (self.cfg.threat_base_interval_ms / (speed * ratio))
            .max(self.cfg.threat_min_interval_ms);
        interval * self.cfg.threat_jitter.lerp(unit)
    }

    fn schedule_normal(&mut self, ctx: &mut Ctx<'_>) {
        let unit = ctx.rng.next_unit();
        let delay = round_ms(self.normal_interval_ms(ctx.meters.viewers(), unit)).max(1);
        self.normal_timer = Some(ctx.timers.schedule(delay, TimerEvent::ChatNormal));
    }

    fn schedule_threat(&mut self, ctx: &mut Ctx<'_>) {
        let elapsed_secs = ms_to_secs(ctx.meters.elapsed_ms());
        let unit = ctx.rng.next_unit();
        let delay =
            round_ms(self.threat_interval_ms(ctx.meters.viewers(), elapsed_secs, unit)).max(1);
        self.threat_timer = Some(ctx.timers.schedule(delay, TimerEvent::ChatThreat));
    }

    fn create_normal(&mut self, now_ms: u64, rng: &mut dyn RandomSource) -> ChatMessage {
        let (text, sentiment) = catalog::pick_weighted(catalog::NORMAL_LINES, |l| l.weight, rng)
            .map_or(("", Sentiment::Neutral), |l| (l.text, l.sentiment));
        self.build(now_ms, text, MessageKind::Normal { sentiment }, rng)
    }

    fn build(
        &mut self,
        now_ms: u64,
        text: &str,
        kind: MessageKind,
        rng: &mut dyn RandomSource,
    ) -> ChatMessage {
        let id = self.next_id;
        self.next_id += 1;
        ChatMessage {
            id,
            username: catalog::pick_username(rng).to_string(),
            color: catalog::pick_color(rng).to_string(),
            text: text.to_string(),
            kind,
            spawned_at_ms: now_ms,
            is_masked: false,
            red_triggered: false,
            flash_triggered: false,
            false_positive: false,
            correct_mask: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, kind: MessageKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push_back(ChatMessage {
            id,
            username: "tester".to_string(),
            color: "#ffffff".to_string(),
            text: String::new(),
            kind,
            spawned_at_ms: 0,
            is_masked: false,
            red_triggered: false,
            flash_triggered: false,
            false_positive: false,
            correct_mask: false,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudio;
    use crate::economy::Economy;
    use crate::rng::ScriptedRandom;

    const QUIET: MessageKind = MessageKind::Normal {
        sentiment: Sentiment::Neutral,
    };
    const HATE: MessageKind = MessageKind::Threat {
        category: ThreatCategory::HateSpeech,
    };

    fn playing_economy() -> Economy {
        let mut economy = Economy::new(GameConfig::default());
        economy.begin(0);
        economy
    }

    #[test]
    fn trim_evicts_oldest_and_counts_live_threats() {
        let mut feed = ChatFeed::new(&GameConfig::default());
        let mut economy = playing_economy();
        let masked = feed.push_for_test(HATE);
        feed.push_for_test(HATE);
        feed.push_for_test(QUIET);
        feed.push_for_test(HATE);
        assert_eq!(feed.mask_message(masked), Some(0));
        for _ in 0..15 {
            feed.push_for_test(QUIET);
        }
        assert_eq!(feed.len(), 19);

        let expired = feed.trim(&mut economy);
        assert_eq!(expired, 2);
        assert_eq!(feed.len(), 15);
        assert!((economy.emotional_value() - 90.0).abs() < f64::EPSILON);
        assert_eq!(economy.counters().threats_expired, 2);
        assert_eq!(feed.messages().next().map(|m| m.id), Some(4));
    }

    #[test]
    fn masking_is_one_shot() {
        let mut feed = ChatFeed::new(&GameConfig::default());
        let id = feed.push_for_test(HATE);
        assert_eq!(feed.mask_message(id), Some(0));
        assert_eq!(feed.mask_message(id), None);
        assert_eq!(feed.mask_message(999), None);
    }

    #[test]
    fn zone_penalties_fire_once() {
        let mut feed = ChatFeed::new(&GameConfig::default());
        let mut economy = playing_economy();
        let flashing = feed.push_for_test(HATE);
        for _ in 0..3 {
            feed.push_for_test(QUIET);
        }
        let red = feed.push_for_test(HATE);
        for _ in 0..15 {
            feed.push_for_test(QUIET);
        }
        assert_eq!(feed.len(), 20);

        let report = feed.classify_zones(&mut economy);
        assert!(report.has_flashing);
        assert!(report.has_red);
        assert_eq!(report.newly_flashing.as_slice(), &[flashing]);
        assert_eq!(report.newly_red.as_slice(), &[red]);
        assert!((economy.emotional_value() - 92.0).abs() < f64::EPSILON);

        let again = feed.classify_zones(&mut economy);
        assert_eq!(again.penalties_fired(), 0);
        assert!(again.has_flashing);
        assert!((economy.emotional_value() - 92.0).abs() < f64::EPSILON);

        let skipped = feed.message(flashing).map(|m| (m.red_triggered, m.flash_triggered));
        assert_eq!(skipped, Some((true, true)));
    }

    #[test]
    fn masked_threats_leave_the_zones() {
        let mut feed = ChatFeed::new(&GameConfig::default());
        let mut economy = playing_economy();
        let id = feed.push_for_test(HATE);
        feed.push_for_test(QUIET);
        feed.mask_message(id);
        let report = feed.classify_zones(&mut economy);
        assert!(!report.has_flashing && !report.has_red);
        assert!((economy.emotional_value() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pulses_clear_after_their_timer() {
        let mut feed = ChatFeed::new(&GameConfig::default());
        let mut economy = playing_economy();
        let mut timers = TimerQueue::new();
        let mut rng = ScriptedRandom::constant(0.5);
        let mut audio = NullAudio;
        let id = feed.push_for_test(QUIET);
        assert!(feed.flag_false_positive(id, &mut timers));
        assert!(!feed.flag_correct_mask(42, &mut timers));
        assert_eq!(feed.message(id).map(|m| m.false_positive), Some(true));

        let (handle, event) = timers.pop_due(400).unwrap();
        let mut ctx = Ctx::new(&mut economy, &mut timers, &mut rng, &mut audio);
        feed.on_timer(handle, event, &mut ctx);
        assert_eq!(feed.message(id).map(|m| m.false_positive), Some(false));
    }

    #[test]
    fn stop_drops_pending_pulses() {
        let mut feed = ChatFeed::new(&GameConfig::default());
        let mut timers = TimerQueue::new();
        let threat = feed.push_for_test(HATE);
        let quiet = feed.push_for_test(QUIET);
        assert!(feed.flag_correct_mask(threat, &mut timers));
        assert!(feed.flag_false_positive(quiet, &mut timers));

        feed.stop(&mut timers);
        assert!(timers.is_empty());
        assert_eq!(feed.message(threat).map(|m| m.correct_mask), Some(false));
        assert_eq!(feed.message(quiet).map(|m| m.false_positive), Some(false));
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn start_seeds_quietly_and_schedules_spawners() {
        let mut feed = ChatFeed::new(&GameConfig::default());
        let mut economy = playing_economy();
        let mut timers = TimerQueue::new();
        let mut rng = ScriptedRandom::constant(0.0);
        let mut audio = NullAudio;
        let mut ctx = Ctx::new(&mut economy, &mut timers, &mut rng, &mut audio);
        feed.start(&mut ctx);
        assert_eq!(feed.len(), 8);
        assert!(feed.messages().all(|m| !m.is_threat()));
        assert_eq!(timers.len(), 2);
        assert!((economy.emotional_value() - 100.0).abs() < f64::EPSILON);

        feed.stop(&mut timers);
        assert!(timers.is_empty());
        assert_eq!(feed.len(), 8);
        feed.clear(&mut timers);
        assert!(feed.is_empty());
    }

    #[test]
    fn spawn_intervals_scale_with_difficulty() {
        let feed = ChatFeed::new(&GameConfig::default());
        assert!((feed.normal_interval_ms(1_000.0, 0.5) - 2_000.0).abs() < 1e-9);
        assert!((feed.normal_interval_ms(3_000.0, 0.5) - 1_000.0).abs() < 1e-9);
        assert!((feed.threat_interval_ms(1_000.0, 0.0, 0.5) - 5_000.0).abs() < 1e-9);
        assert!((feed.threat_interval_ms(1_000.0, 120.0, 0.5) - 2_500.0).abs() < 1e-9);
        assert!((feed.threat_interval_ms(5_000.0, 600.0, 0.0) - 1_600.0).abs() < 1e-9);
    }
}
