//! Session controller wiring the feed, threat machines, and economy to one clock.
use serde::{Deserialize, Serialize};

use crate::audio::{AudioSink, NullAudio, SoundCue};
use crate::chat::{ChatFeed, ChatMessage};
use crate::config::GameConfig;
use crate::constants::HURT_SOUND_VARIANTS;
use crate::context::Ctx;
use crate::economy::{Economy, EconomyEvent, EconomySnapshot, GamePhase, Meters};
use crate::result::RunSummary;
use crate::rng::RngStreams;
use crate::threats::{ThreatChannel, ThreatMachine, ThreatPhase};
use crate::tick::{TickDriver, TickReport};
use crate::timers::{TimerEvent, TimerHandle, TimerQueue};

/// Result of a player mask attempt on a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskOutcome {
    /// A threat was masked; carries the reaction time since it spawned.
    Correct { reaction_ms: u64 },
    /// A harmless message was masked.
    FalsePositive,
    /// Unknown id, already masked, or no run in progress.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSnapshot {
    pub channel: ThreatChannel,
    pub phase: ThreatPhase,
}

/// Everything the presentation layer reads each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub now_ms: u64,
    pub frames: u64,
    pub economy: EconomySnapshot,
    pub messages: Vec<ChatMessage>,
    pub threats: Vec<ThreatSnapshot>,
}

/// One run of the game: owns every component and the clock that drives them.
#[derive(Debug)]
pub struct Session<A: AudioSink = NullAudio> {
    cfg: GameConfig,
    economy: Economy,
    chat: ChatFeed,
    machines: [ThreatMachine; 3],
    timers: TimerQueue,
    rngs: RngStreams,
    audio: A,
    ticker: TickDriver,
    frames: u64,
}

impl Session<NullAudio> {
    /// Silent session with deterministic randomness derived from `seed`.
    #[must_use]
    pub fn with_seed(cfg: GameConfig, seed: u64) -> Self {
        Self::new(cfg, RngStreams::from_user_seed(seed), NullAudio)
    }

    /// Silent session with entropy-seeded randomness.
    #[must_use]
    pub fn unseeded(cfg: GameConfig) -> Self {
        Self::new(cfg, RngStreams::from_entropy(), NullAudio)
    }
}

impl<A: AudioSink> Session<A> {
    #[must_use]
    pub fn new(cfg: GameConfig, rngs: RngStreams, audio: A) -> Self {
        let machines = ThreatChannel::ALL.map(|channel| ThreatMachine::new(channel, &cfg));
        Self {
            economy: Economy::new(cfg.clone()),
            chat: ChatFeed::new(&cfg),
            machines,
            timers: TimerQueue::new(),
            rngs,
            audio,
            ticker: TickDriver::new(cfg.emotional.clone()),
            frames: 0,
            cfg,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    #[must_use]
    pub const fn chat(&self) -> &ChatFeed {
        &self.chat
    }

    #[must_use]
    pub const fn machine(&self, channel: ThreatChannel) -> &ThreatMachine {
        &self.machines[channel.index()]
    }

    #[must_use]
    pub const fn audio(&self) -> &A {
        &self.audio
    }

    pub const fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.economy.phase()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.economy.is_playing()
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of timers currently scheduled across all components.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// True while any threat machine sits in its danger window.
    #[must_use]
    pub fn external_danger(&self) -> bool {
        self.machines.iter().any(ThreatMachine::is_in_danger)
    }

    /// Begin a fresh run at the current clock. Any run in progress is discarded.
    pub fn start(&mut self) {
        self.teardown();
        self.chat.clear(&mut self.timers);
        self.timers.clear();
        self.ticker.reset();
        self.frames = 0;

        let now = self.timers.now_ms();
        self.economy.begin(now);
        self.audio.play(SoundCue::Click);
        self.audio.play(SoundCue::BackgroundStart);

        let mut ctx = Ctx::new(
            &mut self.economy,
            &mut self.timers,
            self.rngs.chat(),
            &mut self.audio,
        );
        self.chat.start(&mut ctx);
        let mut ctx = Ctx::new(
            &mut self.economy,
            &mut self.timers,
            self.rngs.threats(),
            &mut self.audio,
        );
        for machine in &mut self.machines {
            machine.start(&mut ctx);
        }
        log::info!("session started at {now}ms");
    }

    /// Halt every component, leaving the log and meters readable.
    pub fn stop(&mut self) {
        let was_playing = self.economy.is_playing();
        self.teardown();
        self.economy.halt();
        if was_playing {
            self.audio.play(SoundCue::BackgroundStop);
            log::info!("session stopped at {}ms", self.timers.now_ms());
        }
    }

    /// Stop and return to the menu with fresh meters and an empty log.
    pub fn reset(&mut self) {
        self.stop();
        self.chat.clear(&mut self.timers);
        self.economy.reset();
        self.ticker.reset();
        self.frames = 0;
    }

    /// Advance the clock by `dt_ms` and run one frame.
    pub fn advance(&mut self, dt_ms: u64) -> Option<TickReport> {
        let target = self.timers.now_ms().saturating_add(dt_ms);
        self.advance_to(target)
    }

    /// Fire every timer due up to `now_ms` in order, then run one frame at `now_ms`.
    ///
    /// Returns the frame report, or `None` when no run is in progress.
    pub fn advance_to(&mut self, now_ms: u64) -> Option<TickReport> {
        let target = now_ms.max(self.timers.now_ms());
        while let Some((handle, event)) = self.timers.pop_due(target) {
            self.economy.sync_clock(self.timers.now_ms());
            self.dispatch(handle, event);
            self.flush_events();
        }
        self.timers.advance_clock(target);
        self.economy.sync_clock(target);

        if !self.economy.is_playing() {
            return None;
        }
        let external_danger = self.external_danger();
        let report = self.ticker.tick(
            target,
            &mut self.chat,
            external_danger,
            &mut self.economy,
            self.rngs.economy(),
        );
        self.frames += 1;
        self.flush_events();
        Some(report)
    }

    /// Player masks chat message `id`.
    pub fn mask_message(&mut self, id: u64) -> MaskOutcome {
        if !self.economy.is_playing() {
            return MaskOutcome::Ignored;
        }
        let Some(is_threat) = self.chat.message(id).map(ChatMessage::is_threat) else {
            return MaskOutcome::Ignored;
        };
        let age_ratio = self.chat.age_ratio(id).unwrap_or(0.0);
        let Some(spawned_at_ms) = self.chat.mask_message(id) else {
            return MaskOutcome::Ignored;
        };

        let outcome = if is_threat {
            let reaction_ms = self.timers.now_ms().saturating_sub(spawned_at_ms);
            self.economy.mask_threat(age_ratio);
            self.economy.record_reaction(reaction_ms);
            self.chat.flag_correct_mask(id, &mut self.timers);
            self.audio.play(SoundCue::Correct);
            MaskOutcome::Correct { reaction_ms }
        } else {
            self.economy.false_positive();
            self.chat.flag_false_positive(id, &mut self.timers);
            self.audio.play(SoundCue::Incorrect);
            MaskOutcome::FalsePositive
        };
        self.flush_events();
        outcome
    }

    /// Player censors the live occurrence on `channel`.
    pub fn censor(&mut self, channel: ThreatChannel) -> bool {
        if !self.economy.is_playing() {
            return false;
        }
        let mut ctx = Ctx::new(
            &mut self.economy,
            &mut self.timers,
            self.rngs.threats(),
            &mut self.audio,
        );
        let censored = self.machines[channel.index()].censor(&mut ctx);
        if censored {
            self.audio.play(SoundCue::Correct);
        }
        self.flush_events();
        censored
    }

    /// Force an idle machine into grace without waiting for its scheduler.
    pub fn trigger_threat(&mut self, channel: ThreatChannel) -> bool {
        if !self.economy.is_playing() {
            return false;
        }
        let mut ctx = Ctx::new(
            &mut self.economy,
            &mut self.timers,
            self.rngs.threats(),
            &mut self.audio,
        );
        self.machines[channel.index()].trigger(&mut ctx)
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_economy(&self.economy)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            now_ms: self.timers.now_ms(),
            frames: self.frames,
            economy: self.economy.snapshot(),
            messages: self.chat.messages().cloned().collect(),
            threats: self
                .machines
                .iter()
                .map(|m| ThreatSnapshot {
                    channel: m.channel(),
                    phase: m.phase(),
                })
                .collect(),
        }
    }

    fn dispatch(&mut self, handle: TimerHandle, event: TimerEvent) {
        match event {
            TimerEvent::ChatNormal | TimerEvent::ChatThreat | TimerEvent::ClearPulse { .. } => {
                let mut ctx = Ctx::new(
                    &mut self.economy,
                    &mut self.timers,
                    self.rngs.chat(),
                    &mut self.audio,
                );
                self.chat.on_timer(handle, event, &mut ctx);
            }
            TimerEvent::Threat { channel, step } => {
                let mut ctx = Ctx::new(
                    &mut self.economy,
                    &mut self.timers,
                    self.rngs.threats(),
                    &mut self.audio,
                );
                self.machines[channel.index()].on_timer(handle, step, &mut ctx);
            }
        }
    }

    /// Turn economy side effects into sounds; tear down on game over.
    fn flush_events(&mut self) {
        for event in self.economy.take_events() {
            match event {
                EconomyEvent::Hurt => {
                    let variant = self
                        .rngs
                        .economy()
                        .pick_index(usize::from(HURT_SOUND_VARIANTS));
                    let variant = u8::try_from(variant).unwrap_or(0).saturating_add(1);
                    self.audio.play(SoundCue::Hurt(variant));
                }
                EconomyEvent::GameOver => {
                    self.teardown();
                    self.audio.play(SoundCue::GameOver);
                    self.audio.play(SoundCue::BackgroundStop);
                }
            }
        }
    }

    fn teardown(&mut self) {
        self.chat.stop(&mut self.timers);
        for machine in &mut self.machines {
            machine.stop(&mut self.timers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::economy::Smoothness;

    fn recording(seed: u64) -> Session<RecordingAudio> {
        Session::new(
            GameConfig::default(),
            RngStreams::from_user_seed(seed),
            RecordingAudio::default(),
        )
    }

    #[test]
    fn start_wires_components() {
        let mut session = recording(1);
        assert_eq!(session.phase(), GamePhase::Menu);
        assert!(session.advance(16).is_none());

        session.start();
        assert!(session.is_playing());
        assert_eq!(session.chat().len(), 8);
        // Two chat spawners plus three machine schedulers.
        assert_eq!(session.pending_timers(), 5);
        assert_eq!(
            session.audio().cues[..2],
            [SoundCue::Click, SoundCue::BackgroundStart]
        );
        assert!(session.advance(16).is_some());
    }

    #[test]
    fn stop_cancels_every_timer() {
        let mut session = recording(2);
        session.start();
        session.advance(5_000);
        session.stop();
        assert_eq!(session.pending_timers(), 0);
        assert_eq!(session.phase(), GamePhase::Menu);
        assert_eq!(session.audio().count(SoundCue::BackgroundStop), 1);
        let before = session.chat().len();
        session.advance(60_000);
        assert_eq!(session.chat().len(), before);

        session.reset();
        assert!(session.chat().is_empty());
        assert!((session.economy().emotional_value() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn masking_a_normal_message_is_a_false_positive() {
        let mut session = recording(3);
        session.start();
        let id = session.chat().messages().next().map(|m| m.id).unwrap();
        assert_eq!(session.mask_message(id), MaskOutcome::FalsePositive);
        assert_eq!(session.mask_message(id), MaskOutcome::Ignored);
        assert_eq!(session.economy().counters().false_positives, 1);
        assert!((session.economy().emotional_value() - 95.0).abs() < f64::EPSILON);
        assert_eq!(session.audio().count(SoundCue::Incorrect), 1);
        assert_eq!(
            session.chat().message(id).map(|m| m.false_positive),
            Some(true)
        );
        session.advance(400);
        assert_eq!(
            session.chat().message(id).map(|m| m.false_positive),
            Some(false)
        );
    }

    #[test]
    fn early_mask_bonus_pays_most_at_the_oldest_message() {
        use crate::chat::{MessageKind, ThreatCategory};
        const HATE: MessageKind = MessageKind::Threat {
            category: ThreatCategory::HateSpeech,
        };
        const QUIET: MessageKind = MessageKind::Normal {
            sentiment: crate::economy::Sentiment::Neutral,
        };

        let mut cfg = GameConfig::default();
        cfg.emotional.initial = 50.0;
        let recovery = cfg.emotional.early_mask_recovery;
        let mut session = Session::new(cfg, RngStreams::from_user_seed(7), RecordingAudio::default());
        session.start();
        session.chat.clear(&mut session.timers);
        let oldest = session.chat.push_for_test(HATE);
        for _ in 0..13 {
            session.chat.push_for_test(QUIET);
        }
        let newest = session.chat.push_for_test(HATE);
        assert_eq!(session.chat().len(), 15);

        assert!(matches!(session.mask_message(newest), MaskOutcome::Correct { .. }));
        assert!((session.economy().emotional_value() - 50.0).abs() < 1e-9);

        assert!(matches!(session.mask_message(oldest), MaskOutcome::Correct { .. }));
        assert!((session.economy().emotional_value() - (50.0 + recovery)).abs() < 1e-9);
        assert_eq!(session.economy().counters().threats_masked, 2);
    }

    #[test]
    fn stopping_mid_pulse_leaves_no_stuck_flag() {
        let mut session = recording(8);
        session.start();
        let id = session.chat().messages().next().map(|m| m.id).unwrap();
        assert_eq!(session.mask_message(id), MaskOutcome::FalsePositive);
        session.advance(100);
        session.stop();
        assert_eq!(
            session.chat().message(id).map(|m| m.false_positive),
            Some(false)
        );
        assert_eq!(session.pending_timers(), 0);
    }

    #[test]
    fn censor_requires_a_live_occurrence() {
        let mut session = recording(4);
        session.start();
        assert!(!session.censor(ThreatChannel::InfoLeak));
        assert!(session.trigger_threat(ThreatChannel::InfoLeak));
        assert!(!session.trigger_threat(ThreatChannel::InfoLeak));
        assert!(session.censor(ThreatChannel::InfoLeak));
        assert_eq!(session.economy().counters().threats_masked, 1);
        assert_eq!(
            session.machine(ThreatChannel::InfoLeak).phase(),
            ThreatPhase::Censored
        );
    }

    #[test]
    fn machine_danger_counts_as_flashing_pressure() {
        let mut session = recording(5);
        session.start();
        session.advance(0);
        session.trigger_threat(ThreatChannel::PersonalMessage);
        session.advance(3_000);
        assert!(session.external_danger());
        assert_eq!(session.economy().smoothness(), Smoothness::Laggy);
    }

    #[test]
    fn game_over_tears_down_and_plays_cues() {
        let mut cfg = GameConfig::default();
        cfg.emotional.initial = 3.0;
        let mut session = Session::new(
            cfg,
            RngStreams::from_user_seed(6),
            RecordingAudio::default(),
        );
        session.start();
        session.trigger_threat(ThreatChannel::InfoLeak);
        session.advance(3_000);
        assert_eq!(session.phase(), GamePhase::GameOver);
        assert_eq!(session.pending_timers(), 0);
        assert_eq!(session.audio().count(SoundCue::GameOver), 1);
        assert!(session.audio().cues.iter().any(|c| matches!(c, SoundCue::Hurt(1..=3))));
        assert_eq!(session.economy().end_time_ms(), Some(3_000));

        assert!(session.advance(1_000).is_none());
        assert_eq!(session.mask_message(0), MaskOutcome::Ignored);
        session.start();
        assert!(session.is_playing());
    }

    #[test]
    fn snapshot_serializes() {
        let mut session = Session::with_seed(GameConfig::default(), 9);
        session.start();
        session.advance(2_500);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.threats.len(), 3);
        assert!(!snapshot.messages.is_empty());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"phase\":\"Playing\""));
    }
}
