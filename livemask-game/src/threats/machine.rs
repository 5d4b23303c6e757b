use serde::{Deserialize, Serialize};

use super::{ThreatChannel, ThreatPhase, ThreatStep};
use crate::config::{GameConfig, ThreatMachineCfg, ViewerCfg};
use crate::context::Ctx;
use crate::numbers::{ms_to_secs, round_ms};
use crate::timers::{TimerEvent, TimerHandle, TimerQueue};

/// Per-machine tallies, kept for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreatTally {
    pub spawned: u32,
    pub censored_in_grace: u32,
    pub censored_in_danger: u32,
    pub expired: u32,
}

/// One timed threat channel.
///
/// Only one occurrence is live at a time. Every timer the machine owns is held
/// in a slot; a fired event whose handle does not match its slot is stale and
/// ignored.
#[derive(Debug, Clone)]
pub struct ThreatMachine {
    channel: ThreatChannel,
    cfg: ThreatMachineCfg,
    viewers_cfg: ViewerCfg,
    phase: ThreatPhase,
    running: bool,
    spawn_timer: Option<TimerHandle>,
    phase_timer: Option<TimerHandle>,
    drain_timer: Option<TimerHandle>,
    tally: ThreatTally,
}

impl ThreatMachine {
    #[must_use]
    pub fn new(channel: ThreatChannel, cfg: &GameConfig) -> Self {
        Self {
            channel,
            cfg: cfg.machine(channel).clone(),
            viewers_cfg: cfg.viewers.clone(),
            phase: ThreatPhase::Idle,
            running: false,
            spawn_timer: None,
            phase_timer: None,
            drain_timer: None,
            tally: ThreatTally::default(),
        }
    }

    #[must_use]
    pub const fn channel(&self) -> ThreatChannel {
        self.channel
    }

    #[must_use]
    pub const fn phase(&self) -> ThreatPhase {
        self.phase
    }

    /// True while an occurrence is live or its censor blur is showing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != ThreatPhase::Idle
    }

    #[must_use]
    pub fn is_in_danger(&self) -> bool {
        self.phase == ThreatPhase::Danger
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn has_pending_spawn(&self) -> bool {
        self.spawn_timer.is_some()
    }

    #[must_use]
    pub const fn tally(&self) -> ThreatTally {
        self.tally
    }

    /// Reset to idle and schedule the first spawn attempt.
    pub fn start(&mut self, ctx: &mut Ctx<'_>) {
        self.cancel_all(ctx.timers);
        self.phase = ThreatPhase::Idle;
        self.running = true;
        self.tally = ThreatTally::default();
        self.schedule_spawn(ctx);
    }

    /// Cancel every outstanding timer and return to idle.
    pub fn stop(&mut self, timers: &mut TimerQueue) {
        self.cancel_all(timers);
        self.phase = ThreatPhase::Idle;
        self.running = false;
    }

    /// Censor the live occurrence. Ignored unless in grace or danger.
    pub fn censor(&mut self, ctx: &mut Ctx<'_>) -> bool {
        if !self.phase.is_censorable() {
            return false;
        }
        ctx.timers.cancel_slot(&mut self.phase_timer);
        ctx.timers.cancel_slot(&mut self.drain_timer);
        if self.phase == ThreatPhase::Grace {
            self.tally.censored_in_grace += 1;
        } else {
            self.tally.censored_in_danger += 1;
        }
        ctx.meters.count_masked_threat();
        log::debug!("{:?} censored during {:?}", self.channel, self.phase);
        self.phase = ThreatPhase::Censored;
        self.phase_timer = Some(ctx.timers.schedule(
            self.cfg.censor_blur_ms,
            self.event(ThreatStep::CensorElapsed),
        ));
        true
    }

    /// Force an idle machine straight into grace, skipping the spawn scheduler.
    pub fn trigger(&mut self, ctx: &mut Ctx<'_>) -> bool {
        if !self.running || self.phase != ThreatPhase::Idle {
            return false;
        }
        ctx.timers.cancel_slot(&mut self.spawn_timer);
        self.enter_grace(ctx);
        true
    }

    /// Dispatch a fired timer. Events with a stale handle are ignored.
    pub fn on_timer(&mut self, handle: TimerHandle, step: ThreatStep, ctx: &mut Ctx<'_>) {
        match step {
            ThreatStep::Spawn => {
                if self.spawn_timer != Some(handle) {
                    return;
                }
                self.spawn_timer = None;
                self.on_spawn(ctx);
            }
            ThreatStep::GraceElapsed => {
                if self.phase_timer != Some(handle) {
                    return;
                }
                self.phase_timer = None;
                self.on_grace_elapsed(ctx);
            }
            ThreatStep::DangerElapsed => {
                if self.phase_timer != Some(handle) {
                    return;
                }
                self.phase_timer = None;
                self.on_danger_elapsed(ctx);
            }
            ThreatStep::CensorElapsed => {
                if self.phase_timer != Some(handle) {
                    return;
                }
                self.phase_timer = None;
                if self.phase == ThreatPhase::Censored {
                    self.phase = ThreatPhase::Idle;
                    self.schedule_spawn(ctx);
                }
            }
            ThreatStep::Drain => {
                if self.drain_timer != Some(handle) {
                    return;
                }
                self.on_drain(ctx);
            }
        }
    }

    fn on_spawn(&mut self, ctx: &mut Ctx<'_>) {
        if !self.running || !ctx.meters.is_playing() {
            return;
        }
        if self.phase != ThreatPhase::Idle {
            self.schedule_spawn(ctx);
            return;
        }
        if let Some(gate) = &self.cfg.emotion_gate {
            let emotion = ctx.meters.emotional_value();
            if emotion >= gate.threshold {
                self.schedule_spawn(ctx);
                return;
            }
            let chance = (gate.threshold - emotion) / gate.threshold;
            if ctx.rng.next_unit() > chance {
                self.schedule_spawn(ctx);
                return;
            }
        }
        self.enter_grace(ctx);
    }

    fn enter_grace(&mut self, ctx: &mut Ctx<'_>) {
        self.phase = ThreatPhase::Grace;
        self.tally.spawned += 1;
        if let Some(cue) = self.channel.spawn_cue() {
            ctx.audio.play(cue);
        }
        log::debug!("{:?} entered grace", self.channel);
        self.phase_timer = Some(
            ctx.timers
                .schedule(self.cfg.grace_ms, self.event(ThreatStep::GraceElapsed)),
        );
    }

    fn on_grace_elapsed(&mut self, ctx: &mut Ctx<'_>) {
        if self.phase != ThreatPhase::Grace {
            return;
        }
        self.phase = ThreatPhase::Danger;
        log::debug!("{:?} entered danger", self.channel);
        ctx.meters.penalize_channel_danger(self.channel);
        self.phase_timer = Some(
            ctx.timers
                .schedule(self.cfg.danger_ms, self.event(ThreatStep::DangerElapsed)),
        );
        if let Some(drain) = &self.cfg.drain {
            self.drain_timer = Some(
                ctx.timers
                    .schedule_repeating(drain.interval_ms, self.event(ThreatStep::Drain)),
            );
        }
    }

    fn on_danger_elapsed(&mut self, ctx: &mut Ctx<'_>) {
        if self.phase != ThreatPhase::Danger {
            return;
        }
        ctx.timers.cancel_slot(&mut self.drain_timer);
        self.tally.expired += 1;
        log::debug!("{:?} expired uncensored", self.channel);
        ctx.meters.missed_channel_threat(self.channel);
        self.phase = ThreatPhase::Idle;
        self.schedule_spawn(ctx);
    }

    fn on_drain(&mut self, ctx: &mut Ctx<'_>) {
        let interval_ms = match &self.cfg.drain {
            Some(drain) if self.phase == ThreatPhase::Danger && ctx.meters.is_playing() => {
                drain.interval_ms
            }
            _ => {
                ctx.timers.cancel_slot(&mut self.drain_timer);
                return;
            }
        };
        ctx.meters
            .drain_channel_danger(self.channel, ms_to_secs(interval_ms));
    }

    fn schedule_spawn(&mut self, ctx: &mut Ctx<'_>) {
        ctx.timers.cancel_slot(&mut self.spawn_timer);
        if !self.running || !ctx.meters.is_playing() {
            return;
        }
        let delay_ms = match &self.cfg.emotion_gate {
            Some(gate) => gate.check_interval_ms,
            None => {
                let speedup = self.viewers_cfg.speed_multiplier(ctx.meters.viewers());
                round_ms(self.cfg.spawn_delay_ms(speedup, ctx.rng.next_unit())).max(1)
            }
        };
        self.spawn_timer = Some(ctx.timers.schedule(delay_ms, self.event(ThreatStep::Spawn)));
    }

    fn cancel_all(&mut self, timers: &mut TimerQueue) {
        timers.cancel_slot(&mut self.spawn_timer);
        timers.cancel_slot(&mut self.phase_timer);
        timers.cancel_slot(&mut self.drain_timer);
    }

    const fn event(&self, step: ThreatStep) -> TimerEvent {
        TimerEvent::Threat {
            channel: self.channel,
            step,
        }
    }
}
