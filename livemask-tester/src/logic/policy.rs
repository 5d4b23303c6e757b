use std::collections::HashMap;
use std::fmt;

use clap::ValueEnum;
use livemask_game::{AudioSink, Session, ThreatChannel};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

/// Reaction window of the simulated human, in milliseconds.
const HUMAN_REACTION_MS: (u64, u64) = (350, 1_500);
/// Chance per frame that the simulated human masks a random message.
const HUMAN_MISCLICK_RATE: f64 = 0.002;

/// Scripted player acting on a running session once per frame.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    fn act<A: AudioSink>(&mut self, session: &mut Session<A>);
}

/// Built-in player behaviours for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Never touches anything; measures raw pressure
    Idle,
    /// Masks and censors every threat the frame it appears
    Perfect,
    /// Reacts after a jittered delay and occasionally misclicks
    Human,
}

impl PolicyKind {
    pub const ALL: [Self; 3] = [Self::Idle, Self::Perfect, Self::Human];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Perfect => "Perfect",
            Self::Human => "Human",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Policy {
        match self {
            Self::Idle => Policy::Idle(IdlePolicy),
            Self::Perfect => Policy::Perfect(PerfectPolicy),
            Self::Human => Policy::Human(HumanPolicy::new(seed)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed set of policies; the trait's generic method rules out trait objects.
pub enum Policy {
    Idle(IdlePolicy),
    Perfect(PerfectPolicy),
    Human(HumanPolicy),
}

impl PlayerPolicy for Policy {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle(p) => p.name(),
            Self::Perfect(p) => p.name(),
            Self::Human(p) => p.name(),
        }
    }

    fn act<A: AudioSink>(&mut self, session: &mut Session<A>) {
        match self {
            Self::Idle(p) => p.act(session),
            Self::Perfect(p) => p.act(session),
            Self::Human(p) => p.act(session),
        }
    }
}

pub struct IdlePolicy;

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn act<A: AudioSink>(&mut self, _session: &mut Session<A>) {}
}

pub struct PerfectPolicy;

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "perfect"
    }

    fn act<A: AudioSink>(&mut self, session: &mut Session<A>) {
        let threats: Vec<u64> = session.chat().live_threat_ids().collect();
        for id in threats {
            session.mask_message(id);
        }
        for channel in ThreatChannel::ALL {
            if session.machine(channel).phase().is_censorable() {
                session.censor(channel);
            }
        }
    }
}

pub struct HumanPolicy {
    rng: ChaCha20Rng,
    noticed: HashMap<u64, u64>,
    censor_at: [Option<u64>; 3],
}

impl HumanPolicy {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            noticed: HashMap::new(),
            censor_at: [None; 3],
        }
    }

    fn reaction_ms(&mut self) -> u64 {
        self.rng.gen_range(HUMAN_REACTION_MS.0..=HUMAN_REACTION_MS.1)
    }
}

impl PlayerPolicy for HumanPolicy {
    fn name(&self) -> &'static str {
        "human"
    }

    fn act<A: AudioSink>(&mut self, session: &mut Session<A>) {
        let now = session.now_ms();

        let live: Vec<u64> = session.chat().live_threat_ids().collect();
        self.noticed.retain(|id, _| live.contains(id));
        for id in &live {
            if !self.noticed.contains_key(id) {
                let at = now + self.reaction_ms();
                self.noticed.insert(*id, at);
            }
        }
        let mut due: Vec<u64> = self
            .noticed
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| *id)
            .collect();
        due.sort_unstable();
        for id in due {
            self.noticed.remove(&id);
            session.mask_message(id);
        }

        if self.rng.gen_bool(HUMAN_MISCLICK_RATE) {
            let ids: Vec<u64> = session.chat().messages().map(|m| m.id).collect();
            if !ids.is_empty() {
                let pick = ids[self.rng.gen_range(0..ids.len())];
                session.mask_message(pick);
            }
        }

        for channel in ThreatChannel::ALL {
            let slot = channel.index();
            if !session.machine(channel).phase().is_censorable() {
                self.censor_at[slot] = None;
                continue;
            }
            match self.censor_at[slot] {
                None => self.censor_at[slot] = Some(now + self.reaction_ms()),
                Some(at) if at <= now => {
                    self.censor_at[slot] = None;
                    session.censor(channel);
                }
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livemask_game::GameConfig;

    #[test]
    fn perfect_policy_clears_live_threats() {
        let mut session = Session::with_seed(GameConfig::default(), 3);
        session.start();
        session.trigger_threat(ThreatChannel::InfoLeak);
        let mut policy = PolicyKind::Perfect.create_policy(3);
        policy.act(&mut session);
        assert_eq!(policy.name(), "perfect");
        let tally = session.machine(ThreatChannel::InfoLeak).tally();
        assert_eq!(tally.censored_in_grace, 1);
    }

    #[test]
    fn human_policy_waits_before_censoring() {
        let mut session = Session::with_seed(GameConfig::default(), 4);
        session.start();
        session.trigger_threat(ThreatChannel::PersonalMessage);
        let mut policy = HumanPolicy::new(4);
        policy.act(&mut session);
        assert!(session.machine(ThreatChannel::PersonalMessage).is_active());
        for _ in 0..100 {
            session.advance(16);
            policy.act(&mut session);
        }
        let tally = session.machine(ThreatChannel::PersonalMessage).tally();
        assert_eq!(tally.censored_in_grace, 1);
    }
}
