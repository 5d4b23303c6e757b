//! Timed threat channels that run beside the chat feed.
//!
//! Each channel is one [`ThreatMachine`] sharing the same
//! `idle → grace → danger → (censored | idle)` shape with its own timing and
//! payout table from [`crate::config::ThreatMachineCfg`].
mod machine;

pub use machine::{ThreatMachine, ThreatTally};

use serde::{Deserialize, Serialize};

use crate::audio::SoundCue;

/// The three independently scheduled threat generators outside the chat feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatChannel {
    InfoLeak,
    PersonalMessage,
    Misbehavior,
}

impl ThreatChannel {
    pub const ALL: [Self; 3] = [Self::InfoLeak, Self::PersonalMessage, Self::Misbehavior];

    /// Position of the channel in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::InfoLeak => 0,
            Self::PersonalMessage => 1,
            Self::Misbehavior => 2,
        }
    }

    /// Name of the matching section in [`crate::config::GameConfig`].
    #[must_use]
    pub const fn config_field(self) -> &'static str {
        match self {
            Self::InfoLeak => "info_leak",
            Self::PersonalMessage => "personal_message",
            Self::Misbehavior => "misbehavior",
        }
    }

    /// Sound played when an occurrence enters grace, if the channel has one.
    #[must_use]
    pub const fn spawn_cue(self) -> Option<SoundCue> {
        match self {
            Self::InfoLeak => None,
            Self::PersonalMessage => Some(SoundCue::NewThreatNotice),
            Self::Misbehavior => Some(SoundCue::MisbehaviorAlert),
        }
    }
}

/// Observable state of a threat occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ThreatPhase {
    #[default]
    Idle,
    Grace,
    Danger,
    Censored,
}

impl ThreatPhase {
    /// Censoring is only legal while an occurrence is live.
    #[must_use]
    pub const fn is_censorable(self) -> bool {
        matches!(self, Self::Grace | Self::Danger)
    }
}

/// Timer steps a machine schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatStep {
    Spawn,
    GraceElapsed,
    DangerElapsed,
    CensorElapsed,
    Drain,
}
