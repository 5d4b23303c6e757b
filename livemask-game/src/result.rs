use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    GRADE_A_ACCURACY, GRADE_A_SURVIVAL_SECS, GRADE_B_ACCURACY, GRADE_B_SURVIVAL_SECS,
    GRADE_C_ACCURACY, GRADE_S_ACCURACY,
};
use crate::economy::{Economy, Meters};

/// Letter grade awarded at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    /// Grade from accuracy percentage and survival time.
    ///
    /// `S` needs the full target duration; `A` and `B` need a minimum survival.
    #[must_use]
    pub fn from_run(accuracy_pct: f64, survival_secs: f64, target_secs: f64) -> Self {
        if accuracy_pct >= GRADE_S_ACCURACY && survival_secs >= target_secs {
            Self::S
        } else if accuracy_pct >= GRADE_A_ACCURACY && survival_secs >= GRADE_A_SURVIVAL_SECS {
            Self::A
        } else if accuracy_pct >= GRADE_B_ACCURACY && survival_secs >= GRADE_B_SURVIVAL_SECS {
            Self::B
        } else if accuracy_pct >= GRADE_C_ACCURACY {
            Self::C
        } else {
            Self::D
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived statistics of a finished (or in-progress) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub survival_secs: f64,
    pub survived_target: bool,
    pub final_emotional: f64,
    pub final_viewers: f64,
    pub peak_viewers: f64,
    pub threats_masked: u32,
    pub threats_expired: u32,
    pub false_positives: u32,
    pub accuracy_pct: f64,
    pub average_reaction_ms: Option<f64>,
    pub grade: Grade,
}

impl RunSummary {
    #[must_use]
    pub fn from_economy(economy: &Economy) -> Self {
        let counters = economy.counters();
        let survival_secs = economy.survival_secs();
        let target_secs = economy.config().session.target_duration_secs;
        let accuracy_pct = economy.accuracy_pct();
        Self {
            survival_secs,
            survived_target: survival_secs >= target_secs,
            final_emotional: economy.emotional_value(),
            final_viewers: economy.viewers(),
            peak_viewers: economy.peak_viewers(),
            threats_masked: counters.threats_masked,
            threats_expired: counters.threats_expired,
            false_positives: counters.false_positives,
            accuracy_pct,
            average_reaction_ms: economy.average_reaction_ms(),
            grade: Grade::from_run(accuracy_pct, survival_secs, target_secs),
        }
    }
}
