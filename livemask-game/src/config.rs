//! Tuning configuration for a session.
//!
//! Every field has a default drawn from [`crate::constants`], so JSON overlays
//! only need to name the values they change.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::{
    CHAT_MAX_MESSAGES, CHAT_NORMAL_INTERVAL_MS, CHAT_SEED_MESSAGES, CHAT_THREAT_BASE_INTERVAL_MS,
    CHAT_THREAT_JITTER, CHAT_THREAT_MIN_INTERVAL_MS, EARLY_MASK_EMOTIONAL_RECOVERY,
    EMOTIONAL_FLUCTUATION_INTERVAL_MS, EMOTIONAL_FLUCTUATION_JITTER, EMOTIONAL_FLUCTUATION_RANGE,
    EMOTIONAL_VALUE_INITIAL, EMOTIONAL_VALUE_MAX, FALSE_POSITIVE_EMOTIONAL_PENALTY,
    FALSE_POSITIVE_VIEWER_PENALTY, FLASHING_ZONE_RATIO, INFO_LEAK_BASE_INTERVAL_MS,
    INFO_LEAK_CENSOR_BLUR_MS, INFO_LEAK_DANGER_DURATION_MS, INFO_LEAK_DANGER_EMOTIONAL_PENALTY,
    INFO_LEAK_GRACE_PERIOD_MS, INFO_LEAK_MIN_INTERVAL_MS, INFO_LEAK_MISS_EMOTIONAL_PENALTY,
    INFO_LEAK_MISS_VIEWER_PENALTY, INITIAL_VIEWERS, MASK_PULSE_MS, MISBEHAVIOR_CENSOR_BLUR_MS,
    MISBEHAVIOR_CHECK_INTERVAL_MS, MISBEHAVIOR_DANGER_DURATION_MS,
    MISBEHAVIOR_DANGER_EMOTIONAL_PENALTY, MISBEHAVIOR_DRAIN_EMOTIONAL_PER_SEC,
    MISBEHAVIOR_DRAIN_INTERVAL_MS, MISBEHAVIOR_DRAIN_VIEWERS_PER_SEC,
    MISBEHAVIOR_EMOTION_THRESHOLD, MISBEHAVIOR_GRACE_PERIOD_MS, MISBEHAVIOR_MISS_EMOTIONAL_PENALTY,
    MISBEHAVIOR_MISS_VIEWER_PENALTY, MISS_EMOTIONAL_PENALTY, PERSONAL_MSG_BASE_INTERVAL_MS,
    PERSONAL_MSG_CENSOR_BLUR_MS, PERSONAL_MSG_DANGER_DURATION_MS,
    PERSONAL_MSG_DANGER_EMOTIONAL_PENALTY, PERSONAL_MSG_GRACE_PERIOD_MS,
    PERSONAL_MSG_MIN_INTERVAL_MS, PERSONAL_MSG_MISS_EMOTIONAL_PENALTY,
    PERSONAL_MSG_MISS_VIEWER_PENALTY, RED_ZONE_RATIO, SENTIMENT_EMOTIONAL_WEIGHT,
    SMOOTHNESS_NORMAL_TO_SMOOTH_MS, TARGET_DURATION_SECS, THREAT_FLASH_EMOTIONAL_PENALTY,
    THREAT_MACHINE_JITTER, THREAT_MACHINE_SPEEDUP_FLOOR, THREAT_RATIO_CAP_SECS,
    THREAT_RATIO_INCREASE_RATE, THREAT_RED_EMOTIONAL_PENALTY, VIEWER_DIFFICULTY_CAP,
    VIEWER_DIFFICULTY_FLOOR, VIEWER_DIFFICULTY_SCALE, VIEWER_MISS_PENALTY, VIEWER_RATE_LAGGY,
    VIEWER_RATE_NORMAL, VIEWER_RATE_SMOOTH,
};
use crate::threats::ThreatChannel;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} band inverted (min {min:.2} > max {max:.2})")]
    BandInverted {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

/// Closed numeric interval used for jitter multipliers and random ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    const fn from_pair(pair: (f64, f64)) -> Self {
        Self::new(pair.0, pair.1)
    }

    /// Linear interpolation across the band for a unit roll in `[0, 1)`.
    #[must_use]
    pub fn lerp(self, unit: f64) -> f64 {
        self.min + unit * (self.max - self.min)
    }

    fn validate(self, field: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::BandInverted {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionalCfg {
    pub max: f64,
    pub initial: f64,
    pub sentiment_weight: f64,
    pub fluctuation_interval_ms: u64,
    pub fluctuation_jitter: Band,
    pub fluctuation_range: Band,
    pub red_penalty: f64,
    pub flash_penalty: f64,
    pub miss_penalty: f64,
    pub false_positive_penalty: f64,
    pub early_mask_recovery: f64,
}

impl Default for EmotionalCfg {
    fn default() -> Self {
        Self {
            max: EMOTIONAL_VALUE_MAX,
            initial: EMOTIONAL_VALUE_INITIAL,
            sentiment_weight: SENTIMENT_EMOTIONAL_WEIGHT,
            fluctuation_interval_ms: EMOTIONAL_FLUCTUATION_INTERVAL_MS,
            fluctuation_jitter: Band::from_pair(EMOTIONAL_FLUCTUATION_JITTER),
            fluctuation_range: Band::from_pair(EMOTIONAL_FLUCTUATION_RANGE),
            red_penalty: THREAT_RED_EMOTIONAL_PENALTY,
            flash_penalty: THREAT_FLASH_EMOTIONAL_PENALTY,
            miss_penalty: MISS_EMOTIONAL_PENALTY,
            false_positive_penalty: FALSE_POSITIVE_EMOTIONAL_PENALTY,
            early_mask_recovery: EARLY_MASK_EMOTIONAL_RECOVERY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerCfg {
    pub initial: f64,
    pub miss_penalty: f64,
    pub false_positive_penalty: f64,
    pub rate_smooth: f64,
    pub rate_normal: f64,
    pub rate_laggy: f64,
    pub difficulty_cap: f64,
    pub difficulty_scale: f64,
    pub difficulty_floor: f64,
}

impl Default for ViewerCfg {
    fn default() -> Self {
        Self {
            initial: INITIAL_VIEWERS,
            miss_penalty: VIEWER_MISS_PENALTY,
            false_positive_penalty: FALSE_POSITIVE_VIEWER_PENALTY,
            rate_smooth: VIEWER_RATE_SMOOTH,
            rate_normal: VIEWER_RATE_NORMAL,
            rate_laggy: VIEWER_RATE_LAGGY,
            difficulty_cap: VIEWER_DIFFICULTY_CAP,
            difficulty_scale: VIEWER_DIFFICULTY_SCALE,
            difficulty_floor: VIEWER_DIFFICULTY_FLOOR,
        }
    }
}

impl ViewerCfg {
    /// Chat speed multiplier driven by the current viewer count.
    #[must_use]
    pub fn speed_multiplier(&self, viewers: f64) -> f64 {
        let viewers = viewers.min(self.difficulty_cap);
        let multiplier = 1.0 + (viewers - self.initial) / self.difficulty_scale;
        multiplier.max(self.difficulty_floor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothnessCfg {
    pub normal_to_smooth_ms: u64,
}

impl Default for SmoothnessCfg {
    fn default() -> Self {
        Self {
            normal_to_smooth_ms: SMOOTHNESS_NORMAL_TO_SMOOTH_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCfg {
    pub max_messages: usize,
    pub seed_messages: usize,
    pub normal_interval_ms: Band,
    pub threat_base_interval_ms: f64,
    pub threat_min_interval_ms: f64,
    pub threat_jitter: Band,
    pub threat_ratio_cap_secs: f64,
    pub threat_ratio_increase_rate: f64,
    pub flashing_zone_ratio: f64,
    pub red_zone_ratio: f64,
    pub pulse_ms: u64,
}

impl Default for ChatCfg {
    fn default() -> Self {
        Self {
            max_messages: CHAT_MAX_MESSAGES,
            seed_messages: CHAT_SEED_MESSAGES,
            normal_interval_ms: Band::from_pair(CHAT_NORMAL_INTERVAL_MS),
            threat_base_interval_ms: CHAT_THREAT_BASE_INTERVAL_MS,
            threat_min_interval_ms: CHAT_THREAT_MIN_INTERVAL_MS,
            threat_jitter: Band::from_pair(CHAT_THREAT_JITTER),
            threat_ratio_cap_secs: THREAT_RATIO_CAP_SECS,
            threat_ratio_increase_rate: THREAT_RATIO_INCREASE_RATE,
            flashing_zone_ratio: FLASHING_ZONE_RATIO,
            red_zone_ratio: RED_ZONE_RATIO,
            pulse_ms: MASK_PULSE_MS,
        }
    }
}

impl ChatCfg {
    /// Threat ratio multiplier; threats get proportionally more frequent until the cap time.
    #[must_use]
    pub fn threat_ratio(&self, elapsed_secs: f64) -> f64 {
        let capped = elapsed_secs.clamp(0.0, self.threat_ratio_cap_secs);
        1.0 + (capped / 60.0) * self.threat_ratio_increase_rate
    }
}

/// Spawn gate for the misbehavior channel: only fires below an emotional threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionGateCfg {
    pub threshold: f64,
    pub check_interval_ms: u64,
}

/// Continuous drain applied while a machine sits in its danger window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainCfg {
    pub interval_ms: u64,
    pub emotional_per_sec: f64,
    pub viewers_per_sec: f64,
}

/// Timing and payout table for one threat state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatMachineCfg {
    pub base_interval_ms: f64,
    pub min_interval_ms: f64,
    #[serde(default = "ThreatMachineCfg::default_jitter")]
    pub jitter: Band,
    pub grace_ms: u64,
    pub danger_ms: u64,
    pub censor_blur_ms: u64,
    pub danger_emotional_penalty: f64,
    pub miss_emotional_penalty: f64,
    pub miss_viewer_penalty: f64,
    #[serde(default)]
    pub emotion_gate: Option<EmotionGateCfg>,
    #[serde(default)]
    pub drain: Option<DrainCfg>,
}

impl ThreatMachineCfg {
    const fn default_jitter() -> Band {
        Band::from_pair(THREAT_MACHINE_JITTER)
    }

    #[must_use]
    pub fn info_leak() -> Self {
        Self {
            base_interval_ms: INFO_LEAK_BASE_INTERVAL_MS,
            min_interval_ms: INFO_LEAK_MIN_INTERVAL_MS,
            jitter: Self::default_jitter(),
            grace_ms: INFO_LEAK_GRACE_PERIOD_MS,
            danger_ms: INFO_LEAK_DANGER_DURATION_MS,
            censor_blur_ms: INFO_LEAK_CENSOR_BLUR_MS,
            danger_emotional_penalty: INFO_LEAK_DANGER_EMOTIONAL_PENALTY,
            miss_emotional_penalty: INFO_LEAK_MISS_EMOTIONAL_PENALTY,
            miss_viewer_penalty: INFO_LEAK_MISS_VIEWER_PENALTY,
            emotion_gate: None,
            drain: None,
        }
    }

    #[must_use]
    pub fn personal_message() -> Self {
        Self {
            base_interval_ms: PERSONAL_MSG_BASE_INTERVAL_MS,
            min_interval_ms: PERSONAL_MSG_MIN_INTERVAL_MS,
            jitter: Self::default_jitter(),
            grace_ms: PERSONAL_MSG_GRACE_PERIOD_MS,
            danger_ms: PERSONAL_MSG_DANGER_DURATION_MS,
            censor_blur_ms: PERSONAL_MSG_CENSOR_BLUR_MS,
            danger_emotional_penalty: PERSONAL_MSG_DANGER_EMOTIONAL_PENALTY,
            miss_emotional_penalty: PERSONAL_MSG_MISS_EMOTIONAL_PENALTY,
            miss_viewer_penalty: PERSONAL_MSG_MISS_VIEWER_PENALTY,
            emotion_gate: None,
            drain: None,
        }
    }

    #[must_use]
    pub fn misbehavior() -> Self {
        Self {
            base_interval_ms: 0.0,
            min_interval_ms: 0.0,
            jitter: Self::default_jitter(),
            grace_ms: MISBEHAVIOR_GRACE_PERIOD_MS,
            danger_ms: MISBEHAVIOR_DANGER_DURATION_MS,
            censor_blur_ms: MISBEHAVIOR_CENSOR_BLUR_MS,
            danger_emotional_penalty: MISBEHAVIOR_DANGER_EMOTIONAL_PENALTY,
            miss_emotional_penalty: MISBEHAVIOR_MISS_EMOTIONAL_PENALTY,
            miss_viewer_penalty: MISBEHAVIOR_MISS_VIEWER_PENALTY,
            emotion_gate: Some(EmotionGateCfg {
                threshold: MISBEHAVIOR_EMOTION_THRESHOLD,
                check_interval_ms: MISBEHAVIOR_CHECK_INTERVAL_MS,
            }),
            drain: Some(DrainCfg {
                interval_ms: MISBEHAVIOR_DRAIN_INTERVAL_MS,
                emotional_per_sec: MISBEHAVIOR_DRAIN_EMOTIONAL_PER_SEC,
                viewers_per_sec: MISBEHAVIOR_DRAIN_VIEWERS_PER_SEC,
            }),
        }
    }

    /// Delay before the next spawn attempt given the current speedup and a unit roll.
    #[must_use]
    pub fn spawn_delay_ms(&self, speedup: f64, unit: f64) -> f64 {
        let speedup = speedup.max(THREAT_MACHINE_SPEEDUP_FLOOR);
        let interval = (self.base_interval_ms / speedup).max(self.min_interval_ms);
        interval * self.jitter.lerp(unit)
    }

    fn validate(&self, channel: ThreatChannel) -> Result<(), ConfigError> {
        let field = channel.config_field();
        if self.grace_ms == 0 {
            return Err(ConfigError::MinViolation {
                field,
                min: 1.0,
                value: 0.0,
            });
        }
        self.jitter.validate(field)?;
        if let Some(gate) = &self.emotion_gate {
            if gate.threshold <= 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: f64::MIN_POSITIVE,
                    value: gate.threshold,
                });
            }
            if gate.check_interval_ms == 0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 1.0,
                    value: 0.0,
                });
            }
        } else if self.base_interval_ms <= 0.0 {
            return Err(ConfigError::MinViolation {
                field,
                min: f64::MIN_POSITIVE,
                value: self.base_interval_ms,
            });
        }
        if let Some(drain) = &self.drain
            && drain.interval_ms == 0
        {
            return Err(ConfigError::MinViolation {
                field,
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    pub target_duration_secs: f64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            target_duration_secs: TARGET_DURATION_SECS,
        }
    }
}

/// Complete tuning set for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub emotional: EmotionalCfg,
    pub viewers: ViewerCfg,
    pub smoothness: SmoothnessCfg,
    pub chat: ChatCfg,
    pub session: SessionCfg,
    pub info_leak: ThreatMachineCfg,
    pub personal_message: ThreatMachineCfg,
    pub misbehavior: ThreatMachineCfg,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            emotional: EmotionalCfg::default(),
            viewers: ViewerCfg::default(),
            smoothness: SmoothnessCfg::default(),
            chat: ChatCfg::default(),
            session: SessionCfg::default(),
            info_leak: ThreatMachineCfg::info_leak(),
            personal_message: ThreatMachineCfg::personal_message(),
            misbehavior: ThreatMachineCfg::misbehavior(),
        }
    }
}

impl GameConfig {
    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load a configuration overlay from JSON; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the result fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let overlay: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        // Threat channels have per-channel defaults, so merge onto a full document
        // instead of relying on field-level serde defaults.
        let mut merged =
            serde_json::to_value(Self::default()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        merge_json(&mut merged, overlay);
        let config: Self =
            serde_json::from_value(merged).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Payout and timing table for a threat channel.
    #[must_use]
    pub const fn machine(&self, channel: ThreatChannel) -> &ThreatMachineCfg {
        match channel {
            ThreatChannel::InfoLeak => &self.info_leak,
            ThreatChannel::PersonalMessage => &self.personal_message,
            ThreatChannel::Misbehavior => &self.misbehavior,
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let emotional = &self.emotional;
        if emotional.max <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "emotional.max",
                min: f64::MIN_POSITIVE,
                value: emotional.max,
            });
        }
        if emotional.initial <= 0.0 || emotional.initial > emotional.max {
            return Err(ConfigError::RangeViolation {
                field: "emotional.initial",
                min: 0.0,
                max: emotional.max,
                value: emotional.initial,
            });
        }
        if emotional.fluctuation_interval_ms == 0 {
            return Err(ConfigError::MinViolation {
                field: "emotional.fluctuation_interval_ms",
                min: 1.0,
                value: 0.0,
            });
        }
        emotional
            .fluctuation_jitter
            .validate("emotional.fluctuation_jitter")?;
        emotional
            .fluctuation_range
            .validate("emotional.fluctuation_range")?;

        if self.viewers.initial < 0.0 {
            return Err(ConfigError::MinViolation {
                field: "viewers.initial",
                min: 0.0,
                value: self.viewers.initial,
            });
        }
        if self.viewers.difficulty_scale <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "viewers.difficulty_scale",
                min: f64::MIN_POSITIVE,
                value: self.viewers.difficulty_scale,
            });
        }
        if self.viewers.difficulty_floor <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "viewers.difficulty_floor",
                min: f64::MIN_POSITIVE,
                value: self.viewers.difficulty_floor,
            });
        }

        let chat = &self.chat;
        if chat.max_messages == 0 {
            return Err(ConfigError::MinViolation {
                field: "chat.max_messages",
                min: 1.0,
                value: 0.0,
            });
        }
        chat.normal_interval_ms.validate("chat.normal_interval_ms")?;
        chat.threat_jitter.validate("chat.threat_jitter")?;
        if chat.normal_interval_ms.min <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "chat.normal_interval_ms",
                min: f64::MIN_POSITIVE,
                value: chat.normal_interval_ms.min,
            });
        }
        if chat.threat_min_interval_ms <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "chat.threat_min_interval_ms",
                min: f64::MIN_POSITIVE,
                value: chat.threat_min_interval_ms,
            });
        }
        for (field, value) in [
            ("chat.flashing_zone_ratio", chat.flashing_zone_ratio),
            ("chat.red_zone_ratio", chat.red_zone_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }

        for channel in ThreatChannel::ALL {
            self.machine(channel).validate(channel)?;
        }
        Ok(())
    }
}

/// Recursively overwrite `base` with the keys present in `overlay`.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
