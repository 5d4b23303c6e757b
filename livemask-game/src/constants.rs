//! Centralized balance and tuning constants for Livemask game logic.
//!
//! These values seed `GameConfig::default()`. Keeping them together ensures
//! that balance changes go through code review rather than drifting across
//! modules. The danger-zone ratios and the early-mask bonus are heuristics
//! that the rest of the balance leans on; tune them here, not at call sites.

// Emotional value ---------------------------------------------------------
pub(crate) const EMOTIONAL_VALUE_MAX: f64 = 100.0;
pub(crate) const EMOTIONAL_VALUE_INITIAL: f64 = 100.0;
pub(crate) const SENTIMENT_EMOTIONAL_WEIGHT: f64 = 1.0;
pub(crate) const EMOTIONAL_FLUCTUATION_INTERVAL_MS: u64 = 3_000;
pub(crate) const EMOTIONAL_FLUCTUATION_JITTER: (f64, f64) = (0.7, 1.3);
pub(crate) const EMOTIONAL_FLUCTUATION_RANGE: (f64, f64) = (-0.5, 0.5);
pub(crate) const THREAT_RED_EMOTIONAL_PENALTY: f64 = 3.0;
pub(crate) const THREAT_FLASH_EMOTIONAL_PENALTY: f64 = 5.0;
pub(crate) const MISS_EMOTIONAL_PENALTY: f64 = 5.0;
pub(crate) const FALSE_POSITIVE_EMOTIONAL_PENALTY: f64 = 5.0;
pub(crate) const EARLY_MASK_EMOTIONAL_RECOVERY: f64 = 2.0;

// Viewers -----------------------------------------------------------------
pub(crate) const INITIAL_VIEWERS: f64 = 1_000.0;
pub(crate) const VIEWER_MISS_PENALTY: f64 = 50.0;
pub(crate) const FALSE_POSITIVE_VIEWER_PENALTY: f64 = 20.0;
pub(crate) const VIEWER_RATE_SMOOTH: f64 = 5.0;
pub(crate) const VIEWER_RATE_NORMAL: f64 = 1.0;
pub(crate) const VIEWER_RATE_LAGGY: f64 = -2.0;
pub(crate) const VIEWER_DIFFICULTY_CAP: f64 = 5_000.0;
pub(crate) const VIEWER_DIFFICULTY_SCALE: f64 = 2_000.0;
pub(crate) const VIEWER_DIFFICULTY_FLOOR: f64 = 0.5;

// Smoothness --------------------------------------------------------------
pub(crate) const SMOOTHNESS_NORMAL_TO_SMOOTH_MS: u64 = 4_000;

// Chat feed ---------------------------------------------------------------
pub(crate) const CHAT_MAX_MESSAGES: usize = 15;
pub(crate) const CHAT_SEED_MESSAGES: usize = 8;
pub(crate) const CHAT_NORMAL_INTERVAL_MS: (f64, f64) = (1_500.0, 2_500.0);
pub(crate) const CHAT_THREAT_BASE_INTERVAL_MS: f64 = 5_000.0;
pub(crate) const CHAT_THREAT_MIN_INTERVAL_MS: f64 = 2_000.0;
pub(crate) const CHAT_THREAT_JITTER: (f64, f64) = (0.8, 1.2);
pub(crate) const THREAT_RATIO_CAP_SECS: f64 = 180.0;
pub(crate) const THREAT_RATIO_INCREASE_RATE: f64 = 0.5;
pub(crate) const FLASHING_ZONE_RATIO: f64 = 0.15;
pub(crate) const RED_ZONE_RATIO: f64 = 0.5;
pub(crate) const MASK_PULSE_MS: u64 = 400;

// Threat machines ---------------------------------------------------------
pub(crate) const THREAT_MACHINE_JITTER: (f64, f64) = (0.7, 1.3);
pub(crate) const THREAT_MACHINE_SPEEDUP_FLOOR: f64 = 0.5;

pub(crate) const INFO_LEAK_BASE_INTERVAL_MS: f64 = 20_000.0;
pub(crate) const INFO_LEAK_MIN_INTERVAL_MS: f64 = 8_000.0;
pub(crate) const INFO_LEAK_GRACE_PERIOD_MS: u64 = 3_000;
pub(crate) const INFO_LEAK_DANGER_DURATION_MS: u64 = 4_000;
pub(crate) const INFO_LEAK_CENSOR_BLUR_MS: u64 = 1_500;
pub(crate) const INFO_LEAK_DANGER_EMOTIONAL_PENALTY: f64 = 5.0;
pub(crate) const INFO_LEAK_MISS_EMOTIONAL_PENALTY: f64 = 8.0;
pub(crate) const INFO_LEAK_MISS_VIEWER_PENALTY: f64 = 80.0;

pub(crate) const PERSONAL_MSG_BASE_INTERVAL_MS: f64 = 25_000.0;
pub(crate) const PERSONAL_MSG_MIN_INTERVAL_MS: f64 = 10_000.0;
pub(crate) const PERSONAL_MSG_GRACE_PERIOD_MS: u64 = 3_000;
pub(crate) const PERSONAL_MSG_DANGER_DURATION_MS: u64 = 4_000;
pub(crate) const PERSONAL_MSG_CENSOR_BLUR_MS: u64 = 1_500;
pub(crate) const PERSONAL_MSG_DANGER_EMOTIONAL_PENALTY: f64 = 4.0;
pub(crate) const PERSONAL_MSG_MISS_EMOTIONAL_PENALTY: f64 = 6.0;
pub(crate) const PERSONAL_MSG_MISS_VIEWER_PENALTY: f64 = 50.0;

pub(crate) const MISBEHAVIOR_EMOTION_THRESHOLD: f64 = 60.0;
pub(crate) const MISBEHAVIOR_CHECK_INTERVAL_MS: u64 = 2_000;
pub(crate) const MISBEHAVIOR_GRACE_PERIOD_MS: u64 = 2_500;
pub(crate) const MISBEHAVIOR_DANGER_DURATION_MS: u64 = 6_000;
pub(crate) const MISBEHAVIOR_CENSOR_BLUR_MS: u64 = 1_500;
pub(crate) const MISBEHAVIOR_DANGER_EMOTIONAL_PENALTY: f64 = 5.0;
pub(crate) const MISBEHAVIOR_MISS_EMOTIONAL_PENALTY: f64 = 5.0;
pub(crate) const MISBEHAVIOR_MISS_VIEWER_PENALTY: f64 = 60.0;
pub(crate) const MISBEHAVIOR_DRAIN_INTERVAL_MS: u64 = 200;
pub(crate) const MISBEHAVIOR_DRAIN_EMOTIONAL_PER_SEC: f64 = 2.0;
pub(crate) const MISBEHAVIOR_DRAIN_VIEWERS_PER_SEC: f64 = 10.0;

// Session and grading -----------------------------------------------------
pub(crate) const TARGET_DURATION_SECS: f64 = 300.0;
pub(crate) const HURT_SOUND_VARIANTS: u8 = 3;
pub(crate) const GRADE_S_ACCURACY: f64 = 90.0;
pub(crate) const GRADE_A_ACCURACY: f64 = 80.0;
pub(crate) const GRADE_B_ACCURACY: f64 = 65.0;
pub(crate) const GRADE_C_ACCURACY: f64 = 50.0;
pub(crate) const GRADE_A_SURVIVAL_SECS: f64 = 180.0;
pub(crate) const GRADE_B_SURVIVAL_SECS: f64 = 90.0;
