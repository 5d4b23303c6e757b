//! Livemask Game Engine
//!
//! Platform-agnostic core of a live-stream moderation mini-game. The player
//! masks dangerous chat messages and censors timed threats before viewers see
//! them; two meters (emotional value and viewers) track how well that goes.
//!
//! Everything runs on one cooperative clock: the host calls
//! [`Session::advance`] once per frame and the session fires due timers in
//! order before stepping the frame. No rendering, audio playback, or platform
//! dependencies live here; audio is requested through [`AudioSink`].

pub mod audio;
pub mod chat;
pub mod config;
mod constants;
pub mod context;
pub mod economy;
pub mod numbers;
pub mod result;
pub mod rng;
pub mod session;
pub mod threats;
pub mod tick;
pub mod timers;

// Re-export commonly used types
pub use audio::{AudioSink, NullAudio, RecordingAudio, SoundCue};
pub use chat::{ChatFeed, ChatMessage, MessageKind, Pulse, ThreatCategory, Zone, ZoneReport};
pub use config::{
    Band, ChatCfg, ConfigError, DrainCfg, EmotionGateCfg, EmotionalCfg, GameConfig, SessionCfg,
    SmoothnessCfg, ThreatMachineCfg, ViewerCfg,
};
pub use context::Ctx;
pub use economy::{
    Economy, EconomyEvent, EconomySnapshot, GamePhase, Meters, RunCounters, Sentiment, Smoothness,
};
pub use result::{Grade, RunSummary};
pub use rng::{CountingRng, RandomSource, RngStreams, ScriptedRandom};
pub use session::{MaskOutcome, Session, SessionSnapshot, ThreatSnapshot};
pub use threats::{ThreatChannel, ThreatMachine, ThreatPhase, ThreatStep, ThreatTally};
pub use tick::{TickDriver, TickReport};
pub use timers::{TimerEvent, TimerHandle, TimerQueue};
