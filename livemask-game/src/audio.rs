//! Fire-and-forget sound capability consumed by the session.
use serde::{Deserialize, Serialize};

/// Named sound effects the core asks the host to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    Click,
    Correct,
    Incorrect,
    /// One of several hurt variants, numbered from 1.
    Hurt(u8),
    NewThreatNotice,
    MisbehaviorAlert,
    GameOver,
    BackgroundStart,
    BackgroundStop,
}

impl SoundCue {
    /// Asset file the host is expected to map this cue to.
    #[must_use]
    pub fn asset_name(self) -> String {
        match self {
            Self::Click => "generic_click.mp3".to_string(),
            Self::Correct => "correct_action.mp3".to_string(),
            Self::Incorrect => "incorrect_action.mp3".to_string(),
            Self::Hurt(variant) => format!("hurt_{variant}.mp3"),
            Self::NewThreatNotice => "discord_notification.mp3".to_string(),
            Self::MisbehaviorAlert => "angry.mp3".to_string(),
            Self::GameOver => "game_over.mp3".to_string(),
            Self::BackgroundStart | Self::BackgroundStop => "bgm.mp3".to_string(),
        }
    }
}

/// Host audio surface. Implementations must swallow their own failures.
pub trait AudioSink {
    fn play(&mut self, cue: SoundCue);
}

/// Discards every cue; used by headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: SoundCue) {}
}

/// Records cues in order, for tests and the harness.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    pub cues: Vec<SoundCue>,
}

impl RecordingAudio {
    #[must_use]
    pub fn count(&self, cue: SoundCue) -> usize {
        self.cues.iter().filter(|c| **c == cue).count()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }
}
