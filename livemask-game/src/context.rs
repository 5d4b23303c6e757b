//! Borrowed collaborators handed to components while they run a callback.
use crate::audio::AudioSink;
use crate::economy::Meters;
use crate::rng::RandomSource;
use crate::timers::TimerQueue;

/// Everything a component may touch outside its own state during one callback.
///
/// The session builds a fresh context for each dispatch from disjoint fields,
/// so components never hold references to each other.
pub struct Ctx<'a> {
    pub meters: &'a mut dyn Meters,
    pub timers: &'a mut TimerQueue,
    pub rng: &'a mut dyn RandomSource,
    pub audio: &'a mut dyn AudioSink,
}

impl<'a> Ctx<'a> {
    pub fn new(
        meters: &'a mut dyn Meters,
        timers: &'a mut TimerQueue,
        rng: &'a mut dyn RandomSource,
        audio: &'a mut dyn AudioSink,
    ) -> Self {
        Self {
            meters,
            timers,
            rng,
            audio,
        }
    }
}
