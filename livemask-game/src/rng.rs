//! Injectable randomness for spawn jitter, content selection, and probability checks.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;
use std::collections::VecDeque;
use std::fmt;

use crate::config::Band;
use crate::numbers::unit_to_index;

/// Source of uniform deviates in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    /// Uniform value inside `band`.
    fn in_band(&mut self, band: Band) -> f64 {
        band.lerp(self.next_unit())
    }

    /// Uniform index below `len`; returns 0 for empty collections.
    fn pick_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        unit_to_index(self.next_unit(), len)
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::wrap(SmallRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self::wrap(SmallRng::from_entropy())
    }
}

impl<R: RngCore> CountingRng<R> {
    pub const fn wrap(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RandomSource for CountingRng<R> {
    fn next_unit(&mut self) -> f64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.r#gen::<f64>()
    }
}

/// Replays a fixed sequence of deviates, then repeats the fallback value.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    values: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            values: values.into_iter().collect(),
            fallback,
        }
    }

    /// Source that always yields `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new([], value)
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.values
            .pop_front()
            .unwrap_or(self.fallback)
            .clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Randomness streams segregated by simulation domain.
pub struct RngStreams {
    chat: Box<dyn RandomSource>,
    threats: Box<dyn RandomSource>,
    economy: Box<dyn RandomSource>,
}

impl fmt::Debug for RngStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RngStreams").finish_non_exhaustive()
    }
}

impl RngStreams {
    /// Unseeded streams; the default for interactive play.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::from_sources(
            CountingRng::from_entropy(),
            CountingRng::from_entropy(),
            CountingRng::from_entropy(),
        )
    }

    /// Deterministic streams derived from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self::from_sources(
            CountingRng::seeded(derive_stream_seed(seed, b"chat")),
            CountingRng::seeded(derive_stream_seed(seed, b"threats")),
            CountingRng::seeded(derive_stream_seed(seed, b"economy")),
        )
    }

    #[must_use]
    pub fn from_sources(
        chat: impl RandomSource + 'static,
        threats: impl RandomSource + 'static,
        economy: impl RandomSource + 'static,
    ) -> Self {
        Self {
            chat: Box::new(chat),
            threats: Box::new(threats),
            economy: Box::new(economy),
        }
    }

    /// Every stream replays the same constant value.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::from_sources(
            ScriptedRandom::constant(value),
            ScriptedRandom::constant(value),
            ScriptedRandom::constant(value),
        )
    }

    pub fn chat(&mut self) -> &mut dyn RandomSource {
        self.chat.as_mut()
    }

    pub fn threats(&mut self) -> &mut dyn RandomSource {
        self.threats.as_mut()
    }

    pub fn economy(&mut self) -> &mut dyn RandomSource {
        self.economy.as_mut()
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
