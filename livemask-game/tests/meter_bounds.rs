use std::collections::HashSet;

use livemask_game::{
    Economy, GameConfig, GamePhase, Meters, RngStreams, Sentiment, Session, ThreatChannel,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn random_op(economy: &mut Economy, rng: &mut ChaCha20Rng) {
    let channel = ThreatChannel::ALL[rng.gen_range(0..3)];
    match rng.gen_range(0..14) {
        0 => economy.apply_sentiment(Sentiment::Positive),
        1 => economy.apply_sentiment(Sentiment::Negative),
        2 => economy.penalize_threat_red(),
        3 => economy.penalize_threat_flash(),
        4 => economy.missed_threat(),
        5 => economy.penalize_channel_danger(channel),
        6 => economy.missed_channel_threat(channel),
        7 => economy.drain_channel_danger(channel, rng.r#gen::<f64>()),
        8 => economy.mask_threat(rng.r#gen::<f64>()),
        9 => economy.false_positive(),
        10 => economy.update_smoothness(rng.gen_range(0..500), rng.gen_bool(0.2), rng.gen_bool(0.3)),
        11 => economy.update_viewers(rng.gen_range(0..2_000)),
        12 => economy.fluctuate_emotional_value(rng.r#gen::<f64>()),
        _ => economy.count_masked_threat(),
    }
}

#[test]
fn emotional_value_stays_in_range_for_random_sequences() {
    let cfg = GameConfig::default();
    for seed in 0..64_u64 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut economy = Economy::new(cfg.clone());
        economy.begin(0);
        let mut over_at = None;
        for step in 0..400 {
            economy.sync_clock(step * 10);
            let before = economy.snapshot();
            random_op(&mut economy, &mut rng);
            let value = economy.emotional_value();
            assert!(
                (0.0..=cfg.emotional.max).contains(&value),
                "seed {seed} step {step}: emotional {value} out of range"
            );
            assert!(economy.viewers() >= 0.0);
            assert!(economy.peak_viewers() >= economy.viewers());

            if before.phase == GamePhase::GameOver {
                assert_eq!(economy.snapshot(), before, "mutation after game over");
            }
            if economy.phase() == GamePhase::GameOver && over_at.is_none() {
                over_at = Some(step);
                assert!(value.abs() < f64::EPSILON);
            }
        }
    }
}

#[test]
fn seeded_sessions_hold_invariants_under_a_random_player() {
    for seed in 0..12_u64 {
        let mut player = ChaCha20Rng::seed_from_u64(seed ^ 0x5eed);
        let mut session = Session::with_seed(GameConfig::default(), seed);
        session.start();
        let mut flashed = HashSet::new();
        let mut reddened = HashSet::new();
        let mut masked = HashSet::new();

        for _ in 0..6_000 {
            session.advance(16);
            let max = session.config().emotional.max;
            let value = session.economy().emotional_value();
            assert!((0.0..=max).contains(&value));

            for message in session.chat().messages() {
                if flashed.contains(&message.id) {
                    assert!(message.flash_triggered, "flash flag reverted");
                }
                if reddened.contains(&message.id) {
                    assert!(message.red_triggered, "red flag reverted");
                }
                if masked.contains(&message.id) {
                    assert!(message.is_masked, "mask reverted");
                }
                if message.flash_triggered {
                    flashed.insert(message.id);
                    assert!(message.red_triggered);
                }
                if message.red_triggered {
                    reddened.insert(message.id);
                }
                if message.is_masked {
                    masked.insert(message.id);
                }
            }

            if !session.is_playing() {
                break;
            }
            if player.gen_bool(0.02) {
                let ids: Vec<u64> = session.chat().messages().map(|m| m.id).collect();
                if !ids.is_empty() {
                    session.mask_message(ids[player.gen_range(0..ids.len())]);
                }
            }
            if player.gen_bool(0.01) {
                session.censor(ThreatChannel::ALL[player.gen_range(0..3)]);
            }
        }

        if session.phase() == GamePhase::GameOver {
            assert_eq!(session.pending_timers(), 0);
        }
    }
}

#[test]
fn same_seed_same_run() {
    let run = |seed| {
        let mut session = Session::new(
            GameConfig::default(),
            RngStreams::from_user_seed(seed),
            livemask_game::NullAudio,
        );
        session.start();
        for _ in 0..2_000 {
            session.advance(16);
        }
        session.snapshot()
    };
    assert_eq!(run(77), run(77));
}
