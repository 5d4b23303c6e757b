use std::collections::BTreeMap;

use livemask_game::{GameConfig, GamePhase, Grade, RunSummary, Session, ThreatChannel, ThreatTally};
use serde::Serialize;

use super::policy::{PlayerPolicy, PolicyKind};

/// Salt mixed into the run seed before seeding a policy's own RNG.
const POLICY_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Everything needed to run a batch of headless sessions.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub config: GameConfig,
    pub seeds: Vec<u64>,
    pub policies: Vec<PolicyKind>,
    pub iterations: usize,
    pub frame_ms: u64,
    /// Hard stop for runs that never reach game over.
    pub max_secs: u64,
}

/// Outcome of one simulated run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub seed: u64,
    pub run_seed: u64,
    pub iteration: usize,
    pub policy: PolicyKind,
    pub frames: u64,
    pub game_over: bool,
    pub summary: RunSummary,
    pub threat_tallies: Vec<(ThreatChannel, ThreatTally)>,
}

/// Per-policy roll-up across every seed and iteration.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyAggregate {
    pub policy: PolicyKind,
    pub runs: usize,
    pub game_overs: usize,
    pub survived_target: usize,
    pub mean_survival_secs: f64,
    pub mean_accuracy_pct: f64,
    pub mean_final_viewers: f64,
    pub grades: BTreeMap<Grade, usize>,
}

impl PolicyAggregate {
    #[must_use]
    pub fn game_over_rate(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        ratio(self.game_overs, self.runs)
    }
}

/// Derive the session seed for one iteration of a base seed.
#[must_use]
pub const fn run_seed(seed: u64, iteration: usize) -> u64 {
    seed.wrapping_add(iteration as u64)
}

/// Run one session to game over or the time limit.
#[must_use]
pub fn run_once(
    config: &GameConfig,
    seed: u64,
    iteration: usize,
    policy: PolicyKind,
    frame_ms: u64,
    max_secs: u64,
) -> RunRecord {
    let session_seed = run_seed(seed, iteration);
    let mut session = Session::with_seed(config.clone(), session_seed);
    let mut player = policy.create_policy(session_seed ^ POLICY_SEED_SALT);
    let limit_ms = max_secs.saturating_mul(1_000);
    let frame_ms = frame_ms.max(1);

    session.start();
    while session.is_playing() && session.now_ms() < limit_ms {
        session.advance(frame_ms);
        if !session.is_playing() {
            break;
        }
        player.act(&mut session);
    }

    let game_over = session.phase() == GamePhase::GameOver;
    if session.is_playing() {
        session.stop();
    }

    let summary = session.summary();
    log::debug!(
        "seed {seed} iter {iteration} policy {}: {:.1}s grade {} ({})",
        player.name(),
        summary.survival_secs,
        summary.grade,
        if game_over { "game over" } else { "time limit" }
    );

    RunRecord {
        seed,
        run_seed: session_seed,
        iteration,
        policy,
        frames: session.frames(),
        game_over,
        summary,
        threat_tallies: ThreatChannel::ALL
            .iter()
            .map(|&channel| (channel, session.machine(channel).tally()))
            .collect(),
    }
}

/// Run every (policy, seed, iteration) combination in the plan.
pub fn run_plan(plan: &SimulationPlan, mut on_record: impl FnMut(&RunRecord)) -> Vec<RunRecord> {
    let mut records = Vec::with_capacity(plan.policies.len() * plan.seeds.len() * plan.iterations);
    for &policy in &plan.policies {
        for &seed in &plan.seeds {
            for iteration in 0..plan.iterations {
                let record = run_once(
                    &plan.config,
                    seed,
                    iteration,
                    policy,
                    plan.frame_ms,
                    plan.max_secs,
                );
                on_record(&record);
                records.push(record);
            }
        }
    }
    records
}

/// Roll records up per policy, keeping the order policies first appear in.
#[must_use]
pub fn aggregate(records: &[RunRecord]) -> Vec<PolicyAggregate> {
    let mut order: Vec<PolicyKind> = Vec::new();
    for record in records {
        if !order.contains(&record.policy) {
            order.push(record.policy);
        }
    }

    order
        .into_iter()
        .map(|policy| {
            let runs: Vec<&RunRecord> = records.iter().filter(|r| r.policy == policy).collect();
            let count = runs.len();
            let mut grades = BTreeMap::new();
            for run in &runs {
                *grades.entry(run.summary.grade).or_insert(0) += 1;
            }
            PolicyAggregate {
                policy,
                runs: count,
                game_overs: runs.iter().filter(|r| r.game_over).count(),
                survived_target: runs.iter().filter(|r| r.summary.survived_target).count(),
                mean_survival_secs: mean(runs.iter().map(|r| r.summary.survival_secs)),
                mean_accuracy_pct: mean(runs.iter().map(|r| r.summary.accuracy_pct)),
                mean_final_viewers: mean(runs.iter().map(|r| r.summary.final_viewers)),
                grades,
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = count as f64;
    sum / count
}
