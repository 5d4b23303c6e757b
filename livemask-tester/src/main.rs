mod logic;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use livemask_game::GameConfig;
use logic::{
    PolicyAggregate, PolicyKind, RunRecord, SimulationPlan, aggregate, resolve_seed_inputs,
    run_plan, split_csv,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "livemask-tester", version)]
#[command(about = "Headless balance simulations for the Livemask moderation game")]
struct Args {
    /// Seeds to run (comma-separated integers or start..end ranges)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per seed and policy
    #[arg(long, default_value_t = 5)]
    iterations: usize,

    /// Player policies to simulate (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = PolicyKind::ALL)]
    policies: Vec<PolicyKind>,

    /// Simulated frame length in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Stop runs after this many seconds (defaults to the target duration)
    #[arg(long)]
    max_secs: Option<u64>,

    /// JSON config overlay; absent fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fail when any policy's game-over rate exceeds this fraction
    #[arg(long)]
    max_game_over_rate: Option<f64>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.report == ReportFormat::Console && args.output.is_none() {
        announce_banner();
    }
    if args.output.is_some() {
        colored::control::set_override(false);
    }

    let plan = build_plan(&args)?;
    log::info!(
        "running {} seed(s) x {} iteration(s) x {} policy(ies)",
        plan.seeds.len(),
        plan.iterations,
        plan.policies.len()
    );

    let start_time = Instant::now();
    let verbose = args.verbose;
    let records = run_plan(&plan, |record| {
        if verbose {
            eprintln!(
                "  {} seed {} iter {}: {:.1}s, grade {}",
                record.policy, record.seed, record.iteration, record.summary.survival_secs,
                record.summary.grade
            );
        }
    });
    let aggregates = aggregate(&records);

    write_reports(&args, &aggregates, &records, start_time)?;
    check_game_over_rate(args.max_game_over_rate, &aggregates)
}

fn announce_banner() {
    println!("{}", "📺 Livemask Balance Tester".bright_cyan().bold());
    println!("{}", "==========================".cyan());
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default_config());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    GameConfig::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn build_plan(args: &Args) -> Result<SimulationPlan> {
    if args.iterations == 0 {
        bail!("--iterations must be at least 1");
    }
    if args.policies.is_empty() {
        bail!("--policies must name at least one policy");
    }
    let config = load_config(args.config.as_deref())?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let max_secs = args
        .max_secs
        .unwrap_or_else(|| default_max_secs(config.session.target_duration_secs));

    Ok(SimulationPlan {
        config,
        seeds,
        policies: args.policies.clone(),
        iterations: args.iterations,
        frame_ms: args.frame_ms,
        max_secs,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn default_max_secs(target_secs: f64) -> u64 {
    target_secs.max(1.0).ceil() as u64
}

fn check_game_over_rate(limit: Option<f64>, aggregates: &[PolicyAggregate]) -> Result<()> {
    let Some(limit) = limit else {
        return Ok(());
    };
    let failing: Vec<String> = aggregates
        .iter()
        .filter(|a| a.game_over_rate() > limit)
        .map(|a| format!("{} ({:.1}%)", a.policy, a.game_over_rate() * 100.0))
        .collect();
    if failing.is_empty() {
        Ok(())
    } else {
        bail!(
            "game-over rate above {:.1}% for: {}",
            limit * 100.0,
            failing.join(", ")
        )
    }
}

fn write_reports(
    args: &Args,
    aggregates: &[PolicyAggregate],
    records: &[RunRecord],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let duration = start_time.elapsed();

    match args.report {
        ReportFormat::Json => {
            logic::reports::generate_json_report(&mut output_target, aggregates, records, duration)?;
        }
        ReportFormat::Markdown => {
            logic::reports::generate_markdown_report(
                &mut output_target,
                aggregates,
                records,
                duration,
            )?;
        }
        ReportFormat::Csv => {
            logic::reports::generate_csv_report(&mut output_target, records)?;
        }
        ReportFormat::Console => {
            logic::reports::generate_console_report(
                &mut output_target,
                aggregates,
                records,
                duration,
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            seeds: "1337".to_string(),
            iterations: 1,
            policies: vec![PolicyKind::Idle],
            frame_ms: 16,
            max_secs: Some(2),
            config: None,
            max_game_over_rate: None,
            report: ReportFormat::Json,
            verbose: false,
            output: None,
        }
    }

    #[test]
    fn build_plan_defaults_to_target_duration() {
        let mut args = base_args();
        args.max_secs = None;
        let plan = build_plan(&args).unwrap();
        assert_eq!(plan.max_secs, 300);
        assert_eq!(plan.seeds, vec![1337]);
    }

    #[test]
    fn build_plan_rejects_zero_iterations() {
        let mut args = base_args();
        args.iterations = 0;
        assert!(build_plan(&args).is_err());
    }

    #[test]
    fn game_over_gate_reports_offenders() {
        let records = run_plan(&build_plan(&base_args()).unwrap(), |_| {});
        let rollup = aggregate(&records);
        assert!(check_game_over_rate(None, &rollup).is_ok());
        assert!(check_game_over_rate(Some(1.0), &rollup).is_ok());
    }

    #[test]
    fn output_target_writes_file() {
        let path = std::env::temp_dir().join(format!("livemask-out-{}.txt", std::process::id()));
        let mut target = OutputTarget::new(Some(path.clone())).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush_inner().unwrap();
        drop(target);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        let _ = fs::remove_file(path);
    }
}
