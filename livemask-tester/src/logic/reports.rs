use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use super::simulation::{PolicyAggregate, RunRecord};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    total_duration_ms: u128,
    policies: &'a [PolicyAggregate],
    runs: &'a [RunRecord],
}

fn grade_line(aggregate: &PolicyAggregate) -> String {
    aggregate
        .grades
        .iter()
        .map(|(grade, count)| format!("{grade}:{count}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn generate_console_report(
    out: &mut dyn Write,
    aggregates: &[PolicyAggregate],
    records: &[RunRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📺 Livemask Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;
    writeln!(out, "Generated: {}", Utc::now().format(TIMESTAMP_FORMAT))?;
    writeln!(out, "Total runs: {}", records.len())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for aggregate in aggregates {
        writeln!(out, "{}", aggregate.policy.label().bold())?;
        writeln!(out, "   Runs: {}", aggregate.runs)?;
        let game_overs = format!(
            "{} ({:.1}%)",
            aggregate.game_overs,
            aggregate.game_over_rate() * 100.0
        );
        if aggregate.game_overs == 0 {
            writeln!(out, "   Game overs: {}", game_overs.green())?;
        } else {
            writeln!(out, "   Game overs: {}", game_overs.red())?;
        }
        writeln!(out, "   Reached target: {}", aggregate.survived_target)?;
        writeln!(out, "   Mean survival: {:.1}s", aggregate.mean_survival_secs)?;
        writeln!(out, "   Mean accuracy: {:.1}%", aggregate.mean_accuracy_pct)?;
        writeln!(out, "   Mean final viewers: {:.0}", aggregate.mean_final_viewers)?;
        writeln!(out, "   Grades: {}", grade_line(aggregate))?;
        writeln!(out)?;
    }

    if let Some(best) = records
        .iter()
        .max_by(|a, b| a.summary.survival_secs.total_cmp(&b.summary.survival_secs))
    {
        writeln!(out, "{}", "🏆 Longest Run".bright_yellow().bold())?;
        writeln!(out, "{}", "==============".yellow())?;
        writeln!(
            out,
            "{} seed {} iteration {}: {:.1}s, grade {}",
            best.policy, best.seed, best.iteration, best.summary.survival_secs, best.summary.grade
        )?;
    }
    Ok(())
}

pub fn generate_json_report(
    out: &mut dyn Write,
    aggregates: &[PolicyAggregate],
    records: &[RunRecord],
    total_duration: Duration,
) -> Result<()> {
    let report = JsonReport {
        generated_at: Utc::now().to_rfc3339(),
        total_duration_ms: total_duration.as_millis(),
        policies: aggregates,
        runs: records,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut dyn Write,
    aggregates: &[PolicyAggregate],
    records: &[RunRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out, "# Livemask Simulation Report")?;
    writeln!(out)?;
    writeln!(out, "**Generated:** {}", Utc::now().format(TIMESTAMP_FORMAT))?;
    writeln!(out, "**Total runs:** {}", records.len())?;
    writeln!(out, "**Total time:** {total_duration:?}")?;
    writeln!(out)?;

    writeln!(out, "## Policies")?;
    writeln!(out)?;
    writeln!(
        out,
        "| Policy | Runs | Game overs | Reached target | Mean survival (s) | Mean accuracy (%) | Grades |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|")?;
    for aggregate in aggregates {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.1} | {:.1} | {} |",
            aggregate.policy,
            aggregate.runs,
            aggregate.game_overs,
            aggregate.survived_target,
            aggregate.mean_survival_secs,
            aggregate.mean_accuracy_pct,
            grade_line(aggregate)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Runs")?;
    writeln!(out)?;
    writeln!(
        out,
        "| Policy | Seed | Iteration | Survival (s) | Masked | Expired | False positives | Grade |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|---|")?;
    for record in records {
        let s = &record.summary;
        writeln!(
            out,
            "| {} | {} | {} | {:.1} | {} | {} | {} | {} |",
            record.policy,
            record.seed,
            record.iteration,
            s.survival_secs,
            s.threats_masked,
            s.threats_expired,
            s.false_positives,
            s.grade
        )?;
    }
    Ok(())
}

pub fn generate_csv_report(out: &mut dyn Write, records: &[RunRecord]) -> Result<()> {
    writeln!(
        out,
        "policy,seed,iteration,run_seed,frames,game_over,survival_secs,final_emotional,final_viewers,peak_viewers,threats_masked,threats_expired,false_positives,accuracy_pct,average_reaction_ms,grade"
    )?;
    for record in records {
        let s = &record.summary;
        let reaction = s
            .average_reaction_ms
            .map_or_else(String::new, |ms| format!("{ms:.1}"));
        writeln!(
            out,
            "{},{},{},{},{},{},{:.3},{:.2},{:.1},{:.1},{},{},{},{:.2},{},{}",
            record.policy.label().to_lowercase(),
            record.seed,
            record.iteration,
            record.run_seed,
            record.frames,
            record.game_over,
            s.survival_secs,
            s.final_emotional,
            s.final_viewers,
            s.peak_viewers,
            s.threats_masked,
            s.threats_expired,
            s.false_positives,
            s.accuracy_pct,
            reaction,
            s.grade
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::PolicyKind;
    use crate::logic::simulation::{aggregate, run_once};
    use livemask_game::GameConfig;

    fn sample() -> Vec<RunRecord> {
        let config = GameConfig::default();
        vec![
            run_once(&config, 1, 0, PolicyKind::Idle, 16, 3),
            run_once(&config, 1, 0, PolicyKind::Perfect, 16, 3),
        ]
    }

    #[test]
    fn csv_has_header_and_one_row_per_run() {
        let records = sample();
        let mut buf = Vec::new();
        generate_csv_report(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("policy,seed,iteration"));
        assert!(lines[1].starts_with("idle,1,0,"));
        assert_eq!(lines[1].split(',').count(), lines[0].split(',').count());
    }

    #[test]
    fn json_report_parses_back() {
        let records = sample();
        let rollup = aggregate(&records);
        let mut buf = Vec::new();
        generate_json_report(&mut buf, &rollup, &records, Duration::from_millis(5)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["runs"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["policies"][1]["policy"], "perfect");
    }

    #[test]
    fn markdown_lists_every_policy() {
        let records = sample();
        let rollup = aggregate(&records);
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &rollup, &records, Duration::ZERO).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# Livemask Simulation Report"));
        assert!(text.contains("| Idle |"));
        assert!(text.contains("| Perfect |"));
    }
}
