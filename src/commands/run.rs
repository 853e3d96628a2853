use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::TargetArgs;
use crate::config::{HarnessConfig, LoadSettings};
use crate::performance::metrics::{FailureRow, StatsRow};
use crate::performance::monitor::print_final_summary;
use crate::performance::{
    run_prefix, HistoryWriter, LoadTestRunner, ResultFiles, RunOutcome, SpawnSchedule,
};
use crate::scenario::{Protocol, Scenario};

pub struct RunOptions {
    pub target: TargetArgs,
    pub scenario: String,
    pub users: Option<u32>,
    pub spawn_rate: Option<f64>,
    pub run_time: Option<String>,
    pub report_interval: Option<String>,
    pub results_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub output: Option<PathBuf>,
    pub max_failure_rate: Option<f64>,
}

/// Machine-readable copy of a finished run.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    timestamp: DateTime<Utc>,
    scenario: &'a str,
    protocol: Protocol,
    users: u32,
    spawn_rate: f64,
    duration_secs: f64,
    stats: &'a [StatsRow],
    failures: &'a [FailureRow],
}

/// Runs `scenario` once and writes its three CSV files.
pub async fn run_scenario(
    config: &HarnessConfig,
    scenario: Scenario,
    settings: LoadSettings,
    files: &ResultFiles,
    print_progress: bool,
) -> Result<RunOutcome> {
    files.ensure_dir()?;
    let history = HistoryWriter::create(&files.history())?;

    let runner = LoadTestRunner::new(scenario, settings, config.targets.clone())?
        .with_progress(print_progress);
    let outcome = runner.run(Some(history)).await?;

    files.write_stats(&outcome.stats)?;
    files.write_failures(&outcome.failures)?;
    tracing::info!(stats = %files.stats().display(), "results written");

    Ok(outcome)
}

pub async fn handle_run(options: RunOptions) -> Result<()> {
    let mut config = options.target.load_config()?;
    if let Some(users) = options.users {
        config.load.users = users;
    }
    if let Some(rate) = options.spawn_rate {
        config.load.spawn_rate = rate;
    }
    if let Some(run_time) = &options.run_time {
        config.load.run_time = run_time.clone();
    }
    if let Some(interval) = &options.report_interval {
        config.load.report_interval = interval.clone();
    }
    let settings = config.load.settings()?;
    let scenario = Scenario::by_name(&options.scenario)?;

    println!("{} Starting load test", "→".cyan());
    println!("Scenario: {}", scenario.name.bright_white());
    println!("Protocol: {}", scenario.protocol.label().bright_white());
    let target = match scenario.protocol {
        Protocol::Grpc => &config.targets.grpc_endpoint,
        _ => &config.targets.host,
    };
    println!("Target: {}", target.bright_white());
    println!("Users: {}", settings.users.to_string().bright_white());
    println!(
        "Spawn rate: {}/s",
        settings.spawn_rate.to_string().bright_white()
    );
    println!("Run time: {}", config.load.run_time.bright_white());
    let ramp = SpawnSchedule::new(settings.users, settings.spawn_rate).ramp_duration();
    if ramp > settings.run_time {
        println!(
            "{} Ramp-up takes {:.1}s, longer than the run: not every user will start",
            "⚠".yellow(),
            ramp.as_secs_f64()
        );
    } else {
        println!("Ramp-up: {:.1}s", ramp.as_secs_f64());
    }

    let results_dir = options
        .results_dir
        .clone()
        .unwrap_or_else(|| config.output.results_dir.clone());
    let prefix = options
        .prefix
        .clone()
        .unwrap_or_else(|| run_prefix(&scenario.name, settings.users));
    let files = ResultFiles::new(&results_dir, prefix);

    let scenario_name = scenario.name.clone();
    let protocol = scenario.protocol;
    let outcome = run_scenario(&config, scenario, settings.clone(), &files, true).await?;

    print_final_summary(&outcome.stats, outcome.elapsed);

    println!();
    println!("{} Load test completed", "✔".green().bold());
    println!("Stats: {}", files.stats().display());
    println!("Failures: {}", files.failures().display());
    println!("History: {}", files.history().display());

    if let Some(output_path) = &options.output {
        let report = RunReport {
            timestamp: Utc::now(),
            scenario: &scenario_name,
            protocol,
            users: settings.users,
            spawn_rate: settings.spawn_rate,
            duration_secs: outcome.elapsed.as_secs_f64(),
            stats: &outcome.stats,
            failures: &outcome.failures,
        };
        save_report(&report, output_path)?;
        println!("{} Run report saved to {}", "✔".green(), output_path.display());
    }

    if let (Some(limit), Some(total)) = (options.max_failure_rate, outcome.aggregated()) {
        if total.failure_rate() > limit {
            anyhow::bail!(
                "Load test failed: failure rate {:.2}% is above {:.2}%",
                total.failure_rate(),
                limit
            );
        }
    }

    Ok(())
}

fn save_report(report: &RunReport<'_>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
