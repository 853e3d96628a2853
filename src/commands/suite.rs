use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::commands::run::run_scenario;
use crate::commands::TargetArgs;
use crate::performance::{run_prefix, ResultFiles};
use crate::report;
use crate::scenario::{Protocol, Scenario};
use crate::ui::progress::create_progress_bar;
use crate::utils::parse_duration;

pub struct SuiteOptions {
    pub target: TargetArgs,
    pub protocols: Vec<Protocol>,
    pub user_counts: Vec<u32>,
    pub spawn_rate: Option<f64>,
    pub run_time: Option<String>,
    pub cooldown: Option<String>,
    pub results_dir: Option<PathBuf>,
    pub charts: bool,
    pub charts_dir: Option<PathBuf>,
}

/// Every protocol × user-count combination, in protocol order.
pub fn matrix(protocols: &[Protocol], user_counts: &[u32]) -> Vec<(Protocol, u32)> {
    protocols
        .iter()
        .flat_map(|&p| user_counts.iter().map(move |&u| (p, u)))
        .collect()
}

pub async fn handle_suite(options: SuiteOptions) -> Result<()> {
    let mut config = options.target.load_config()?;
    if !options.protocols.is_empty() {
        config.matrix.protocols = options.protocols.clone();
    }
    if !options.user_counts.is_empty() {
        config.matrix.user_counts = options.user_counts.clone();
    }
    if let Some(rate) = options.spawn_rate {
        config.load.spawn_rate = rate;
    }
    if let Some(run_time) = &options.run_time {
        config.load.run_time = run_time.clone();
    }
    if let Some(cooldown) = &options.cooldown {
        config.matrix.cooldown = cooldown.clone();
    }
    let results_dir = options
        .results_dir
        .clone()
        .unwrap_or_else(|| config.output.results_dir.clone());
    let cooldown = parse_duration(&config.matrix.cooldown)?;

    let runs = matrix(&config.matrix.protocols, &config.matrix.user_counts);
    if runs.is_empty() {
        anyhow::bail!("Nothing to run: the protocol or user count list is empty");
    }

    println!("{} Starting load test matrix", "→".cyan());
    println!(
        "Protocols: {}",
        config
            .matrix
            .protocols
            .iter()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(", ")
            .bright_white()
    );
    println!(
        "User counts: {}",
        config
            .matrix
            .user_counts
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(", ")
            .bright_white()
    );
    println!("Run time per test: {}", config.load.run_time.bright_white());
    println!("Results: {}", results_dir.display());
    println!();

    let pb = create_progress_bar(runs.len() as u64);
    let mut failed_runs = Vec::new();

    for (index, &(protocol, users)) in runs.iter().enumerate() {
        pb.set_message(format!("{} with {} users", protocol.label(), users));

        let mut run_config = config.clone();
        run_config.load.users = users;
        let outcome = match run_config.load.settings() {
            Ok(settings) => {
                let files = ResultFiles::new(&results_dir, run_prefix(protocol.slug(), users));
                run_scenario(
                    &run_config,
                    Scenario::for_protocol(protocol),
                    settings,
                    &files,
                    false,
                )
                .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => {
                let (requests, failure_rate, rps) = outcome
                    .aggregated()
                    .map(|t| (t.request_count, t.failure_rate(), t.requests_per_second))
                    .unwrap_or_default();
                pb.println(format!(
                    "{} {} with {} users: {} requests, {:.1} req/s, {:.2}% failures",
                    "✔".green(),
                    protocol.label(),
                    users,
                    requests,
                    rps,
                    failure_rate
                ));
            }
            Err(e) => {
                pb.println(format!(
                    "{} {} with {} users failed: {:#}",
                    "✖".red(),
                    protocol.label(),
                    users,
                    e
                ));
                failed_runs.push((protocol, users));
            }
        }
        pb.inc(1);

        if index + 1 < runs.len() && !cooldown.is_zero() {
            pb.set_message(format!("cooling down {}s", cooldown.as_secs()));
            tokio::time::sleep(cooldown).await;
        }
    }
    pb.finish_with_message("done");

    if options.charts {
        println!();
        let charts_dir = options
            .charts_dir
            .clone()
            .unwrap_or_else(|| config.output.charts_dir.clone());
        report::generate(
            &results_dir,
            &charts_dir,
            &config.matrix.protocols,
            &config.matrix.user_counts,
        )?;
    }

    println!();
    if failed_runs.is_empty() {
        println!(
            "{} {} runs completed",
            "✔".green().bold(),
            runs.len()
        );
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} runs failed: {}",
            failed_runs.len(),
            runs.len(),
            failed_runs
                .iter()
                .map(|(p, u)| format!("{} {}", p.label(), u))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_order() {
        let runs = matrix(&[Protocol::Rest, Protocol::Grpc], &[100, 1000]);
        assert_eq!(
            runs,
            vec![
                (Protocol::Rest, 100),
                (Protocol::Rest, 1000),
                (Protocol::Grpc, 100),
                (Protocol::Grpc, 1000),
            ]
        );
        assert!(matrix(&[], &[100]).is_empty());
    }
}
