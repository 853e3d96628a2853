use anyhow::Result;
use owo_colors::OwoColorize;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::commands::TargetArgs;
use crate::http::HttpClient;
use crate::protocols::ProtocolClient;
use crate::scenario::Scenario;
use crate::ui::request_box::print_request_box;
use crate::ui::response_box::print_response_box;
use crate::ui::spinner::Spinner;
use crate::utils::parse_duration;

/// Sends every task of a scenario once and shows what came back.
pub async fn handle_probe(target: TargetArgs, scenario: String, quiet: bool) -> Result<()> {
    let config = target.load_config()?;
    let scenario = Scenario::by_name(&scenario)?;
    let timeout = parse_duration(&config.load.request_timeout)?;

    println!(
        "{} Probing scenario {} ({} tasks)",
        "→".cyan(),
        scenario.name.bright_white(),
        scenario.tasks.len()
    );
    println!();

    let http = HttpClient::new(&config.targets.host, timeout, config.targets.insecure)?;
    let mut client = ProtocolClient::for_user(
        scenario.protocol,
        scenario.check,
        &http,
        &config.targets,
        timeout,
    )?;
    let mut rng = SmallRng::from_entropy();
    let mut failed = 0;

    for task in &scenario.tasks {
        let operation = scenario.materialize(task.kind, &mut rng);

        if !quiet {
            let (target, payload) = client.describe(operation);
            print_request_box(&task.name, client.request_type(), &target, &payload);
        }

        let record = {
            let _spinner = Spinner::sending(&task.name);
            client.execute(operation, &task.name).await
        };

        if record.is_failure() {
            failed += 1;
        }

        if quiet {
            let mark = if record.is_failure() {
                "✖".red().to_string()
            } else {
                "✔".green().to_string()
            };
            println!(
                "{} {} ({}ms){}",
                mark,
                task.name,
                record.response_time.as_millis(),
                record
                    .error
                    .as_deref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            );
        } else {
            print_response_box(&record);
        }
    }

    let total = scenario.tasks.len();
    println!();
    if failed == 0 {
        println!("{} {} tasks passed", "✔".green().bold(), total);
        Ok(())
    } else {
        anyhow::bail!("{} of {} tasks failed", failed, total)
    }
}
