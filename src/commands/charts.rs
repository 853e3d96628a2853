use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::config::HarnessConfig;
use crate::report;
use crate::scenario::Protocol;

pub struct ChartsOptions {
    pub config: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub charts_dir: Option<PathBuf>,
    pub protocols: Vec<Protocol>,
    pub user_counts: Vec<u32>,
}

pub async fn handle_charts(options: ChartsOptions) -> Result<()> {
    let config = HarnessConfig::load(options.config.as_deref())?;
    let results_dir = options.results_dir.unwrap_or(config.output.results_dir);
    let charts_dir = options.charts_dir.unwrap_or(config.output.charts_dir);
    let protocols = if options.protocols.is_empty() {
        config.matrix.protocols
    } else {
        options.protocols
    };
    let user_counts = if options.user_counts.is_empty() {
        config.matrix.user_counts
    } else {
        options.user_counts
    };

    println!("{}", "=".repeat(80).dimmed());
    println!("{} Generating comparison charts", "→".cyan());
    println!("{}", "=".repeat(80).dimmed());
    println!();

    let Some(generated) = report::generate(&results_dir, &charts_dir, &protocols, &user_counts)?
    else {
        return Ok(());
    };

    println!();
    println!("{}", "=".repeat(80).dimmed());
    println!("{} All charts generated", "✔".green().bold());
    println!("{}", "=".repeat(80).dimmed());
    println!();
    println!("Charts saved in: {}", charts_dir.display().to_string().bright_white());
    for path in &generated {
        if let Some(name) = path.file_name() {
            println!("  - {}", name.to_string_lossy());
        }
    }

    Ok(())
}
