use crate::report::ResultSet;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary_report.txt";

fn millis(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2} ms", v),
        None => "N/A".to_string(),
    }
}

/// Plain-text summary of the aggregated row of every run, grouped by user count.
pub fn render_summary(results: &ResultSet) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "RELATÓRIO DE TESTES DE CARGA - MUSIC STREAMING API");
    let _ = writeln!(out, "{}\n", rule);

    for &user_count in &results.user_counts {
        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "CARGA: {} USUÁRIOS", user_count);
        let _ = writeln!(out, "{}\n", rule);

        for &protocol in &results.protocols {
            let has_data = results
                .rows
                .iter()
                .any(|r| r.protocol == protocol && r.user_count == user_count);
            if !has_data {
                continue;
            }

            let _ = writeln!(out, "\n{}", protocol.label());
            let _ = writeln!(out, "{}", "-".repeat(40));

            if let Some(row) = results.aggregated(protocol, user_count) {
                let _ = writeln!(out, "  Total de Requisições: {}", row.request_count);
                let _ = writeln!(out, "  Requisições/s: {:.2}", row.requests_per_second);
                let _ = writeln!(out, "  Tempo Médio: {:.2} ms", row.average_response_time);
                let _ = writeln!(out, "  Tempo Mínimo: {:.2} ms", row.min_response_time);
                let _ = writeln!(out, "  Tempo Máximo: {:.2} ms", row.max_response_time);
                let _ = writeln!(out, "  Percentil 50%: {}", millis(row.p50));
                let _ = writeln!(out, "  Percentil 95%: {}", millis(row.p95));
                let _ = writeln!(out, "  Percentil 99%: {}", millis(row.p99));
                let _ = writeln!(out, "  Falhas: {}", row.failure_count);
            }

            out.push('\n');
        }
    }

    out
}

pub fn write_summary(results: &ResultSet, charts_dir: &Path) -> Result<PathBuf> {
    println!();
    println!("{} Writing summary report", "📄".bright_white());

    let path = charts_dir.join(SUMMARY_FILE);
    fs::write(&path, render_summary(results))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("  {} Saved: {}", "✓".green(), path.display());
    Ok(path)
}
