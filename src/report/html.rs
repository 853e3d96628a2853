use crate::report::ResultSet;
use anyhow::{Context as _, Result};
use chrono::Utc;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Serialize)]
struct IndexRow {
    user_count: u32,
    protocol: &'static str,
    requests: u64,
    rps: String,
    average: String,
    p50: String,
    p95: String,
    p99: String,
    failures: u64,
    failure_rate: String,
}

#[derive(Debug, Serialize)]
struct ChartLink {
    title: String,
    file: String,
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.0}", v))
}

fn chart_title(file: &str) -> String {
    match file.trim_end_matches(".svg") {
        "response_time_comparison" => "Tempo de Resposta Médio".to_string(),
        "requests_per_second" => "Requisições por Segundo".to_string(),
        "failure_rate" => "Taxa de Falhas".to_string(),
        "percentiles_comparison" => "Percentis de Tempo de Resposta".to_string(),
        "overall_performance" => "Performance Geral".to_string(),
        other => other.to_string(),
    }
}

/// Renders `index.html` linking every generated file. Paths are written relative to
/// `charts_dir`, which is where the index itself lands.
pub fn render_index(results: &ResultSet, generated: &[PathBuf]) -> Result<String> {
    let mut tera = Tera::default();
    // Every value comes from our own stats rows and file names.
    tera.autoescape_on(vec![]);
    tera.add_raw_template("index.html", include_str!("../../templates/report_index.html"))
        .map_err(|e| anyhow::anyhow!("Failed to add template: {}", e))?;

    let mut rows = Vec::new();
    for &user_count in &results.user_counts {
        for &protocol in &results.protocols {
            if let Some(row) = results.aggregated(protocol, user_count) {
                rows.push(IndexRow {
                    user_count,
                    protocol: protocol.label(),
                    requests: row.request_count,
                    rps: format!("{:.2}", row.requests_per_second),
                    average: format!("{:.2}", row.average_response_time),
                    p50: optional(row.p50),
                    p95: optional(row.p95),
                    p99: optional(row.p99),
                    failures: row.failure_count,
                    failure_rate: format!("{:.2}", row.failure_rate()),
                });
            }
        }
    }

    let file_names: Vec<String> = generated
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    let charts: Vec<ChartLink> = file_names
        .iter()
        .filter(|n| n.ends_with(".svg"))
        .map(|n| ChartLink {
            title: chart_title(n),
            file: n.clone(),
        })
        .collect();
    let summary_file = file_names.iter().find(|n| n.ends_with(".txt"));

    let mut context = Context::new();
    context.insert(
        "timestamp",
        &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    context.insert("protocol_count", &results.protocols.len());
    context.insert("user_counts", &results.user_counts);
    context.insert("rows", &rows);
    context.insert("charts", &charts);
    context.insert("summary_file", &summary_file);

    Ok(tera.render("index.html", &context)?)
}

pub fn write_index(results: &ResultSet, charts_dir: &Path, generated: &[PathBuf]) -> Result<PathBuf> {
    let path = charts_dir.join(INDEX_FILE);
    let html = render_index(results, generated)?;
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("  {} Saved: {}", "✓".green(), path.display());
    Ok(path)
}
