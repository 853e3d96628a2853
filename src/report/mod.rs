//! Turns the stats CSV files of a protocol × user-count matrix into comparison charts,
//! a text summary and an HTML index.

pub mod charts;
pub mod html;
pub mod summary;

use crate::performance::export::{read_stats, run_prefix, ResultFiles};
use crate::performance::metrics::StatsRow;
use crate::scenario::Protocol;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn protocol_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^(REST|GraphQL|SOAP|gRPC) - ").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

/// Short task label shared by every protocol, e.g. `gRPC - Listar Todas Músicas`
/// becomes `Listar Músicas`. Names outside the comparison scenarios are kept as they are.
pub fn task_label(name: &str) -> String {
    let Some(prefix) = protocol_prefix().find(name) else {
        return name.to_string();
    };

    match &name[prefix.end()..] {
        "Listar Todas Músicas" => "Listar Músicas".to_string(),
        "Listar Todos Usuários" => "Listar Usuários".to_string(),
        "Listar Playlists de Usuário" => "Listar Playlists".to_string(),
        _ => name.to_string(),
    }
}

/// One stats row tagged with the run it came from.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub protocol: Protocol,
    pub user_count: u32,
    pub task: String,
    pub stats: StatsRow,
}

/// Everything loaded from a results directory.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub rows: Vec<ResultRow>,
    pub protocols: Vec<Protocol>,
    pub user_counts: Vec<u32>,
}

/// Reads `<results_dir>/<protocol>_<users>_users_stats.csv` for every combination.
/// Missing or unreadable files are reported and skipped.
pub fn load_results(results_dir: &Path, protocols: &[Protocol], user_counts: &[u32]) -> ResultSet {
    let mut set = ResultSet {
        rows: Vec::new(),
        protocols: protocols.to_vec(),
        user_counts: user_counts.to_vec(),
    };

    for &protocol in protocols {
        for &user_count in user_counts {
            let path = ResultFiles::new(results_dir, run_prefix(protocol.slug(), user_count)).stats();

            if !path.exists() {
                println!("  {} File not found: {}", "⚠".yellow(), path.display());
                continue;
            }

            match read_stats(&path) {
                Ok(rows) => {
                    set.rows.extend(rows.into_iter().map(|stats| ResultRow {
                        protocol,
                        user_count,
                        task: task_label(&stats.name),
                        stats,
                    }));
                    println!(
                        "  {} Loaded: {} with {} users",
                        "✓".green(),
                        protocol.label(),
                        user_count
                    );
                }
                Err(e) => {
                    println!("  {} Failed to load {}: {:#}", "✗".red(), path.display(), e);
                }
            }
        }
    }

    set
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn aggregated(&self, protocol: Protocol, user_count: u32) -> Option<&StatsRow> {
        self.rows
            .iter()
            .find(|r| r.protocol == protocol && r.user_count == user_count && r.stats.is_aggregated())
            .map(|r| &r.stats)
    }

    /// Mean of `metric` by task × protocol over the per-endpoint rows of one user count.
    pub fn endpoint_pivot<F>(&self, user_count: u32, metric: F) -> Pivot
    where
        F: Fn(&StatsRow) -> Option<f64>,
    {
        let points = self
            .rows
            .iter()
            .filter(|r| r.user_count == user_count && !r.stats.is_aggregated())
            .map(|r| (r.task.clone(), r.protocol, metric(&r.stats)));

        let mut pivot = Pivot::from_points(points);
        pivot.categories.sort();
        pivot
    }

    /// `metric` of the aggregated rows by user count × protocol.
    pub fn aggregated_pivot<F>(&self, metric: F) -> Pivot
    where
        F: Fn(&StatsRow) -> Option<f64>,
    {
        let mut pivot = Pivot::from_points(
            self.rows
                .iter()
                .filter(|r| r.stats.is_aggregated())
                .map(|r| (r.user_count.to_string(), r.protocol, metric(&r.stats))),
        );
        pivot.categories.sort_by_key(|c| c.parse::<u64>().unwrap_or(u64::MAX));
        pivot
    }
}

/// A category × protocol table of mean values. Missing measurements are skipped, so a
/// cell exists only when at least one value was present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    pub categories: Vec<String>,
    pub protocols: Vec<Protocol>,
    values: HashMap<(String, Protocol), f64>,
}

impl Pivot {
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (String, Protocol, Option<f64>)>,
    {
        let mut categories: Vec<String> = Vec::new();
        let mut sums: HashMap<(String, Protocol), (f64, u32)> = HashMap::new();

        for (category, protocol, value) in points {
            if !categories.contains(&category) {
                categories.push(category.clone());
            }
            if let Some(value) = value.filter(|v| v.is_finite()) {
                let cell = sums.entry((category, protocol)).or_insert((0.0, 0));
                cell.0 += value;
                cell.1 += 1;
            }
        }

        let protocols = Protocol::ALL
            .into_iter()
            .filter(|p| sums.keys().any(|(_, q)| q == p))
            .collect();
        let values = sums
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect();

        Self {
            categories,
            protocols,
            values,
        }
    }

    pub fn value(&self, category: &str, protocol: Protocol) -> Option<f64> {
        self.values.get(&(category.to_string(), protocol)).copied()
    }

    pub fn max_value(&self) -> f64 {
        self.values.values().copied().fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Loads the matrix results and writes every chart, `summary_report.txt` and
/// `index.html` into `charts_dir`. Returns `None` when there was nothing to report on.
pub fn generate(
    results_dir: &Path,
    charts_dir: &Path,
    protocols: &[Protocol],
    user_counts: &[u32],
) -> Result<Option<Vec<PathBuf>>> {
    println!("{} Loading results from {}", "📂".bright_white(), results_dir.display());
    let results = load_results(results_dir, protocols, user_counts);

    if results.is_empty() {
        println!();
        println!("{} No data available to generate charts!", "✗".red());
        println!("  Run the load tests first with: streamload suite");
        return Ok(None);
    }
    println!("  Total rows loaded: {}", results.rows.len().to_string().bright_white());

    fs::create_dir_all(charts_dir)
        .with_context(|| format!("Failed to create charts directory: {}", charts_dir.display()))?;

    let mut generated = charts::render_all(&results, charts_dir)?;
    generated.push(summary::write_summary(&results, charts_dir)?);
    generated.push(html::write_index(&results, charts_dir, &generated)?);

    Ok(Some(generated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, avg: f64) -> StatsRow {
        StatsRow {
            request_type: "GET".to_string(),
            name: name.to_string(),
            request_count: 10,
            failure_count: 1,
            median_response_time: Some(avg),
            average_response_time: avg,
            min_response_time: avg,
            max_response_time: avg,
            average_content_size: 0.0,
            requests_per_second: 1.0,
            failures_per_second: 0.1,
            p50: Some(avg),
            p66: None,
            p75: None,
            p80: None,
            p90: None,
            p95: None,
            p98: None,
            p99: None,
            p99_9: None,
            p99_99: None,
            p100: None,
        }
    }

    fn result(protocol: Protocol, user_count: u32, name: &str, avg: f64) -> ResultRow {
        ResultRow {
            protocol,
            user_count,
            task: task_label(name),
            stats: row(name, avg),
        }
    }

    #[test]
    fn test_task_label_strips_protocol() {
        assert_eq!(task_label("REST - Listar Todas Músicas"), "Listar Músicas");
        assert_eq!(task_label("gRPC - Listar Todos Usuários"), "Listar Usuários");
        assert_eq!(
            task_label("GraphQL - Listar Playlists de Usuário"),
            "Listar Playlists"
        );
        assert_eq!(task_label("SOAP - Listar Playlists de Usuário"), "Listar Playlists");
    }

    #[test]
    fn test_task_label_keeps_unknown_names() {
        assert_eq!(task_label("Aggregated"), "Aggregated");
        assert_eq!(task_label("/api/musicas/[id]"), "/api/musicas/[id]");
        assert_eq!(task_label("REST - Buscar Música"), "REST - Buscar Música");
        assert_eq!(task_label("HTTP - Listar Todas Músicas"), "HTTP - Listar Todas Músicas");
    }

    #[test]
    fn test_pivot_means_and_skips_missing() {
        let pivot = Pivot::from_points(vec![
            ("b".to_string(), Protocol::Soap, Some(10.0)),
            ("a".to_string(), Protocol::Soap, Some(20.0)),
            ("a".to_string(), Protocol::Soap, Some(40.0)),
            ("a".to_string(), Protocol::Rest, None),
        ]);
        assert_eq!(pivot.categories, vec!["b", "a"]);
        assert_eq!(pivot.protocols, vec![Protocol::Soap]);
        assert_eq!(pivot.value("a", Protocol::Soap), Some(30.0));
        assert_eq!(pivot.value("a", Protocol::Rest), None);
        assert_eq!(pivot.max_value(), 30.0);
    }

    #[test]
    fn test_endpoint_pivot_excludes_aggregated() {
        let set = ResultSet {
            rows: vec![
                result(Protocol::Rest, 100, "REST - Listar Todas Músicas", 12.0),
                result(Protocol::Grpc, 100, "gRPC - Listar Todas Músicas", 4.0),
                result(Protocol::Grpc, 100, "gRPC - Listar Todos Usuários", 6.0),
                result(Protocol::Grpc, 100, "Aggregated", 5.0),
                result(Protocol::Grpc, 1000, "gRPC - Listar Todas Músicas", 99.0),
            ],
            protocols: Protocol::ALL.to_vec(),
            user_counts: vec![100, 1000],
        };

        let pivot = set.endpoint_pivot(100, |r| Some(r.average_response_time));
        assert_eq!(pivot.categories, vec!["Listar Músicas", "Listar Usuários"]);
        assert_eq!(pivot.protocols, vec![Protocol::Rest, Protocol::Grpc]);
        assert_eq!(pivot.value("Listar Músicas", Protocol::Grpc), Some(4.0));

        let overall = set.aggregated_pivot(|r| Some(r.average_response_time));
        assert_eq!(overall.categories, vec!["100"]);
        assert_eq!(overall.value("100", Protocol::Grpc), Some(5.0));
        assert_eq!(
            set.aggregated(Protocol::Grpc, 100).map(|r| r.average_response_time),
            Some(5.0)
        );
        assert!(set.aggregated(Protocol::Rest, 100).is_none());
    }

    #[test]
    fn test_aggregated_pivot_orders_user_counts_numerically() {
        let set = ResultSet {
            rows: vec![
                result(Protocol::Soap, 10000, "Aggregated", 3.0),
                result(Protocol::Soap, 100, "Aggregated", 1.0),
                result(Protocol::Soap, 1000, "Aggregated", 2.0),
            ],
            ..ResultSet::default()
        };
        let pivot = set.aggregated_pivot(|r| Some(r.average_response_time));
        assert_eq!(pivot.categories, vec!["100", "1000", "10000"]);
    }
}
