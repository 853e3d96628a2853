use crate::performance::export::HistoryWriter;
use crate::performance::metrics::{HistoryRow, StatsRegistry, StatsRow};
use crate::performance::patterns::SpawnSchedule;
use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

pub struct PerformanceMonitor {
    start_time: Instant,
    report_interval: Duration,
    run_time: Duration,
    schedule: SpawnSchedule,
    print_progress: bool,
}

impl PerformanceMonitor {
    pub fn new(
        report_interval: Duration,
        run_time: Duration,
        schedule: SpawnSchedule,
        print_progress: bool,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            report_interval,
            run_time,
            schedule,
            print_progress,
        }
    }

    /// Generate and print a progress report
    pub fn print_progress_report(&self, row: &StatsRow, active_users: usize) {
        let elapsed = self.start_time.elapsed();
        let remaining = self.run_time.saturating_sub(elapsed);

        let progress_percent = if self.run_time > Duration::ZERO {
            (elapsed.as_secs_f64() / self.run_time.as_secs_f64() * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((progress_percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled.min(bar_width);
        let progress_bar = format!(
            "[{}{}]",
            "=".repeat(filled.min(bar_width)).green(),
            "-".repeat(empty).dimmed()
        );

        println!();
        println!("{} Load Test Progress", "📊".bright_white());
        println!(
            "  {} {:.1}% ({}s / {}s)",
            progress_bar,
            progress_percent,
            elapsed.as_secs(),
            self.run_time.as_secs()
        );
        println!(
            "  Users: {} ({})",
            active_users.to_string().bright_white(),
            self.schedule.phase_description(elapsed)
        );

        if row.request_count > 0 {
            println!(
                "  Current RPS: {}",
                format!("{:.1}", row.requests_per_second).bright_white()
            );
            println!(
                "  Total Requests: {}",
                row.request_count.to_string().bright_white()
            );
            println!(
                "  Avg Response Time: {}",
                format!("{:.2}ms", row.average_response_time).bright_white()
            );
            if let Some(p95) = row.p95 {
                println!("  P95 Response Time: {}", format!("{:.0}ms", p95).bright_white());
            }
            if row.failure_count > 0 {
                println!(
                    "  {} Failures: {} ({:.1}%)",
                    "⚠".yellow(),
                    row.failure_count.to_string().bright_white(),
                    row.failure_rate()
                );
            }
        }

        if remaining > Duration::ZERO {
            println!("  Time Remaining: {}s", remaining.as_secs().bright_white());
        }
    }

    /// Runs until `stop` fires: every `report_interval` the aggregated state is printed
    /// (when enabled) and appended to the history file. The writer is handed back so the
    /// caller can add the closing row.
    pub fn start_background_monitoring(
        self,
        registry: Arc<Mutex<StatsRegistry>>,
        active_users: Arc<AtomicUsize>,
        mut history: Option<HistoryWriter>,
        mut stop: oneshot::Receiver<()>,
    ) -> JoinHandle<Option<HistoryWriter>> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.report_interval);
            interval.tick().await; // Skip the first tick which fires immediately

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = &mut stop => break,
                }

                let users = active_users.load(Ordering::Relaxed);
                let row = registry.lock().await.aggregated_row();

                if self.print_progress {
                    self.print_progress_report(&row, users);
                }
                if let Some(writer) = history.as_mut() {
                    let history_row =
                        HistoryRow::from_aggregated(&row, chrono::Utc::now().timestamp(), users);
                    if let Err(e) = writer.append(&history_row) {
                        tracing::warn!(error = %e, "failed to append stats history row");
                    }
                }
            }

            history
        })
    }
}

/// Print the final summary when a run completes
pub fn print_final_summary(rows: &[StatsRow], elapsed: Duration) {
    let Some(total) = rows.iter().find(|r| r.is_aggregated()) else {
        return;
    };

    println!();
    println!("{}", "=".repeat(60).dimmed());
    println!("{} Final Load Test Results", "🎯".bright_white());
    println!("{}", "=".repeat(60).dimmed());

    println!();
    println!("{} Requests:", "📋".bright_white());
    println!(
        "  {:<44} {:>8} {:>8} {:>9} {:>8}",
        "Name".bold(),
        "Reqs".bold(),
        "Fails".bold(),
        "Avg (ms)".bold(),
        "Req/s".bold()
    );
    for row in rows.iter().filter(|r| !r.is_aggregated()) {
        let fails = format!("{:>8}", row.failure_count);
        let fails = if row.failure_count > 0 {
            fails.red().to_string()
        } else {
            fails.green().to_string()
        };
        println!(
            "  {:<44} {:>8} {} {:>9.1} {:>8.2}",
            truncate_name(&format!("{} {}", row.request_type, row.name), 44),
            row.request_count,
            fails,
            row.average_response_time,
            row.requests_per_second
        );
    }

    println!();
    println!("{} Test Summary:", "📋".bright_white());
    println!("  Total Duration: {}s", elapsed.as_secs().bright_white());
    println!(
        "  Total Requests: {}",
        total.request_count.to_string().bright_white()
    );
    println!(
        "  Failed: {} ({:.2}%)",
        total.failure_count.to_string().red(),
        total.failure_rate()
    );

    println!();
    println!("{} Performance Metrics:", "⚡".bright_white());
    println!(
        "  Requests/sec: {}",
        format!("{:.1}", total.requests_per_second).bright_white()
    );
    println!(
        "  Avg Response: {}",
        format!("{:.2}ms", total.average_response_time).bright_white()
    );
    println!(
        "  Min Response: {}",
        format!("{:.2}ms", total.min_response_time).bright_white()
    );
    println!(
        "  Max Response: {}",
        format!("{:.2}ms", total.max_response_time).bright_white()
    );

    println!();
    println!("{} Response Time Percentiles:", "📊".bright_white());
    for (label, value) in [
        ("P50 (median)", total.p50),
        ("P95", total.p95),
        ("P99", total.p99),
    ] {
        println!("  {}: {}", label, format_millis(value).bright_white());
    }

    println!();
    print_performance_assessment(total);

    println!("{}", "=".repeat(60).dimmed());
}

fn print_performance_assessment(total: &StatsRow) {
    println!("{} Performance Assessment:", "🔍".bright_white());

    let success_rate_percent = 100.0 - total.failure_rate();
    if success_rate_percent >= 99.0 {
        println!("  Success Rate: {} Excellent (≥99%)", "✅".green());
    } else if success_rate_percent >= 95.0 {
        println!("  Success Rate: {} Good (≥95%)", "✅".green());
    } else if success_rate_percent >= 90.0 {
        println!("  Success Rate: {} Fair (≥90%)", "⚠".yellow());
    } else {
        println!("  Success Rate: {} Poor (<90%)", "❌".red());
    }

    let avg_response_ms = total.average_response_time;
    if avg_response_ms <= 100.0 {
        println!("  Avg Response: {} Excellent (≤100ms)", "✅".green());
    } else if avg_response_ms <= 500.0 {
        println!("  Avg Response: {} Good (≤500ms)", "✅".green());
    } else if avg_response_ms <= 1000.0 {
        println!("  Avg Response: {} Fair (≤1s)", "⚠".yellow());
    } else {
        println!("  Avg Response: {} Poor (>1s)", "❌".red());
    }

    let p95_response_ms = total.p95.unwrap_or(0.0);
    if p95_response_ms <= 200.0 {
        println!("  P95 Response: {} Excellent (≤200ms)", "✅".green());
    } else if p95_response_ms <= 1000.0 {
        println!("  P95 Response: {} Good (≤1s)", "✅".green());
    } else if p95_response_ms <= 2000.0 {
        println!("  P95 Response: {} Fair (≤2s)", "⚠".yellow());
    } else {
        println!("  P95 Response: {} Poor (>2s)", "❌".red());
    }
}

fn format_millis(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{:.0}ms", ms),
        None => "N/A".to_string(),
    }
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let kept: String = name.chars().take(width - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name_counts_chars() {
        assert_eq!(truncate_name("GET /api/musicas", 44), "GET /api/musicas");
        let long = "POST GraphQL - Listar Playlists de Usuário (muito longo)";
        let cut = truncate_name(long, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(Some(12.4)), "12ms");
        assert_eq!(format_millis(None), "N/A");
    }

    #[tokio::test]
    async fn test_monitor_writes_history_until_stopped() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("history.csv");
        let history = HistoryWriter::create(&path).unwrap();

        let monitor = PerformanceMonitor::new(
            Duration::from_millis(20),
            Duration::from_secs(1),
            SpawnSchedule::new(1, 1.0),
            false,
        );
        let mut registry = StatsRegistry::new();
        registry.record(&crate::protocols::RequestRecord {
            request_type: "grpc".to_string(),
            name: "gRPC - Listar Todos Usuários".to_string(),
            response_time: Duration::from_millis(8),
            response_length: 3,
            error: None,
        });

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = monitor.start_background_monitoring(
            Arc::new(Mutex::new(registry)),
            Arc::new(AtomicUsize::new(1)),
            Some(history),
            stop_rx,
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        stop_tx.send(()).unwrap();
        let history = handle.await.unwrap();
        assert!(history.is_some());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines.len() >= 2, "history: {}", content);
        assert!(lines[1].contains(",1,,Aggregated,"), "history: {}", content);
    }
}
