use crate::config::{LoadSettings, Targets};
use crate::http::HttpClient;
use crate::performance::export::HistoryWriter;
use crate::performance::metrics::{FailureRow, StatsRegistry, StatsRow};
use crate::performance::monitor::PerformanceMonitor;
use crate::performance::patterns::SpawnSchedule;
use crate::protocols::ProtocolClient;
use crate::scenario::Scenario;
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{sleep, sleep_until, Instant};

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stats: Vec<StatsRow>,
    pub failures: Vec<FailureRow>,
    pub elapsed: Duration,
    pub users_spawned: usize,
}

impl RunOutcome {
    pub fn aggregated(&self) -> Option<&StatsRow> {
        self.stats.iter().find(|r| r.is_aggregated())
    }
}

pub struct LoadTestRunner {
    scenario: Arc<Scenario>,
    settings: LoadSettings,
    targets: Targets,
    http: HttpClient,
    print_progress: bool,
}

impl LoadTestRunner {
    pub fn new(scenario: Scenario, settings: LoadSettings, targets: Targets) -> Result<Self> {
        let http = HttpClient::new(&targets.host, settings.request_timeout, targets.insecure)?;

        Ok(Self {
            scenario: Arc::new(scenario),
            settings,
            targets,
            http,
            print_progress: true,
        })
    }

    /// Turns the periodic console report on or off. History rows are written either way.
    pub fn with_progress(mut self, print_progress: bool) -> Self {
        self.print_progress = print_progress;
        self
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub async fn run(&self, history: Option<HistoryWriter>) -> Result<RunOutcome> {
        let schedule = SpawnSchedule::new(self.settings.users, self.settings.spawn_rate);
        let registry = Arc::new(Mutex::new(StatsRegistry::new()));
        let active_users = Arc::new(AtomicUsize::new(0));

        tracing::info!(
            scenario = %self.scenario.name,
            users = self.settings.users,
            spawn_rate = self.settings.spawn_rate,
            run_time = ?self.settings.run_time,
            "starting load test"
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let monitor = PerformanceMonitor::new(
            self.settings.report_interval,
            self.settings.run_time,
            schedule,
            self.print_progress,
        );
        let monitor_handle = monitor.start_background_monitoring(
            Arc::clone(&registry),
            Arc::clone(&active_users),
            history,
            stop_rx,
        );

        let start = Instant::now();
        let deadline = start + self.settings.run_time;
        registry.lock().await.reset_clock();

        let mut users = FuturesUnordered::new();
        for index in 0..schedule.users() {
            let due = start + schedule.start_offset(index);
            if due >= deadline {
                break;
            }
            sleep_until(due).await;

            let client = ProtocolClient::for_user(
                self.scenario.protocol,
                self.scenario.check,
                &self.http,
                &self.targets,
                self.settings.request_timeout,
            )?;
            active_users.fetch_add(1, Ordering::Relaxed);

            users.push(tokio::spawn(virtual_user(
                Arc::clone(&self.scenario),
                client,
                Arc::clone(&registry),
                deadline,
            )));
        }
        tracing::debug!(spawned = users.len(), "all users spawned");

        while let Some(result) = users.next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "virtual user task failed");
            }
        }

        let _ = stop_tx.send(());
        let history = monitor_handle.await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "monitor task failed");
            None
        });

        let registry = registry.lock().await;
        let elapsed = registry.elapsed();
        let users_spawned = active_users.load(Ordering::Relaxed);

        if let Some(mut writer) = history {
            let row = registry.history_row(chrono::Utc::now().timestamp(), users_spawned);
            writer.append(&row)?;
        }

        tracing::info!(
            requests = registry.total_requests(),
            failures = registry.total_failures(),
            "load test finished"
        );

        Ok(RunOutcome {
            stats: registry.stats_rows(elapsed),
            failures: registry.failure_rows(),
            elapsed,
            users_spawned,
        })
    }
}

/// One virtual user: pick a task, run it, record it, wait, until `deadline`. A request
/// still in flight at the deadline is dropped without being recorded.
async fn virtual_user(
    scenario: Arc<Scenario>,
    mut client: ProtocolClient,
    registry: Arc<Mutex<StatsRegistry>>,
    deadline: Instant,
) {
    let mut rng = SmallRng::from_entropy();

    loop {
        let task = scenario.pick_task(&mut rng);
        let operation = scenario.materialize(task.kind, &mut rng);

        let record = tokio::select! {
            record = client.execute(operation, &task.name) => record,
            _ = sleep_until(deadline) => break,
        };
        registry.lock().await.record(&record);

        let wait = scenario.wait.sample(&mut rng);
        tokio::select! {
            _ = sleep(wait) => {}
            _ = sleep_until(deadline) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Protocol;

    fn settings(users: u32, run_time: Duration) -> LoadSettings {
        LoadSettings {
            users,
            spawn_rate: 100.0,
            run_time,
            report_interval: Duration::from_secs(60),
            request_timeout: Duration::from_millis(500),
        }
    }

    fn unreachable_targets() -> Targets {
        Targets {
            host: "http://127.0.0.1:1".to_string(),
            grpc_endpoint: "http://127.0.0.1:1".to_string(),
            ..Targets::default()
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_records_failures() {
        let runner = LoadTestRunner::new(
            Scenario::for_protocol(Protocol::Rest),
            settings(3, Duration::from_millis(300)),
            unreachable_targets(),
        )
        .unwrap()
        .with_progress(false);

        let outcome = runner.run(None).await.unwrap();
        assert_eq!(outcome.users_spawned, 3);

        let total = outcome.aggregated().unwrap();
        assert!(total.request_count >= 3);
        assert_eq!(total.failure_count, total.request_count);
        assert!(!outcome.failures.is_empty());
        assert!(outcome.stats.iter().all(|r| r.is_aggregated() || r.request_type == "GET"));
    }

    #[tokio::test]
    async fn test_run_stops_at_deadline() {
        let runner = LoadTestRunner::new(
            Scenario::for_protocol(Protocol::Grpc),
            settings(2, Duration::from_millis(200)),
            unreachable_targets(),
        )
        .unwrap()
        .with_progress(false);

        let started = std::time::Instant::now();
        let outcome = runner.run(None).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(outcome
            .stats
            .iter()
            .all(|r| r.is_aggregated() || r.request_type == "grpc"));
    }
}
