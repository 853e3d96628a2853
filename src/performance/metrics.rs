use crate::protocols::RequestRecord;
use crate::utils::as_millis_f64;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const AGGREGATED_NAME: &str = "Aggregated";

/// Raw measurements of one `(request type, name)` pair.
#[derive(Debug, Clone)]
pub struct EntryStats {
    pub request_type: String,
    pub name: String,
    pub request_count: u64,
    pub failure_count: u64,
    pub response_times: Vec<Duration>,
    pub total_content_length: u64,
}

impl EntryStats {
    pub fn new(request_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            name: name.into(),
            request_count: 0,
            failure_count: 0,
            response_times: Vec::new(),
            total_content_length: 0,
        }
    }

    pub fn record(&mut self, record: &RequestRecord) {
        self.request_count += 1;
        self.response_times.push(record.response_time);
        self.total_content_length += record.response_length;

        if record.is_failure() {
            self.failure_count += 1;
        }
    }

    pub fn merge(&mut self, other: &EntryStats) {
        self.request_count += other.request_count;
        self.failure_count += other.failure_count;
        self.response_times.extend(other.response_times.iter());
        self.total_content_length += other.total_content_length;
    }

    /// Summarizes the entry over a run that has lasted `elapsed`.
    pub fn to_row(&self, elapsed: Duration) -> StatsRow {
        let mut sorted = self.response_times.clone();
        sorted.sort_unstable();

        let secs = elapsed.as_secs_f64();
        let per_second = |count: u64| if secs > 0.0 { count as f64 / secs } else { 0.0 };
        let pct = |p: f64| percentile(&sorted, p).map(|d| as_millis_f64(d).round());

        let (average, min, max, average_content_size) = if sorted.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let total: Duration = sorted.iter().sum();
            (
                as_millis_f64(total) / sorted.len() as f64,
                as_millis_f64(sorted[0]),
                as_millis_f64(sorted[sorted.len() - 1]),
                self.total_content_length as f64 / self.request_count as f64,
            )
        };

        StatsRow {
            request_type: self.request_type.clone(),
            name: self.name.clone(),
            request_count: self.request_count,
            failure_count: self.failure_count,
            median_response_time: pct(50.0),
            average_response_time: average,
            min_response_time: min,
            max_response_time: max,
            average_content_size,
            requests_per_second: per_second(self.request_count),
            failures_per_second: per_second(self.failure_count),
            p50: pct(50.0),
            p66: pct(66.0),
            p75: pct(75.0),
            p80: pct(80.0),
            p90: pct(90.0),
            p95: pct(95.0),
            p98: pct(98.0),
            p99: pct(99.0),
            p99_9: pct(99.9),
            p99_99: pct(99.99),
            p100: pct(100.0),
        }
    }
}

/// Nearest-rank percentile of an ascending slice.
pub fn percentile(sorted: &[Duration], p: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[index])
}

/// Collects every request of a run.
#[derive(Debug)]
pub struct StatsRegistry {
    start_time: Instant,
    entries: IndexMap<(String, String), EntryStats>,
    failures: IndexMap<(String, String, String), u64>,
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            entries: IndexMap::new(),
            failures: IndexMap::new(),
        }
    }

    /// Restarts the clock that requests/s is measured against.
    pub fn reset_clock(&mut self) {
        self.start_time = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn record(&mut self, record: &RequestRecord) {
        self.entries
            .entry((record.request_type.clone(), record.name.clone()))
            .or_insert_with(|| EntryStats::new(&record.request_type, &record.name))
            .record(record);

        if let Some(error) = &record.error {
            *self
                .failures
                .entry((record.request_type.clone(), record.name.clone(), error.clone()))
                .or_insert(0) += 1;
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.entries.values().map(|e| e.request_count).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.entries.values().map(|e| e.failure_count).sum()
    }

    pub fn aggregated(&self) -> EntryStats {
        let mut total = EntryStats::new("", AGGREGATED_NAME);
        for entry in self.entries.values() {
            total.merge(entry);
        }
        total
    }

    /// Per-endpoint rows sorted by name, followed by the aggregated row.
    pub fn stats_rows(&self, elapsed: Duration) -> Vec<StatsRow> {
        let mut rows: Vec<StatsRow> = self.entries.values().map(|e| e.to_row(elapsed)).collect();
        rows.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.request_type.cmp(&b.request_type))
        });
        rows.push(self.aggregated().to_row(elapsed));
        rows
    }

    /// Distinct errors, most frequent first.
    pub fn failure_rows(&self) -> Vec<FailureRow> {
        let mut rows: Vec<FailureRow> = self
            .failures
            .iter()
            .map(|((method, name, error), occurrences)| FailureRow {
                method: method.clone(),
                name: name.clone(),
                error: error.clone(),
                occurrences: *occurrences,
            })
            .collect();
        rows.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        rows
    }

    /// The aggregated row as of now.
    pub fn aggregated_row(&self) -> StatsRow {
        self.aggregated().to_row(self.elapsed())
    }

    pub fn history_row(&self, timestamp: i64, user_count: usize) -> HistoryRow {
        HistoryRow::from_aggregated(&self.aggregated_row(), timestamp, user_count)
    }
}

/// One line of `<prefix>_stats.csv`. The same shape is read back by the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRow {
    #[serde(rename = "Type")]
    pub request_type: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Request Count")]
    pub request_count: u64,
    #[serde(rename = "Failure Count")]
    pub failure_count: u64,
    #[serde(rename = "Median Response Time", with = "not_available")]
    pub median_response_time: Option<f64>,
    #[serde(rename = "Average Response Time", deserialize_with = "lenient_f64")]
    pub average_response_time: f64,
    #[serde(rename = "Min Response Time", deserialize_with = "lenient_f64")]
    pub min_response_time: f64,
    #[serde(rename = "Max Response Time", deserialize_with = "lenient_f64")]
    pub max_response_time: f64,
    #[serde(rename = "Average Content Size", deserialize_with = "lenient_f64")]
    pub average_content_size: f64,
    #[serde(rename = "Requests/s", deserialize_with = "lenient_f64")]
    pub requests_per_second: f64,
    #[serde(rename = "Failures/s", deserialize_with = "lenient_f64")]
    pub failures_per_second: f64,
    #[serde(rename = "50%", with = "not_available")]
    pub p50: Option<f64>,
    #[serde(rename = "66%", with = "not_available")]
    pub p66: Option<f64>,
    #[serde(rename = "75%", with = "not_available")]
    pub p75: Option<f64>,
    #[serde(rename = "80%", with = "not_available")]
    pub p80: Option<f64>,
    #[serde(rename = "90%", with = "not_available")]
    pub p90: Option<f64>,
    #[serde(rename = "95%", with = "not_available")]
    pub p95: Option<f64>,
    #[serde(rename = "98%", with = "not_available")]
    pub p98: Option<f64>,
    #[serde(rename = "99%", with = "not_available")]
    pub p99: Option<f64>,
    #[serde(rename = "99.9%", with = "not_available")]
    pub p99_9: Option<f64>,
    #[serde(rename = "99.99%", with = "not_available")]
    pub p99_99: Option<f64>,
    #[serde(rename = "100%", with = "not_available")]
    pub p100: Option<f64>,
}

impl StatsRow {
    pub fn is_aggregated(&self) -> bool {
        self.name == AGGREGATED_NAME
    }

    /// Failures as a percentage of requests; 0 when nothing was sent.
    pub fn failure_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.failure_count as f64 / self.request_count as f64 * 100.0
        }
    }
}

/// One line of `<prefix>_failures.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRow {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "Occurrences")]
    pub occurrences: u64,
}

/// One line of `<prefix>_stats_history.csv`, written on every monitor tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "User Count")]
    pub user_count: usize,
    #[serde(rename = "Type")]
    pub request_type: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Requests/s")]
    pub requests_per_second: f64,
    #[serde(rename = "Failures/s")]
    pub failures_per_second: f64,
    #[serde(rename = "50%", with = "not_available")]
    pub p50: Option<f64>,
    #[serde(rename = "95%", with = "not_available")]
    pub p95: Option<f64>,
    #[serde(rename = "99%", with = "not_available")]
    pub p99: Option<f64>,
    #[serde(rename = "Total Request Count")]
    pub total_request_count: u64,
    #[serde(rename = "Total Failure Count")]
    pub total_failure_count: u64,
    #[serde(rename = "Total Average Response Time")]
    pub total_average_response_time: f64,
}

impl HistoryRow {
    pub fn from_aggregated(row: &StatsRow, timestamp: i64, user_count: usize) -> Self {
        Self {
            timestamp,
            user_count,
            request_type: row.request_type.clone(),
            name: row.name.clone(),
            requests_per_second: row.requests_per_second,
            failures_per_second: row.failures_per_second,
            p50: row.p50,
            p95: row.p95,
            p99: row.p99,
            total_request_count: row.request_count,
            total_failure_count: row.failure_count,
            total_average_response_time: row.average_response_time,
        }
    }
}

// Empty measurements are written as `N/A`, and read back as `None`.
mod not_available {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_f64(*v),
            None => serializer.serialize_str("N/A"),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("N/A") {
            return Ok(None);
        }
        raw.parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(not_available::deserialize(deserializer)?.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, millis: u64, length: u64, error: Option<&str>) -> RequestRecord {
        RequestRecord {
            request_type: "GET".to_string(),
            name: name.to_string(),
            response_time: Duration::from_millis(millis),
            response_length: length,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_entry_row_summary() {
        let mut entry = EntryStats::new("GET", "REST - Listar Todos Usuários");
        entry.record(&record("x", 100, 1000, None));
        entry.record(&record("x", 150, 2000, None));
        entry.record(&record("x", 200, 0, Some("Status code: 500")));

        let row = entry.to_row(Duration::from_secs(3));
        assert_eq!(row.request_count, 3);
        assert_eq!(row.failure_count, 1);
        assert_eq!(row.average_response_time, 150.0);
        assert_eq!(row.min_response_time, 100.0);
        assert_eq!(row.max_response_time, 200.0);
        assert_eq!(row.average_content_size, 1000.0);
        assert_eq!(row.requests_per_second, 1.0);
        assert!((row.failures_per_second - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(row.median_response_time, Some(150.0));
        assert_eq!(row.p100, Some(200.0));
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let times: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        assert_eq!(percentile(&times, 50.0), Some(Duration::from_millis(50)));
        assert_eq!(percentile(&times, 95.0), Some(Duration::from_millis(95)));
        assert_eq!(percentile(&times, 99.99), Some(Duration::from_millis(100)));
        assert_eq!(percentile(&times, 100.0), Some(Duration::from_millis(100)));
        assert_eq!(percentile(&[], 50.0), None);

        let single = [Duration::from_millis(7)];
        assert_eq!(percentile(&single, 1.0), Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_empty_entry_has_no_percentiles() {
        let row = EntryStats::new("POST", "empty").to_row(Duration::from_secs(1));
        assert_eq!(row.request_count, 0);
        assert_eq!(row.p50, None);
        assert_eq!(row.average_response_time, 0.0);
        assert_eq!(row.failure_rate(), 0.0);
    }

    #[test]
    fn test_registry_rows_end_with_aggregated() {
        let mut registry = StatsRegistry::new();
        registry.record(&record("b", 10, 5, None));
        registry.record(&record("a", 20, 5, None));
        registry.record(&record("a", 30, 5, Some("Status code: 404")));
        registry.record(&record("a", 40, 5, Some("Status code: 404")));

        let rows = registry.stats_rows(Duration::from_secs(2));
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", AGGREGATED_NAME]);

        let aggregated = rows.last().unwrap();
        assert!(aggregated.is_aggregated());
        assert_eq!(aggregated.request_type, "");
        assert_eq!(aggregated.request_count, 4);
        assert_eq!(aggregated.failure_count, 2);
        assert_eq!(aggregated.failure_rate(), 50.0);
        assert_eq!(aggregated.requests_per_second, 2.0);

        let failures = registry.failure_rows();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "a");
        assert_eq!(failures[0].occurrences, 2);
        assert_eq!(registry.total_requests(), 4);
        assert_eq!(registry.total_failures(), 2);
    }

    #[test]
    fn test_same_name_different_type_kept_apart() {
        let mut registry = StatsRegistry::new();
        registry.record(&record("x", 10, 0, None));
        let mut grpc = record("x", 10, 0, None);
        grpc.request_type = "grpc".to_string();
        registry.record(&grpc);

        let rows = registry.stats_rows(Duration::from_secs(1));
        let types: Vec<&str> = rows.iter().map(|r| r.request_type.as_str()).collect();
        assert_eq!(types, vec!["GET", "grpc", ""]);
    }

    #[test]
    fn test_history_row_mirrors_aggregated_row() {
        let mut registry = StatsRegistry::new();
        registry.record(&record("a", 20, 5, None));
        registry.record(&record("b", 40, 5, Some("Status code: 500")));

        let row = registry.aggregated_row();
        let history = HistoryRow::from_aggregated(&row, 1_700_000_000, 7);
        assert_eq!(history.timestamp, 1_700_000_000);
        assert_eq!(history.user_count, 7);
        assert_eq!(history.name, AGGREGATED_NAME);
        assert_eq!(history.total_request_count, 2);
        assert_eq!(history.total_failure_count, 1);
        assert_eq!(history.p50, row.p50);
        assert_eq!(history.total_average_response_time, row.average_response_time);
    }

    #[test]
    fn test_stats_row_reads_not_available() {
        let csv_text = "Type,Name,Request Count,Failure Count,Median Response Time,Average Response Time,Min Response Time,Max Response Time,Average Content Size,Requests/s,Failures/s,50%,66%,75%,80%,90%,95%,98%,99%,99.9%,99.99%,100%\n\
GET,/api/usuarios,0,0,0,0.0,0,0,0,0.0,0.0,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A\n";
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let row: StatsRow = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(row.request_count, 0);
        assert_eq!(row.p95, None);
        assert_eq!(row.median_response_time, Some(0.0));
    }
}
