use anyhow::Result;
use std::fs;
use std::time::Duration;
use streamload::performance::{run_prefix, ResultFiles, StatsRegistry};
use streamload::protocols::RequestRecord;
use streamload::report::{self, charts::CHART_FILES, html::INDEX_FILE, summary::SUMMARY_FILE};
use streamload::scenario::{Protocol, Scenario};
use tempfile::TempDir;

fn record(protocol: Protocol, name: &str, millis: u64, error: Option<&str>) -> RequestRecord {
    let request_type = match protocol {
        Protocol::Rest => "GET",
        Protocol::Grpc => "grpc",
        _ => "POST",
    };
    RequestRecord {
        request_type: request_type.to_string(),
        name: name.to_string(),
        response_time: Duration::from_millis(millis),
        response_length: 256,
        error: error.map(str::to_string),
    }
}

/// Writes a stats file shaped like a real run of the comparison scenario.
fn write_run(dir: &std::path::Path, protocol: Protocol, users: u32, base_ms: u64) -> Result<()> {
    let scenario = Scenario::for_protocol(protocol);
    let mut registry = StatsRegistry::new();
    for (i, task) in scenario.tasks.iter().enumerate() {
        for n in 0..20 {
            let error = (n == 0 && i == 2).then_some("Status code: 500");
            registry.record(&record(protocol, &task.name, base_ms + n * 3, error));
        }
    }

    let files = ResultFiles::new(dir, run_prefix(protocol.slug(), users));
    files.ensure_dir()?;
    files.write_stats(&registry.stats_rows(Duration::from_secs(30)))?;
    files.write_failures(&registry.failure_rows())?;
    Ok(())
}

/// Test full report generation from a results directory
#[test]
fn test_generate_writes_charts_summary_and_index() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let results_dir = temp_dir.path().join("results");
    let charts_dir = temp_dir.path().join("charts");

    for (protocol, base) in [(Protocol::Rest, 40), (Protocol::Grpc, 10)] {
        write_run(&results_dir, protocol, 100, base)?;
        write_run(&results_dir, protocol, 1000, base * 4)?;
    }

    let generated = report::generate(
        &results_dir,
        &charts_dir,
        &[Protocol::Rest, Protocol::Grpc],
        &[100, 1000],
    )?
    .expect("results were written");

    assert_eq!(generated.len(), CHART_FILES.len() + 2);
    for file in CHART_FILES {
        let content = fs::read_to_string(charts_dir.join(file))?;
        assert!(content.contains("<svg"), "{} is not an SVG", file);
    }

    let summary = fs::read_to_string(charts_dir.join(SUMMARY_FILE))?;
    assert!(summary.contains("CARGA: 100 USUÁRIOS"));
    assert!(summary.contains("CARGA: 1000 USUÁRIOS"));
    assert!(summary.contains("REST"));
    assert!(summary.contains("  Total de Requisições: 60"));
    assert!(summary.contains("  Falhas: 1"));

    let index = fs::read_to_string(charts_dir.join(INDEX_FILE))?;
    assert!(index.contains("overall_performance.svg"));
    assert!(index.contains(SUMMARY_FILE));

    Ok(())
}

/// Test that missing runs are skipped rather than failing the report
#[test]
fn test_generate_with_partial_matrix() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let results_dir = temp_dir.path().join("results");
    let charts_dir = temp_dir.path().join("charts");

    write_run(&results_dir, Protocol::Soap, 100, 25)?;

    let generated = report::generate(
        &results_dir,
        &charts_dir,
        &Protocol::ALL,
        &[100, 1000, 10000],
    )?;
    assert!(generated.is_some());

    let summary = fs::read_to_string(charts_dir.join(SUMMARY_FILE))?;
    assert!(summary.contains("SOAP"));
    assert!(!summary.contains("GRAPHQL"));

    Ok(())
}

/// Test that an empty results directory produces nothing
#[test]
fn test_generate_without_results() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let charts_dir = temp_dir.path().join("charts");

    let generated = report::generate(temp_dir.path(), &charts_dir, &Protocol::ALL, &[100])?;
    assert!(generated.is_none());
    assert!(!charts_dir.exists());

    Ok(())
}

/// Test that a malformed stats file is skipped while the others still load
#[test]
fn test_unreadable_stats_file_is_skipped() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let results_dir = temp_dir.path().join("results");
    let charts_dir = temp_dir.path().join("charts");

    write_run(&results_dir, Protocol::Rest, 100, 30)?;
    let broken = ResultFiles::new(&results_dir, run_prefix(Protocol::Grpc.slug(), 100)).stats();
    fs::write(&broken, "Type,Name\ngrpc,half a row\n")?;

    let results = report::load_results(&results_dir, &[Protocol::Rest, Protocol::Grpc], &[100]);
    assert_eq!(results.rows.len(), 4);
    assert!(results.rows.iter().all(|r| r.protocol == Protocol::Rest));
    assert!(results.aggregated(Protocol::Grpc, 100).is_none());

    let generated = report::generate(
        &results_dir,
        &charts_dir,
        &[Protocol::Rest, Protocol::Grpc],
        &[100],
    )?;
    assert!(generated.is_some());
    let summary = fs::read_to_string(charts_dir.join(SUMMARY_FILE))?;
    assert!(summary.contains("REST"));
    assert!(!summary.contains("GRPC"));

    Ok(())
}

/// Test that a stats file with N/A percentiles still loads
#[test]
fn test_load_results_accepts_missing_percentiles() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = ResultFiles::new(temp_dir.path(), run_prefix("graphql", 100)).stats();
    fs::write(
        &path,
        "Type,Name,Request Count,Failure Count,Median Response Time,Average Response Time,\
Min Response Time,Max Response Time,Average Content Size,Requests/s,Failures/s,\
50%,66%,75%,80%,90%,95%,98%,99%,99.9%,99.99%,100%\n\
,Aggregated,0,0,N/A,0,0,0,0,0,0,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A,N/A\n",
    )?;

    let results = report::load_results(temp_dir.path(), &[Protocol::GraphQl], &[100]);
    assert_eq!(results.rows.len(), 1);
    let row = results.aggregated(Protocol::GraphQl, 100).expect("aggregated row");
    assert_eq!(row.p95, None);
    assert_eq!(row.failure_rate(), 0.0);

    Ok(())
}
