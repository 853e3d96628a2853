use crate::grpc::DEFAULT_SERVICE;
use crate::scenario::Protocol;
use crate::utils::parse_duration;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "streamload.yaml";

/// Harness configuration, read from `streamload.yaml`. Every section is optional and
/// command-line flags override what the file says.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HarnessConfig {
    pub targets: Targets,
    pub load: LoadConfig,
    pub matrix: MatrixConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Targets {
    /// Base URL of the REST, GraphQL and SOAP endpoints.
    pub host: String,
    pub grpc_endpoint: String,
    /// Fully-qualified gRPC service name.
    pub grpc_service: String,
    pub insecure: bool,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            host: "http://app:8080".to_string(),
            grpc_endpoint: "http://app:9090".to_string(),
            grpc_service: DEFAULT_SERVICE.to_string(),
            insecure: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoadConfig {
    pub users: u32,
    /// Users started per second.
    pub spawn_rate: f64,
    pub run_time: String,
    pub report_interval: String,
    pub request_timeout: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            users: 100,
            spawn_rate: 10.0,
            run_time: "60s".to_string(),
            report_interval: "5s".to_string(),
            // Generous, so slow responses under load are measured instead of cut off
            request_timeout: "60s".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MatrixConfig {
    pub protocols: Vec<Protocol>,
    pub user_counts: Vec<u32>,
    /// Idle time between two runs of the matrix.
    pub cooldown: String,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            protocols: Protocol::ALL.to_vec(),
            user_counts: vec![100, 1000, 10000],
            cooldown: "10s".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
    pub charts_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            charts_dir: PathBuf::from("charts"),
        }
    }
}

/// Resolved load profile of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSettings {
    pub users: u32,
    pub spawn_rate: f64,
    pub run_time: Duration,
    pub report_interval: Duration,
    pub request_timeout: Duration,
}

impl LoadConfig {
    pub fn settings(&self) -> Result<LoadSettings> {
        if self.users == 0 {
            bail!("users must be at least 1");
        }
        if self.spawn_rate.is_nan() || self.spawn_rate <= 0.0 {
            bail!("spawn_rate must be positive, got {}", self.spawn_rate);
        }

        let report_interval =
            parse_duration(&self.report_interval).context("Invalid report_interval")?;
        if report_interval.is_zero() {
            bail!("report_interval must be greater than zero");
        }

        Ok(LoadSettings {
            users: self.users,
            spawn_rate: self.spawn_rate,
            run_time: parse_duration(&self.run_time).context("Invalid run_time")?,
            report_interval,
            request_timeout: parse_duration(&self.request_timeout)
                .context("Invalid request_timeout")?,
        })
    }
}

impl HarnessConfig {
    /// Loads `path`, or `streamload.yaml` from the working directory when it exists,
    /// or falls back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    HarnessConfig::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: HarnessConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.targets.host)
            .with_context(|| format!("Invalid host URL: {}", self.targets.host))?;
        Url::parse(&self.targets.grpc_endpoint)
            .with_context(|| format!("Invalid gRPC endpoint: {}", self.targets.grpc_endpoint))?;
        if self.targets.grpc_service.is_empty() {
            bail!("grpc_service must not be empty");
        }
        self.load.settings()?;
        parse_duration(&self.matrix.cooldown).context("Invalid matrix cooldown")?;
        Ok(())
    }
}
