pub mod charts;
pub mod probe;
pub mod run;
pub mod suite;

use crate::config::HarnessConfig;
use anyhow::Result;
use std::path::PathBuf;

/// Flags shared by every command that talks to the API.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct TargetArgs {
    /// Configuration file (defaults to ./streamload.yaml when present)
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,
    /// Base URL of the REST, GraphQL and SOAP endpoints
    #[arg(long = "host")]
    pub host: Option<String>,
    /// gRPC endpoint URL
    #[arg(long = "grpc-endpoint")]
    pub grpc_endpoint: Option<String>,
    /// Fully-qualified gRPC service name
    #[arg(long = "grpc-service")]
    pub grpc_service: Option<String>,
    /// Skip TLS certificate verification
    #[arg(long = "insecure")]
    pub insecure: bool,
    /// Per-request timeout (e.g. "30s")
    #[arg(long = "timeout")]
    pub timeout: Option<String>,
}

impl TargetArgs {
    /// Loads the configuration file and applies the command-line overrides on top.
    pub fn load_config(&self) -> Result<HarnessConfig> {
        let mut config = HarnessConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.targets.host = host.clone();
        }
        if let Some(endpoint) = &self.grpc_endpoint {
            config.targets.grpc_endpoint = endpoint.clone();
        }
        if let Some(service) = &self.grpc_service {
            config.targets.grpc_service = service.clone();
        }
        if self.insecure {
            config.targets.insecure = true;
        }
        if let Some(timeout) = &self.timeout {
            config.load.request_timeout = timeout.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("streamload.yaml");
        fs::write(
            &path,
            "targets:\n  host: http://file:8080\n  grpc_endpoint: http://file:9090\n",
        )
        .unwrap();

        let args = TargetArgs {
            config: Some(path),
            host: Some("http://flag:8080".to_string()),
            timeout: Some("5s".to_string()),
            ..TargetArgs::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.targets.host, "http://flag:8080");
        assert_eq!(config.targets.grpc_endpoint, "http://file:9090");
        assert_eq!(config.load.request_timeout, "5s");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("streamload.yaml");
        fs::write(&path, "{}\n").unwrap();

        let args = TargetArgs {
            config: Some(path),
            timeout: Some("forever".to_string()),
            ..TargetArgs::default()
        };
        assert!(args.load_config().is_err());
    }
}
