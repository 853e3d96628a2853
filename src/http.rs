use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for the REST, GraphQL and SOAP scenarios.
///
/// `reqwest::Client` pools connections internally, so cloning this is cheap and every
/// virtual user of a run talks through the same pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration, insecure: bool) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);

        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build().context("Failed to create HTTP client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for an API path such as `/api/musicas`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
