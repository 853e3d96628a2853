//! Request shaping and pass/fail classification for each wire protocol.

pub mod graphql;
pub mod grpc;
pub mod rest;
pub mod soap;

use crate::config::Targets;
use crate::grpc::MusicStreamingClient;
use crate::http::HttpClient;
use crate::scenario::{Operation, Protocol, ResponseCheck};
use anyhow::Result;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a single request was counted as a failure.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Status code: {0}")]
    Status(u16),
    #[error("Status code: {status} for user {user_id}")]
    StatusForUser { status: u16, user_id: i64 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{}", .0.message())]
    Grpc(#[from] tonic::Status),
}

impl CallError {
    /// The status failure message, naming the user for per-user requests.
    pub fn status(status: u16, operation: Operation) -> Self {
        match operation {
            Operation::UserPlaylists { user_id } => CallError::StatusForUser { status, user_id },
            _ => CallError::Status(status),
        }
    }
}

/// The outcome of one request, as the statistics collector sees it.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// HTTP method for HTTP-based protocols, `grpc` for gRPC.
    pub request_type: String,
    pub name: String,
    pub response_time: Duration,
    pub response_length: u64,
    pub error: Option<String>,
}

impl RequestRecord {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Shared success rule for the HTTP-based protocols.
pub(crate) fn check_status(
    check: ResponseCheck,
    status: u16,
    operation: Operation,
) -> Result<(), CallError> {
    let ok = match check {
        ResponseCheck::Strict => status == 200,
        ResponseCheck::Lenient => status < 400,
    };
    if ok {
        Ok(())
    } else {
        Err(CallError::status(status, operation))
    }
}

/// A connected client for one virtual user.
#[derive(Debug, Clone)]
pub enum ProtocolClient {
    Rest { http: HttpClient, check: ResponseCheck },
    GraphQl { http: HttpClient },
    Soap { http: HttpClient },
    Grpc { client: MusicStreamingClient },
}

impl ProtocolClient {
    /// Builds the client a virtual user of `protocol` needs. HTTP-based protocols
    /// share `http`; gRPC users get their own channel.
    pub fn for_user(
        protocol: Protocol,
        check: ResponseCheck,
        http: &HttpClient,
        targets: &Targets,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(match protocol {
            Protocol::Rest => ProtocolClient::Rest {
                http: http.clone(),
                check,
            },
            Protocol::GraphQl => ProtocolClient::GraphQl { http: http.clone() },
            Protocol::Soap => ProtocolClient::Soap { http: http.clone() },
            Protocol::Grpc => ProtocolClient::Grpc {
                client: MusicStreamingClient::new(
                    &targets.grpc_endpoint,
                    &targets.grpc_service,
                    timeout,
                )?,
            },
        })
    }

    pub fn request_type(&self) -> &'static str {
        match self {
            ProtocolClient::Rest { .. } => "GET",
            ProtocolClient::GraphQl { .. } | ProtocolClient::Soap { .. } => "POST",
            ProtocolClient::Grpc { .. } => "grpc",
        }
    }

    /// Target and payload lines of the request for `operation`, for display.
    pub fn describe(&self, operation: Operation) -> (String, Vec<String>) {
        match self {
            ProtocolClient::Rest { http, .. } => (http.url(&rest::path_for(operation)), Vec::new()),
            ProtocolClient::GraphQl { http } => (
                http.url(graphql::ENDPOINT),
                vec![graphql::query_for(operation).0],
            ),
            ProtocolClient::Soap { http } => (
                http.url(soap::ENDPOINT),
                soap::body_for(operation)
                    .lines()
                    .map(|l| l.trim().to_string())
                    .collect(),
            ),
            ProtocolClient::Grpc { client } => {
                (client.method_path(grpc::method_for(operation)), Vec::new())
            }
        }
    }

    /// Issues one request and times it. Never fails: errors become failed records.
    pub async fn execute(&mut self, operation: Operation, name: &str) -> RequestRecord {
        let request_type = self.request_type();
        let start = Instant::now();

        let outcome = match self {
            ProtocolClient::Rest { http, check } => rest::execute(http, *check, operation).await,
            ProtocolClient::GraphQl { http } => graphql::execute(http, operation).await,
            ProtocolClient::Soap { http } => soap::execute(http, operation).await,
            ProtocolClient::Grpc { client } => grpc::execute(client, operation).await,
        };
        let response_time = start.elapsed();

        match outcome {
            Ok(response_length) => RequestRecord {
                request_type: request_type.to_string(),
                name: name.to_string(),
                response_time,
                response_length,
                error: None,
            },
            Err(e) => {
                tracing::debug!(name, error = %e, "request failed");
                RequestRecord {
                    request_type: request_type.to_string(),
                    name: name.to_string(),
                    response_time,
                    response_length: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_strict() {
        assert!(check_status(ResponseCheck::Strict, 200, Operation::ListSongs).is_ok());
        let err = check_status(ResponseCheck::Strict, 204, Operation::ListSongs).unwrap_err();
        assert_eq!(err.to_string(), "Status code: 204");
    }

    #[test]
    fn test_check_status_lenient() {
        assert!(check_status(ResponseCheck::Lenient, 302, Operation::ListUsers).is_ok());
        assert!(check_status(ResponseCheck::Lenient, 404, Operation::ListUsers).is_err());
    }

    #[test]
    fn test_status_error_names_user() {
        let err = CallError::status(500, Operation::UserPlaylists { user_id: 17 });
        assert_eq!(err.to_string(), "Status code: 500 for user 17");
    }

    #[tokio::test]
    async fn test_describe_names_target() {
        let http = HttpClient::new("http://app:8080", Duration::from_secs(1), false).unwrap();
        let targets = Targets::default();
        let timeout = Duration::from_secs(1);

        let rest = ProtocolClient::for_user(Protocol::Rest, ResponseCheck::Strict, &http, &targets, timeout)
            .unwrap();
        let (target, lines) = rest.describe(Operation::PlaylistSongs { playlist_id: 8 });
        assert_eq!(target, "http://app:8080/api/playlists/8/musicas");
        assert!(lines.is_empty());
        assert_eq!(rest.request_type(), "GET");

        let soap = ProtocolClient::for_user(Protocol::Soap, ResponseCheck::Strict, &http, &targets, timeout)
            .unwrap();
        let (target, lines) = soap.describe(Operation::GetSong { song_id: 3 });
        assert_eq!(target, "http://app:8080/api/ws");
        assert_eq!(lines[1], "<mus:musicaId>3</mus:musicaId>");

        let grpc = ProtocolClient::for_user(Protocol::Grpc, ResponseCheck::Strict, &http, &targets, timeout)
            .unwrap();
        let (target, _) = grpc.describe(Operation::ListSongs);
        assert_eq!(target, "/musicstreaming.MusicStreamingService/ListarMusicas");
        assert_eq!(grpc.request_type(), "grpc");
    }

    #[test]
    fn test_grpc_error_uses_status_message() {
        let err = CallError::from(tonic::Status::unavailable("connection refused"));
        assert_eq!(err.to_string(), "connection refused");
    }
}
