//! Load generation for a music-streaming API over REST, GraphQL, SOAP and gRPC, plus the
//! post-processing that turns the resulting CSV files into comparison charts.

pub mod commands;
pub mod config;
pub mod grpc;
pub mod http;
pub mod logging;
pub mod performance;
pub mod protocols;
pub mod report;
pub mod scenario;
pub mod ui;
pub mod utils;
