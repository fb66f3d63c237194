//! Error types for the serving pipeline.
//!
//! None of these escape the bridge loop: each is logged where it occurs and
//! turned into a degraded path (no message, no context, next tier).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures on the serial link.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("serial write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("serial port control failed: {0}")]
    Control(String),
}

/// The index file could not be used at all.
#[derive(Debug, Error)]
pub enum IndexLoadError {
    #[error("index file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read index file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The embedding service could not produce a query vector.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("embedding service returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected embedding response structure")]
    MalformedResponse,
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
}

/// One generation tier failed to produce a reply.
#[derive(Debug, Error)]
pub enum TierFailure {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("response carried no text")]
    EmptyCompletion,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Backend(String),
}
