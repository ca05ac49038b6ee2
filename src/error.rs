//! Structured error types for the responder.

use std::fmt;
use std::io;

/// Top-level error type for startup and serving
#[derive(Debug)]
pub enum ServerError {
    /// IO error (socket bind, stdin, file operations)
    Io(io::Error),
    /// Configuration error
    Config(String),
    /// Zone ingestion failed
    Ingest(IngestError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Io(e) => write!(f, "IO error: {}", e),
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Ingest(e) => write!(f, "Ingestion error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Io(e) => Some(e),
            ServerError::Ingest(e) => Some(e),
            ServerError::Config(_) => None,
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        ServerError::Io(err)
    }
}

impl From<IngestError> for ServerError {
    fn from(err: IngestError) -> Self {
        ServerError::Ingest(err)
    }
}

/// Errors raised while fetching or parsing zone data
#[derive(Debug)]
pub enum IngestError {
    /// Endpoint is not a usable http/https URI
    InvalidEndpoint(String),
    /// TCP connect failed
    Connect(String),
    /// TLS setup or handshake failed
    Tls(String),
    /// HTTP protocol failure
    Http(String),
    /// Source answered with a non-success status
    Status(u16),
    /// Fetch did not complete within the configured timeout
    Timeout,
    /// Response body exceeded the configured limit
    BodyTooLarge(u64),
    /// Response body was not a JSON array of records
    Parse(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::InvalidEndpoint(msg) => write!(f, "invalid endpoint: {}", msg),
            IngestError::Connect(msg) => write!(f, "connect failed: {}", msg),
            IngestError::Tls(msg) => write!(f, "TLS failure: {}", msg),
            IngestError::Http(msg) => write!(f, "HTTP failure: {}", msg),
            IngestError::Status(code) => {
                write!(f, "zone source returned status {}", code)
            }
            IngestError::Timeout => write!(f, "zone source request timed out"),
            IngestError::BodyTooLarge(limit) => {
                write!(f, "zone source body exceeds {} bytes", limit)
            }
            IngestError::Parse(msg) => write!(f, "invalid zone data: {}", msg),
        }
    }
}

impl std::error::Error for IngestError {}

/// DNS-related errors
#[derive(Debug)]
pub enum DnsError {
    /// Packet could not be parsed far enough to answer
    ParseError(String),
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsError::ParseError(msg) => write!(f, "DNS parse error: {}", msg),
        }
    }
}

impl std::error::Error for DnsError {}
