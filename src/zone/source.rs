//! Zone data sources.
//!
//! `HttpZoneSource` performs a single authenticated GET per fetch over a fresh
//! hyper http1 connection, optionally wrapped in TLS.

use crate::body::{collect_limited, BodyExt, Empty, LimitedError};
use crate::config::SourceConfig;
use crate::error::IngestError;
use crate::helpers::{create_tls_connector, host_header, server_name};
use crate::tokio_io::TokioIo;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use bytes::Bytes;
use hyper::header::{ACCEPT, AUTHORIZATION, HOST, USER_AGENT};
use hyper::{Method, Request, Uri};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Anything that can hand back a raw zone export.
pub trait ZoneSource: Send + Sync {
    /// Fetch the complete zone body
    fn fetch(&self) -> impl Future<Output = Result<Bytes, IngestError>> + Send;
}

/// Zone source backed by an HTTP(S) endpoint with Basic auth
pub struct HttpZoneSource {
    endpoint: String,
    host: String,
    port: u16,
    path: String,
    authorization: String,
    timeout: Duration,
    max_body_bytes: u64,
    tls: Option<TlsConnector>,
}

impl HttpZoneSource {
    pub fn new(config: &SourceConfig) -> Result<Self, IngestError> {
        let uri: Uri = config
            .endpoint
            .parse()
            .map_err(|e| IngestError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;

        let https = match uri.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            _ => {
                return Err(IngestError::InvalidEndpoint(format!(
                    "{}: scheme must be http or https",
                    config.endpoint
                )))
            }
        };

        let host = uri
            .host()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                IngestError::InvalidEndpoint(format!("{}: missing host", config.endpoint))
            })?
            .to_string();

        let port = uri.port_u16().unwrap_or(if https { 443 } else { 80 });

        let path = uri
            .path_and_query()
            .map(|p| p.as_str())
            .filter(|p| !p.is_empty())
            .unwrap_or("/")
            .to_string();

        let credentials = format!("{}:{}", config.username, config.password);
        let authorization = format!("Basic {}", BASE64_STANDARD.encode(credentials));

        Ok(HttpZoneSource {
            endpoint: config.endpoint.clone(),
            host,
            port,
            path,
            authorization,
            timeout: Duration::from_millis(config.timeout_ms),
            max_body_bytes: config.max_body_bytes,
            tls: https.then(create_tls_connector),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_inner(&self) -> Result<Bytes, IngestError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| IngestError::Connect(format!("{}:{}: {}", self.host, self.port, e)))?;

        match &self.tls {
            Some(connector) => {
                let name = server_name(&self.host)?;
                let tls_stream = connector
                    .connect(name, stream)
                    .await
                    .map_err(|e| IngestError::Tls(format!("{}: {}", self.host, e)))?;
                self.request(TokioIo::new(tls_stream)).await
            }
            None => self.request(TokioIo::new(stream)).await,
        }
    }

    async fn request<T>(&self, io: TokioIo<T>) -> Result<Bytes, IngestError>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| IngestError::Http(format!("handshake failed: {}", e)))?;

        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                debug!(error = ?err, "Zone source connection driver error");
            }
        });

        let request = Request::builder()
            .method(Method::GET)
            .uri(self.path.as_str())
            .header(HOST, host_header(&self.host, self.port, self.tls.is_some()))
            .header(AUTHORIZATION, self.authorization.as_str())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("zonekeeper/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
            .map_err(|e| IngestError::Http(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| IngestError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status(status.as_u16()));
        }

        let body = response.into_body().limited(self.max_body_bytes);
        collect_limited(body).await.map_err(|e| match e {
            LimitedError::LimitExceeded(e) => IngestError::BodyTooLarge(e.limit),
            LimitedError::Inner(e) => IngestError::Http(e.to_string()),
        })
    }
}

impl ZoneSource for HttpZoneSource {
    async fn fetch(&self) -> Result<Bytes, IngestError> {
        debug!(endpoint = %self.endpoint, "Fetching zone data");
        match tokio::time::timeout(self.timeout, self.fetch_inner()).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Timeout),
        }
    }
}
