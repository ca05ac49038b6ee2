//! Helper functions for TLS and endpoint handling.

use crate::error::IngestError;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio_rustls::TlsConnector;

/// Create a TLS connector trusting the bundled webpki roots
pub fn create_tls_connector() -> TlsConnector {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Server name for SNI and certificate verification
pub fn server_name(host: &str) -> Result<ServerName<'static>, IngestError> {
    ServerName::try_from(host.to_string())
        .map_err(|e| IngestError::Tls(format!("invalid server name {}: {}", host, e)))
}

/// Host header value; default ports are omitted
pub fn host_header(host: &str, port: u16, https: bool) -> String {
    let default_port = if https { 443 } else { 80 };
    if port == default_port {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    }
}
