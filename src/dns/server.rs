//! UDP DNS server loop.

use crate::dns::handler::handle_dns_query;
use crate::zone::ZoneStore;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

/// Largest query we read; anything longer is cut at this size
const MAX_QUERY_SIZE: usize = 512;

/// Authoritative UDP responder bound to one address
pub struct DnsServer {
    socket: Arc<UdpSocket>,
    store: Arc<ZoneStore>,
    log_queries: bool,
}

impl DnsServer {
    pub async fn bind(
        listen_addr: SocketAddr,
        store: Arc<ZoneStore>,
        log_queries: bool,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(listen_addr).await?;
        Ok(DnsServer {
            socket: Arc::new(socket),
            store,
            log_queries,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve queries until `shutdown` resolves.
    ///
    /// Each query is answered from its own task; tasks already spawned finish
    /// after the loop stops.
    pub async fn run<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(listen = %self.local_addr()?, "DNS server started");

        tokio::pin!(shutdown);

        loop {
            let mut buf = vec![0u8; MAX_QUERY_SIZE];
            let (len, src) = tokio::select! {
                _ = &mut shutdown => {
                    info!("DNS server stopping");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        // ICMP port unreachable from an earlier send surfaces here on some platforms
                        debug!(error = %e, "DNS receive failed");
                        continue;
                    }
                },
            };
            buf.truncate(len);

            debug!(bytes = len, client = %src, "DNS query received");

            let socket = Arc::clone(&self.socket);
            let store = Arc::clone(&self.store);
            let log_queries = self.log_queries;

            tokio::spawn(async move {
                match handle_dns_query(&buf, src, &store, log_queries) {
                    Ok(response) => {
                        if let Err(e) = socket.send_to(&response, src).await {
                            error!(client = %src, error = %e, "DNS failed to send response");
                        } else {
                            debug!(bytes = response.len(), client = %src, "DNS response sent");
                        }
                    }
                    Err(e) => {
                        debug!(client = %src, error = %e, "DNS dropping unparseable packet");
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::record::ResourceRecord;
    use crate::dns::wire::builder::{build_query, parse_response};
    use crate::dns::wire::RecordType;
    use crate::zone::{ZoneKey, ZoneTable};
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn start(store: Arc<ZoneStore>) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<io::Result<()>>) {
        let server = DnsServer::bind("127.0.0.1:0".parse().unwrap(), store, false)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));
        (addr, tx, handle)
    }

    async fn query(server: SocketAddr, name: &str, qtype: RecordType, id: u16) -> Option<Vec<u8>> {
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(&build_query(name, qtype, id), server)
            .await
            .unwrap();
        let mut buf = vec![0u8; 1024];
        match tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => {
                buf.truncate(len);
                Some(buf)
            }
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_server_answers_query() {
        let store = Arc::new(ZoneStore::new());
        let mut table = ZoneTable::new();
        table.insert(
            ZoneKey::from_name("example.com").unwrap(),
            vec![ResourceRecord::a("example.com", Ipv4Addr::new(1, 2, 3, 4), 300)],
        );
        store.replace_live(table);

        let (addr, _tx, _handle) = start(store).await;

        let response = query(addr, "www.example.com", RecordType::A, 0x4242)
            .await
            .expect("no response");
        let parsed = parse_response(&response).unwrap();
        assert_eq!(parsed.id, 0x4242);
        assert_eq!(parsed.addrs(), vec![Ipv4Addr::new(1, 2, 3, 4)]);
    }

    #[tokio::test]
    async fn test_server_answers_empty_store() {
        let (addr, _tx, _handle) = start(Arc::new(ZoneStore::new())).await;

        let response = query(addr, "example.com", RecordType::A, 1)
            .await
            .expect("no response");
        assert!(parse_response(&response).unwrap().answers.is_empty());
    }

    #[tokio::test]
    async fn test_server_ignores_short_packet() {
        let (addr, _tx, _handle) = start(Arc::new(ZoneStore::new())).await;

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&[0x00, 0x01, 0x02], addr).await.unwrap();

        let mut buf = [0u8; 512];
        let result =
            tokio::time::timeout(Duration::from_millis(300), client.recv_from(&mut buf)).await;
        assert!(result.is_err(), "short packet should get no response");

        // Still serving afterwards
        assert!(query(addr, "example.com", RecordType::A, 2).await.is_some());
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let (_addr, tx, handle) = start(Arc::new(ZoneStore::new())).await;
        tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server did not stop");
        assert!(result.unwrap().is_ok());
    }
}
