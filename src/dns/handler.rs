//! Query resolution against the zone store.

use crate::dns::record::ResourceRecord;
use crate::dns::wire::{build_response, empty_response, DnsQuery, RecordType};
use crate::error::DnsError;
use crate::zone::{ZoneKey, ZoneStore};
use std::net::SocketAddr;
use tracing::{debug, info};

/// Answer set for `query`: the store's records for the question's zone key
/// when the question asks for A, empty otherwise.
pub fn resolve(query: &DnsQuery, store: &ZoneStore) -> Vec<ResourceRecord> {
    let Some(question) = query.question() else {
        return Vec::new();
    };

    if question.qtype != RecordType::A {
        return Vec::new();
    }

    match ZoneKey::from_name(&question.name) {
        Some(key) => store.lookup(&key),
        None => Vec::new(),
    }
}

/// Build the response bytes for one inbound packet.
///
/// Queries whose header is readable always get a NOERROR response. Packets
/// too short for a header, or with the QR bit set, yield an error and must
/// be dropped.
pub fn handle_dns_query(
    query_buf: &[u8],
    client: SocketAddr,
    store: &ZoneStore,
    log_queries: bool,
) -> Result<Vec<u8>, DnsError> {
    let query = match DnsQuery::parse(query_buf) {
        Ok(q) => q,
        Err(e) => {
            debug!(
                client = %client,
                error = %e,
                bytes = query_buf.len(),
                "DNS failed to parse query"
            );
            return empty_response(query_buf).ok_or_else(|| DnsError::ParseError(e.to_string()));
        }
    };

    let answers = resolve(&query, store);

    match query.question() {
        Some(q) if log_queries => info!(
            id = query.id(),
            client = %client,
            name = %q.name,
            qtype = %q.qtype,
            answers = answers.len(),
            "DNS query"
        ),
        Some(q) => debug!(
            id = query.id(),
            client = %client,
            name = %q.name,
            qtype = %q.qtype,
            answers = answers.len(),
            "DNS query"
        ),
        None => debug!(id = query.id(), client = %client, "DNS query without question"),
    }

    Ok(build_response(&query, &answers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::wire::builder::{build_empty_query, build_query, parse_response};
    use crate::dns::wire::ResponseCode;
    use crate::zone::ZoneTable;
    use std::net::Ipv4Addr;

    fn client() -> SocketAddr {
        "127.0.0.1:5300".parse().unwrap()
    }

    fn store_with(records: Vec<ResourceRecord>) -> ZoneStore {
        let mut table = ZoneTable::new();
        for record in records {
            let key = ZoneKey::from_name(&record.name).unwrap();
            table.entry(key).or_default().push(record);
        }
        let store = ZoneStore::new();
        store.replace_live(table);
        store
    }

    fn a(name: &str, ip: [u8; 4]) -> ResourceRecord {
        ResourceRecord::a(name, Ipv4Addr::from(ip), 300)
    }

    #[test]
    fn test_subdomain_query_answers_from_zone() {
        let store = store_with(vec![a("example.com", [1, 2, 3, 4])]);
        let query = DnsQuery::parse(&build_query("www.example.com", RecordType::A, 7)).unwrap();

        let answers = resolve(&query, &store);
        assert_eq!(answers, vec![a("example.com", [1, 2, 3, 4])]);
    }

    #[test]
    fn test_answers_keep_store_order() {
        let store = store_with(vec![
            a("example.com", [1, 1, 1, 1]),
            a("www.example.com", [2, 2, 2, 2]),
            a("example.com", [3, 3, 3, 3]),
        ]);
        let buf = build_query("example.com", RecordType::A, 1);
        let response = handle_dns_query(&buf, client(), &store, false).unwrap();

        let parsed = parse_response(&response).unwrap();
        assert_eq!(
            parsed.addrs(),
            vec![
                Ipv4Addr::new(1, 1, 1, 1),
                Ipv4Addr::new(2, 2, 2, 2),
                Ipv4Addr::new(3, 3, 3, 3)
            ]
        );
    }

    #[test]
    fn test_non_a_query_is_empty() {
        let store = store_with(vec![a("example.com", [1, 2, 3, 4])]);
        for qtype in [RecordType::AAAA, RecordType::MX, RecordType::TXT, RecordType::ANY] {
            let query = DnsQuery::parse(&build_query("example.com", qtype, 1)).unwrap();
            assert!(resolve(&query, &store).is_empty(), "{} answered", qtype);
        }
    }

    #[test]
    fn test_single_label_name_is_empty() {
        let store = store_with(vec![a("example.com", [1, 2, 3, 4])]);
        let query = DnsQuery::parse(&build_query("com", RecordType::A, 1)).unwrap();
        assert!(resolve(&query, &store).is_empty());
    }

    #[test]
    fn test_no_question_gets_empty_response() {
        let store = store_with(vec![a("example.com", [1, 2, 3, 4])]);
        let response = handle_dns_query(&build_empty_query(42), client(), &store, false).unwrap();

        let parsed = parse_response(&response).unwrap();
        assert_eq!(parsed.id, 42);
        assert_eq!(parsed.qdcount, 0);
        assert!(parsed.answers.is_empty());
    }

    #[test]
    fn test_unknown_domain_noerror_empty() {
        let store = store_with(vec![a("example.com", [1, 2, 3, 4])]);
        let buf = build_query("nothing.example.org", RecordType::A, 9);
        let response = handle_dns_query(&buf, client(), &store, true).unwrap();

        let parsed = parse_response(&response).unwrap();
        assert_eq!(parsed.id, 9);
        assert_eq!(parsed.rcode, ResponseCode::NoError);
        assert!(parsed.is_authoritative());
        assert_eq!(parsed.qdcount, 1);
        assert!(parsed.answers.is_empty());
    }

    #[test]
    fn test_malformed_question_gets_header_response() {
        let store = ZoneStore::new();
        let mut buf = build_query("example.com", RecordType::A, 77);
        buf.truncate(buf.len() - 3);

        let response = handle_dns_query(&buf, client(), &store, false).unwrap();
        let parsed = parse_response(&response).unwrap();
        assert_eq!(parsed.id, 77);
        assert_eq!(parsed.rcode, ResponseCode::NoError);
        assert_eq!(parsed.qdcount, 0);
    }

    #[test]
    fn test_response_packet_is_dropped() {
        let store = store_with(vec![a("example.com", [1, 2, 3, 4])]);
        let mut buf = build_query("example.com", RecordType::A, 5);
        buf[2] |= 0x80;

        let result = handle_dns_query(&buf, client(), &store, false);
        assert!(matches!(result, Err(DnsError::ParseError(_))));
    }

    #[test]
    fn test_short_packet_is_error() {
        let store = ZoneStore::new();
        let result = handle_dns_query(&[0x12, 0x34, 0x01], client(), &store, false);
        assert!(matches!(result, Err(DnsError::ParseError(_))));
    }
}
