//! Zone ingestion: fetch, parse, group by zone key, install.

use crate::dns::record::ResourceRecord;
use crate::dns::wire::RecordType;
use crate::error::IngestError;
use crate::zone::key::ZoneKey;
use crate::zone::source::ZoneSource;
use crate::zone::store::{ZoneStore, ZoneTable};
use tracing::{debug, info, warn};

/// Counts from one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Entries in the source body
    pub fetched: usize,
    /// A records installed
    pub accepted: usize,
    /// Well-formed records of other types
    pub ignored: usize,
    /// Entries that failed to parse or had no zone key
    pub invalid: usize,
    /// Distinct zone keys installed
    pub zones: usize,
}

/// Parse a JSON array of records into a live table.
///
/// The body must be an array; individual bad entries are logged and skipped.
pub fn parse_zone_data(body: &[u8]) -> Result<(ZoneTable, IngestSummary), IngestError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| IngestError::Parse(e.to_string()))?;

    let mut table = ZoneTable::new();
    let mut summary = IngestSummary {
        fetched: entries.len(),
        ..IngestSummary::default()
    };

    for (index, entry) in entries.into_iter().enumerate() {
        let record: ResourceRecord = match serde_json::from_value(entry) {
            Ok(record) => record,
            Err(e) => {
                warn!(index, error = %e, "Skipping invalid zone record");
                summary.invalid += 1;
                continue;
            }
        };

        if record.rtype != RecordType::A {
            debug!(name = %record.name, rtype = %record.rtype, "Ignoring non-address record");
            summary.ignored += 1;
            continue;
        }

        let Some(key) = ZoneKey::from_name(&record.name) else {
            warn!(index, name = %record.name, "Skipping record with fewer than two labels");
            summary.invalid += 1;
            continue;
        };

        table.entry(key).or_default().push(record);
        summary.accepted += 1;
    }

    summary.zones = table.len();
    Ok((table, summary))
}

/// Fetch from `source` and replace the live table on success.
///
/// On any error the store is left untouched. The store lock is only taken for
/// the final swap.
pub async fn ingest<S: ZoneSource>(
    source: &S,
    store: &ZoneStore,
) -> Result<IngestSummary, IngestError> {
    let body = source.fetch().await?;
    debug!(bytes = body.len(), "Zone data fetched");

    let (table, summary) = parse_zone_data(&body)?;
    store.replace_live(table);

    info!(
        records = summary.accepted,
        zones = summary.zones,
        ignored = summary.ignored,
        invalid = summary.invalid,
        "Zone data installed"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::record::RecordData;
    use bytes::Bytes;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source returning a canned body or a canned status failure
    struct MockSource {
        body: Option<&'static str>,
        status: u16,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn ok(body: &'static str) -> Self {
            Self {
                body: Some(body),
                status: 200,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                body: None,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ZoneSource for MockSource {
        async fn fetch(&self) -> Result<Bytes, IngestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(body) => Ok(Bytes::from_static(body.as_bytes())),
                None => Err(IngestError::Status(self.status)),
            }
        }
    }

    fn key(name: &str) -> ZoneKey {
        ZoneKey::from_name(name).unwrap()
    }

    const ZONE: &str = r#"[
        {"name": "example.com.", "type": "A", "class": "IN", "ttl": 300, "value": "1.2.3.4"},
        {"name": "www.example.com.", "type": "A", "ttl": 60, "value": "1.2.3.5"},
        {"name": "example.com.", "type": "MX", "value": "10 mail.example.com."},
        {"name": "api.example.org", "type": "A", "value": "10.0.0.1"}
    ]"#;

    #[test]
    fn test_parse_groups_by_zone_key() {
        let (table, summary) = parse_zone_data(ZONE.as_bytes()).unwrap();

        assert_eq!(
            summary,
            IngestSummary {
                fetched: 4,
                accepted: 3,
                ignored: 1,
                invalid: 0,
                zones: 2,
            }
        );

        let com = &table[&key("example.com")];
        assert_eq!(com.len(), 2);
        assert_eq!(com[0].data, RecordData::A(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(com[1].name, "www.example.com.");
        assert_eq!(com[1].ttl, 60);

        assert_eq!(table[&key("example.org")].len(), 1);
    }

    #[test]
    fn test_parse_skips_bad_entries() {
        let body = r#"[
            {"name": "example.com", "type": "A", "value": "999.1.1.1"},
            {"name": "localhost", "type": "A", "value": "127.0.0.1"},
            {"type": "A", "value": "1.1.1.1"},
            "not an object",
            {"name": "example.com", "type": "A", "value": "1.1.1.1"}
        ]"#;
        let (table, summary) = parse_zone_data(body.as_bytes()).unwrap();
        assert_eq!(summary.invalid, 4);
        assert_eq!(summary.accepted, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_parse_counts_oversized_names_as_invalid() {
        let body = format!(
            r#"[
                {{"name": "{}.example.com", "type": "A", "value": "1.2.3.4"}},
                {{"name": "www.example.com", "type": "A", "value": "5.6.7.8"}}
            ]"#,
            "a".repeat(64)
        );
        let (table, summary) = parse_zone_data(body.as_bytes()).unwrap();
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.accepted, 1);

        let records = &table[&key("example.com")];
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "www.example.com.");
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_zone_data(br#"{"name": "example.com"}"#),
            Err(IngestError::Parse(_))
        ));
        assert!(matches!(
            parse_zone_data(b"<html>"),
            Err(IngestError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_empty_array() {
        let (table, summary) = parse_zone_data(b"[]").unwrap();
        assert!(table.is_empty());
        assert_eq!(summary, IngestSummary::default());
    }

    #[tokio::test]
    async fn test_ingest_installs_live_table() {
        let store = ZoneStore::new();
        let source = MockSource::ok(ZONE);

        let summary = ingest(&source, &store).await.unwrap();
        assert_eq!(summary.accepted, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let records = store.lookup(&key("www.example.com"));
        assert_eq!(records.len(), 2);
        assert_eq!(store.stats().live_keys, 2);
    }

    #[tokio::test]
    async fn test_failed_ingest_leaves_store_untouched() {
        let store = ZoneStore::new();
        ingest(&MockSource::ok(ZONE), &store).await.unwrap();
        let before = store.stats();

        let err = ingest(&MockSource::failing(503), &store).await.unwrap_err();
        assert!(matches!(err, IngestError::Status(503)));
        assert_eq!(store.stats(), before);
        assert_eq!(store.lookup(&key("example.com")).len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_body_leaves_store_untouched() {
        let store = ZoneStore::new();
        ingest(&MockSource::ok(ZONE), &store).await.unwrap();

        let err = ingest(&MockSource::ok("not json"), &store).await.unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
        assert_eq!(store.lookup(&key("example.org")).len(), 1);
    }

    #[tokio::test]
    async fn test_reingest_replaces_wholesale() {
        let store = ZoneStore::new();
        ingest(&MockSource::ok(ZONE), &store).await.unwrap();

        let next = r#"[{"name": "example.net", "type": "A", "value": "5.5.5.5"}]"#;
        ingest(&MockSource::ok(next), &store).await.unwrap();

        assert!(store.lookup(&key("example.com")).is_empty());
        assert!(store.lookup(&key("example.org")).is_empty());
        assert_eq!(store.lookup(&key("example.net")).len(), 1);
    }
}
