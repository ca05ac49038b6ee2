//! Zone data: keys, the live/stale store, sources and ingestion.

mod ingest;
mod key;
mod source;
mod store;

pub use ingest::{ingest, parse_zone_data, IngestSummary};
pub use key::ZoneKey;
pub use source::{HttpZoneSource, ZoneSource};
pub use store::{FlushOutcome, ZoneStats, ZoneStore, ZoneTable};
