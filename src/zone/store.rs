//! Live and stale record tables behind a single reader/writer lock.
//!
//! Lookups take the read lock for the duration of one clone; every mutation
//! (replace, flush, clear) happens under one write-lock acquisition, so a
//! reader always sees a table either before or after a whole operation.

use crate::dns::record::ResourceRecord;
use crate::dns::wire::RecordType;
use crate::zone::key::ZoneKey;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// ZoneKey -> records, in source order
pub type ZoneTable = HashMap<ZoneKey, Vec<ResourceRecord>>;

#[derive(Default)]
struct Tables {
    live: ZoneTable,
    stale: ZoneTable,
}

/// Result of demoting one record type for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No live records exist for the key
    NoRecords,
    /// `moved` records went to stale, `remaining` stayed live
    Moved { moved: usize, remaining: usize },
}

/// Table sizes for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneStats {
    pub live_keys: usize,
    pub live_records: usize,
    pub stale_keys: usize,
    pub stale_records: usize,
}

/// Single source of truth for zone data
#[derive(Default)]
pub struct ZoneStore {
    tables: RwLock<Tables>,
}

impl ZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Mutations swap whole values, so a poisoned lock never holds partial state
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live records for `key`, else stale records, else nothing.
    ///
    /// Never merges the two tables.
    pub fn lookup(&self, key: &ZoneKey) -> Vec<ResourceRecord> {
        let tables = self.read();

        match tables.live.get(key) {
            Some(records) if !records.is_empty() => records.clone(),
            _ => tables
                .stale
                .get(key)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Swap in a freshly ingested live table. Stale data is untouched.
    pub fn replace_live(&self, table: ZoneTable) {
        let previous = {
            let mut tables = self.write();
            std::mem::replace(&mut tables.live, table)
        };
        // Old table is dropped outside the lock
        drop(previous);
    }

    /// Move every live record of `rtype` under `key` into the stale table.
    pub fn flush_record_type(&self, key: &ZoneKey, rtype: RecordType) -> FlushOutcome {
        let mut tables = self.write();
        let Tables { live, stale } = &mut *tables;

        let records = match live.get_mut(key) {
            Some(records) if !records.is_empty() => records,
            _ => return FlushOutcome::NoRecords,
        };

        let (demoted, kept): (Vec<_>, Vec<_>) = std::mem::take(records)
            .into_iter()
            .partition(|record| record.rtype == rtype);

        let moved = demoted.len();
        let remaining = kept.len();

        if kept.is_empty() {
            live.remove(key);
        } else {
            *records = kept;
        }

        if !demoted.is_empty() {
            stale.entry(key.clone()).or_default().extend(demoted);
        }

        FlushOutcome::Moved { moved, remaining }
    }

    /// Drop every stale record. Returns how many were removed.
    pub fn flush_all_stale(&self) -> usize {
        let previous = {
            let mut tables = self.write();
            std::mem::take(&mut tables.stale)
        };
        previous.values().map(Vec::len).sum()
    }

    pub fn stats(&self) -> ZoneStats {
        let tables = self.read();
        ZoneStats {
            live_keys: tables.live.len(),
            live_records: tables.live.values().map(Vec::len).sum(),
            stale_keys: tables.stale.len(),
            stale_records: tables.stale.values().map(Vec::len).sum(),
        }
    }

    /// Live records for `key` only, without stale fallback
    #[cfg(test)]
    pub fn live_records(&self, key: &ZoneKey) -> Vec<ResourceRecord> {
        self.read().live.get(key).cloned().unwrap_or_default()
    }

    /// Stale records for `key` only
    #[cfg(test)]
    pub fn stale_records(&self, key: &ZoneKey) -> Vec<ResourceRecord> {
        self.read().stale.get(key).cloned().unwrap_or_default()
    }
}
