//! Resource records as served from the zone tables.

use crate::dns::wire::{check_name, RecordClass, RecordType};
use serde::Deserialize;
use std::fmt;
use std::net::Ipv4Addr;

/// Record payload. Only address data is encodable on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    /// Presentation-format value of any other type, kept verbatim
    Other(String),
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(addr) => write!(f, "{}", addr),
            RecordData::Other(value) => write!(f, "{}", value),
        }
    }
}

/// A single resource record.
///
/// Deserializes from the zone source's JSON form:
/// `{"name": "www.example.com.", "type": "A", "class": "IN", "ttl": 300, "value": "1.2.3.4"}`.
/// `class` defaults to IN and `ttl` to 300. Names are stored lowercase and
/// fully qualified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: RecordType,
    pub class: RecordClass,
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    /// Build an IN-class address record
    pub fn a(name: &str, addr: Ipv4Addr, ttl: u32) -> Self {
        ResourceRecord {
            name: fqdn(name),
            rtype: RecordType::A,
            class: RecordClass::IN,
            ttl,
            data: RecordData::A(addr),
        }
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.class, self.rtype, self.data
        )
    }
}

#[derive(Deserialize)]
struct RawRecord {
    name: String,
    #[serde(rename = "type")]
    rtype: String,
    #[serde(default = "default_class")]
    class: String,
    #[serde(default = "default_ttl")]
    ttl: u32,
    value: String,
}

fn default_class() -> String {
    "IN".to_string()
}

fn default_ttl() -> u32 {
    300
}

impl TryFrom<RawRecord> for ResourceRecord {
    type Error = String;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        if raw.name.trim_matches('.').is_empty() {
            return Err("record name is empty".to_string());
        }
        check_name(raw.name.trim())?;

        let rtype: RecordType = raw.rtype.parse()?;
        let class: RecordClass = raw.class.parse()?;

        let data = match rtype {
            RecordType::A => {
                let addr = raw.value.trim().parse::<Ipv4Addr>().map_err(|_| {
                    format!("invalid IPv4 address {:?} for {}", raw.value, raw.name)
                })?;
                RecordData::A(addr)
            }
            _ => RecordData::Other(raw.value),
        };

        Ok(ResourceRecord {
            name: fqdn(&raw.name),
            rtype,
            class,
            ttl: raw.ttl,
            data,
        })
    }
}

/// Lowercase and append the root dot
fn fqdn(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    format!("{}.", trimmed.to_ascii_lowercase())
}
