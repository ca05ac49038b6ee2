//! Minimal DNS wire format codec (RFC 1035).
//!
//! Parses the header and first question of an inbound query and encodes
//! authoritative responses carrying address records.

use crate::dns::record::{RecordData, ResourceRecord};
use std::fmt;
use std::str::FromStr;

// DNS wire format constants
const HEADER_SIZE: usize = 12;
const FLAG_QR: u16 = 0x8000; // Query/Response flag
const FLAG_AA: u16 = 0x0400; // Authoritative answer
const FLAG_TC: u16 = 0x0200; // Truncated
const FLAG_RD: u16 = 0x0100; // Recursion desired
const FLAG_OPCODE_MASK: u16 = 0x7800;
const FLAG_RCODE_MASK: u16 = 0x000F; // Response code mask

/// Classic UDP payload limit; larger answers are truncated
pub const MAX_UDP_RESPONSE: usize = 512;

// RFC 1035: Maximum hostname length is 253 characters
const MAX_HOSTNAME_LEN: usize = 253;
// RFC 1035: Maximum label length is 63 characters
const MAX_LABEL_LEN: usize = 63;

// DNS record type values (RFC 1035 + extensions)
const TYPE_A: u16 = 1;
const TYPE_AAAA: u16 = 28;
const TYPE_ANY: u16 = 255;
const TYPE_AXFR: u16 = 252;
const TYPE_IXFR: u16 = 251;
const TYPE_MX: u16 = 15;
const TYPE_TXT: u16 = 16;
const TYPE_PTR: u16 = 12;
const TYPE_CNAME: u16 = 5;
const TYPE_NS: u16 = 2;
const TYPE_SOA: u16 = 6;

const CLASS_IN: u16 = 1;
const CLASS_CH: u16 = 3;
const CLASS_HS: u16 = 4;

/// DNS response codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
}

impl ResponseCode {
    /// Create from raw 4-bit value
    pub fn from_u16(value: u16) -> Self {
        match value & FLAG_RCODE_MASK {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NxDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            _ => ResponseCode::ServFail,
        }
    }
}

/// DNS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    ANY,
    AXFR,
    IXFR,
    MX,
    TXT,
    PTR,
    CNAME,
    NS,
    SOA,
    Other(u16),
}

impl RecordType {
    /// Create from raw type value
    pub fn from_u16(value: u16) -> Self {
        match value {
            TYPE_A => RecordType::A,
            TYPE_AAAA => RecordType::AAAA,
            TYPE_ANY => RecordType::ANY,
            TYPE_AXFR => RecordType::AXFR,
            TYPE_IXFR => RecordType::IXFR,
            TYPE_MX => RecordType::MX,
            TYPE_TXT => RecordType::TXT,
            TYPE_PTR => RecordType::PTR,
            TYPE_CNAME => RecordType::CNAME,
            TYPE_NS => RecordType::NS,
            TYPE_SOA => RecordType::SOA,
            other => RecordType::Other(other),
        }
    }

    /// Convert to raw type value
    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => TYPE_A,
            RecordType::AAAA => TYPE_AAAA,
            RecordType::ANY => TYPE_ANY,
            RecordType::AXFR => TYPE_AXFR,
            RecordType::IXFR => TYPE_IXFR,
            RecordType::MX => TYPE_MX,
            RecordType::TXT => TYPE_TXT,
            RecordType::PTR => TYPE_PTR,
            RecordType::CNAME => TYPE_CNAME,
            RecordType::NS => TYPE_NS,
            RecordType::SOA => TYPE_SOA,
            RecordType::Other(v) => v,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::ANY => write!(f, "ANY"),
            RecordType::AXFR => write!(f, "AXFR"),
            RecordType::IXFR => write!(f, "IXFR"),
            RecordType::MX => write!(f, "MX"),
            RecordType::TXT => write!(f, "TXT"),
            RecordType::PTR => write!(f, "PTR"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::NS => write!(f, "NS"),
            RecordType::SOA => write!(f, "SOA"),
            RecordType::Other(v) => write!(f, "TYPE{}", v),
        }
    }
}

/// Parses mnemonics case-insensitively; `TYPE<n>` covers everything else.
impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let rtype = match upper.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::AAAA,
            "ANY" => RecordType::ANY,
            "AXFR" => RecordType::AXFR,
            "IXFR" => RecordType::IXFR,
            "MX" => RecordType::MX,
            "TXT" => RecordType::TXT,
            "PTR" => RecordType::PTR,
            "CNAME" => RecordType::CNAME,
            "NS" => RecordType::NS,
            "SOA" => RecordType::SOA,
            other => match other.strip_prefix("TYPE").map(str::parse::<u16>) {
                Some(Ok(code)) => RecordType::from_u16(code),
                _ => return Err(format!("unknown record type: {}", s)),
            },
        };
        Ok(rtype)
    }
}

/// DNS record classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordClass {
    #[default]
    IN,
    CH,
    HS,
    Other(u16),
}

impl RecordClass {
    pub fn from_u16(value: u16) -> Self {
        match value {
            CLASS_IN => RecordClass::IN,
            CLASS_CH => RecordClass::CH,
            CLASS_HS => RecordClass::HS,
            other => RecordClass::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordClass::IN => CLASS_IN,
            RecordClass::CH => CLASS_CH,
            RecordClass::HS => CLASS_HS,
            RecordClass::Other(v) => v,
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordClass::IN => write!(f, "IN"),
            RecordClass::CH => write!(f, "CH"),
            RecordClass::HS => write!(f, "HS"),
            RecordClass::Other(v) => write!(f, "CLASS{}", v),
        }
    }
}

impl FromStr for RecordClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "IN" => Ok(RecordClass::IN),
            "CH" => Ok(RecordClass::CH),
            "HS" => Ok(RecordClass::HS),
            other => match other.strip_prefix("CLASS").map(str::parse::<u16>) {
                Some(Ok(code)) => Ok(RecordClass::from_u16(code)),
                _ => Err(format!("unknown record class: {}", s)),
            },
        }
    }
}

/// First question of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

/// Parsed DNS query
#[derive(Debug)]
pub struct DnsQuery {
    id: u16,
    flags: u16,
    question: Option<Question>,
}

impl DnsQuery {
    /// Parse a DNS query from raw bytes.
    ///
    /// A query with QDCOUNT = 0 parses with no question.
    pub fn parse(buf: &[u8]) -> Result<DnsQuery, &'static str> {
        if buf.len() < HEADER_SIZE {
            return Err("Packet too short for DNS header");
        }

        let id = u16::from_be_bytes([buf[0], buf[1]]);
        let flags = u16::from_be_bytes([buf[2], buf[3]]);
        let qdcount = u16::from_be_bytes([buf[4], buf[5]]);

        if flags & FLAG_QR != 0 {
            return Err("Not a query (QR bit set)");
        }

        if qdcount == 0 {
            return Ok(DnsQuery {
                id,
                flags,
                question: None,
            });
        }

        let (name, name_end) = parse_name(buf, HEADER_SIZE)?;

        // Need 4 more bytes for QTYPE and QCLASS
        if buf.len() < name_end + 4 {
            return Err("Packet too short for question");
        }

        let qtype = u16::from_be_bytes([buf[name_end], buf[name_end + 1]]);
        let qclass = u16::from_be_bytes([buf[name_end + 2], buf[name_end + 3]]);

        Ok(DnsQuery {
            id,
            flags,
            question: Some(Question {
                name,
                qtype: RecordType::from_u16(qtype),
                qclass: RecordClass::from_u16(qclass),
            }),
        })
    }

    /// Get query ID
    pub fn id(&self) -> u16 {
        self.id
    }

    /// First question, if the query carried one
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    fn recursion_desired(&self) -> bool {
        self.flags & FLAG_RD != 0
    }

    fn opcode_bits(&self) -> u16 {
        self.flags & FLAG_OPCODE_MASK
    }
}

/// Encode an authoritative response to `query` carrying `answers` in order.
///
/// Answers that would push the message past 512 bytes are dropped and the
/// TC bit is set.
pub fn build_response(query: &DnsQuery, answers: &[ResourceRecord]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_UDP_RESPONSE);

    let mut flags = FLAG_QR | FLAG_AA | query.opcode_bits();
    if query.recursion_desired() {
        flags |= FLAG_RD;
    }
    flags |= ResponseCode::NoError as u16;

    let qdcount: u16 = if query.question.is_some() { 1 } else { 0 };

    buf.extend_from_slice(&query.id.to_be_bytes());
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&qdcount.to_be_bytes());
    buf.extend_from_slice(&[0, 0]); // ANCOUNT, patched below
    buf.extend_from_slice(&[0, 0]); // NSCOUNT
    buf.extend_from_slice(&[0, 0]); // ARCOUNT

    if let Some(q) = &query.question {
        encode_name(&mut buf, &q.name);
        buf.extend_from_slice(&q.qtype.to_u16().to_be_bytes());
        buf.extend_from_slice(&q.qclass.to_u16().to_be_bytes());
    }

    let mut ancount: u16 = 0;
    let mut truncated = false;
    let mut record_buf = Vec::with_capacity(64);

    for record in answers {
        record_buf.clear();
        if !encode_record(&mut record_buf, record) {
            continue;
        }
        if buf.len() + record_buf.len() > MAX_UDP_RESPONSE {
            truncated = true;
            break;
        }
        buf.extend_from_slice(&record_buf);
        ancount += 1;
    }

    buf[6..8].copy_from_slice(&ancount.to_be_bytes());
    if truncated {
        let flags = flags | FLAG_TC;
        buf[2..4].copy_from_slice(&flags.to_be_bytes());
    }

    buf
}

/// Build a header-only NOERROR response from raw query bytes.
///
/// Used when the header is readable but the rest of the packet is not.
/// Packets that are themselves responses get nothing back.
pub fn empty_response(query_buf: &[u8]) -> Option<Vec<u8>> {
    if query_buf.len() < HEADER_SIZE {
        return None;
    }

    let mut response = query_buf[..HEADER_SIZE].to_vec();

    let mut flags = u16::from_be_bytes([response[2], response[3]]);
    if flags & FLAG_QR != 0 {
        return None;
    }
    flags |= FLAG_QR | FLAG_AA;
    flags = (flags & !FLAG_RCODE_MASK) | (ResponseCode::NoError as u16);

    response[2] = (flags >> 8) as u8;
    response[3] = flags as u8;

    // No question echoed, no records
    response[4..HEADER_SIZE].fill(0);

    Some(response)
}

/// Append one resource record. Returns false for data we cannot encode.
fn encode_record(buf: &mut Vec<u8>, record: &ResourceRecord) -> bool {
    let rdata: Vec<u8> = match &record.data {
        RecordData::A(addr) => addr.octets().to_vec(),
        RecordData::Other(_) => return false,
    };

    encode_name(buf, &record.name);
    buf.extend_from_slice(&record.rtype.to_u16().to_be_bytes());
    buf.extend_from_slice(&record.class.to_u16().to_be_bytes());
    buf.extend_from_slice(&record.ttl.to_be_bytes());
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&rdata);
    true
}

/// Encode a domain name in DNS wire format (no compression)
fn encode_name(buf: &mut Vec<u8>, domain: &str) {
    let domain = domain.trim_end_matches('.');
    for label in domain.split('.') {
        if label.is_empty() {
            continue;
        }
        let label = &label.as_bytes()[..label.len().min(MAX_LABEL_LEN)];
        buf.push(label.len() as u8);
        buf.extend_from_slice(label);
    }
    buf.push(0);
}

/// Check that `name` fits the wire limits enforced on parsed names:
/// labels of 1 to 63 bytes, 253 bytes in total.
pub fn check_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim_end_matches('.');
    let mut total_len: usize = 0;

    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(format!("empty label in {:?}", name));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(format!(
                "label exceeds maximum length ({}) in {:?}",
                MAX_LABEL_LEN, name
            ));
        }
        total_len += label.len() + 1;
    }

    if total_len > MAX_HOSTNAME_LEN {
        return Err(format!(
            "name exceeds maximum length ({}): {} bytes",
            MAX_HOSTNAME_LEN, total_len
        ));
    }
    Ok(())
}

/// Parse a DNS name from the buffer, handling compression pointers
fn parse_name(buf: &[u8], start: usize) -> Result<(String, usize), &'static str> {
    let mut name_parts = Vec::new();
    let mut pos = start;
    let mut followed_pointer = false;
    let mut end_pos = 0;
    let mut total_len: usize = 0;

    loop {
        if pos >= buf.len() {
            return Err("Name extends beyond packet");
        }

        let len = buf[pos] as usize;

        if len == 0 {
            if !followed_pointer {
                end_pos = pos + 1;
            }
            break;
        }

        // Compression pointer (top 2 bits = 11)
        if len & 0xC0 == 0xC0 {
            if pos + 1 >= buf.len() {
                return Err("Compression pointer extends beyond packet");
            }
            if !followed_pointer {
                end_pos = pos + 2;
            }
            let offset = ((len & 0x3F) << 8) | (buf[pos + 1] as usize);
            if offset >= pos {
                return Err("Forward compression pointer (loop protection)");
            }
            pos = offset;
            followed_pointer = true;
            continue;
        }

        if len > MAX_LABEL_LEN {
            return Err("Label exceeds maximum length (63)");
        }

        pos += 1;
        if pos + len > buf.len() {
            return Err("Label extends beyond packet");
        }

        total_len += len + 1;
        if total_len > MAX_HOSTNAME_LEN {
            return Err("Hostname exceeds maximum length (253)");
        }

        let label = std::str::from_utf8(&buf[pos..pos + len])
            .map_err(|_| "Invalid UTF-8 in label")?
            .to_string();
        name_parts.push(label);
        pos += len;
    }

    let name = if name_parts.is_empty() {
        ".".to_string()
    } else {
        name_parts.join(".") + "."
    };

    Ok((name, end_pos))
}

// ==================== Helpers for building/reading packets (tests) ====================
