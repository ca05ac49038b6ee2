//! Zone keys: the two-label suffix records are grouped and looked up by.

use std::fmt;

/// Normalized `<label>.<tld>` key, lowercase, no trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneKey(String);

impl ZoneKey {
    /// Derive the key from a domain name by keeping its last two labels.
    ///
    /// Names with fewer than two labels (`"com"`, `"."`, `""`) have no key.
    pub fn from_name(name: &str) -> Option<ZoneKey> {
        let labels: Vec<&str> = name
            .trim()
            .split('.')
            .filter(|label| !label.is_empty())
            .collect();

        if labels.len() < 2 {
            return None;
        }

        let tail = &labels[labels.len() - 2..];
        Some(ZoneKey(tail.join(".").to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
