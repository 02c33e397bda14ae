//! Query string scanning
//!
//! A single left-to-right pass over the raw query. It tolerates stray `&`
//! and `?` separators and drops pairs it cannot make sense of instead of
//! rejecting the whole string.

use std::collections::HashMap;

/// Case-insensitive query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: HashMap<String, String>,
}

impl Query {
    /// Look up a value; the key is matched case-insensitively
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.contains_key(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over (lowercased key, decoded value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse a raw query string (without the leading `?`).
///
/// Returns `None` for an empty string. A trailing key with no `=` ends the
/// scan, pairs with an empty key or an undecodable value are skipped.
/// Keys are not decoded, only lowercased.
pub fn parse_query(raw: &str) -> Option<Query> {
    let bytes = raw.as_bytes();
    let len = bytes.len();
    if len == 0 {
        return None;
    }

    let mut query = Query::default();
    let mut i = 0;
    while i < len {
        while i < len && bytes[i] == b'&' {
            i += 1;
        }

        let start = i;
        while i < len && bytes[i] != b'=' {
            i += 1;
        }
        if i == len {
            break;
        }
        let key = &raw[start..i];

        i += 1;
        let value_start = i;
        while i < len && bytes[i] != b'&' && bytes[i] != b'?' {
            i += 1;
        }
        let value = &raw[value_start..i];

        if !key.is_empty() {
            if let Some(decoded) = percent_decode(value) {
                query.pairs.insert(key.to_lowercase(), decoded);
            }
        }

        // skip the delimiter
        i += 1;
    }
    Some(query)
}

/// Strict form-style percent decoding.
///
/// `+` becomes a space. Returns `None` on a truncated or non-hex escape,
/// or when the decoded bytes are not valid UTF-8.
pub fn percent_decode(s: &str) -> Option<String> {
    decode(s, true)
}

/// Strict percent decoding for URL paths, where `+` is a literal `+`
pub fn percent_decode_path(s: &str) -> Option<String> {
    decode(s, false)
}

fn decode(s: &str, plus_as_space: bool) -> Option<String> {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| b == b'%' || (plus_as_space && b == b'+')) {
        return Some(s.to_string());
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = hex_value(*bytes.get(i + 1)?)?;
                let lo = hex_value(*bytes.get(i + 2)?)?;
                out.push(hi << 4 | lo);
                i += 3;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

#[inline]
fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
