//! Query string manipulation.
//!
//! [`Query`] is a multi-valued map of query parameters. Keys are kept sorted
//! and each key keeps its values in insertion order, so encoding is
//! deterministic:
//!
//! ```rust
//! use rith_http::Query;
//!
//! let mut query = Query::parse("a=1").unwrap();
//! query.merge(&Query::from([("b", "4"), ("a", "2"), ("a", "3")]));
//! assert_eq!(query.encode(), "a=1&a=2&a=3&b=4");
//! ```
//!
//! Keys and values are held as decoded bytes, not strings. Parameters that
//! decode to invalid UTF-8 survive an edit of some other parameter:
//!
//! ```rust
//! use rith_http::Query;
//!
//! let mut query = Query::parse("sig=%FF%00").unwrap();
//! query.set("page", "2");
//! assert_eq!(query.encode(), "page=2&sig=%FF%00");
//! ```
use std::borrow::Cow;
use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

use crate::{Error, Result};

/// Multi-valued query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
}

impl Query {
    /// Creates an empty query.
    pub const fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Decodes a raw `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is not expected; pass what follows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] when a `%` is not followed by two hex
    /// digits.
    pub fn parse(raw: &str) -> Result<Self> {
        check_escapes(raw)?;
        let mut query = Self::new();
        for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            query.add(decode(key), decode(value));
        }
        Ok(query)
    }

    /// Appends a value to `key`, keeping any existing values.
    pub fn add(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.params.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Replaces every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.params.insert(key.into(), vec![value.into()]);
        self
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.params.remove(key.as_bytes()).is_some()
    }

    /// Returns the first value of `key`, if it is valid UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_bytes(key)
            .and_then(|value| core::str::from_utf8(value).ok())
    }

    /// Returns the first value of `key` as raw decoded bytes.
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.params
            .get(key.as_bytes())
            .and_then(|values| values.first())
            .map(Vec::as_slice)
    }

    /// Returns every value of `key`, in insertion order.
    ///
    /// Invalid UTF-8 is replaced with `U+FFFD`; use [`iter`](Self::iter) for
    /// the raw bytes.
    pub fn get_all(&self, key: &str) -> Vec<Cow<'_, str>> {
        self.params
            .get(key.as_bytes())
            .map(|values| {
                values
                    .iter()
                    .map(|value| String::from_utf8_lossy(value))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Appends every value of `other` to this query.
    pub fn merge(&mut self, other: &Query) -> &mut Self {
        for (key, values) in &other.params {
            self.params
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        self
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over decoded `(key, value)` pairs in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.params.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_slice(), value.as_slice()))
        })
    }

    /// Encodes the parameters, keys sorted, values in insertion order.
    pub fn encode(&self) -> String {
        let mut encoded = String::new();
        for (key, value) in self.iter() {
            if !encoded.is_empty() {
                encoded.push('&');
            }
            encoded.extend(form_urlencoded::byte_serialize(key));
            encoded.push('=');
            encoded.extend(form_urlencoded::byte_serialize(value));
        }
        encoded
    }
}

// `+` stands for a space; `%2B` is a literal plus.
fn decode(raw: &str) -> Vec<u8> {
    percent_decode_str(&raw.replace('+', " ")).collect()
}

fn check_escapes(raw: &str) -> Result<()> {
    let bytes = raw.as_bytes();
    let mut from = 0;
    while let Some(offset) = bytes[from..].iter().position(|&b| b == b'%') {
        let at = from + offset;
        let valid = bytes
            .get(at + 1..at + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(Error::InvalidQuery(format!(
                "invalid percent escape at byte {at} of {raw:?}"
            )));
        }
        from = at + 3;
    }
    Ok(())
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        query.extend(iter);
        query
    }
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>> Extend<(K, V)> for Query {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add(key, value);
        }
    }
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>, const N: usize> From<[(K, V); N]> for Query {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
