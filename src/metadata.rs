//! # Metadata Store
//!
//! Case-insensitive multimap used for request metadata, received initial
//! metadata and received trailing metadata.
//!
//! Keys are normalized to lowercase on every operation, so a transport that
//! capitalizes header names (`X-Grpc-Test-Echo-Initial`) never affects lookups.
//! Values are kept in their wire form: plain keys hold ASCII text, keys ending
//! in `-bin` hold the base64 text of a binary payload. [`Metadata::set_bin`]
//! and [`Metadata::get_bin`] move between raw bytes and that text.

use std::collections::HashMap;
use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::constants::headers::BINARY_SUFFIX;
use crate::error::{GrpcWebError, Result};

/// Padded on encode, padding optional on decode (servers send both).
const BINARY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Case-insensitive metadata keyed by lowercase header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: HashMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from received header pairs.
    ///
    /// Received values are not validated; names are lowercased and repeated
    /// names accumulate.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut metadata = Self::new();
        for (key, value) in pairs {
            metadata
                .entries
                .entry(key.as_ref().trim().to_ascii_lowercase())
                .or_default()
                .push(value.into());
        }
        metadata
    }

    /// Replace all values of `key` with `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = normalize_key(key)?;
        let value = value.into();
        validate_value(&key, &value)?;
        self.entries.insert(key, vec![value]);
        Ok(())
    }

    /// Add `value` after any existing values of `key`.
    pub fn append(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = normalize_key(key)?;
        let value = value.into();
        validate_value(&key, &value)?;
        self.entries.entry(key).or_default().push(value);
        Ok(())
    }

    /// Replace the values of a `-bin` key with the base64 encoding of `value`.
    pub fn set_bin(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let key = normalize_binary_key(key)?;
        self.entries.insert(key, vec![BINARY_ENGINE.encode(value)]);
        Ok(())
    }

    pub fn append_bin(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let key = normalize_binary_key(key)?;
        self.entries
            .entry(key)
            .or_default()
            .push(BINARY_ENGINE.encode(value));
        Ok(())
    }

    /// First value of `key` in wire form (base64 text for `-bin` keys).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of a `-bin` key, base64-decoded.
    pub fn get_bin(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = normalize_binary_key(key)?;
        match self.get(&key) {
            Some(text) => BINARY_ENGINE
                .decode(text.trim())
                .map(Some)
                .map_err(|e| GrpcWebError::invalid_metadata(format!("{key}: invalid base64: {e}"))),
            None => Ok(None),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&key.to_ascii_lowercase())
    }

    /// Overlay `other` onto this store: every key present in `other` replaces
    /// this store's values for that key.
    pub fn merge(&mut self, other: &Metadata) {
        for (key, values) in &other.entries {
            self.entries.insert(key.clone(), values.clone());
        }
    }

    /// Iterate over `(key, value)` pairs, one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of values across all keys.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Header pairs for the wire, sorted by key for stable output.
    pub fn to_header_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.to_header_pairs() {
            write!(f, "{key}: {value}\r\n")?;
        }
        Ok(())
    }
}

pub fn is_binary_key(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with(BINARY_SUFFIX)
}

fn normalize_key(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(GrpcWebError::invalid_metadata("empty metadata key"));
    }
    if !key.bytes().all(is_token_byte) {
        return Err(GrpcWebError::invalid_metadata(format!(
            "invalid character in metadata key: {key:?}"
        )));
    }
    Ok(key.to_ascii_lowercase())
}

fn normalize_binary_key(key: &str) -> Result<String> {
    let key = normalize_key(key)?;
    if !key.ends_with(BINARY_SUFFIX) {
        return Err(GrpcWebError::invalid_metadata(format!(
            "binary metadata key must end in {BINARY_SUFFIX}: {key}"
        )));
    }
    Ok(key)
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.bytes().all(|b| b == b'\t' || (0x20..=0x7e).contains(&b)) {
        Ok(())
    } else {
        Err(GrpcWebError::invalid_metadata(format!(
            "value of {key} must be printable ASCII"
        )))
    }
}

/// RFC 7230 `tchar`
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
