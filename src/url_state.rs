//! Mapping between the parameter map and the shareable URL query string.
//!
//! Only visible keys with non-default values are written.  Parsing never
//! fails: unknown keys are skipped and malformed values fall back to their
//! default.

use std::collections::BTreeSet;

use crate::data::params::{ParamKey, ParamValue, ParameterMap};
use crate::error::ParamError;

/// Parse the text of a single parameter.
pub fn parse_param(name: &str, raw: &str) -> Result<(ParamKey, ParamValue), ParamError> {
    let key = ParamKey::from_url_name(name).ok_or_else(|| ParamError::UnknownKey(name.to_string()))?;
    let value = ParamValue::parse(key.kind(), raw).ok_or_else(|| ParamError::Malformed {
        key,
        raw: raw.to_string(),
    })?;
    Ok((key, value))
}

/// Parameters decoded from a query string, plus which keys were present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub params: ParameterMap,
    pub present: BTreeSet<ParamKey>,
}

impl ParsedQuery {
    pub fn has(&self, key: ParamKey) -> bool {
        self.present.contains(&key)
    }
}

/// Decode a query string (with or without the leading `?`).
pub fn parse_query(query: &str) -> ParsedQuery {
    let query = query.trim_start_matches('?');
    let mut parsed = ParsedQuery::default();
    for (name, raw) in url::form_urlencoded::parse(query.as_bytes()) {
        match parse_param(&name, &raw) {
            Ok((key, value)) => {
                // Shapes always match here since the value was parsed for this key.
                if parsed.params.set(key, value).is_ok() {
                    parsed.present.insert(key);
                }
            }
            Err(ParamError::UnknownKey(name)) => {
                log::debug!("ignoring unknown url parameter '{}'", name);
            }
            Err(e) => {
                log::debug!("{}; using the default", e);
            }
        }
    }
    parsed
}

/// Encode the visible, non-default entries of `params`.
pub fn serialize_query(params: &ParameterMap) -> String {
    let mut out = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.visible() {
        if *value != key.default_value() {
            out.append_pair(key.url_name(), &value.to_query_value());
        }
    }
    out.finish()
}

/// Query string for a link derived from `params`: `overwrite` entries replace
/// the current values and `ignore` keys are dropped.
pub fn new_link(
    params: &ParameterMap,
    overwrite: &[(ParamKey, ParamValue)],
    ignore: &[ParamKey],
) -> String {
    let mut derived = params.clone();
    for (key, value) in overwrite {
        if let Err(e) = derived.set(*key, value.clone()) {
            log::debug!("new_link: {}", e);
        }
    }
    for key in ignore {
        derived.reset(*key);
    }
    serialize_query(&derived)
}

/// Receives URL updates (browser history, address bar, clipboard, …).
pub trait UrlSink {
    /// Replace the current entry with `query`.
    fn replace(&mut self, query: &str);
}

/// History kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Vec<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest query, if any update happened.
    pub fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Number of updates received.
    pub fn writes(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl UrlSink for MemoryHistory {
    fn replace(&mut self, query: &str) {
        self.entries.push(query.to_string());
    }
}
