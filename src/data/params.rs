//! Canonical application parameters.
//!
//! Every [`ParamKey`] has a default, so a read never comes back empty.  Keys
//! marked hidden are transient and never reach the shareable URL.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ParamError;

/// Name of one application parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKey {
    Project,
    Source,
    Pos,
    Left,
    Right,
    Dims,
    Transform,
    Activation,
    CellWidth,
    WordBrush,
    WordBrushZero,
    SelectedCells,
    ExcludedCells,
    VisibleMeta,
}

impl ParamKey {
    pub const ALL: [ParamKey; 14] = [
        ParamKey::Project,
        ParamKey::Source,
        ParamKey::Pos,
        ParamKey::Left,
        ParamKey::Right,
        ParamKey::Dims,
        ParamKey::Transform,
        ParamKey::Activation,
        ParamKey::CellWidth,
        ParamKey::WordBrush,
        ParamKey::WordBrushZero,
        ParamKey::SelectedCells,
        ParamKey::ExcludedCells,
        ParamKey::VisibleMeta,
    ];

    /// Name used in the URL query string.
    pub fn url_name(self) -> &'static str {
        match self {
            ParamKey::Project => "project",
            ParamKey::Source => "source",
            ParamKey::Pos => "pos",
            ParamKey::Left => "left",
            ParamKey::Right => "right",
            ParamKey::Dims => "dims",
            ParamKey::Transform => "transform",
            ParamKey::Activation => "activation",
            ParamKey::CellWidth => "cw",
            ParamKey::WordBrush => "wordBrush",
            ParamKey::WordBrushZero => "wordBrushZero",
            ParamKey::SelectedCells => "sc",
            ParamKey::ExcludedCells => "ex",
            ParamKey::VisibleMeta => "meta",
        }
    }

    pub fn from_url_name(name: &str) -> Option<ParamKey> {
        ParamKey::ALL.into_iter().find(|k| k.url_name() == name)
    }

    /// Hidden keys are view-local and never written to the URL.
    pub fn is_hidden(self) -> bool {
        matches!(
            self,
            ParamKey::Left | ParamKey::Right | ParamKey::Dims | ParamKey::Transform
        )
    }

    pub fn kind(self) -> ParamKind {
        match self {
            ParamKey::Project | ParamKey::Source | ParamKey::Transform => ParamKind::Text,
            ParamKey::Pos | ParamKey::Left | ParamKey::Right | ParamKey::CellWidth => ParamKind::Int,
            ParamKey::Activation => ParamKind::Float,
            ParamKey::WordBrush | ParamKey::WordBrushZero => ParamKind::Range,
            ParamKey::SelectedCells | ParamKey::ExcludedCells => ParamKind::IntList,
            ParamKey::Dims | ParamKey::VisibleMeta => ParamKind::TextList,
        }
    }

    pub fn default_value(self) -> ParamValue {
        match self {
            ParamKey::Project | ParamKey::Source => ParamValue::Text(String::new()),
            ParamKey::Pos => ParamValue::Int(0),
            ParamKey::Left => ParamValue::Int(5),
            ParamKey::Right => ParamValue::Int(40),
            ParamKey::Dims => ParamValue::TextList(vec!["states".into(), "words".into()]),
            ParamKey::Transform => ParamValue::Text("tanh".into()),
            ParamKey::Activation => ParamValue::Float(0.3),
            ParamKey::CellWidth => ParamValue::Int(30),
            ParamKey::WordBrush | ParamKey::WordBrushZero => ParamValue::Range(None),
            ParamKey::SelectedCells | ParamKey::ExcludedCells => ParamValue::IntList(Vec::new()),
            ParamKey::VisibleMeta => ParamValue::TextList(Vec::new()),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url_name())
    }
}

/// Value shape expected for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Text,
    Range,
    IntList,
    TextList,
}

impl ParamKind {
    fn describe(self) -> &'static str {
        match self {
            ParamKind::Int => "an integer",
            ParamKind::Float => "a number",
            ParamKind::Text => "a string",
            ParamKind::Range => "an optional integer pair",
            ParamKind::IntList => "a list of integers",
            ParamKind::TextList => "a list of strings",
        }
    }
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    /// Integer pair such as a brush `[start, end)`; `None` when unset.
    Range(Option<[i64; 2]>),
    IntList(Vec<i64>),
    TextList(Vec<String>),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Text(_) => ParamKind::Text,
            ParamValue::Range(_) => ParamKind::Range,
            ParamValue::IntList(_) => ParamKind::IntList,
            ParamValue::TextList(_) => ParamKind::TextList,
        }
    }

    /// Text form used in URLs and request payloads.  Lists are comma-joined.
    pub fn to_query_value(&self) -> String {
        match self {
            ParamValue::Int(v) => v.to_string(),
            ParamValue::Float(v) => v.to_string(),
            ParamValue::Text(s) => s.clone(),
            ParamValue::Range(None) => String::new(),
            ParamValue::Range(Some([a, b])) => format!("{a},{b}"),
            ParamValue::IntList(v) => join(v.iter()),
            ParamValue::TextList(v) => v.join(","),
        }
    }

    /// Parse the text form of a value of the given kind.
    pub fn parse(kind: ParamKind, raw: &str) -> Option<ParamValue> {
        // Strings are kept verbatim; everything else ignores surrounding blanks.
        let trimmed = raw.trim();
        match kind {
            ParamKind::Int => trimmed.parse().ok().map(ParamValue::Int),
            ParamKind::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ParamValue::Float),
            ParamKind::Text => Some(ParamValue::Text(raw.to_string())),
            ParamKind::Range => {
                if trimmed.is_empty() || trimmed == "null" {
                    return Some(ParamValue::Range(None));
                }
                let parts = split_list(trimmed)
                    .map(|p| p.parse::<i64>().ok())
                    .collect::<Option<Vec<_>>>()?;
                match parts.as_slice() {
                    [a, b] => Some(ParamValue::Range(Some([*a, *b]))),
                    _ => None,
                }
            }
            ParamKind::IntList => split_list(trimmed)
                .map(|p| p.parse::<i64>().ok())
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::IntList),
            ParamKind::TextList => Some(ParamValue::TextList(
                raw.split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Full set of parameters, always populated for every key.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMap {
    values: BTreeMap<ParamKey, ParamValue>,
}

impl Default for ParameterMap {
    fn default() -> Self {
        Self {
            values: ParamKey::ALL
                .into_iter()
                .map(|k| (k, k.default_value()))
                .collect(),
        }
    }
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ParamKey) -> &ParamValue {
        // Every key is inserted at construction and `set` never removes one.
        &self.values[&key]
    }

    /// Write a value; the value shape must match the key.
    pub fn set(&mut self, key: ParamKey, value: ParamValue) -> Result<(), ParamError> {
        let expected = key.kind();
        // Integers are accepted where a float is expected.
        let value = match (expected, value) {
            (ParamKind::Float, ParamValue::Int(v)) => ParamValue::Float(v as f64),
            (_, v) => v,
        };
        if value.kind() != expected {
            return Err(ParamError::TypeMismatch {
                key,
                expected: expected.describe(),
            });
        }
        match &value {
            ParamValue::Float(v) if !v.is_finite() => {
                return Err(ParamError::NonFinite { key, value: *v });
            }
            // List items are comma-joined in the URL.
            ParamValue::TextList(items) => {
                if let Some(item) = items.iter().find(|s| s.is_empty() || s.contains(',')) {
                    return Err(ParamError::Malformed {
                        key,
                        raw: item.clone(),
                    });
                }
            }
            _ => {}
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Restore the default of one key.
    pub fn reset(&mut self, key: ParamKey) {
        self.values.insert(key, key.default_value());
    }

    pub fn is_default(&self, key: ParamKey) -> bool {
        *self.get(key) == key.default_value()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, &ParamValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Entries that belong in the shareable URL.
    pub fn visible(&self) -> impl Iterator<Item = (ParamKey, &ParamValue)> {
        self.iter().filter(|(k, _)| !k.is_hidden())
    }

    // ── Typed accessors ─────────────────────────────────────────────────

    pub fn int(&self, key: ParamKey) -> i64 {
        match self.get(key) {
            ParamValue::Int(v) => *v,
            ParamValue::Float(v) => *v as i64,
            _ => 0,
        }
    }

    pub fn float(&self, key: ParamKey) -> f64 {
        match self.get(key) {
            ParamValue::Float(v) => *v,
            ParamValue::Int(v) => *v as f64,
            _ => 0.0,
        }
    }

    pub fn text(&self, key: ParamKey) -> &str {
        match self.get(key) {
            ParamValue::Text(s) => s,
            _ => "",
        }
    }

    pub fn range(&self, key: ParamKey) -> Option<[i64; 2]> {
        match self.get(key) {
            ParamValue::Range(r) => *r,
            _ => None,
        }
    }

    pub fn int_list(&self, key: ParamKey) -> &[i64] {
        match self.get(key) {
            ParamValue::IntList(v) => v,
            _ => &[],
        }
    }

    pub fn text_list(&self, key: ParamKey) -> &[String] {
        match self.get(key) {
            ParamValue::TextList(v) => v,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_has_a_default() {
        let map = ParameterMap::new();
        for key in ParamKey::ALL {
            assert_eq!(map.get(key).kind(), key.kind(), "{key}");
        }
        assert_eq!(map.int(ParamKey::Left), 5);
        assert_eq!(map.int(ParamKey::Right), 40);
        assert_eq!(map.float(ParamKey::Activation), 0.3);
        assert_eq!(map.int(ParamKey::CellWidth), 30);
        assert_eq!(map.text_list(ParamKey::Dims), ["states", "words"]);
    }

    #[test]
    fn url_names_are_unique_and_reversible() {
        for key in ParamKey::ALL {
            assert_eq!(ParamKey::from_url_name(key.url_name()), Some(key));
        }
        assert_eq!(ParamKey::from_url_name("nope"), None);
    }

    #[test]
    fn set_rejects_wrong_shape() {
        let mut map = ParameterMap::new();
        let err = map
            .set(ParamKey::Pos, ParamValue::Text("ten".into()))
            .unwrap_err();
        assert!(matches!(err, ParamError::TypeMismatch { key: ParamKey::Pos, .. }));
        assert_eq!(map.int(ParamKey::Pos), 0);
    }

    #[test]
    fn int_is_widened_for_float_keys() {
        let mut map = ParameterMap::new();
        map.set(ParamKey::Activation, ParamValue::Int(1)).unwrap();
        assert_eq!(map.get(ParamKey::Activation), &ParamValue::Float(1.0));
    }

    #[test]
    fn set_rejects_non_finite_floats() {
        let mut map = ParameterMap::new();
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = map.set(ParamKey::Activation, ParamValue::Float(v)).unwrap_err();
            assert!(matches!(err, ParamError::NonFinite { key: ParamKey::Activation, .. }));
        }
        assert_eq!(map.float(ParamKey::Activation), 0.3);
    }

    #[test]
    fn set_rejects_list_items_that_cannot_be_joined() {
        let mut map = ParameterMap::new();
        for bad in [vec!["a,b".to_string()], vec!["pos".to_string(), String::new()]] {
            let err = map.set(ParamKey::VisibleMeta, ParamValue::TextList(bad)).unwrap_err();
            assert!(matches!(err, ParamError::Malformed { key: ParamKey::VisibleMeta, .. }));
        }
        assert!(map.text_list(ParamKey::VisibleMeta).is_empty());
        map.set(ParamKey::VisibleMeta, ParamValue::TextList(vec![" pos ".into()]))
            .unwrap();
    }

    #[test]
    fn text_keeps_surrounding_whitespace() {
        assert_eq!(
            ParamValue::parse(ParamKind::Text, " states1 "),
            Some(ParamValue::Text(" states1 ".into()))
        );
        assert_eq!(
            ParamValue::parse(ParamKind::TextList, " pos,ner"),
            Some(ParamValue::TextList(vec![" pos".into(), "ner".into()]))
        );
    }

    #[test]
    fn parse_handles_each_kind() {
        assert_eq!(ParamValue::parse(ParamKind::Int, "42"), Some(ParamValue::Int(42)));
        assert_eq!(ParamValue::parse(ParamKind::Int, "4.2"), None);
        assert_eq!(ParamValue::parse(ParamKind::Float, "nan"), None);
        assert_eq!(
            ParamValue::parse(ParamKind::Range, "3,7"),
            Some(ParamValue::Range(Some([3, 7])))
        );
        assert_eq!(ParamValue::parse(ParamKind::Range, "3"), None);
        assert_eq!(ParamValue::parse(ParamKind::Range, ""), Some(ParamValue::Range(None)));
        assert_eq!(
            ParamValue::parse(ParamKind::IntList, "1, 5,9"),
            Some(ParamValue::IntList(vec![1, 5, 9]))
        );
        assert_eq!(ParamValue::parse(ParamKind::IntList, "1,x"), None);
        assert_eq!(
            ParamValue::parse(ParamKind::TextList, "pos,,ner"),
            Some(ParamValue::TextList(vec!["pos".into(), "ner".into()]))
        );
    }

    #[test]
    fn hidden_keys_are_not_visible() {
        let map = ParameterMap::new();
        let visible: Vec<ParamKey> = map.visible().map(|(k, _)| k).collect();
        assert!(!visible.contains(&ParamKey::Left));
        assert!(!visible.contains(&ParamKey::Dims));
        assert!(visible.contains(&ParamKey::Activation));
    }
}
