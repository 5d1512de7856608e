// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Protocol-visible attribute model.
//
// Job submissions, printer defaults, and synthesized capability sets all use
// the same representation: an ordered map from attribute name to one or more
// typed values.  The transport layer that encodes these on the wire lives
// outside this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single typed attribute value (RFC 8010 value tags, simplified).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Integer(i32),
    Boolean(bool),
    Enum(i32),
    Keyword(String),
    Text(String),
    Name(String),
    Uri(String),
    MimeType(String),
    Range { lower: i32, upper: i32 },
    /// Resolution in dots per inch (cross-feed, feed).
    Resolution { x: i32, y: i32 },
    Collection(AttributeSet),
    NoValue,
}

impl AttrValue {
    pub fn keyword(value: impl Into<String>) -> Self {
        Self::Keyword(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// String payload for keyword/text/name/uri/mime values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Keyword(s) | Self::Text(s) | Self::Name(s) | Self::Uri(s) | Self::MimeType(s) => {
                Some(s.as_str())
            }
            _ => None,
        }
    }

    /// Integer payload for integer/enum values.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) | Self::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&AttributeSet> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }
}

/// A named attribute with one or more values (`1setOf` when more than one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<AttrValue>,
}

impl Attribute {
    /// First value, if any.
    pub fn first(&self) -> Option<&AttrValue> {
        self.values.first()
    }
}

/// Ordered set of attributes keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet {
    attrs: BTreeMap<String, Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an attribute with a single value.
    pub fn add(&mut self, name: &str, value: AttrValue) -> &mut Self {
        self.add_values(name, vec![value])
    }

    /// Add (or replace) an attribute with a list of values.
    ///
    /// An empty list is ignored so callers can pass through optional driver
    /// lists without checking them first.
    pub fn add_values(&mut self, name: &str, values: Vec<AttrValue>) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        self.attrs.insert(
            name.to_string(),
            Attribute {
                name: name.to_string(),
                values,
            },
        );
        self
    }

    /// Add a keyword list.
    pub fn add_keywords<S: AsRef<str>>(&mut self, name: &str, keywords: &[S]) -> &mut Self {
        let values = keywords
            .iter()
            .map(|k| AttrValue::Keyword(k.as_ref().to_string()))
            .collect();
        self.add_values(name, values)
    }

    /// Add an integer list.
    pub fn add_integers(&mut self, name: &str, values: &[i32]) -> &mut Self {
        let values = values.iter().map(|v| AttrValue::Integer(*v)).collect();
        self.add_values(name, values)
    }

    /// Add an enum list.
    pub fn add_enums(&mut self, name: &str, values: &[i32]) -> &mut Self {
        let values = values.iter().map(|v| AttrValue::Enum(*v)).collect();
        self.add_values(name, values)
    }

    /// Merge `other` on top of this set; attributes in `other` win.
    pub fn merge(&mut self, other: &AttributeSet) {
        for (name, attr) in &other.attrs {
            self.attrs.insert(name.clone(), attr.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        self.attrs.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    fn first(&self, name: &str) -> Option<&AttrValue> {
        self.get(name).and_then(Attribute::first)
    }

    /// First value as a string (keyword, text, name, uri, mime).
    pub fn string(&self, name: &str) -> Option<&str> {
        self.first(name).and_then(AttrValue::as_str)
    }

    /// First value as an integer (integer or enum).
    pub fn integer(&self, name: &str) -> Option<i32> {
        self.first(name).and_then(AttrValue::as_integer)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.first(name).and_then(AttrValue::as_boolean)
    }

    /// First value as a resolution pair.
    pub fn resolution(&self, name: &str) -> Option<(i32, i32)> {
        match self.first(name) {
            Some(AttrValue::Resolution { x, y }) => Some((*x, *y)),
            _ => None,
        }
    }

    pub fn range(&self, name: &str) -> Option<(i32, i32)> {
        match self.first(name) {
            Some(AttrValue::Range { lower, upper }) => Some((*lower, *upper)),
            _ => None,
        }
    }

    pub fn collection(&self, name: &str) -> Option<&AttributeSet> {
        self.first(name).and_then(AttrValue::as_collection)
    }

    /// All string payloads of an attribute.
    pub fn strings(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|a| a.values.iter().filter_map(AttrValue::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_return_first_value() {
        let mut attrs = AttributeSet::new();
        attrs
            .add("copies", AttrValue::Integer(3))
            .add_keywords("sides-supported", &["one-sided", "two-sided-long-edge"])
            .add("printer-resolution", AttrValue::Resolution { x: 300, y: 600 });

        assert_eq!(attrs.integer("copies"), Some(3));
        assert_eq!(attrs.string("sides-supported"), Some("one-sided"));
        assert_eq!(attrs.strings("sides-supported").len(), 2);
        assert_eq!(attrs.resolution("printer-resolution"), Some((300, 600)));
        assert_eq!(attrs.integer("missing"), None);
    }

    #[test]
    fn empty_value_lists_are_skipped() {
        let mut attrs = AttributeSet::new();
        attrs.add_keywords::<&str>("media-type-supported", &[]);
        assert!(!attrs.contains("media-type-supported"));
        assert!(attrs.is_empty());
    }

    #[test]
    fn merge_overrides_existing_attributes() {
        let mut base = AttributeSet::new();
        base.add("print-speed-default", AttrValue::Integer(2));
        base.add("copies-default", AttrValue::Integer(1));

        let mut overlay = AttributeSet::new();
        overlay.add("print-speed-default", AttrValue::Integer(5));

        base.merge(&overlay);
        assert_eq!(base.integer("print-speed-default"), Some(5));
        assert_eq!(base.integer("copies-default"), Some(1));
    }

    #[test]
    fn mismatched_type_yields_none() {
        let mut attrs = AttributeSet::new();
        attrs.add("media", AttrValue::keyword("iso_a4_210x297mm"));
        assert_eq!(attrs.integer("media"), None);
        assert!(attrs.collection("media").is_none());
    }
}
