// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Tolerant extraction of `name=value` variables from textual responses.
//!
//! READVAR payloads are a loosely comma-separated list of fields, mixed
//! with material this sampler has no use for: quoted strings
//! (`version="ntpd 4.2.8..."`), hex timestamps (`reftime=0xe6...`), and
//! address tokens. The scanner walks the text once and keeps only fields
//! whose name matches `[a-z_]+` and whose value is a plain signed decimal
//! followed by a delimiter. Everything else is skipped, never an error;
//! an empty result set is the caller's signal to decide.

use std::collections::BTreeMap;

/// Parsed numeric variables from one response, keyed by bare field name.
///
/// Produced per response and consumed immediately by the sampler; iteration
/// order is deterministic (name order).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableSet {
    fields: BTreeMap<String, f64>,
}

impl VariableSet {
    /// Look up a field by bare name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Whether no fields were parsed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of parsed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Drop every field whose name is not in `keep`.
    pub fn retain_known(&mut self, keep: &[&str]) {
        self.fields.retain(|name, _| keep.contains(&name.as_str()));
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b == b'_'
}

fn is_value_byte(b: u8) -> bool {
    b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+'
}

/// Scan `text` for numeric `name=value` fields.
///
/// Zero matches yields an empty set, not an error. Values that do not parse
/// as a decimal number, or that run into a non-delimiter byte (the `x` of a
/// hex literal, the third dot of a dotted quad), are skipped along with
/// their name.
pub fn parse_fields(text: &str) -> VariableSet {
    let bytes = text.as_bytes();
    let mut fields = BTreeMap::new();
    let mut i = 0;
    while i < bytes.len() {
        let name_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            i += 1;
            continue;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        let name = &text[name_start..i];
        i += 1;
        let value_start = i;
        while i < bytes.len() && is_value_byte(bytes[i]) {
            i += 1;
        }
        let delimited =
            i >= bytes.len() || bytes[i] == b',' || bytes[i].is_ascii_whitespace();
        if !delimited || i == value_start {
            continue;
        }
        if let Ok(value) = text[value_start..i].parse::<f64>() {
            fields.insert(name.to_string(), value);
        }
    }
    VariableSet { fields }
}

/// Extract the `srcadr=` token: a dotted quad or hostname.
///
/// Looked up independently of [`parse_fields`] since addresses are not
/// numeric values.
pub fn parse_source_address(text: &str) -> Option<String> {
    token_after(text, "srcadr=", |b| {
        b.is_ascii_alphanumeric() || b == b'.' || b == b'-'
    })
}

/// Extract the `refid=` alphabetic token (`GPS`, `PPS`, ...).
///
/// Numeric reference ids (upstream server addresses) yield `None`; only
/// reference-clock style identifiers are used for peer naming.
pub fn parse_reference_id(text: &str) -> Option<String> {
    token_after(text, "refid=", |b| b.is_ascii_alphabetic())
}

fn token_after(text: &str, key: &str, accept: impl Fn(u8) -> bool) -> Option<String> {
    let start = text.find(key)? + key.len();
    let rest = &text[start..];
    let end = rest
        .bytes()
        .position(|b| !accept(b))
        .unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some(rest[..end].to_string())
    }
}
