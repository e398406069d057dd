// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Flattened contact form payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the visitor's name field.
pub const NAME_FIELD: &str = "name";
/// Name of the free-text message field.
pub const MESSAGE_FIELD: &str = "message";
/// Name of the reply address field.
pub const EMAIL_FIELD: &str = "email";
/// Field carrying the delivery API access key.
pub const ACCESS_KEY_FIELD: &str = "access_key";

/// Form fields as submitted, serialized as a flat JSON object.
///
/// Unknown fields are carried through to the relay untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactForm {
    fields: Map<String, Value>,
}

impl ContactForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for string fields.
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields
            .insert(field.to_string(), Value::String(value.into()));
    }

    /// Insert a field only when it is not already present.
    pub fn set_if_absent(&mut self, field: &str, value: impl Into<String>) {
        if !self.fields.contains_key(field) {
            self.set(field, value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String value of a field. `None` when absent or not a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Whether a field carries any non-empty value.
    ///
    /// Strings count when non-empty, booleans when true, numbers when
    /// non-zero, arrays and objects when they hold anything.
    pub fn is_filled(&self, field: &str) -> bool {
        match self.fields.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decoded `application/x-www-form-urlencoded` pairs. Every value is a
/// string; a repeated key keeps its last value.
impl FromIterator<(String, String)> for ContactForm {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let fields = pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Self { fields }
    }
}
