//! Snapshot value model.
//!
//! A fetched entity is held as a [`ValueStore`]: a mapping from field name to
//! [`Slot`], or a plain sequence for list-shaped responses. Custom fields are
//! stored wrapped in [`CustomFieldValue`] so the wire path needed for partial
//! updates survives the flattening done at extraction time; reads unwrap the
//! wrapper transparently and writes rewrap, preserving path and kind.

use crate::error::{ModelError, ModelResult};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde_json::Value;
use std::collections::BTreeMap;

/// One typed value inside an entity snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(DateTime<FixedOffset>),
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Converts raw wire JSON into a value tree without any coercion:
    /// strings stay strings, numbers map to `Int`/`Float`.
    pub fn from_wire(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else if n.is_u64() {
                    // beyond i64 range; a float would lose digits
                    FieldValue::Str(n.to_string())
                } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                    FieldValue::Float(f)
                } else {
                    FieldValue::Str(n.to_string())
                }
            }
            Value::String(s) => FieldValue::Str(s),
            Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from_wire).collect())
            }
            Value::Object(map) => FieldValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from_wire(v)))
                    .collect(),
            ),
        }
    }

    /// Serializes the value back into wire JSON. Dates are rendered as
    /// RFC 3339 with seconds precision.
    pub fn to_wire(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Date(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
            FieldValue::Array(items) => Value::Array(items.iter().map(FieldValue::to_wire).collect()),
            FieldValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            FieldValue::Date(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Whether a custom field repeats within a field-set group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomFieldKind {
    Standard,
    Grouped,
}

/// A custom-field value together with the wire path recorded at extraction.
///
/// Owned exclusively by the snapshot that contains it; the path never changes
/// after extraction unless the field is replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFieldValue {
    pub value: FieldValue,
    pub path: String,
    pub kind: CustomFieldKind,
}

/// One snapshot entry: either a plain value or a wrapped custom field.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Plain(FieldValue),
    Custom(CustomFieldValue),
}

impl Slot {
    /// The readable value, unwrapping a custom-field wrapper.
    pub fn value(&self) -> &FieldValue {
        match self {
            Slot::Plain(v) => v,
            Slot::Custom(cf) => &cf.value,
        }
    }

    pub fn as_custom(&self) -> Option<&CustomFieldValue> {
        match self {
            Slot::Custom(cf) => Some(cf),
            Slot::Plain(_) => None,
        }
    }
}

/// The field container for one entity snapshot.
///
/// Most responses are map-shaped; a handful of endpoints return a bare array
/// (list-shaped). Mapping-only operations on a list-shaped store return
/// [`ModelError::ListShaped`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueStore {
    Map(BTreeMap<String, Slot>),
    List(Vec<FieldValue>),
}

impl Default for ValueStore {
    fn default() -> Self {
        ValueStore::Map(BTreeMap::new())
    }
}

impl ValueStore {
    /// Builds a store from raw wire JSON. Objects become map-shaped stores,
    /// arrays list-shaped ones; any other payload is wrapped under `value`.
    pub fn from_wire(value: Value) -> Self {
        match value {
            Value::Object(map) => ValueStore::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Slot::Plain(FieldValue::from_wire(v))))
                    .collect(),
            ),
            Value::Array(items) => {
                ValueStore::List(items.into_iter().map(FieldValue::from_wire).collect())
            }
            other => {
                let mut map = BTreeMap::new();
                map.insert(
                    "value".to_string(),
                    Slot::Plain(FieldValue::from_wire(other)),
                );
                ValueStore::Map(map)
            }
        }
    }

    /// Serializes the store back into wire JSON. Custom-field wrappers are
    /// excluded: their values travel inside the retained descriptor array
    /// once [`crate::reinject_custom_fields`] has run.
    pub fn to_wire(&self) -> Value {
        match self {
            ValueStore::Map(map) => Value::Object(
                map.iter()
                    .filter_map(|(k, slot)| match slot {
                        Slot::Plain(v) => Some((k.clone(), v.to_wire())),
                        Slot::Custom(_) => None,
                    })
                    .collect(),
            ),
            ValueStore::List(items) => Value::Array(items.iter().map(FieldValue::to_wire).collect()),
        }
    }

    /// Reads a field, transparently unwrapping a custom-field wrapper.
    /// Returns `None` for absent keys and for list-shaped stores.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        match self {
            ValueStore::Map(map) => map.get(name).map(Slot::value),
            ValueStore::List(_) => None,
        }
    }

    /// The raw slot for a field, wrapper included.
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        match self {
            ValueStore::Map(map) => map.get(name),
            ValueStore::List(_) => None,
        }
    }

    /// Writes a field. Writing to an existing custom-field key rewraps the
    /// new value with the original path and kind; any other write stores a
    /// plain value.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> ModelResult<()> {
        let map = self.map_mut("set")?;
        let value = value.into();
        let slot = match map.get(name) {
            Some(Slot::Custom(existing)) => Slot::Custom(CustomFieldValue {
                value,
                path: existing.path.clone(),
                kind: existing.kind,
            }),
            _ => Slot::Plain(value),
        };
        map.insert(name.to_string(), slot);
        Ok(())
    }

    /// Inserts a custom-field wrapper under `name`, replacing any prior slot.
    pub fn insert_custom(&mut self, name: &str, field: CustomFieldValue) -> ModelResult<()> {
        let map = self.map_mut("insert_custom")?;
        map.insert(name.to_string(), Slot::Custom(field));
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        matches!(self, ValueStore::Map(map) if map.contains_key(name))
    }

    /// Removes a field, returning its slot if present.
    pub fn remove(&mut self, name: &str) -> ModelResult<Option<Slot>> {
        Ok(self.map_mut("remove")?.remove(name))
    }

    /// Field names, in sorted order.
    pub fn keys(&self) -> ModelResult<impl Iterator<Item = &str>> {
        Ok(self.map_ref("keys")?.keys().map(String::as_str))
    }

    /// `(name, slot)` pairs, in sorted key order.
    pub fn entries(&self) -> ModelResult<impl Iterator<Item = (&str, &Slot)>> {
        Ok(self
            .map_ref("entries")?
            .iter()
            .map(|(k, v)| (k.as_str(), v)))
    }

    /// Unwrapped field values, in sorted key order.
    pub fn values(&self) -> ModelResult<impl Iterator<Item = &FieldValue>> {
        Ok(self.map_ref("values")?.values().map(Slot::value))
    }

    /// The elements of a list-shaped store.
    pub fn elements(&self) -> Option<&[FieldValue]> {
        match self {
            ValueStore::List(items) => Some(items),
            ValueStore::Map(_) => None,
        }
    }

    /// Number of fields (map-shaped) or elements (list-shaped).
    pub fn len(&self) -> usize {
        match self {
            ValueStore::Map(map) => map.len(),
            ValueStore::List(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrites this store's fields with `other`'s on exact key collisions
    /// while leaving keys only present locally untouched.
    pub fn merge_from(&mut self, other: ValueStore) -> ModelResult<()> {
        let map = self.map_mut("merge_from")?;
        match other {
            ValueStore::Map(incoming) => {
                map.extend(incoming);
                Ok(())
            }
            ValueStore::List(_) => Err(ModelError::ListShaped {
                operation: "merge_from",
            }),
        }
    }

    fn map_ref(&self, operation: &'static str) -> ModelResult<&BTreeMap<String, Slot>> {
        match self {
            ValueStore::Map(map) => Ok(map),
            ValueStore::List(_) => Err(ModelError::ListShaped { operation }),
        }
    }

    fn map_mut(&mut self, operation: &'static str) -> ModelResult<&mut BTreeMap<String, Slot>> {
        match self {
            ValueStore::Map(map) => Ok(map),
            ValueStore::List(_) => Err(ModelError::ListShaped { operation }),
        }
    }
}
