use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use super::is_all_digits;

/// One wire value: text, number, or boolean.
///
/// Absence is modelled with `Option<Scalar>`; an explicit empty string is
/// `Scalar::Text(String::new())` and is never the same as a missing value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Convert a JSON leaf. `null`, arrays and objects are not scalars.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Number(n) => n.as_f64().map(Self::Number),
            JsonValue::String(s) => Some(Self::Text(s.clone())),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// Text view of the value, formatted the way the remote service prints it.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// `true` when the printed form is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }

    /// Loose truthiness: non-empty text, non-zero number.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) if n.is_nan() => f.write_str("NaN"),
            Self::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Self::Number(n) if *n == 0.0 => f.write_str("0"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Scalar {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A property value as held in form state: one scalar or an ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(Scalar),
    Multi(Vec<Scalar>),
}

impl FieldValue {
    /// Convert a JSON value. Arrays lose their `null`/non-scalar members;
    /// slot-map objects become ordered lists; `null` is absent.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Array(items) => Some(Self::Multi(
                items.iter().filter_map(Scalar::from_json).collect(),
            )),
            JsonValue::Object(_) => {
                SlotMap::from_json(value).map(|slots| Self::Multi(slots.ordered_values()))
            }
            leaf => Scalar::from_json(leaf).map(Self::Single),
        }
    }

    #[must_use]
    pub const fn as_single(&self) -> Option<&Scalar> {
        match self {
            Self::Single(s) => Some(s),
            Self::Multi(_) => None,
        }
    }

    #[must_use]
    pub fn as_multi(&self) -> Option<&[Scalar]> {
        match self {
            Self::Multi(items) => Some(items),
            Self::Single(_) => None,
        }
    }

    /// `true` for a single empty string (not for an empty list).
    #[must_use]
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Single(Scalar::Text(s)) if s.is_empty())
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Single(Scalar::from(value))
    }
}

impl From<Vec<Scalar>> for FieldValue {
    fn from(value: Vec<Scalar>) -> Self {
        Self::Multi(value)
    }
}

/// Current form state, keyed by UUID (or raw id when unmapped).
pub type FormData = BTreeMap<String, FieldValue>;

/// Last-known server truth, keyed like [`FormData`].
pub type PreviousValues = BTreeMap<String, FieldValue>;

/// Captured slot maps per property key.
pub type SlotMaps = BTreeMap<String, SlotMap>;

/// Build form data from a JSON object; `null` entries are treated as absent.
#[must_use]
pub fn form_data_from_json(value: &JsonValue) -> FormData {
    let Some(obj) = value.as_object() else {
        return FormData::new();
    };
    obj.iter()
        .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
        .collect()
}

// ---------------------------------------------------------------------------
// Slot maps
// ---------------------------------------------------------------------------

/// Sparse slot-key → value mapping for one multi-valued property.
///
/// Keys keep their original spelling so they can be written back verbatim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotMap {
    entries: Vec<(String, Option<Scalar>)>,
}

fn slot_order(key: &str) -> (u8, u64) {
    key.parse::<u64>().map_or((1, 0), |n| (0, n))
}

impl SlotMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Read a JSON object as a slot map. Non-objects yield `None`.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            entries: obj
                .iter()
                .map(|(k, v)| (k.clone(), Scalar::from_json(v)))
                .collect(),
        })
    }

    /// `true` when every key of the object is all digits (an empty object qualifies).
    #[must_use]
    pub fn looks_like_slots(value: &JsonValue) -> bool {
        value
            .as_object()
            .is_some_and(|obj| obj.keys().all(|k| is_all_digits(k)))
    }

    /// Number list values in order as slots `1..=n`.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Option<Scalar>>) -> Self {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| ((i + 1).to_string(), v))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<Scalar>) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Scalar>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Entries sorted by numeric slot key; non-numeric keys sort last.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, Option<&Scalar>)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by_key(|(k, _)| slot_order(k));
        sorted
    }

    /// Values in slot order with `null` and blank entries dropped.
    #[must_use]
    pub fn ordered_values(&self) -> Vec<Scalar> {
        self.sorted()
            .into_iter()
            .filter_map(|(_, v)| v.filter(|s| !s.is_blank()).cloned())
            .collect()
    }

    /// Every slot in order as text, `null` rendered as `""`.
    #[must_use]
    pub fn ordered_text(&self) -> Vec<String> {
        self.sorted()
            .into_iter()
            .map(|(_, v)| v.map(|s| s.as_text().into_owned()).unwrap_or_default())
            .collect()
    }

    /// Only the all-digit slot keys, ascending.
    #[must_use]
    pub fn numeric_slots(&self) -> Vec<(&str, Option<&Scalar>)> {
        self.sorted()
            .into_iter()
            .filter(|(k, _)| is_all_digits(k))
            .collect()
    }
}

impl Serialize for SlotMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
