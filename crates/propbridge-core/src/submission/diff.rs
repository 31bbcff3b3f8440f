use serde::{Deserialize, Serialize};
use tracing::debug;

use super::meta::{MetaEntry, MetaIndex};
use super::snapshot::{field_text, form_list};
use crate::coerce::normalize_text;
use crate::error::EngineError;
use crate::model::{DataType, FieldValue, FormData, PreviousValues, Scalar};

/// Width of the remote storage field, in UTF-8 bytes.
pub const DEFAULT_MAX_VALUE_BYTES: usize = 255;

/// One changed property in apply-endpoint shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProperty {
    pub key: String,
    pub values: Vec<String>,
}

/// `{ "properties": [{ key, values }] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProperties {
    pub properties: Vec<SourceProperty>,
}

impl SourceProperties {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SourceProperty> {
        self.properties.iter().find(|p| p.key == key)
    }
}

/// Normalized comparable list: joined text split, each value coerced,
/// printed and trimmed, blanks dropped.
pub(crate) fn normalize_multi(raw: Option<&FieldValue>, data_type: DataType) -> Vec<String> {
    form_list(raw)
        .iter()
        .map(|v| normalize_text(Some(v), data_type))
        .filter(|v| !v.is_empty())
        .collect()
}

/// Normalized comparable scalar. Lists are compared by their joined text.
pub(crate) fn normalize_single(raw: Option<&FieldValue>, data_type: DataType) -> String {
    match raw {
        None => normalize_text(None, data_type),
        Some(FieldValue::Single(s)) => normalize_text(Some(s), data_type),
        Some(multi @ FieldValue::Multi(_)) => {
            normalize_text(Some(&Scalar::Text(field_text(multi))), data_type)
        }
    }
}

/// Match `current` against `previous` in order.
///
/// Each previous value consumes one equal current value and keeps its
/// position; unmatched previous positions are `None`. Returns the slots and
/// the current values left over, in their original order.
pub(crate) fn reconcile(previous: &[String], current: &[String]) -> (Vec<Option<String>>, Vec<String>) {
    let mut remaining = current.to_vec();
    let slots = previous
        .iter()
        .map(|prev| {
            remaining
                .iter()
                .position(|c| c == prev)
                .map(|i| remaining.remove(i))
        })
        .collect();
    (slots, remaining)
}

fn check_width(key: &str, values: &[String], limit: usize) -> Result<(), EngineError> {
    match values.iter().find(|v| !v.is_empty() && v.len() > limit) {
        Some(v) => Err(EngineError::ValueTooLong {
            key: key.to_string(),
            bytes: v.len(),
            limit,
        }),
        None => Ok(()),
    }
}

fn diff_entry(
    entry: &MetaEntry,
    form: &FormData,
    prev: &PreviousValues,
    limit: usize,
) -> Result<Option<SourceProperty>, EngineError> {
    let key = entry.uuid.as_str();
    let raw = form.get(key);
    let previous = prev.get(key);

    let values = if entry.is_multi {
        let current = normalize_multi(raw, entry.data_type);
        let previous = normalize_multi(previous, entry.data_type);
        if current == previous {
            return Ok(None);
        }
        let (slots, leftovers) = reconcile(&previous, &current);
        slots
            .into_iter()
            .map(Option::unwrap_or_default)
            .chain(leftovers)
            .collect()
    } else {
        let current = normalize_single(raw, entry.data_type);
        if current == normalize_single(previous, entry.data_type) {
            return Ok(None);
        }
        vec![current]
    };

    check_width(key, &values, limit)?;
    Ok(Some(SourceProperty {
        key: key.to_string(),
        values,
    }))
}

/// The minimal change set between form state and the previous snapshot.
///
/// Read-only properties are never emitted. A changed multi-valued property
/// keeps surviving values in their previous positions, blanks removed ones
/// and appends new ones.
///
/// # Errors
///
/// Returns [`EngineError::ValueTooLong`] when any non-empty emitted value is
/// longer than `max_value_bytes` UTF-8 bytes.
pub fn collect_source_properties(
    form: &FormData,
    prev: &PreviousValues,
    meta: &MetaIndex,
    max_value_bytes: usize,
) -> Result<SourceProperties, EngineError> {
    let mut out = SourceProperties::default();
    for entry in meta.writable() {
        if let Some(prop) = diff_entry(entry, form, prev, max_value_bytes)? {
            out.properties.push(prop);
        }
    }
    debug!(changed = out.len(), "collected source properties");
    Ok(out)
}
