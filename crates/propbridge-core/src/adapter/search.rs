use serde_json::Value as JsonValue;
use tracing::debug;

use super::first_present;
use crate::id_map::IdMap;
use crate::model::{FieldValue, Scalar, json_id};

/// One item of a search-result (`sr`) response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchItem {
    pub id: Option<String>,
    /// `sourceProperties[].key` → display value.
    pub source_properties: Vec<(String, FieldValue)>,
    /// `displayProperties[].id` → display value.
    pub display_properties: Vec<(String, FieldValue)>,
    pub category: Option<String>,
    pub sort_property: Option<(String, FieldValue)>,
    /// The embedded `propertyIdToUUID` map, when it is well formed.
    pub id_map: Option<IdMap>,
}

/// `displayValue ?? value ?? ""`.
fn display_of(entry: &JsonValue) -> FieldValue {
    first_present(entry, &["displayValue", "value"])
        .and_then(FieldValue::from_json)
        .unwrap_or_else(|| FieldValue::Single(Scalar::Text(String::new())))
}

fn keyed_list(item: &JsonValue, list: &str, key: &str) -> Vec<(String, FieldValue)> {
    item.get(list)
        .and_then(JsonValue::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| Some((e.get(key).and_then(json_id)?, display_of(e))))
                .collect()
        })
        .unwrap_or_default()
}

/// Category id from an object carrying one of the usual id fields.
fn category_from_object(obj: &JsonValue) -> Option<String> {
    ["id", "categoryId", "uuid", "uniqueId", "key"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(json_id))
}

impl SearchItem {
    /// Adapt one raw search item. Missing pieces stay empty.
    #[must_use]
    pub fn from_value(item: &JsonValue) -> Self {
        if !item.is_object() {
            debug!("search item is not an object");
            return Self::default();
        }

        let category = match item.get("category") {
            Some(scalar @ (JsonValue::String(_) | JsonValue::Number(_))) => json_id(scalar),
            Some(obj @ JsonValue::Object(_)) => category_from_object(obj),
            _ => None,
        }
        .or_else(|| {
            item.get("sourceCategories")
                .and_then(|c| c.get(0))
                .and_then(|first| category_from_object(first).or_else(|| json_id(first)))
        });

        let sort_property = item.get("sortProperty").and_then(|sp| {
            let id = sp.get("id").and_then(json_id)?;
            let value = sp.get("value").filter(|v| truthy(v))?;
            Some((id, FieldValue::from_json(value)?))
        });

        Self {
            id: item.get("id").and_then(json_id),
            source_properties: keyed_list(item, "sourceProperties", "key"),
            display_properties: keyed_list(item, "displayProperties", "id"),
            category,
            sort_property,
            id_map: item.get("propertyIdToUUID").and_then(IdMap::from_embedded),
        }
    }

    /// Pick the first item of a full search response, or treat the value as
    /// an item when it already looks like one.
    #[must_use]
    pub fn from_response(response: &JsonValue) -> Option<Self> {
        if let Some(items) = response.get("items").and_then(JsonValue::as_array) {
            let first = items.first()?;
            let mut item = Self::from_value(first);
            if item.id_map.is_none() {
                item.id_map = IdMap::from_search_response(response);
            }
            return Some(item);
        }
        response.is_object().then(|| Self::from_value(response))
    }
}

fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
