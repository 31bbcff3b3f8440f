use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::model::{Scalar, SlotMap};

/// A validated document as returned by `update/validate`.
///
/// The raw property maps are kept for the full-update payload, which echoes
/// them back unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResponse {
    pub object_definition_id: Option<JsonValue>,
    pub system_properties: Map<String, JsonValue>,
    pub color_code: Option<JsonValue>,
    pub remarks: Option<JsonValue>,
    pub doc_number: Option<JsonValue>,
    pub id: Option<JsonValue>,
    pub extended_properties: Map<String, JsonValue>,
    pub multivalue_extended_properties: Map<String, JsonValue>,
}

fn object_at(value: &JsonValue, key: &str) -> Map<String, JsonValue> {
    value
        .get(key)
        .and_then(JsonValue::as_object)
        .cloned()
        .unwrap_or_default()
}

fn present(value: &JsonValue, key: &str) -> Option<JsonValue> {
    value.get(key).filter(|v| !v.is_null()).cloned()
}

fn numeric_order(key: &str) -> (u8, u64) {
    key.parse::<u64>().map_or((1, 0), |n| (0, n))
}

impl ValidationResponse {
    /// Adapt a raw response. Non-objects yield `None`.
    #[must_use]
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        if !value.is_object() {
            debug!("validation response is not an object");
            return None;
        }
        Some(Self {
            object_definition_id: present(value, "objectDefinitionId"),
            system_properties: object_at(value, "systemProperties"),
            color_code: present(value, "colorCode"),
            remarks: present(value, "remarks"),
            doc_number: present(value, "docNumber"),
            id: present(value, "id"),
            extended_properties: object_at(value, "extendedProperties"),
            multivalue_extended_properties: object_at(value, "multivalueExtendedProperties"),
        })
    }

    /// `true` when the numeric id carries a multi-value slot map.
    #[must_use]
    pub fn is_multi(&self, numeric_id: &str) -> bool {
        self.multivalue_extended_properties
            .get(numeric_id)
            .is_some_and(|v| v.is_object() || v.is_array())
    }

    /// Single values in numeric id order. `null` is kept as `None`.
    #[must_use]
    pub fn single_values(&self) -> Vec<(&str, Option<Scalar>)> {
        let mut out: Vec<_> = self
            .extended_properties
            .iter()
            .map(|(k, v)| (k.as_str(), Scalar::from_json(v)))
            .collect();
        out.sort_by_key(|(k, _)| numeric_order(k));
        out
    }

    /// Multi-value slot maps in numeric id order. Non-object entries are
    /// skipped; arrays are read as consecutive slots.
    #[must_use]
    pub fn multi_values(&self) -> Vec<(&str, SlotMap)> {
        let mut out: Vec<_> = self
            .multivalue_extended_properties
            .iter()
            .filter_map(|(k, v)| {
                let slots = match v {
                    JsonValue::Object(_) => SlotMap::from_json(v)?,
                    JsonValue::Array(items) => {
                        SlotMap::from_values(items.iter().map(Scalar::from_json))
                    }
                    _ => return None,
                };
                Some((k.as_str(), slots))
            })
            .collect();
        out.sort_by_key(|(k, _)| numeric_order(k));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adapts_and_orders() {
        let resp = ValidationResponse::from_value(&json!({
            "objectDefinitionId": "9e332",
            "extendedProperties": {"20": "b", "3": null, "105": "x"},
            "multivalueExtendedProperties": {"105": {"2": "y", "1": "x"}, "7": "bad"},
            "colorCode": 3
        }))
        .unwrap();
        let keys: Vec<_> = resp.single_values().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["3", "20", "105"]);
        assert!(resp.is_multi("105"));
        assert!(!resp.is_multi("7"));
        let multi = resp.multi_values();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].1.ordered_text(), vec!["x", "y"]);
        assert_eq!(resp.color_code, Some(json!(3)));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(ValidationResponse::from_value(&json!(null)).is_none());
        assert!(ValidationResponse::from_value(&json!("x")).is_none());
    }
}
