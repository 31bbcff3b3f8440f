//! Dataset (value list) option handling.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::field::locale_chain;
use crate::model::{FieldValue, Scalar};

/// Key holding the stored raw value of a dataset entry.
const ORIGINAL_KEY: &str = "x-original";

/// One selectable value with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetOption {
    pub label: String,
    pub value: String,
}

fn entry_text(entry: &JsonValue, key: &str) -> String {
    match entry.get(key) {
        Some(JsonValue::String(s)) => s.trim().to_string(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Turn a dataset response (`{"values": [...]}`) into label/value options.
///
/// Labels follow the locale chain and fall back to the raw value; entries
/// with a blank raw value are dropped.
#[must_use]
pub fn normalize_dataset_options(dataset: &JsonValue, locale: &str) -> Vec<DatasetOption> {
    let Some(values) = dataset.get("values").and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    let chain = locale_chain(locale);

    values
        .iter()
        .filter_map(|entry| {
            let value = entry_text(entry, ORIGINAL_KEY);
            if value.is_empty() {
                return None;
            }
            let label = chain
                .iter()
                .map(|loc| entry_text(entry, loc))
                .find(|l| !l.is_empty())
                .unwrap_or_else(|| value.clone());
            Some(DatasetOption { label, value })
        })
        .collect()
}

/// Map an initial value onto the dataset: exact value match, then label
/// match, otherwise the trimmed input unchanged.
#[must_use]
pub fn map_initial_to_dataset_value(initial: &str, options: &[DatasetOption]) -> String {
    let needle = initial.trim();
    if needle.is_empty() || options.iter().any(|o| o.value == needle) {
        return needle.to_string();
    }
    options
        .iter()
        .find(|o| o.label == needle)
        .map_or_else(|| needle.to_string(), |o| o.value.clone())
}

/// List form of [`map_initial_to_dataset_value`]; blank results are dropped.
#[must_use]
pub fn map_initial_list_to_dataset_values(
    initial: &FieldValue,
    options: &[DatasetOption],
) -> Vec<String> {
    let items: Vec<&Scalar> = match initial {
        FieldValue::Single(s) => vec![s],
        FieldValue::Multi(items) => items.iter().collect(),
    };
    items
        .into_iter()
        .map(|s| map_initial_to_dataset_value(&s.as_text(), options))
        .filter(|v| !v.is_empty())
        .collect()
}

/// Options from an "existing values" response (`{"values": [{"value": ...}]}`),
/// labelled by their own value.
#[must_use]
pub fn normalize_existing_options(response: &JsonValue) -> Vec<DatasetOption> {
    response
        .get("values")
        .and_then(JsonValue::as_array)
        .map(|values| {
            values
                .iter()
                .map(|entry| {
                    let value = match entry.get("value") {
                        Some(JsonValue::String(s)) => s.clone(),
                        Some(JsonValue::Null) | None => String::new(),
                        Some(other) => other.to_string(),
                    };
                    DatasetOption {
                        label: value.clone(),
                        value,
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Shape a value for an existing-values picker: text, or a list of text.
#[must_use]
pub fn coerce_for_existing_values(value: Option<&FieldValue>, is_multi: bool) -> FieldValue {
    let as_text = |s: &Scalar| Scalar::Text(s.as_text().into_owned());
    match (value, is_multi) {
        (Some(FieldValue::Multi(items)), true) => {
            FieldValue::Multi(items.iter().map(as_text).collect())
        }
        (Some(FieldValue::Single(s)), true) => FieldValue::Multi(vec![as_text(s)]),
        (None, true) => FieldValue::Multi(vec![Scalar::Text(String::new())]),
        (Some(FieldValue::Single(s)), false) => FieldValue::Single(as_text(s)),
        (Some(FieldValue::Multi(items)), false) => FieldValue::Single(Scalar::Text(
            items
                .iter()
                .map(|s| s.as_text().into_owned())
                .collect::<Vec<_>>()
                .join(","),
        )),
        (None, false) => FieldValue::Single(Scalar::Text(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset() -> JsonValue {
        json!({"values": [
            {"x-original": "INV", "de-DE": "Rechnung", "en": "Invoice"},
            {"x-original": "CRN", "de": "Gutschrift"},
            {"x-original": "RAW"},
            {"x-original": "  ", "en": "Blank"}
        ]})
    }

    #[test]
    fn labels_follow_locale_chain() {
        let opts = normalize_dataset_options(&dataset(), "de-DE");
        assert_eq!(opts.len(), 3);
        assert_eq!(opts[0].label, "Rechnung");
        assert_eq!(opts[1].label, "Gutschrift");
        assert_eq!(opts[2].label, "RAW");

        let en = normalize_dataset_options(&dataset(), "en-US");
        assert_eq!(en[0].label, "Invoice");
        assert_eq!(en[1].label, "Gutschrift");
    }

    #[test]
    fn initial_value_matches_value_then_label() {
        let opts = normalize_dataset_options(&dataset(), "en");
        assert_eq!(map_initial_to_dataset_value("INV", &opts), "INV");
        assert_eq!(map_initial_to_dataset_value("Invoice", &opts), "INV");
        assert_eq!(map_initial_to_dataset_value("legacy", &opts), "legacy");
    }

    #[test]
    fn list_mapping_drops_blanks() {
        let opts = normalize_dataset_options(&dataset(), "en");
        let mapped = map_initial_list_to_dataset_values(
            &FieldValue::Multi(vec!["Invoice".into(), " ".into(), "CRN".into()]),
            &opts,
        );
        assert_eq!(mapped, vec!["INV", "CRN"]);
    }

    #[test]
    fn existing_values_label_themselves() {
        let opts = normalize_existing_options(&json!({"values": [{"value": "A"}, {"value": 2}]}));
        assert_eq!(opts[1], DatasetOption { label: "2".into(), value: "2".into() });
        assert_eq!(
            coerce_for_existing_values(Some(&FieldValue::Single(Scalar::Number(5.0))), true),
            FieldValue::Multi(vec!["5".into()])
        );
    }
}
