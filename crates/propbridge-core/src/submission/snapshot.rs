use tracing::debug;

use crate::adapter::{DetailDocument, PropertyOrigin};
use crate::coerce::coerce;
use crate::id_map::IdMap;
use crate::index::ValueIndex;
use crate::model::{FieldValue, FormData, PreviousValues, PropertyDescriptor, Scalar, SlotMaps};
use crate::multivalue::{LIST_SEPARATORS, has_separator, split_joined};

/// Form value as a list: lists as-is, joined text split, other non-empty
/// scalars as a singleton.
pub(crate) fn form_list(raw: Option<&FieldValue>) -> Vec<Scalar> {
    match raw {
        None => Vec::new(),
        Some(FieldValue::Multi(items)) => items.clone(),
        Some(FieldValue::Single(Scalar::Text(s))) if s.is_empty() => Vec::new(),
        Some(FieldValue::Single(Scalar::Text(s))) if has_separator(s, LIST_SEPARATORS) => {
            split_joined(s, LIST_SEPARATORS)
                .into_iter()
                .map(Scalar::Text)
                .collect()
        }
        Some(FieldValue::Single(s)) => vec![s.clone()],
    }
}

/// Text of any field value; lists are joined with `,`.
pub(crate) fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Single(s) => s.as_text().into_owned(),
        FieldValue::Multi(items) => items
            .iter()
            .map(|s| s.as_text().into_owned())
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Last-known server values per property, keyed by mapped UUID.
///
/// Multi-valued properties read the detail index, then the form data;
/// single-valued properties read the search index, then the form data, then
/// the `DOCUMENT_ID` / `CATEGORY` aliases.
#[must_use]
pub fn make_previous_values(
    descriptors: &[PropertyDescriptor],
    id_map: &IdMap,
    detail: Option<&ValueIndex>,
    search: Option<&ValueIndex>,
    form: &FormData,
) -> PreviousValues {
    let mut prev = PreviousValues::new();
    for desc in descriptors {
        let raw_id = desc.id.trim();
        if raw_id.is_empty() {
            continue;
        }
        let (key, numeric) = id_map.resolve(raw_id);
        let by_key_or_numeric = |idx: &ValueIndex| -> Option<FieldValue> {
            idx.get(&key)
                .or_else(|| numeric.as_deref().and_then(|n| idx.get(n)))
                .cloned()
        };

        if desc.is_multi_value {
            let from_detail = detail
                .and_then(by_key_or_numeric)
                .and_then(|v| v.as_multi().map(<[Scalar]>::to_vec));
            let items = from_detail.unwrap_or_else(|| form_list(form.get(&key)));
            let values = items
                .iter()
                .map(|s| coerce(s, desc.data_type))
                .filter(|s| !s.is_blank())
                .collect();
            prev.insert(key, FieldValue::Multi(values));
        } else {
            let found = search
                .and_then(by_key_or_numeric)
                .or_else(|| form.get(&key).cloned())
                .or_else(|| search.and_then(|idx| idx.legacy_alias(&key).cloned()));
            let text = found
                .map(|v| {
                    let scalar = match &v {
                        FieldValue::Single(s) => s.clone(),
                        FieldValue::Multi(_) => Scalar::Text(field_text(&v)),
                    };
                    coerce(&scalar, desc.data_type).as_text().trim().to_string()
                })
                .unwrap_or_default();
            prev.insert(key, FieldValue::Single(Scalar::Text(text)));
        }
    }
    debug!(fields = prev.len(), "captured previous values");
    prev
}

/// Exact slot maps per property as the detail document returned them.
///
/// Sources in priority order: `multivalueProperties`, then
/// `multivalueExtendedProperties`, then slot maps inside
/// `extendedProperties`. Synthesized slots (from plain lists) are ignored.
#[must_use]
pub fn multivalue_slot_maps(doc: &DetailDocument, id_map: &IdMap) -> SlotMaps {
    let mut out = SlotMaps::new();
    for origin in [
        PropertyOrigin::Object,
        PropertyOrigin::MultivalueExtended,
        PropertyOrigin::Extended,
    ] {
        for prop in doc
            .multi
            .iter()
            .filter(|p| p.origin == origin && p.server_slots)
        {
            let key = prop.uuid.clone().or_else(|| {
                prop.id
                    .as_deref()
                    .map(|id| id_map.form_key(id).to_string())
            });
            let Some(key) = key.filter(|k| !k.is_empty()) else {
                continue;
            };
            out.entry(key).or_insert_with(|| prop.slots.clone());
        }
    }
    debug!(properties = out.len(), "captured slot maps");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{detail_index, search_index};
    use crate::adapter::SearchItem;
    use crate::model::DataType;
    use serde_json::json;

    fn id_map() -> IdMap {
        [
            ("1".to_string(), "uuid-1".to_string()),
            ("2".to_string(), "uuid-2".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn multi_prefers_detail_then_form() {
        let doc = DetailDocument::from_value(&json!({
            "extendedProperties": {"1": {"1": "a", "2": " ", "3": "b"}}
        }));
        let detail = detail_index(&doc, &id_map());
        let mut form = FormData::new();
        form.insert("uuid-2".into(), FieldValue::from("x | y;z"));
        let descriptors = vec![
            PropertyDescriptor::new("1").multi(),
            PropertyDescriptor::new("2").multi(),
            PropertyDescriptor::new("3").multi(),
        ];
        let prev = make_previous_values(&descriptors, &id_map(), Some(&detail), None, &form);
        assert_eq!(prev["uuid-1"], FieldValue::Multi(vec!["a".into(), "b".into()]));
        assert_eq!(
            prev["uuid-2"],
            FieldValue::Multi(vec!["x".into(), "y".into(), "z".into()])
        );
        assert_eq!(prev["3"], FieldValue::Multi(vec![]));
    }

    #[test]
    fn single_reads_search_then_form_then_aliases() {
        let item = SearchItem::from_value(&json!({
            "id": "D1",
            "sourceProperties": [{"key": "1", "value": " 5 "}]
        }));
        let search = search_index(&item, &[]);
        let mut form = FormData::new();
        form.insert("uuid-2".into(), FieldValue::from("typed"));
        let descriptors = vec![
            PropertyDescriptor::new("1").with_data_type(DataType::Number),
            PropertyDescriptor::new("2"),
            PropertyDescriptor::new("DOCUMENT_ID"),
            PropertyDescriptor::new("missing"),
        ];
        let prev = make_previous_values(&descriptors, &id_map(), None, Some(&search), &form);
        assert_eq!(prev["uuid-1"], FieldValue::from("5"));
        assert_eq!(prev["uuid-2"], FieldValue::from("typed"));
        assert_eq!(prev["DOCUMENT_ID"], FieldValue::from("D1"));
        assert_eq!(prev["missing"], FieldValue::from(""));
    }

    #[test]
    fn slot_maps_first_source_wins() {
        let doc = DetailDocument::from_value(&json!({
            "multivalueProperties": [{"id": "1", "values": {"1": "a", "6": "c"}}],
            "multivalueExtendedProperties": {"1": {"1": "dup"}, "2": {"2": "b"}},
            "extendedProperties": {"9": {"4": "d"}, "10": ["plain", "list"]}
        }));
        let maps = multivalue_slot_maps(&doc, &id_map());
        assert_eq!(maps["uuid-1"].ordered_text(), vec!["a", "c"]);
        assert_eq!(maps["uuid-2"].get("2"), Some(&Scalar::from("b")));
        assert!(maps.contains_key("9"));
        assert!(!maps.contains_key("10"));
    }
}
