use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::diff::{normalize_multi, normalize_single, reconcile};
use super::encode_component;
use super::meta::{MetaEntry, MetaIndex};
use crate::adapter::ConcurrencyToken;
use crate::id_map::IdMap;
use crate::index::ValueIndex;
use crate::model::{
    FieldValue, FormData, PreviousValues, PropertyDescriptor, Scalar, SlotMap, SlotMaps,
    is_all_digits,
};

/// System properties copied from the search index into the payload.
pub const SYSTEM_PROPERTY_WHITELIST: &[&str] = &[
    "property_document_number",
    "property_variant_number",
    "property_editor",
    "property_colorcode",
];

/// Self link of the document being updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmsObjectLink {
    pub href: String,
    pub id: String,
}

/// The `storeObject` block: marks the request as a metadata-only update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreObject {
    pub display_value: String,
    pub filename: String,
    pub dms_object_id: String,
    pub dmsobject: DmsObjectLink,
    pub do_mapping: bool,
    pub is_in_update_mode: bool,
    pub do_validate: bool,
    pub file_select: bool,
    pub id: u32,
    #[serde(rename = "_links")]
    pub links: Map<String, JsonValue>,
    #[serde(rename = "_embedded")]
    pub embedded: Map<String, JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_token_url: Option<String>,
}

impl StoreObject {
    /// `/dms/r/{repo}/o2/{doc}`, or empty without a repository.
    #[must_use]
    pub fn self_href(repo_id: Option<&str>, document_id: &str) -> String {
        match repo_id.map(str::trim).filter(|r| !r.is_empty()) {
            Some(repo) => format!(
                "/dms/r/{}/o2/{}",
                encode_component(repo),
                encode_component(document_id)
            ),
            None => String::new(),
        }
    }

    #[must_use]
    pub fn new(
        repo_id: Option<&str>,
        document_id: &str,
        display_value: Option<&str>,
        filename: Option<&str>,
        concurrency: Option<&ConcurrencyToken>,
    ) -> Self {
        Self {
            display_value: display_value.unwrap_or_default().to_string(),
            filename: filename.unwrap_or_default().to_string(),
            dms_object_id: document_id.to_string(),
            dmsobject: DmsObjectLink {
                href: Self::self_href(repo_id, document_id),
                id: document_id.to_string(),
            },
            do_mapping: false,
            is_in_update_mode: true,
            do_validate: false,
            file_select: false,
            id: 0,
            links: Map::new(),
            embedded: Map::new(),
            e_tag: concurrency.and_then(|c| c.e_tag.clone()),
            lock_token_url: concurrency.and_then(|c| c.lock_token_url.clone()),
        }
    }
}

/// Body of `POST /o2/{documentId}/update/validate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPayload {
    #[serde(rename = "type")]
    pub kind: u8,
    pub object_definition_id: String,
    pub system_properties: Map<String, JsonValue>,
    pub remarks: Map<String, JsonValue>,
    pub multivalue_extended_properties: BTreeMap<String, SlotMap>,
    pub extended_properties: BTreeMap<String, String>,
    pub doc_number: String,
    pub id: String,
    pub store_object: StoreObject,
}

/// Everything [`build_validation_payload`] reads.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest<'a> {
    pub document_id: &'a str,
    pub repo_id: Option<&'a str>,
    pub object_definition_id: Option<&'a str>,
    pub category_id: Option<&'a str>,
    pub form: &'a FormData,
    pub meta: &'a MetaIndex,
    pub id_map: &'a IdMap,
    /// Falls back to descriptors derived from `meta` when empty.
    pub descriptors: &'a [PropertyDescriptor],
    pub previous: Option<&'a PreviousValues>,
    pub slot_maps: Option<&'a SlotMaps>,
    pub search: Option<&'a ValueIndex>,
    pub concurrency: Option<&'a ConcurrencyToken>,
    pub display_value: Option<&'a str>,
    pub filename: Option<&'a str>,
}

impl<'a> ValidationRequest<'a> {
    #[must_use]
    pub const fn new(
        document_id: &'a str,
        form: &'a FormData,
        meta: &'a MetaIndex,
        id_map: &'a IdMap,
    ) -> Self {
        Self {
            document_id,
            repo_id: None,
            object_definition_id: None,
            category_id: None,
            form,
            meta,
            id_map,
            descriptors: &[],
            previous: None,
            slot_maps: None,
            search: None,
            concurrency: None,
            display_value: None,
            filename: None,
        }
    }

    fn object_definition_id(&self) -> String {
        let non_empty = |s: Option<&'a str>| s.map(str::trim).filter(|s| !s.is_empty());
        non_empty(self.object_definition_id)
            .or_else(|| {
                non_empty(self.category_id).and_then(|cat| self.id_map.numeric_id_for(cat))
            })
            .or_else(|| non_empty(self.category_id))
            .unwrap_or_default()
            .to_string()
    }

    fn system_properties(&self) -> Map<String, JsonValue> {
        let Some(search) = self.search else {
            return Map::new();
        };
        SYSTEM_PROPERTY_WHITELIST
            .iter()
            .filter_map(|key| search.get(key).map(|v| ((*key).to_string(), v.to_json())))
            .collect()
    }

    fn properties(&self) -> Vec<PropertyDescriptor> {
        if !self.descriptors.is_empty() {
            return self.descriptors.to_vec();
        }
        self.meta
            .iter()
            .map(|m| PropertyDescriptor {
                id: m.uuid.clone(),
                data_type: m.data_type,
                is_multi_value: m.is_multi,
                read_only: m.read_only,
                ..PropertyDescriptor::default()
            })
            .collect()
    }

    fn previous_of(&self, form_key: &str, prop_id: &str) -> Option<&'a FieldValue> {
        let prev = self.previous?;
        prev.get(form_key).or_else(|| prev.get(prop_id))
    }
}

/// Previous ordering of a multi-valued property as `(slot key, value)`.
///
/// A captured slot map wins (numeric keys only, ascending); otherwise the
/// snapshot list is numbered `1..=n`.
fn previous_slots(
    req: &ValidationRequest<'_>,
    entry: &MetaEntry,
    form_key: &str,
    prop_id: &str,
) -> Vec<(String, String)> {
    let captured = req
        .slot_maps
        .and_then(|maps| maps.get(form_key).or_else(|| maps.get(prop_id)))
        .map(|slots| {
            slots
                .numeric_slots()
                .into_iter()
                .map(|(k, v)| {
                    let text = v.map(|s| s.as_text().trim().to_string()).unwrap_or_default();
                    (k.to_string(), text)
                })
                .collect::<Vec<_>>()
        })
        .filter(|slots| !slots.is_empty());
    if let Some(slots) = captured {
        return slots;
    }
    normalize_multi(req.previous_of(form_key, prop_id), entry.data_type)
        .into_iter()
        .enumerate()
        .map(|(i, v)| ((i + 1).to_string(), v))
        .collect()
}

/// First unused slot at or after `from`; once the key space above is
/// exhausted, the lowest unused slot.
fn free_slot(taken: &BTreeSet<u64>, from: u64) -> u64 {
    (from..=u64::MAX)
        .chain(1..from)
        .find(|n| !taken.contains(n))
        .unwrap_or(from)
}

/// Write current values into the previous slot layout.
fn slot_values(previous: &[(String, String)], current: &[String]) -> SlotMap {
    let prev_values: Vec<String> = previous.iter().map(|(_, v)| v.clone()).collect();
    let (mut slots, mut remaining) = reconcile(&prev_values, current);
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        if remaining.is_empty() {
            break;
        }
        *slot = Some(remaining.remove(0));
    }

    let mut out = SlotMap::new();
    for ((key, _), value) in previous.iter().zip(slots) {
        out.insert(key.clone(), Some(Scalar::Text(value.unwrap_or_default())));
    }
    let mut taken: BTreeSet<u64> = previous
        .iter()
        .filter_map(|(k, _)| k.parse::<u64>().ok())
        .collect();
    let mut from = taken.last().map_or(1, |max| max.saturating_add(1));
    for value in remaining {
        let slot = free_slot(&taken, from);
        taken.insert(slot);
        out.insert(slot.to_string(), Some(Scalar::Text(value)));
        from = slot.saturating_add(1);
    }
    if out.is_empty() {
        out.insert("1", Some(Scalar::Text(String::new())));
    }
    out
}

/// Build the validate-update request body.
///
/// Properties without a resolvable numeric id and read-only properties are
/// left out. Single values fall back to the previous snapshot when the form
/// has none; multi values reuse the previous slot layout.
#[must_use]
pub fn build_validation_payload(req: &ValidationRequest<'_>) -> ValidationPayload {
    let mut extended = BTreeMap::new();
    let mut multivalue = BTreeMap::new();

    for desc in req.properties() {
        let prop_id = desc.id.trim();
        if prop_id.is_empty() {
            continue;
        }
        let form_key = req.id_map.form_key(prop_id);
        let entry = req
            .meta
            .get(form_key)
            .or_else(|| req.meta.get(prop_id))
            .cloned()
            .unwrap_or_else(|| MetaEntry {
                uuid: form_key.to_string(),
                numeric_id: req
                    .id_map
                    .numeric_id_for(form_key)
                    .or_else(|| req.id_map.numeric_id_for(prop_id))
                    .map(ToString::to_string),
                data_type: desc.data_type,
                is_multi: desc.is_multi_value,
                read_only: desc.is_read_only(),
            });
        if entry.read_only {
            continue;
        }
        let numeric_id = entry
            .numeric_id
            .as_deref()
            .or_else(|| req.id_map.numeric_id_for(form_key))
            .or_else(|| req.id_map.numeric_id_for(prop_id))
            .or_else(|| is_all_digits(prop_id).then_some(prop_id));
        let Some(numeric_id) = numeric_id.map(ToString::to_string) else {
            debug!(property = %prop_id, "no numeric id, leaving property out");
            continue;
        };
        let raw = req.form.get(form_key).or_else(|| req.form.get(prop_id));

        if entry.is_multi {
            let current = normalize_multi(raw, entry.data_type);
            let previous = previous_slots(req, &entry, form_key, prop_id);
            multivalue.insert(numeric_id, slot_values(&previous, &current));
        } else {
            let value = raw
                .or_else(|| req.previous_of(form_key, prop_id))
                .map(|v| normalize_single(Some(v), entry.data_type))
                .unwrap_or_default();
            extended.insert(numeric_id, value);
        }
    }

    debug!(
        single = extended.len(),
        multi = multivalue.len(),
        "built validation payload"
    );
    ValidationPayload {
        kind: 1,
        object_definition_id: req.object_definition_id(),
        system_properties: req.system_properties(),
        remarks: Map::new(),
        multivalue_extended_properties: multivalue,
        extended_properties: extended,
        doc_number: req.document_id.to_string(),
        id: req.document_id.to_string(),
        store_object: StoreObject::new(
            req.repo_id,
            req.document_id,
            req.display_value,
            req.filename,
            req.concurrency,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;
    use serde_json::json;

    fn id_map() -> IdMap {
        [
            ("100".to_string(), "uuid-100".to_string()),
            ("9e332".to_string(), "cat-uuid".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn slots(pairs: &[(&str, Option<&str>)]) -> SlotMap {
        let mut map = SlotMap::new();
        for (k, v) in pairs {
            map.insert(*k, v.map(Scalar::from));
        }
        map
    }

    #[test]
    fn fixed_shape_and_store_object() {
        let id_map = id_map();
        let meta = MetaIndex::default();
        let form = FormData::new();
        let token = ConcurrencyToken {
            e_tag: Some("\"v1\"".into()),
            lock_token_url: None,
        };
        let mut req = ValidationRequest::new("D 1", &form, &meta, &id_map);
        req.repo_id = Some("repo/x");
        req.category_id = Some("cat-uuid");
        req.concurrency = Some(&token);
        let json = serde_json::to_value(build_validation_payload(&req)).unwrap();

        assert_eq!(json["type"], 1);
        assert_eq!(json["objectDefinitionId"], "9e332");
        assert_eq!(json["docNumber"], "D 1");
        assert_eq!(json["remarks"], json!({}));
        let store = &json["storeObject"];
        assert_eq!(store["dmsobject"]["href"], "/dms/r/repo%2Fx/o2/D%201");
        assert_eq!(store["isInUpdateMode"], true);
        assert_eq!(store["doMapping"], false);
        assert_eq!(store["id"], 0);
        assert_eq!(store["_links"], json!({}));
        assert_eq!(store["eTag"], "\"v1\"");
        assert!(store.get("lockTokenUrl").is_none());
    }

    #[test]
    fn href_is_empty_without_repository() {
        assert_eq!(StoreObject::self_href(None, "D1"), "");
        assert_eq!(StoreObject::self_href(Some(" "), "D1"), "");
    }

    #[test]
    fn single_values_fall_back_to_previous() {
        let id_map = id_map();
        let descriptors = vec![
            PropertyDescriptor::new("100"),
            PropertyDescriptor::new("200").with_data_type(DataType::Number),
            PropertyDescriptor::new("no-numeric"),
            PropertyDescriptor::new("300").read_only(),
        ];
        let meta = MetaIndex::build(&descriptors, &id_map);
        let mut form = FormData::new();
        form.insert("200".into(), FieldValue::from(" 1 000 "));
        form.insert("300".into(), FieldValue::from("ignored"));
        let mut prev = PreviousValues::new();
        prev.insert("uuid-100".into(), FieldValue::from(" kept "));

        let mut req = ValidationRequest::new("D1", &form, &meta, &id_map);
        req.descriptors = &descriptors;
        req.previous = Some(&prev);
        let payload = build_validation_payload(&req);
        assert_eq!(payload.extended_properties.get("100").map(String::as_str), Some("kept"));
        assert_eq!(payload.extended_properties.get("200").map(String::as_str), Some("1000"));
        assert_eq!(payload.extended_properties.len(), 2);
    }

    #[test]
    fn multi_values_reuse_captured_slots() {
        let prev = slots(&[("1", Some("v1")), ("2", Some("v2")), ("6", Some("v3"))]);
        let current = vec!["v3".to_string(), "new".to_string(), "v1".to_string()];
        let previous: Vec<(String, String)> = prev
            .numeric_slots()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.map(|s| s.to_string()).unwrap_or_default()))
            .collect();
        let out = slot_values(&previous, &current);
        assert_eq!(out.get("1"), Some(&Scalar::from("v1")));
        assert_eq!(out.get("2"), Some(&Scalar::from("new")));
        assert_eq!(out.get("6"), Some(&Scalar::from("v3")));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn insertions_go_after_highest_slot() {
        let previous = vec![("3".to_string(), "a".to_string())];
        let out = slot_values(&previous, &["a".to_string(), "b".to_string()]);
        assert_eq!(out.get("4"), Some(&Scalar::from("b")));
    }

    #[test]
    fn insertion_after_largest_slot_key_takes_lowest_free_slot() {
        let previous = vec![(u64::MAX.to_string(), "A".to_string())];
        let out = slot_values(&previous, &["A".to_string(), "B".to_string(), "C".to_string()]);
        assert_eq!(out.get("18446744073709551615"), Some(&Scalar::from("A")));
        assert_eq!(out.get("1"), Some(&Scalar::from("B")));
        assert_eq!(out.get("2"), Some(&Scalar::from("C")));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn removals_blank_their_slot_and_empty_keeps_placeholder() {
        let previous = vec![("1".to_string(), "a".to_string()), ("2".to_string(), "b".to_string())];
        let out = slot_values(&previous, &["b".to_string()]);
        assert_eq!(out.get("1"), Some(&Scalar::from("")));
        assert_eq!(out.get("2"), Some(&Scalar::from("b")));

        let empty = slot_values(&[], &[]);
        assert_eq!(empty.get("1"), Some(&Scalar::from("")));
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn multi_without_slot_map_numbers_from_snapshot() {
        let id_map = id_map();
        let descriptors = vec![PropertyDescriptor::new("100").multi()];
        let meta = MetaIndex::build(&descriptors, &id_map);
        let mut form = FormData::new();
        form.insert("uuid-100".into(), FieldValue::from("b;c"));
        let mut prev = PreviousValues::new();
        prev.insert(
            "uuid-100".into(),
            FieldValue::Multi(vec!["a".into(), "b".into()]),
        );
        let mut req = ValidationRequest::new("D1", &form, &meta, &id_map);
        req.previous = Some(&prev);
        let payload = build_validation_payload(&req);
        let json = serde_json::to_value(&payload.multivalue_extended_properties["100"]).unwrap();
        assert_eq!(json, json!({"1": "c", "2": "b"}));
    }

    #[test]
    fn whitelisted_system_properties_are_copied() {
        let id_map = IdMap::new();
        let meta = MetaIndex::default();
        let form = FormData::new();
        let mut search = ValueIndex::new();
        search.insert("property_document_number", FieldValue::from("N-1"));
        search.insert("property_filename", FieldValue::from("a.pdf"));
        let mut req = ValidationRequest::new("D1", &form, &meta, &id_map);
        req.search = Some(&search);
        req.object_definition_id = Some("42");
        let payload = build_validation_payload(&req);
        assert_eq!(payload.object_definition_id, "42");
        assert_eq!(payload.system_properties.len(), 1);
        assert_eq!(payload.system_properties["property_document_number"], "N-1");
    }
}
