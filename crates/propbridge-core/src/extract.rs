//! Value indexes per source document, and initial form values assembled
//! from them.

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::adapter::{DetailDocument, MultiProperty, PropertyOrigin, SearchItem, SingleProperty};
use crate::coerce::{coerce, coerce_opt};
use crate::id_map::IdMap;
use crate::index::{CATEGORY, DOCUMENT_ID, ValueIndex, prefixed};
use crate::model::{DataType, FieldValue, FormData, PropertyDescriptor, Scalar, SlotMap};
use crate::multivalue::{INITIAL_SEPARATORS, LIST_SEPARATORS, has_separator, split_joined};

/// `property_*` spellings copied to their canonical system name when the
/// canonical key is missing from a search index.
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("property_filename", "FILE_NAME"),
    ("property_filetype", "FILE_EXTENSION"),
    ("property_filesize", "FILE_SIZE"),
    ("property_state", "STATUS"),
    ("property_editor", "EDITOR"),
    ("property_owner", "OWNER"),
    ("property_document_id", DOCUMENT_ID),
    ("property_category", CATEGORY),
];

// ---------------------------------------------------------------------------
// Index builders
// ---------------------------------------------------------------------------

/// Index a search item. `extra_aliases` extends [`LEGACY_ALIASES`].
#[must_use]
pub fn search_index(item: &SearchItem, extra_aliases: &[(&str, &str)]) -> ValueIndex {
    let mut idx = ValueIndex::new();
    for (key, value) in item.source_properties.iter().chain(&item.display_properties) {
        idx.insert(key, value.clone());
    }
    if let Some(id) = &item.id {
        idx.insert(DOCUMENT_ID, FieldValue::from(id.as_str()));
    }
    if let Some(category) = &item.category {
        idx.insert(CATEGORY, FieldValue::from(category.as_str()));
    }
    if let Some((key, value)) = &item.sort_property {
        idx.insert(key, value.clone());
    }
    for (legacy, canonical) in LEGACY_ALIASES.iter().chain(extra_aliases) {
        if let Some(value) = idx.get(legacy).cloned() {
            idx.insert_if_absent(canonical, value);
        }
    }
    debug!(keys = idx.len(), "built search index");
    idx
}

/// Every key a detail property is reachable under: id, uuid, mapped uuid,
/// and for on-premise entries the `property_<id>` alias.
fn detail_keys(id: Option<&str>, uuid: Option<&str>, origin: PropertyOrigin, id_map: &IdMap) -> Vec<String> {
    let mut keys = Vec::with_capacity(4);
    if let Some(id) = id {
        keys.push(id.to_string());
        if origin != PropertyOrigin::Object {
            keys.push(prefixed(id));
        }
        if let Some(mapped) = id_map.get(id) {
            keys.push(mapped.to_string());
        }
    }
    if let Some(uuid) = uuid {
        keys.push(uuid.to_string());
    }
    keys
}

fn single_value(prop: &SingleProperty) -> FieldValue {
    FieldValue::Single(
        prop.effective()
            .cloned()
            .unwrap_or_else(|| Scalar::Text(String::new())),
    )
}

fn multi_value(prop: &MultiProperty) -> FieldValue {
    FieldValue::Multi(prop.slots.ordered_values())
}

/// Index a detail document.
#[must_use]
pub fn detail_index(doc: &DetailDocument, id_map: &IdMap) -> ValueIndex {
    let mut idx = ValueIndex::new();

    for sys in &doc.system_properties {
        let value = sys
            .effective()
            .cloned()
            .unwrap_or_else(|| Scalar::Text(String::new()));
        idx.insert(&sys.id, FieldValue::Single(value));
    }

    let keyed = |id: &Option<String>, uuid: &Option<String>, origin| {
        detail_keys(id.as_deref(), uuid.as_deref(), origin, id_map)
    };

    for prop in doc.single.iter().filter(|p| p.origin == PropertyOrigin::Object) {
        for key in keyed(&prop.id, &prop.uuid, prop.origin) {
            idx.insert(&key, single_value(prop));
        }
    }
    for prop in doc.multi.iter().filter(|p| p.origin == PropertyOrigin::Object) {
        for key in keyed(&prop.id, &prop.uuid, prop.origin) {
            idx.insert(&key, multi_value(prop));
        }
    }

    for prop in doc.single.iter().filter(|p| p.origin == PropertyOrigin::Extended) {
        if prop.value.as_ref().is_none_or(|v| v.as_text().is_empty()) {
            continue;
        }
        for key in keyed(&prop.id, &prop.uuid, prop.origin) {
            idx.insert(&key, single_value(prop));
        }
    }
    for prop in doc.multi.iter().filter(|p| p.origin == PropertyOrigin::Extended) {
        for key in keyed(&prop.id, &prop.uuid, prop.origin) {
            idx.insert(&key, multi_value(prop));
        }
    }
    for prop in doc
        .multi
        .iter()
        .filter(|p| p.origin == PropertyOrigin::MultivalueExtended)
    {
        for key in keyed(&prop.id, &prop.uuid, prop.origin) {
            idx.insert_if_absent(&key, multi_value(prop));
        }
    }

    if let Some(id) = &doc.id {
        idx.insert(DOCUMENT_ID, FieldValue::from(id.as_str()));
    }
    debug!(keys = idx.len(), variant = %doc.variant, "built detail index");
    idx
}

/// Index the host's `dmsProperties` bag.
///
/// Lists lose null/blank members but are kept even when empty; empty
/// scalars are skipped.
#[must_use]
pub fn host_index(bag: &Map<String, JsonValue>, id_map: &IdMap) -> ValueIndex {
    let mut idx = ValueIndex::new();
    for (raw_key, raw) in bag {
        let key = raw_key.trim();
        if key.is_empty() {
            continue;
        }
        let value = match raw {
            JsonValue::Array(items) => FieldValue::Multi(
                items
                    .iter()
                    .filter_map(Scalar::from_json)
                    .filter(|s| !s.is_blank())
                    .collect(),
            ),
            JsonValue::Object(_) if SlotMap::looks_like_slots(raw) => FieldValue::Multi(
                SlotMap::from_json(raw)
                    .map(|s| s.ordered_values())
                    .unwrap_or_default(),
            ),
            JsonValue::String(s) if s.is_empty() => continue,
            leaf => match Scalar::from_json(leaf) {
                Some(s) => FieldValue::Single(s),
                None => continue,
            },
        };
        idx.insert(key, value.clone());
        idx.insert(&prefixed(key), value.clone());
        if let Some(uuid) = id_map.get(key) {
            idx.insert(uuid, value);
        }
    }
    debug!(keys = idx.len(), "built host index");
    idx
}

// ---------------------------------------------------------------------------
// Initial values
// ---------------------------------------------------------------------------

/// The indexes available for one load. Any may be missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexSources<'a> {
    pub host: Option<&'a ValueIndex>,
    pub detail: Option<&'a ValueIndex>,
    pub search: Option<&'a ValueIndex>,
}

impl<'a> IndexSources<'a> {
    /// First hit in precedence order: host, then detail then search for
    /// multi-valued fields, search then detail for single-valued ones.
    #[must_use]
    pub fn lookup(&self, key: &str, is_multi: bool, id_map: &IdMap) -> Option<&'a FieldValue> {
        let order = if is_multi {
            [self.host, self.detail, self.search]
        } else {
            [self.host, self.search, self.detail]
        };
        order
            .into_iter()
            .flatten()
            .find_map(|idx| idx.lookup(key, id_map))
    }
}

fn join_text(items: &[Scalar]) -> Scalar {
    Scalar::Text(
        items
            .iter()
            .map(|s| s.as_text().into_owned())
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Initial multi-value list from whatever a source index held.
fn initial_multi(value: Option<&FieldValue>, data_type: DataType) -> Vec<Scalar> {
    match value {
        None => Vec::new(),
        Some(FieldValue::Multi(items)) => items.iter().map(|s| coerce(s, data_type)).collect(),
        Some(FieldValue::Single(Scalar::Text(s))) if s.is_empty() => Vec::new(),
        Some(FieldValue::Single(Scalar::Text(s))) if has_separator(s, INITIAL_SEPARATORS) => {
            split_joined(s, INITIAL_SEPARATORS)
                .into_iter()
                .map(|part| coerce(&Scalar::Text(part), data_type))
                .collect()
        }
        Some(FieldValue::Single(s)) => vec![coerce(s, data_type)],
    }
}

/// Initial form values keyed by mapped UUID (or raw id when unmapped).
///
/// Multi-valued fields always get an entry; single-valued fields only when
/// some source had a value.
#[must_use]
pub fn build_initial_values(
    descriptors: &[PropertyDescriptor],
    sources: IndexSources<'_>,
    id_map: &IdMap,
) -> FormData {
    let mut out = FormData::new();
    for desc in descriptors {
        let raw_id = desc.id.trim();
        if raw_id.is_empty() {
            continue;
        }
        let key = id_map.form_key(raw_id).to_string();
        let found = sources.lookup(&key, desc.is_multi_value, id_map);

        if desc.is_multi_value {
            out.insert(key, FieldValue::Multi(initial_multi(found, desc.data_type)));
        } else if let Some(value) = found {
            let scalar = match value {
                FieldValue::Single(s) => coerce(s, desc.data_type),
                FieldValue::Multi(items) => coerce(&join_text(items), desc.data_type),
            };
            out.insert(key, FieldValue::Single(scalar));
        }
    }
    debug!(fields = out.len(), "assembled initial values");
    out
}

// ---------------------------------------------------------------------------
// Per-UUID import
// ---------------------------------------------------------------------------

/// How the caller wants the extracted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportShape {
    pub is_multi: bool,
    pub data_type: DataType,
}

fn first_only(mut values: Vec<Scalar>, is_multi: bool) -> Vec<Scalar> {
    if !is_multi {
        values.truncate(1);
    }
    values
}

fn slot_values(slots: &SlotMap, data_type: DataType) -> Vec<Scalar> {
    slots
        .sorted()
        .into_iter()
        .filter_map(|(_, v)| coerce_opt(v, data_type))
        .collect()
}

fn scalar_hit(value: Option<&Scalar>, shape: ImportShape) -> Vec<Scalar> {
    let coerced = coerce_opt(value, shape.data_type);
    match coerced {
        Some(Scalar::Text(s)) if s.is_empty() && shape.is_multi => Vec::new(),
        Some(v) => vec![v],
        None => Vec::new(),
    }
}

/// Values of one property read straight from a detail document, for
/// importing from another document.
///
/// Looks at multi-value records, then single records, then system
/// records, then on-premise extended entries (also under `property_<id>`).
#[must_use]
pub fn values_for_uuid_from_detail(
    doc: &DetailDocument,
    uuid: &str,
    id_map: &IdMap,
    shape: ImportShape,
) -> Vec<Scalar> {
    let uuid = uuid.trim();
    if uuid.is_empty() {
        return Vec::new();
    }
    let numeric = id_map.numeric_id_for(uuid);
    let wanted = |key: &str| key == uuid || numeric == Some(key);
    let record_key = |id: &Option<String>, u: &Option<String>| u.clone().or_else(|| id.clone());

    if let Some(hit) = doc.multi.iter().find(|p| {
        p.origin == PropertyOrigin::Object
            && record_key(&p.id, &p.uuid).is_some_and(|k| wanted(&k))
    }) {
        return first_only(slot_values(&hit.slots, shape.data_type), shape.is_multi);
    }

    if let Some(hit) = doc.single.iter().find(|p| {
        p.origin == PropertyOrigin::Object
            && record_key(&p.id, &p.uuid).is_some_and(|k| wanted(&k))
    }) {
        return scalar_hit(hit.value.as_ref(), shape);
    }

    if let Some(hit) = doc.system_properties.iter().find(|p| wanted(&p.id)) {
        return scalar_hit(hit.value.as_ref(), shape);
    }

    for id in std::iter::once(uuid).chain(numeric) {
        let alias = prefixed(id);
        let is_id = |key: &Option<String>| key.as_deref().is_some_and(|k| k == id || k == alias);
        if let Some(hit) = doc
            .multi
            .iter()
            .find(|p| p.origin == PropertyOrigin::Extended && is_id(&p.id))
        {
            return first_only(slot_values(&hit.slots, shape.data_type), shape.is_multi);
        }
        if let Some(value) = doc
            .single
            .iter()
            .find(|p| p.origin == PropertyOrigin::Extended && is_id(&p.id))
            .and_then(|p| p.value.as_ref())
        {
            return vec![coerce(value, shape.data_type)];
        }
    }
    Vec::new()
}

/// Values of one property from a search index, for importing from another
/// document. Multi-valued text is split on `;`, `,` and `|`.
#[must_use]
pub fn values_for_uuid_from_search(
    idx: &ValueIndex,
    uuid: &str,
    id_map: &IdMap,
    shape: ImportShape,
) -> Vec<Scalar> {
    let found = idx
        .get(uuid)
        .or_else(|| id_map.numeric_id_for(uuid).and_then(|n| idx.get(n)))
        .or_else(|| idx.legacy_alias(uuid));
    let Some(value) = found else {
        return Vec::new();
    };

    if !shape.is_multi {
        let scalar = match value {
            FieldValue::Single(s) => coerce(s, shape.data_type),
            FieldValue::Multi(items) => coerce(&join_text(items), shape.data_type),
        };
        return vec![scalar];
    }

    let items = match value {
        FieldValue::Multi(items) => items.clone(),
        FieldValue::Single(Scalar::Text(s)) if s.is_empty() => Vec::new(),
        FieldValue::Single(Scalar::Text(s)) if has_separator(s, LIST_SEPARATORS) => {
            split_joined(s, LIST_SEPARATORS)
                .into_iter()
                .map(Scalar::Text)
                .collect()
        }
        FieldValue::Single(s) => vec![s.clone()],
    };
    items.iter().map(|s| coerce(s, shape.data_type)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id_map() -> IdMap {
        [("159".to_string(), "uuid-159".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn search_index_aliases_only_when_absent() {
        let item = SearchItem::from_value(&json!({
            "id": "D1",
            "sourceProperties": [
                {"key": "property_filename", "value": "a.pdf"},
                {"key": "property_state", "value": "new"},
                {"key": "STATUS", "value": "kept"}
            ],
            "category": "CAT"
        }));
        let idx = search_index(&item, &[("property_filename", "NAME")]);
        assert_eq!(idx.get("FILE_NAME"), Some(&FieldValue::from("a.pdf")));
        assert_eq!(idx.get("NAME"), Some(&FieldValue::from("a.pdf")));
        assert_eq!(idx.get("STATUS"), Some(&FieldValue::from("kept")));
        assert_eq!(idx.get(DOCUMENT_ID), Some(&FieldValue::from("D1")));
        assert_eq!(idx.get(CATEGORY), Some(&FieldValue::from("CAT")));
    }

    #[test]
    fn detail_index_covers_every_alias() {
        let doc = DetailDocument::from_value(&json!({
            "id": "D2",
            "extendedProperties": {"159": "Value A", "160": "", "161": {"2": "b", "1": "a"}},
            "multivalueExtendedProperties": {"161": {"1": "ignored"}, "162": {"1": "z"}}
        }));
        let idx = detail_index(&doc, &id_map());
        assert_eq!(idx.get("159"), Some(&FieldValue::from("Value A")));
        assert_eq!(idx.get("property_159"), Some(&FieldValue::from("Value A")));
        assert_eq!(idx.get("uuid-159"), Some(&FieldValue::from("Value A")));
        assert!(idx.get("160").is_none());
        assert_eq!(
            idx.get("161"),
            Some(&FieldValue::Multi(vec!["a".into(), "b".into()]))
        );
        assert_eq!(idx.get("162"), Some(&FieldValue::Multi(vec!["z".into()])));
        assert_eq!(idx.get(DOCUMENT_ID), Some(&FieldValue::from("D2")));
    }

    #[test]
    fn detail_system_properties_prefer_display_value() {
        let doc = DetailDocument::from_value(&json!({
            "systemProperties": [
                {"id": "property_filename", "value": "raw.pdf", "displayValue": "Shown.pdf"},
                {"id": "property_state", "value": "Freigabe"}
            ],
            "objectProperties": [{"id": "1", "value": "raw", "displayValue": "shown"}]
        }));
        let idx = detail_index(&doc, &IdMap::default());
        assert_eq!(idx.get("property_filename"), Some(&FieldValue::from("Shown.pdf")));
        assert_eq!(idx.get("property_state"), Some(&FieldValue::from("Freigabe")));
        assert_eq!(idx.get("1"), Some(&FieldValue::from("raw")));
    }

    #[test]
    fn host_index_normalizes_entries() {
        let bag = json!({"159": "x", "200": ["a", null, " "], "201": [], "202": "", "203": {"2": "q", "1": "p"}});
        let idx = host_index(bag.as_object().unwrap(), &id_map());
        assert_eq!(idx.get("uuid-159"), Some(&FieldValue::from("x")));
        assert_eq!(idx.get("property_200"), Some(&FieldValue::Multi(vec!["a".into()])));
        assert_eq!(idx.get("201"), Some(&FieldValue::Multi(vec![])));
        assert!(idx.get("202").is_none());
        assert_eq!(
            idx.get("203"),
            Some(&FieldValue::Multi(vec!["p".into(), "q".into()]))
        );
    }

    #[test]
    fn initial_values_follow_precedence_and_shape() {
        let mut host = ValueIndex::new();
        host.insert("property_7", FieldValue::from("from host"));
        let mut search = ValueIndex::new();
        search.insert("uuid-159", FieldValue::from("from search"));
        search.insert("8", FieldValue::from("a; b,c"));
        let mut detail = ValueIndex::new();
        detail.insert("uuid-159", FieldValue::from("from detail"));

        let descriptors = vec![
            PropertyDescriptor::new("159"),
            PropertyDescriptor::new("7"),
            PropertyDescriptor::new("8").multi(),
            PropertyDescriptor::new("9").multi(),
            PropertyDescriptor::new("10"),
        ];
        let sources = IndexSources {
            host: Some(&host),
            detail: Some(&detail),
            search: Some(&search),
        };
        let values = build_initial_values(&descriptors, sources, &id_map());
        assert_eq!(values.get("uuid-159"), Some(&FieldValue::from("from search")));
        assert_eq!(values.get("7"), Some(&FieldValue::from("from host")));
        assert_eq!(
            values.get("8"),
            Some(&FieldValue::Multi(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(values.get("9"), Some(&FieldValue::Multi(vec![])));
        assert!(!values.contains_key("10"));
    }

    #[test]
    fn import_from_detail_prefers_multivalue_records() {
        let doc = DetailDocument::from_value(&json!({
            "multivalueProperties": [{"uuid": "uuid-159", "values": {"2": "b", "1": "a"}}],
            "objectProperties": [{"uuid": "uuid-159", "value": "single"}]
        }));
        let multi = ImportShape { is_multi: true, data_type: DataType::String };
        let single = ImportShape { is_multi: false, data_type: DataType::String };
        assert_eq!(
            values_for_uuid_from_detail(&doc, "uuid-159", &id_map(), multi),
            vec![Scalar::from("a"), Scalar::from("b")]
        );
        assert_eq!(
            values_for_uuid_from_detail(&doc, "uuid-159", &id_map(), single),
            vec![Scalar::from("a")]
        );
    }

    #[test]
    fn import_from_on_premise_detail_uses_numeric_id() {
        let doc = DetailDocument::from_value(&json!({
            "extendedProperties": {"property_159": "42"}
        }));
        let shape = ImportShape { is_multi: false, data_type: DataType::Number };
        assert_eq!(
            values_for_uuid_from_detail(&doc, "uuid-159", &id_map(), shape),
            vec![Scalar::Number(42.0)]
        );
        assert!(values_for_uuid_from_detail(&doc, "", &id_map(), shape).is_empty());
    }

    #[test]
    fn import_from_search_splits_joined_text() {
        let mut idx = ValueIndex::new();
        idx.insert("159", FieldValue::from("x|y; z"));
        idx.insert("property_document_id", FieldValue::from("D3"));
        let multi = ImportShape { is_multi: true, data_type: DataType::String };
        assert_eq!(
            values_for_uuid_from_search(&idx, "uuid-159", &id_map(), multi),
            vec![Scalar::from("x"), Scalar::from("y"), Scalar::from("z")]
        );
        let single = ImportShape::default();
        assert_eq!(
            values_for_uuid_from_search(&idx, DOCUMENT_ID, &id_map(), single),
            vec![Scalar::from("D3")]
        );
        assert!(values_for_uuid_from_search(&idx, "nope", &id_map(), single).is_empty());
    }
}
