use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeMap;
use tracing::debug;

use super::diff::{SourceProperties, SourceProperty};
use super::encode_component;
use super::meta::MetaIndex;
use super::validate::StoreObject;
use crate::adapter::ValidationResponse;
use crate::coerce::{coerce, coerce_opt};
use crate::id_map::IdMap;
use crate::model::{DataType, FieldValue, FormData, PropertyDescriptor, Scalar};

/// `numericId → uuid` from the id map plus every descriptor that resolves.
fn numeric_to_uuid(id_map: &IdMap, descriptors: &[PropertyDescriptor]) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = id_map
        .iter()
        .map(|(n, u)| (n.to_string(), u.to_string()))
        .collect();
    for desc in descriptors {
        let (uuid, numeric) = id_map.resolve(desc.id.trim());
        if let Some(numeric) = numeric {
            out.insert(numeric, uuid);
        }
    }
    out
}

/// Data type of the descriptor whose form key is `key`.
fn data_type_for(descriptors: &[PropertyDescriptor], id_map: &IdMap, key: &str) -> Option<DataType> {
    descriptors
        .iter()
        .find(|d| id_map.form_key(d.id.trim()) == key)
        .map(|d| d.data_type)
}

/// Form values (keyed by UUID) taken back out of a validation response.
///
/// Single values are coerced by the matching descriptor's type and skipped
/// when the same id also carries a slot map. Slot maps become ordered lists
/// with `null` as `""`.
#[must_use]
pub fn extract_values_from_validation_response(
    resp: &ValidationResponse,
    id_map: &IdMap,
    descriptors: &[PropertyDescriptor],
) -> FormData {
    let uuids = numeric_to_uuid(id_map, descriptors);
    let mut out = FormData::new();

    for (numeric, value) in resp.single_values() {
        let Some(uuid) = uuids.get(numeric) else {
            continue;
        };
        if resp.is_multi(numeric) {
            continue;
        }
        let value = match data_type_for(descriptors, id_map, uuid) {
            Some(dt) => coerce_opt(value.as_ref(), dt),
            None => value,
        };
        if let Some(value) = value {
            out.insert(uuid.clone(), FieldValue::Single(value));
        }
    }

    for (numeric, slots) in resp.multi_values() {
        let Some(uuid) = uuids.get(numeric) else {
            continue;
        };
        let data_type = data_type_for(descriptors, id_map, uuid);
        let values = slots
            .ordered_text()
            .into_iter()
            .map(|text| {
                let scalar = Scalar::Text(text);
                match data_type {
                    Some(dt) if !scalar.as_text().is_empty() => coerce(&scalar, dt),
                    _ => scalar,
                }
            })
            .collect();
        out.insert(uuid.clone(), FieldValue::Multi(values));
    }
    debug!(fields = out.len(), "extracted values from validation response");
    out
}

/// Apply-endpoint properties derived from a validation response.
///
/// Keys are mapped UUIDs; ids without a UUID are left out. Empty single
/// values are only emitted for writable properties; empty lists never.
#[must_use]
pub fn source_properties_from_validation_response(
    resp: &ValidationResponse,
    id_map: &IdMap,
    descriptors: &[PropertyDescriptor],
    meta: &MetaIndex,
) -> SourceProperties {
    let uuids = numeric_to_uuid(id_map, descriptors);
    let mut out = SourceProperties::default();

    for (numeric, value) in resp.single_values() {
        if resp.is_multi(numeric) {
            continue;
        }
        let Some(key) = uuids.get(numeric).cloned() else {
            debug!(id = numeric, "no uuid for validated property");
            continue;
        };
        let text = value.map(|v| v.as_text().into_owned()).unwrap_or_default();
        let writable = meta.get(&key).is_some_and(|m| !m.read_only);
        if !text.is_empty() || writable {
            out.properties.push(SourceProperty {
                key,
                values: vec![text],
            });
        }
    }

    for (numeric, slots) in resp.multi_values() {
        let Some(key) = uuids.get(numeric).cloned() else {
            debug!(id = numeric, "no uuid for validated property");
            continue;
        };
        let values = slots.ordered_text();
        if values.is_empty() {
            continue;
        }
        out.properties.push(SourceProperty { key, values });
    }
    out
}

// ---------------------------------------------------------------------------
// Apply payload
// ---------------------------------------------------------------------------

/// Optional fields of an apply request. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyOptions {
    pub display_value: Option<String>,
    pub filename: Option<String>,
    pub alteration_text: Option<String>,
    pub source_category: Option<String>,
    pub source_id: Option<String>,
    pub content_location_uri: Option<String>,
    pub content_uri: Option<String>,
}

/// Body of the apply-update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alteration_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_properties: Option<SourceProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_location_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_uri: Option<String>,
}

fn present(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// Assemble an apply payload; absent and empty fields are left out.
#[must_use]
pub fn build_apply_payload(properties: SourceProperties, opts: &ApplyOptions) -> ApplyPayload {
    ApplyPayload {
        display_value: present(opts.display_value.as_ref()),
        filename: present(opts.filename.as_ref()),
        alteration_text: present(opts.alteration_text.as_ref()),
        source_category: present(opts.source_category.as_ref()),
        source_id: present(opts.source_id.as_ref()),
        source_properties: (!properties.is_empty()).then_some(properties),
        content_location_uri: present(opts.content_location_uri.as_ref()),
        content_uri: present(opts.content_uri.as_ref()),
    }
}

/// Default source of a repository: `/dms/r/{repo}/source`.
#[must_use]
pub fn default_source_id(repo_id: &str) -> String {
    format!("/dms/r/{}/source", encode_component(repo_id))
}

/// Apply payload straight from a validation response.
///
/// With properties present and neither a source id nor a source category
/// given, the repository's default source is used.
#[must_use]
pub fn build_apply_payload_from_validation_response(
    resp: &ValidationResponse,
    id_map: &IdMap,
    descriptors: &[PropertyDescriptor],
    meta: &MetaIndex,
    repo_id: &str,
    opts: &ApplyOptions,
) -> ApplyPayload {
    let properties = source_properties_from_validation_response(resp, id_map, descriptors, meta);
    let mut opts = opts.clone();
    let unset = |v: &Option<String>| v.as_deref().is_none_or(str::is_empty);
    if !properties.is_empty()
        && unset(&opts.source_id)
        && unset(&opts.source_category)
        && !repo_id.trim().is_empty()
    {
        opts.source_id = Some(default_source_id(repo_id.trim()));
    }
    build_apply_payload(properties, &opts)
}

// ---------------------------------------------------------------------------
// Full update payload
// ---------------------------------------------------------------------------

/// Body of a full-document update, built from a validation response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_definition_id: Option<JsonValue>,
    pub system_properties: Map<String, JsonValue>,
    pub remarks: JsonValue,
    pub multivalue_extended_properties: Map<String, JsonValue>,
    pub extended_properties: Map<String, JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    pub store_object: JsonValue,
    pub state: Option<String>,
}

fn json_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Re-shape a validation response for a full-document update.
///
/// `colorCode` is folded into `property_colorcode` unless that is already
/// set.
#[must_use]
pub fn update_payload_from_validation_response(
    resp: &ValidationResponse,
    store_object: Option<&StoreObject>,
) -> UpdatePayload {
    let mut system_properties = resp.system_properties.clone();
    if let Some(color) = &resp.color_code {
        system_properties
            .entry("property_colorcode")
            .or_insert_with(|| JsonValue::String(json_text(color)));
    }
    let store_object = store_object
        .and_then(|s| serde_json::to_value(s).ok())
        .unwrap_or_else(|| json!({}));

    UpdatePayload {
        kind: 1,
        object_definition_id: resp.object_definition_id.clone(),
        system_properties,
        remarks: resp.remarks.clone().unwrap_or_else(|| json!({})),
        multivalue_extended_properties: resp.multivalue_extended_properties.clone(),
        extended_properties: resp.extended_properties.clone(),
        doc_number: resp.doc_number.clone(),
        id: resp.id.clone(),
        store_object,
        state: None,
    }
}
