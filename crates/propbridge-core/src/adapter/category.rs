//! Category metadata adapters.
//!
//! Cloud repositories list category properties directly. On-premise
//! repositories publish one `storedoctype` document describing every
//! document type, its extended properties and the shared system properties.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::DeploymentVariant;
use crate::model::{DataType, PropertyDescriptor, json_bool, json_id};

/// Descriptors from a cloud category-properties response:
/// `_embedded.properties`, a bare array, `properties` or `items`.
#[must_use]
pub fn descriptors_from_category_response(response: &JsonValue) -> Vec<PropertyDescriptor> {
    let list = response
        .pointer("/_embedded/properties")
        .filter(|v| v.is_array())
        .or_else(|| response.is_array().then_some(response))
        .or_else(|| response.get("properties").filter(|v| v.is_array()))
        .or_else(|| response.get("items").filter(|v| v.is_array()));
    let Some(list) = list else {
        debug!("category response carries no property list");
        return Vec::new();
    };
    PropertyDescriptor::list_from_json(list)
}

/// Descriptors for `category` from the metadata document `variant`
/// publishes.
///
/// On-premise metadata is a `storedoctype` document: the matching document
/// type's extended properties, or every property when no category is known.
/// A response without `storageDocumentTypes` is read as a cloud response.
#[must_use]
pub fn descriptors_for_variant(
    response: &JsonValue,
    variant: DeploymentVariant,
    category: Option<&str>,
    locale: &str,
) -> Vec<PropertyDescriptor> {
    let is_storedoctype = response.get("storageDocumentTypes").is_some_and(JsonValue::is_array);
    if variant == DeploymentVariant::Cloud || !is_storedoctype {
        return descriptors_from_category_response(response);
    }
    let doc_types = StoredDocTypes::from_value(response.clone());
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(category) => doc_types.category_descriptors(category, locale),
        None => doc_types.all_descriptors(locale),
    }
}

/// One selectable category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: String,
    pub display_name: String,
}

/// Parsed `storedoctype` document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredDocTypes {
    raw: JsonValue,
}

/// Build a name map from a plain label: the locale, its language, and `en`.
fn name_map(raw: Option<&JsonValue>, fallback: &str, locale: &str) -> BTreeMap<String, String> {
    if let Some(JsonValue::Object(map)) = raw {
        return map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();
    }
    let label = raw
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.trim());
    if label.is_empty() {
        return BTreeMap::new();
    }
    let mut map = BTreeMap::new();
    let locale = if locale.is_empty() { "en" } else { locale };
    map.insert(locale.to_string(), label.to_string());
    if let Some((short, _)) = locale.split_once('-') {
        map.entry(short.to_string()).or_insert_with(|| label.to_string());
    }
    map.entry("en".to_string()).or_insert_with(|| label.to_string());
    map
}

fn flag(prop: &JsonValue, key: &str) -> Option<bool> {
    prop.get(key).filter(|v| !v.is_null()).map(json_bool)
}

fn descriptor_from_prop(prop: &JsonValue, locale: &str, system: bool) -> Option<PropertyDescriptor> {
    let id = prop.get("id").and_then(json_id)?;
    let label = prop
        .get("displayName")
        .and_then(JsonValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&id)
        .to_string();
    let has_value_list = flag(prop, "hasValueList").unwrap_or(false);
    let data_set_id = prop
        .get("dataSetId")
        .and_then(json_id)
        .or_else(|| has_value_list.then(|| id.clone()));
    let read_only = system
        || flag(prop, "readOnly").unwrap_or_else(|| flag(prop, "isModifiable") == Some(false));
    Some(PropertyDescriptor {
        name: name_map(prop.get("name"), &label, locale),
        data_type: prop
            .get("dataType")
            .map_or(DataType::String, DataType::from_json),
        is_multi_value: flag(prop, "isMultiValue")
            .or_else(|| flag(prop, "isMultivalue"))
            .unwrap_or(false),
        is_system_property: system,
        read_only,
        has_value_list,
        data_set_id,
        is_mandatory: flag(prop, "isMandatory").unwrap_or(false),
        id,
    })
}

impl StoredDocTypes {
    #[must_use]
    pub const fn from_value(raw: JsonValue) -> Self {
        Self { raw }
    }

    fn document_types(&self) -> impl Iterator<Item = &JsonValue> {
        self.raw
            .get("storageDocumentTypes")
            .and_then(JsonValue::as_array)
            .into_iter()
            .flatten()
    }

    /// Every document type as a category.
    #[must_use]
    pub fn categories(&self) -> Vec<CategorySummary> {
        self.document_types()
            .filter_map(|dt| {
                let id = dt.get("id").and_then(json_id)?;
                let display_name = dt
                    .get("displayName")
                    .and_then(JsonValue::as_str)
                    .map_or_else(|| id.clone(), ToString::to_string);
                Some(CategorySummary { id, display_name })
            })
            .collect()
    }

    /// Match by exact id, then case-insensitive id or display name.
    #[must_use]
    pub fn find_document_type(&self, category: &str) -> Option<&JsonValue> {
        let wanted = category.trim();
        if wanted.is_empty() {
            return None;
        }
        let lower = wanted.to_lowercase();
        self.document_types().find(|dt| {
            let id = dt.get("id").and_then(json_id).unwrap_or_default();
            let name = dt
                .get("displayName")
                .and_then(JsonValue::as_str)
                .unwrap_or_default();
            id == wanted || id.to_lowercase() == lower || name.to_lowercase() == lower
        })
    }

    /// Extended properties of one document type.
    #[must_use]
    pub fn category_descriptors(&self, category: &str, locale: &str) -> Vec<PropertyDescriptor> {
        let Some(doc_type) = self.find_document_type(category) else {
            debug!(category = %category, "document type not found");
            return Vec::new();
        };
        doc_type
            .get("extendedProperties")
            .and_then(JsonValue::as_array)
            .into_iter()
            .flatten()
            .filter_map(|p| descriptor_from_prop(p, locale, false))
            .collect()
    }

    /// Shared system properties, always read-only.
    #[must_use]
    pub fn system_descriptors(&self, locale: &str) -> Vec<PropertyDescriptor> {
        self.raw
            .get("systemProperties")
            .and_then(JsonValue::as_array)
            .into_iter()
            .flatten()
            .filter_map(|p| descriptor_from_prop(p, locale, true))
            .collect()
    }

    /// System properties followed by every distinct extended property.
    #[must_use]
    pub fn all_descriptors(&self, locale: &str) -> Vec<PropertyDescriptor> {
        let mut out = self.system_descriptors(locale);
        let mut seen = HashSet::new();
        for doc_type in self.document_types() {
            let props = doc_type.get("extendedProperties").and_then(JsonValue::as_array);
            for prop in props.into_iter().flatten() {
                if let Some(desc) = descriptor_from_prop(prop, locale, false)
                    && seen.insert(desc.id.clone())
                {
                    out.push(desc);
                }
            }
        }
        out
    }
}
