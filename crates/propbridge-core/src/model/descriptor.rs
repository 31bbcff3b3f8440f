use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::{DataType, json_bool, json_id};

/// Known system property identifiers, in both the `property_*` and the
/// canonical upper-case spelling.
pub const SYSTEM_PROPERTY_IDS: &[&str] = &[
    "property_document_id",
    "DOCUMENT_ID",
    "property_filename",
    "FILE_NAME",
    "property_filetype",
    "FILE_EXTENSION",
    "property_filesize",
    "FILE_SIZE",
    "property_state",
    "STATUS",
    "property_editor",
    "EDITOR",
    "property_owner",
    "OWNER",
    "property_category",
    "CATEGORY",
    "property_document_number",
    "property_variant_number",
    "property_colorcode",
];

/// Metadata describing one editable document field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "JsonValue")]
pub struct PropertyDescriptor {
    pub id: String,
    /// Localized labels keyed by locale tag.
    pub name: BTreeMap<String, String>,
    pub data_type: DataType,
    pub is_multi_value: bool,
    pub is_system_property: bool,
    pub read_only: bool,
    pub has_value_list: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_set_id: Option<String>,
    pub is_mandatory: bool,
}

impl PropertyDescriptor {
    /// A writable single-valued `STRING` descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    #[must_use]
    pub const fn multi(mut self) -> Self {
        self.is_multi_value = true;
        self
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Lenient conversion from a category-properties entry.
    ///
    /// Returns `None` when the entry has no usable id.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        let id = obj.get("id").and_then(json_id)?;
        let name = match obj.get("name") {
            Some(JsonValue::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            Some(JsonValue::String(s)) if !s.trim().is_empty() => {
                BTreeMap::from([("en".to_string(), s.trim().to_string())])
            }
            _ => BTreeMap::new(),
        };
        let flag = |key: &str| obj.get(key).is_some_and(json_bool);

        Some(Self {
            id,
            name,
            data_type: obj
                .get("dataType")
                .map_or(DataType::String, DataType::from_json),
            is_multi_value: flag("isMultiValue") || flag("isMultivalue"),
            is_system_property: flag("isSystemProperty"),
            read_only: flag("readOnly"),
            has_value_list: flag("hasValueList"),
            data_set_id: obj
                .get("dataSetId")
                .and_then(json_id)
                .filter(|s| !s.is_empty()),
            is_mandatory: flag("isMandatory"),
        })
    }

    /// Parse a list of descriptors, dropping entries without an id.
    #[must_use]
    pub fn list_from_json(value: &JsonValue) -> Vec<Self> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(Self::from_json).collect())
            .unwrap_or_default()
    }

    /// `true` when flagged as system-owned or its id is a known system id.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system_property || SYSTEM_PROPERTY_IDS.contains(&self.id.trim())
    }

    /// System-owned or explicitly read-only fields are never written.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.is_system_property || self.read_only
    }
}

impl TryFrom<JsonValue> for PropertyDescriptor {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_json(&value).ok_or_else(|| "property descriptor without an id".to_string())
    }
}

/// Only category/object properties, system properties removed.
#[must_use]
pub fn category_only_properties(properties: &[PropertyDescriptor]) -> Vec<PropertyDescriptor> {
    properties
        .iter()
        .filter(|p| !p.is_system())
        .cloned()
        .collect()
}
