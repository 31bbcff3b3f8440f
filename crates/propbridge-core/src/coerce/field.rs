//! Presentation metadata for form fields.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{DataType, PropertyDescriptor};

/// Locale fallback order: exact tag, language only, `en`, `de-DE`, `de`.
#[must_use]
pub fn locale_chain(locale: &str) -> Vec<String> {
    let mut chain: Vec<String> = Vec::with_capacity(5);
    let language = locale.split('-').next().unwrap_or_default();
    for candidate in [locale, language, "en", "de-DE", "de"] {
        if !candidate.is_empty() && !chain.iter().any(|c| c == candidate) {
            chain.push(candidate.to_string());
        }
    }
    chain
}

/// Pick a label for `locale`, falling back to the first label present.
#[must_use]
pub fn label_from_name(name: &BTreeMap<String, String>, locale: &str) -> String {
    locale_chain(locale)
        .iter()
        .find_map(|loc| name.get(loc).filter(|l| !l.is_empty()))
        .or_else(|| name.values().next())
        .cloned()
        .unwrap_or_default()
}

/// Which input widget a field needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    DateTime,
    Checkbox,
    MultiText,
}

impl FieldKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Checkbox => "checkbox",
            Self::MultiText => "multitext",
        }
    }

    /// Multi-valued fields are list editors, except booleans stay checkboxes.
    #[must_use]
    pub const fn for_data_type(data_type: DataType, is_multi: bool) -> Self {
        match (data_type, is_multi) {
            (DataType::Boolean, _) => Self::Checkbox,
            (_, true) => Self::MultiText,
            (DataType::Date, false) => Self::Date,
            (DataType::DateTime, false) => Self::DateTime,
            (DataType::Number | DataType::Decimal | DataType::Integer, false) => Self::Number,
            (DataType::String | DataType::KeyValue, false) => Self::Text,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the form layer needs to render one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    pub uuid: String,
    pub label: String,
    pub data_type: DataType,
    pub kind: FieldKind,
    pub is_system: bool,
    pub is_multi: bool,
    pub read_only: bool,
    pub data_set_id: String,
    pub has_value_list: bool,
    pub is_required: bool,
}

impl FieldMeta {
    #[must_use]
    pub fn from_descriptor(desc: &PropertyDescriptor, locale: &str) -> Self {
        let label = label_from_name(&desc.name, locale);
        Self {
            uuid: desc.id.clone(),
            label: if label.is_empty() { desc.id.clone() } else { label },
            data_type: desc.data_type,
            kind: FieldKind::for_data_type(desc.data_type, desc.is_multi_value),
            is_system: desc.is_system_property,
            is_multi: desc.is_multi_value,
            read_only: desc.is_read_only(),
            data_set_id: desc.data_set_id.clone().unwrap_or_default(),
            has_value_list: desc.has_value_list,
            is_required: desc.is_mandatory,
        }
    }
}
