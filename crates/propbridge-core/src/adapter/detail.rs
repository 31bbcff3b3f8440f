//! Document detail (`o2`) adapter.
//!
//! Cloud documents carry `objectProperties` / `multivalueProperties` arrays;
//! on-premise documents carry `extendedProperties` /
//! `multivalueExtendedProperties` objects keyed by numeric id. Both collapse
//! into [`DetailDocument`].

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use super::{DeploymentVariant, first_present, first_text};
use crate::model::{Scalar, SlotMap, json_id};

/// Where a property was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyOrigin {
    /// `objectProperties` / `multivalueProperties`.
    Object,
    /// `extendedProperties`.
    Extended,
    /// `multivalueExtendedProperties`.
    MultivalueExtended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProperty {
    pub id: String,
    pub value: Option<Scalar>,
    pub display_value: Option<Scalar>,
}

impl SystemProperty {
    /// `displayValue ?? value`: system properties pre-fill what the server
    /// shows, not the raw value.
    #[must_use]
    pub fn effective(&self) -> Option<&Scalar> {
        self.display_value.as_ref().or(self.value.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleProperty {
    pub id: Option<String>,
    pub uuid: Option<String>,
    pub value: Option<Scalar>,
    pub display_value: Option<Scalar>,
    pub origin: PropertyOrigin,
}

impl SingleProperty {
    /// `value ?? displayValue`.
    #[must_use]
    pub fn effective(&self) -> Option<&Scalar> {
        self.value.as_ref().or(self.display_value.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiProperty {
    pub id: Option<String>,
    pub uuid: Option<String>,
    pub slots: SlotMap,
    /// `true` when the server sent real slot keys; `false` when they were
    /// synthesized from list order.
    pub server_slots: bool,
    pub origin: PropertyOrigin,
}

/// Optimistic concurrency data needed to write the document back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyToken {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_token_url: Option<String>,
}

impl ConcurrencyToken {
    const E_TAG_KEYS: &'static [&'static str] = &["eTag", "etag", "ETag"];
    const LOCK_KEYS: &'static [&'static str] = &["lockTokenUrl", "lockTokenURL", "locktokenUrl"];

    /// Read from `storeObject`, then the document root, then
    /// `_links.locktoken.href`.
    #[must_use]
    pub fn from_document(doc: &JsonValue) -> Self {
        let store = doc.get("storeObject").unwrap_or(&JsonValue::Null);
        let link_href = |v: &JsonValue| {
            v.pointer("/_links/locktoken/href")
                .and_then(JsonValue::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };
        Self {
            e_tag: first_text(store, Self::E_TAG_KEYS).or_else(|| first_text(doc, Self::E_TAG_KEYS)),
            lock_token_url: first_text(store, Self::LOCK_KEYS)
                .or_else(|| first_text(doc, Self::LOCK_KEYS))
                .or_else(|| link_href(store))
                .or_else(|| link_href(doc)),
        }
    }
}

/// Canonical view of one document detail response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailDocument {
    pub id: Option<String>,
    pub variant: DeploymentVariant,
    pub system_properties: Vec<SystemProperty>,
    pub single: Vec<SingleProperty>,
    pub multi: Vec<MultiProperty>,
    pub concurrency: ConcurrencyToken,
}

/// On-premise documents key their properties by numeric id in objects;
/// cloud documents list them in arrays. `None` when the document carries
/// neither layout or both.
fn sniff_variant(doc: &JsonValue) -> Option<DeploymentVariant> {
    let has_arrays = doc.get("objectProperties").is_some_and(JsonValue::is_array)
        || doc.get("multivalueProperties").is_some_and(JsonValue::is_array);
    let has_extended = doc.get("extendedProperties").is_some_and(JsonValue::is_object)
        || doc
            .get("multivalueExtendedProperties")
            .is_some_and(JsonValue::is_object);
    match (has_arrays, has_extended) {
        (true, false) => Some(DeploymentVariant::Cloud),
        (false, true) => Some(DeploymentVariant::OnPremise),
        _ => None,
    }
}

fn scalar_field(entry: &JsonValue, key: &str) -> Option<Scalar> {
    entry.get(key).and_then(Scalar::from_json)
}

impl DetailDocument {
    /// Adapt a raw detail response. Non-objects yield an empty document.
    #[must_use]
    pub fn from_value(doc: &JsonValue) -> Self {
        Self::from_value_as(doc, DeploymentVariant::default())
    }

    /// Like [`Self::from_value`], labelling the document `fallback` when its
    /// layout does not tell the variant apart.
    #[must_use]
    pub fn from_value_as(doc: &JsonValue, fallback: DeploymentVariant) -> Self {
        if !doc.is_object() {
            debug!("detail document is not an object");
            return Self {
                variant: fallback,
                ..Self::default()
            };
        }
        let mut out = Self {
            id: doc.get("id").and_then(json_id),
            variant: sniff_variant(doc).unwrap_or(fallback),
            concurrency: ConcurrencyToken::from_document(doc),
            ..Self::default()
        };
        out.read_system_properties(doc.get("systemProperties"));
        out.read_object_properties(doc);
        if let Some(ext) = doc.get("extendedProperties").and_then(JsonValue::as_object) {
            out.read_extended(ext);
        }
        if let Some(mv) = doc
            .get("multivalueExtendedProperties")
            .and_then(JsonValue::as_object)
        {
            out.read_multivalue_extended(mv);
        }
        debug!(
            variant = %out.variant,
            single = out.single.len(),
            multi = out.multi.len(),
            system = out.system_properties.len(),
            "adapted detail document"
        );
        out
    }

    fn read_system_properties(&mut self, raw: Option<&JsonValue>) {
        match raw {
            Some(JsonValue::Array(entries)) => {
                self.system_properties = entries
                    .iter()
                    .filter_map(|e| {
                        Some(SystemProperty {
                            id: e.get("id").and_then(json_id)?,
                            value: scalar_field(e, "value"),
                            display_value: scalar_field(e, "displayValue"),
                        })
                    })
                    .collect();
            }
            Some(JsonValue::Object(map)) => {
                self.system_properties = map
                    .iter()
                    .map(|(k, v)| {
                        let (value, display_value) = if v.is_object() {
                            (scalar_field(v, "value"), scalar_field(v, "displayValue"))
                        } else {
                            (Scalar::from_json(v), None)
                        };
                        SystemProperty {
                            id: k.clone(),
                            value,
                            display_value,
                        }
                    })
                    .collect();
            }
            _ => {}
        }
    }

    fn read_object_properties(&mut self, doc: &JsonValue) {
        let entries = doc.get("objectProperties").and_then(JsonValue::as_array);
        for entry in entries.into_iter().flatten() {
            let id = entry.get("id").and_then(json_id);
            let uuid = entry.get("uuid").and_then(json_id);
            if id.is_none() && uuid.is_none() {
                continue;
            }
            self.single.push(SingleProperty {
                id,
                uuid,
                value: scalar_field(entry, "value"),
                display_value: scalar_field(entry, "displayValue"),
                origin: PropertyOrigin::Object,
            });
        }

        let entries = doc.get("multivalueProperties").and_then(JsonValue::as_array);
        for entry in entries.into_iter().flatten() {
            let id = entry.get("id").and_then(json_id);
            let uuid = entry.get("uuid").and_then(json_id);
            if id.is_none() && uuid.is_none() {
                continue;
            }
            let raw = first_present(entry, &["values", "value"]);
            let (slots, server_slots) = match raw {
                Some(JsonValue::Array(items)) => {
                    (SlotMap::from_values(items.iter().map(Scalar::from_json)), false)
                }
                Some(obj @ JsonValue::Object(_)) => (SlotMap::from_json(obj).unwrap_or_default(), true),
                Some(leaf) => (SlotMap::from_values([Scalar::from_json(leaf)]), false),
                None => (SlotMap::new(), false),
            };
            self.multi.push(MultiProperty {
                id,
                uuid,
                slots,
                server_slots,
                origin: PropertyOrigin::Object,
            });
        }
    }

    fn read_extended(&mut self, ext: &Map<String, JsonValue>) {
        for (key, raw) in ext {
            match raw {
                JsonValue::Null => {}
                JsonValue::Array(items) => self.multi.push(MultiProperty {
                    id: Some(key.clone()),
                    uuid: None,
                    slots: SlotMap::from_values(items.iter().map(Scalar::from_json)),
                    server_slots: false,
                    origin: PropertyOrigin::Extended,
                }),
                JsonValue::Object(_) if SlotMap::looks_like_slots(raw) => {
                    self.multi.push(MultiProperty {
                        id: Some(key.clone()),
                        uuid: None,
                        slots: SlotMap::from_json(raw).unwrap_or_default(),
                        server_slots: true,
                        origin: PropertyOrigin::Extended,
                    });
                }
                JsonValue::Object(_) => {
                    debug!(key = %key, "skipping structured extended property");
                }
                leaf => self.single.push(SingleProperty {
                    id: Some(key.clone()),
                    uuid: None,
                    value: Scalar::from_json(leaf),
                    display_value: None,
                    origin: PropertyOrigin::Extended,
                }),
            }
        }
    }

    fn read_multivalue_extended(&mut self, mv: &Map<String, JsonValue>) {
        for (key, raw) in mv {
            let slots = match raw {
                JsonValue::Object(_) => SlotMap::from_json(raw).unwrap_or_default(),
                JsonValue::Array(items) => SlotMap::from_values(items.iter().map(Scalar::from_json)),
                _ => continue,
            };
            self.multi.push(MultiProperty {
                id: Some(key.clone()),
                uuid: None,
                slots,
                server_slots: raw.is_object(),
                origin: PropertyOrigin::MultivalueExtended,
            });
        }
    }

    /// System property by id.
    #[must_use]
    pub fn system_property(&self, id: &str) -> Option<&SystemProperty> {
        self.system_properties.iter().find(|p| p.id == id)
    }
}
