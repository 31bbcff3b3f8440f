//! Numeric property id ↔ UUID mapping.
//!
//! The map is small (tens to a few hundred entries per category) and rebuilt
//! on every load, so the reverse direction is a plain linear scan.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::model::{is_all_digits, json_id};

/// What to do when one numeric id shows up twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Later definitions overwrite earlier ones.
    #[default]
    Last,
    /// The earliest definition is kept.
    First,
    /// Conflicting UUIDs fail the build.
    Error,
}

impl DuplicatePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::First => "first",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "first" => Ok(Self::First),
            "error" => Ok(Self::Error),
            other => Err(format!("invalid duplicate policy: '{other}'")),
        }
    }
}

/// `true` for the canonical 8-4-4-4-12 hex UUID spelling.
#[must_use]
pub fn is_uuid_shaped(s: &str) -> bool {
    let s = s.trim();
    s.len() == 36 && uuid::Uuid::try_parse(s).is_ok()
}

/// Session-scoped `numericId → uuid` lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMap {
    entries: BTreeMap<String, String>,
}

impl IdMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build from object definitions: every definition and each of its
    /// `propertyFields` contributes `(id, uniqueId | uuid)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateIdConflict`] under
    /// [`DuplicatePolicy::Error`] when two different UUIDs claim one id.
    pub fn from_object_definitions(
        response: &JsonValue,
        policy: DuplicatePolicy,
    ) -> Result<Self, EngineError> {
        let mut map = Self::new();
        let Some(defs) = response
            .get("objectDefinitions")
            .and_then(JsonValue::as_array)
        else {
            debug!("object definitions response has no objectDefinitions array");
            return Ok(map);
        };

        for def in defs {
            map.set_pair(def, policy)?;
            let fields = def.get("propertyFields").and_then(JsonValue::as_array);
            for field in fields.into_iter().flatten() {
                map.set_pair(field, policy)?;
            }
        }

        debug!(entries = map.len(), policy = %policy, "built id map from object definitions");
        Ok(map)
    }

    fn set_pair(&mut self, def: &JsonValue, policy: DuplicatePolicy) -> Result<(), EngineError> {
        let Some(id) = def.get("id").and_then(json_id) else {
            return Ok(());
        };
        let uuid = def
            .get("uniqueId")
            .filter(|v| !v.is_null())
            .or_else(|| def.get("uuid"))
            .and_then(json_id);
        let Some(uuid) = uuid else {
            debug!(id = %id, "skipping definition without uuid");
            return Ok(());
        };

        if let Some(existing) = self.entries.get(&id) {
            match policy {
                DuplicatePolicy::First => return Ok(()),
                DuplicatePolicy::Error if *existing != uuid => {
                    return Err(EngineError::DuplicateIdConflict {
                        numeric_id: id,
                        existing: existing.clone(),
                        incoming: uuid,
                    });
                }
                DuplicatePolicy::Last | DuplicatePolicy::Error => {
                    if *existing != uuid {
                        warn!(id = %id, existing = %existing, incoming = %uuid, "numeric id rebound to a different uuid");
                    }
                }
            }
        }
        self.entries.insert(id, uuid);
        Ok(())
    }

    /// Read the embedded `propertyIdToUUID` map of a search response (or its
    /// first item).
    ///
    /// Accepted only when non-empty, every key is numeric and every value is
    /// UUID-shaped.
    #[must_use]
    pub fn from_search_response(response: &JsonValue) -> Option<Self> {
        let candidate = response
            .get("propertyIdToUUID")
            .filter(|v| !v.is_null())
            .or_else(|| {
                response
                    .get("items")
                    .and_then(|items| items.get(0))
                    .and_then(|item| item.get("propertyIdToUUID"))
            })?;
        Self::from_embedded(candidate)
    }

    /// Validate and adopt an embedded `{numericId: uuid}` object.
    #[must_use]
    pub fn from_embedded(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.is_empty() {
            return None;
        }
        let mut entries = BTreeMap::new();
        for (k, v) in obj {
            let key = k.trim();
            let uuid = v.as_str().map(str::trim)?;
            if !is_all_digits(key) || !is_uuid_shaped(uuid) {
                debug!(key = %k, "embedded id map rejected");
                return None;
            }
            entries.insert(key.to_string(), uuid.to_string());
        }
        Some(Self { entries })
    }

    pub fn insert(&mut self, numeric_id: impl Into<String>, uuid: impl Into<String>) {
        self.entries.insert(numeric_id.into(), uuid.into());
    }

    /// UUID for a numeric id.
    #[must_use]
    pub fn get(&self, numeric_id: &str) -> Option<&str> {
        self.entries.get(numeric_id).map(String::as_str)
    }

    /// Reverse lookup by linear scan. When several ids map to one UUID the
    /// numerically lowest wins.
    #[must_use]
    pub fn numeric_id_for(&self, uuid: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|(_, u)| *u == uuid)
            .map(|(n, _)| n.as_str())
            .min_by_key(|n| n.parse::<u64>().map_or((1, 0), |v| (0, v)))
    }

    /// Resolve a descriptor id to `(form key, numeric id)`.
    ///
    /// A mapped numeric id becomes its UUID; anything else keeps its spelling
    /// and gets its numeric id from the reverse lookup.
    #[must_use]
    pub fn resolve(&self, raw_id: &str) -> (String, Option<String>) {
        if let Some(uuid) = self.get(raw_id) {
            return (uuid.to_string(), Some(raw_id.to_string()));
        }
        (
            raw_id.to_string(),
            self.numeric_id_for(raw_id).map(ToString::to_string),
        )
    }

    /// The form key for a descriptor id (mapped UUID, else the id itself).
    #[must_use]
    pub fn form_key<'a>(&'a self, raw_id: &'a str) -> &'a str {
        self.get(raw_id).unwrap_or(raw_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for IdMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const U1: &str = "e51d2f7c-1111-4a4a-8b8b-000000000001";
    const U2: &str = "7c4874df-2222-4a4a-8b8b-000000000002";

    fn defs() -> JsonValue {
        json!({"objectDefinitions": [
            {"id": "9e332", "uniqueId": "cat-uuid", "propertyFields": [
                {"id": "100", "uniqueId": U1},
                {"id": 101, "uuid": U2},
                {"id": "", "uniqueId": "ignored"}
            ]},
            {"id": "other", "propertyFields": [{"id": "100", "uniqueId": U2}]}
        ]})
    }

    #[test]
    fn walks_definitions_and_fields() {
        let map = IdMap::from_object_definitions(&defs(), DuplicatePolicy::Last).unwrap();
        assert_eq!(map.get("9e332"), Some("cat-uuid"));
        assert_eq!(map.get("101"), Some(U2));
        assert_eq!(map.get("100"), Some(U2), "last definition wins");
        assert!(map.get("other").is_none(), "definitions without uuid are skipped");
    }

    #[test]
    fn first_policy_keeps_earliest() {
        let map = IdMap::from_object_definitions(&defs(), DuplicatePolicy::First).unwrap();
        assert_eq!(map.get("100"), Some(U1));
    }

    #[test]
    fn error_policy_fails_only_on_conflict() {
        let err = IdMap::from_object_definitions(&defs(), DuplicatePolicy::Error).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateIdConflict { ref numeric_id, .. } if numeric_id == "100"));

        let same = json!({"objectDefinitions": [
            {"id": "1", "uniqueId": U1},
            {"id": "1", "uniqueId": U1}
        ]});
        assert!(IdMap::from_object_definitions(&same, DuplicatePolicy::Error).is_ok());
    }

    #[test]
    fn malformed_definitions_yield_empty_map() {
        let map = IdMap::from_object_definitions(&json!({"foo": 1}), DuplicatePolicy::Last).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn search_map_requires_numeric_keys_and_uuids() {
        let ok = IdMap::from_search_response(&json!({"propertyIdToUUID": {"1": U1}})).unwrap();
        assert_eq!(ok.get("1"), Some(U1));

        let nested =
            IdMap::from_search_response(&json!({"items": [{"propertyIdToUUID": {"2": U2}}]}))
                .unwrap();
        assert_eq!(nested.get("2"), Some(U2));

        assert!(IdMap::from_search_response(&json!({"propertyIdToUUID": {}})).is_none());
        assert!(IdMap::from_search_response(&json!({"propertyIdToUUID": {"a": U1}})).is_none());
        assert!(IdMap::from_search_response(&json!({"propertyIdToUUID": {"1": "nope"}})).is_none());
    }

    #[test]
    fn reverse_lookup_and_resolve() {
        let map: IdMap = [
            ("159".to_string(), "uuid-159".to_string()),
            ("20".to_string(), "shared".to_string()),
            ("3".to_string(), "shared".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(map.numeric_id_for("uuid-159"), Some("159"));
        assert_eq!(map.numeric_id_for("shared"), Some("3"));
        assert_eq!(map.numeric_id_for("missing"), None);

        assert_eq!(map.resolve("159"), ("uuid-159".into(), Some("159".into())));
        assert_eq!(map.resolve("uuid-159"), ("uuid-159".into(), Some("159".into())));
        assert_eq!(map.resolve("other"), ("other".into(), None));
        assert_eq!(map.form_key("159"), "uuid-159");
    }
}
