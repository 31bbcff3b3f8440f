use serde::Serialize;
use std::collections::HashMap;

use crate::id_map::IdMap;
use crate::model::{DataType, PropertyDescriptor};

/// What the diff needs to know about one writable-or-not property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaEntry {
    pub uuid: String,
    pub numeric_id: Option<String>,
    pub data_type: DataType,
    pub is_multi: bool,
    pub read_only: bool,
}

impl MetaEntry {
    #[must_use]
    pub fn from_descriptor(desc: &PropertyDescriptor, id_map: &IdMap) -> Self {
        let (uuid, numeric_id) = id_map.resolve(desc.id.trim());
        Self {
            uuid,
            numeric_id,
            data_type: desc.data_type,
            is_multi: desc.is_multi_value,
            read_only: desc.is_read_only(),
        }
    }
}

/// `uuid → MetaEntry`, iterated in descriptor order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaIndex {
    entries: Vec<MetaEntry>,
    positions: HashMap<String, usize>,
}

impl MetaIndex {
    /// One entry per descriptor with a non-empty id. A later descriptor
    /// resolving to the same UUID replaces the earlier entry in place.
    #[must_use]
    pub fn build(descriptors: &[PropertyDescriptor], id_map: &IdMap) -> Self {
        let mut idx = Self::default();
        for desc in descriptors.iter().filter(|d| !d.id.trim().is_empty()) {
            idx.insert(MetaEntry::from_descriptor(desc, id_map));
        }
        tracing::debug!(entries = idx.len(), "built meta index");
        idx
    }

    pub fn insert(&mut self, entry: MetaEntry) {
        if let Some(&pos) = self.positions.get(&entry.uuid) {
            self.entries[pos] = entry;
        } else {
            self.positions.insert(entry.uuid.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    #[must_use]
    pub fn get(&self, uuid: &str) -> Option<&MetaEntry> {
        self.positions.get(uuid).map(|&pos| &self.entries[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaEntry> {
        self.entries.iter()
    }

    /// Entries that may be written.
    pub fn writable(&self) -> impl Iterator<Item = &MetaEntry> {
        self.entries.iter().filter(|e| !e.read_only)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetaIndex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}
