//! One document's edit session: load, edit, diff, submit.
//!
//! [`EditSession`] glues the pure stages together. Loading builds the id
//! map, the three value indexes, the initial form values, the previous
//! snapshot and the captured slot maps. Edits go into the form. The
//! submission helpers read all of it.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::adapter::{
    ConcurrencyToken, DetailDocument, HostContext, SearchItem, ValidationResponse,
    descriptors_for_variant, resolve_doc_id,
};
use crate::cache::{CacheKey, CategoryMetadata, MetadataCache};
use crate::coerce::FieldMeta;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::extract::{
    ImportShape, IndexSources, build_initial_values, detail_index, host_index, search_index,
    values_for_uuid_from_detail, values_for_uuid_from_search,
};
use crate::id_map::IdMap;
use crate::index::ValueIndex;
use crate::model::{
    FieldValue, FormData, PreviousValues, PropertyDescriptor, Scalar, SlotMaps,
    category_only_properties, form_data_from_json,
};
use crate::multivalue::parse_input_line;
use crate::submission::{
    ApplyOptions, ApplyPayload, MetaIndex, SourceProperties, StoreObject, UpdatePayload,
    ValidationPayload, ValidationRequest, build_apply_payload_from_validation_response,
    build_validation_payload, collect_source_properties, extract_values_from_validation_response,
    make_previous_values, multivalue_slot_maps, update_payload_from_validation_response,
};

// ---------------------------------------------------------------------------
// DocumentSources
// ---------------------------------------------------------------------------

/// Raw inputs for one load, as the service (or a fixture file) delivers them.
///
/// Every field is optional; a load with nothing yields an empty session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentSources {
    pub document_id: Option<String>,
    pub repo_id: Option<String>,
    pub category_id: Option<String>,
    pub object_definition_id: Option<String>,
    /// Category properties response, or a bare descriptor array.
    pub descriptors: Option<JsonValue>,
    /// `{ objectDefinitions: [...] }`.
    pub object_definitions: Option<JsonValue>,
    /// A ready `numericId → uuid` map.
    pub id_map: Option<BTreeMap<String, String>>,
    pub search: Option<JsonValue>,
    pub detail: Option<JsonValue>,
    pub host: Option<JsonValue>,
    /// Pending edits applied on top of the initial values.
    pub form: Option<JsonValue>,
    pub display_value: Option<String>,
    pub filename: Option<String>,
}

impl DocumentSources {
    /// Descriptors and id map carried inline.
    ///
    /// Descriptors are read in the shape the configured deployment variant
    /// publishes. An explicit `idMap` wins over object definitions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateIdConflict`] when object definitions
    /// conflict under [`crate::id_map::DuplicatePolicy::Error`].
    pub fn metadata(&self, config: &EngineConfig) -> Result<CategoryMetadata, EngineError> {
        let category = self.category_id.clone().or_else(|| {
            self.search
                .as_ref()
                .and_then(SearchItem::from_response)
                .and_then(|s| s.category)
        });
        let descriptors = self
            .descriptors
            .as_ref()
            .map(|raw| {
                descriptors_for_variant(
                    raw,
                    config.deployment.variant,
                    category.as_deref(),
                    &config.locale.default,
                )
            })
            .unwrap_or_default();
        let id_map = match (&self.id_map, &self.object_definitions) {
            (Some(map), _) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            (None, Some(defs)) => IdMap::from_object_definitions(defs, config.id_map.on_duplicate)?,
            (None, None) => IdMap::new(),
        };
        Ok(CategoryMetadata {
            descriptors,
            id_map,
        })
    }
}

// ---------------------------------------------------------------------------
// EditSession
// ---------------------------------------------------------------------------

/// Everything known about the document being edited.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    config: EngineConfig,
    metadata: MetadataCache<CategoryMetadata>,
    document_id: String,
    repo_id: Option<String>,
    category_id: Option<String>,
    object_definition_id: Option<String>,
    display_value: Option<String>,
    filename: Option<String>,
    descriptors: Vec<PropertyDescriptor>,
    id_map: IdMap,
    meta: MetaIndex,
    detail: Option<DetailDocument>,
    detail_index: Option<ValueIndex>,
    search_index: Option<ValueIndex>,
    host_index: Option<ValueIndex>,
    initial: FormData,
    previous: PreviousValues,
    slot_maps: SlotMaps,
    form: FormData,
}

impl EditSession {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Load a document using only the metadata carried in `sources`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateIdConflict`] when the object
    /// definitions conflict under the `error` duplicate policy.
    pub fn load(&mut self, sources: &DocumentSources) -> Result<(), EngineError> {
        let metadata = sources.metadata(&self.config)?;
        self.load_with(metadata, sources);
        Ok(())
    }

    /// Load a document, taking category metadata from the session cache and
    /// calling `fetch` only on a miss for `(base, repoId)`.
    ///
    /// # Errors
    ///
    /// Whatever `fetch` returns; nothing is cached or loaded then.
    pub fn load_cached<E>(
        &mut self,
        base: &str,
        sources: &DocumentSources,
        fetch: impl FnOnce() -> Result<CategoryMetadata, E>,
    ) -> Result<(), E> {
        let key = CacheKey::new(base, sources.repo_id.as_deref().unwrap_or_default());
        let metadata = self.metadata.get_or_try_insert_with(key, fetch)?.clone();
        self.load_with(metadata, sources);
        Ok(())
    }

    /// Drop cached metadata for one repository.
    pub fn invalidate_metadata(&mut self, base: &str, repo_id: &str) {
        self.metadata.invalidate(&CacheKey::new(base, repo_id));
    }

    /// Drop all cached metadata.
    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
    }

    #[must_use]
    pub const fn metadata_cache(&self) -> &MetadataCache<CategoryMetadata> {
        &self.metadata
    }

    fn load_with(&mut self, metadata: CategoryMetadata, sources: &DocumentSources) {
        let CategoryMetadata {
            descriptors,
            mut id_map,
        } = metadata;

        let host = sources.host.as_ref().map(HostContext::from_value);
        let search = sources.search.as_ref().and_then(SearchItem::from_response);
        let variant = self.config.deployment.variant;
        let detail = sources
            .detail
            .as_ref()
            .map(|raw| DetailDocument::from_value_as(raw, variant));

        let embedded = search
            .as_ref()
            .and_then(|s| s.id_map.clone())
            .filter(|_| id_map.is_empty());
        if let Some(embedded) = embedded {
            debug!(entries = embedded.len(), "using id map embedded in search result");
            id_map = embedded;
        }

        let search_index = search.as_ref().map(|item| search_index(item, &[]));
        let detail_index = detail.as_ref().map(|doc| detail_index(doc, &id_map));
        let host_index = host
            .as_ref()
            .filter(|h| !h.data.dms_properties.is_empty())
            .map(|h| host_index(&h.data.dms_properties, &id_map));

        let host_doc = host.as_ref().and_then(HostContext::document_id);
        let candidates = [
            sources.document_id.as_deref(),
            host_doc.as_deref(),
            detail.as_ref().and_then(|d| d.id.as_deref()),
            search.as_ref().and_then(|s| s.id.as_deref()),
        ];
        self.document_id = resolve_doc_id(candidates.into_iter().flatten()).unwrap_or_default();

        let initial = build_initial_values(
            &descriptors,
            IndexSources {
                host: host_index.as_ref(),
                detail: detail_index.as_ref(),
                search: search_index.as_ref(),
            },
            &id_map,
        );
        self.previous = make_previous_values(
            &descriptors,
            &id_map,
            detail_index.as_ref(),
            search_index.as_ref(),
            &initial,
        );
        self.slot_maps = detail
            .as_ref()
            .map(|doc| multivalue_slot_maps(doc, &id_map))
            .unwrap_or_default();

        self.form = initial.clone();
        if let Some(edits) = sources.form.as_ref().map(form_data_from_json) {
            for (key, value) in edits {
                let key = id_map.form_key(key.trim()).to_string();
                self.form.insert(key, value);
            }
        }

        self.meta = MetaIndex::build(&descriptors, &id_map);
        self.category_id = sources
            .category_id
            .clone()
            .or_else(|| search.as_ref().and_then(|s| s.category.clone()));
        self.repo_id.clone_from(&sources.repo_id);
        self.object_definition_id.clone_from(&sources.object_definition_id);
        self.display_value.clone_from(&sources.display_value);
        self.filename.clone_from(&sources.filename);
        self.initial = initial;
        self.descriptors = descriptors;
        self.id_map = id_map;
        self.detail = detail;
        self.detail_index = detail_index;
        self.search_index = search_index;
        self.host_index = host_index;

        info!(
            document = %self.document_id,
            descriptors = self.descriptors.len(),
            id_map = self.id_map.len(),
            fields = self.form.len(),
            "document loaded"
        );
    }

    // -- accessors --------------------------------------------------------

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    #[must_use]
    pub fn repo_id(&self) -> Option<&str> {
        self.repo_id.as_deref()
    }

    #[must_use]
    pub fn category_id(&self) -> Option<&str> {
        self.category_id.as_deref()
    }

    #[must_use]
    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    /// Descriptors without the system properties.
    #[must_use]
    pub fn category_descriptors(&self) -> Vec<PropertyDescriptor> {
        category_only_properties(&self.descriptors)
    }

    /// Render metadata for every descriptor in the configured locale.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldMeta> {
        self.descriptors
            .iter()
            .map(|d| FieldMeta::from_descriptor(d, &self.config.locale.default))
            .collect()
    }

    #[must_use]
    pub const fn id_map(&self) -> &IdMap {
        &self.id_map
    }

    #[must_use]
    pub const fn meta(&self) -> &MetaIndex {
        &self.meta
    }

    #[must_use]
    pub const fn detail(&self) -> Option<&DetailDocument> {
        self.detail.as_ref()
    }

    #[must_use]
    pub const fn search_index(&self) -> Option<&ValueIndex> {
        self.search_index.as_ref()
    }

    #[must_use]
    pub const fn host_index(&self) -> Option<&ValueIndex> {
        self.host_index.as_ref()
    }

    #[must_use]
    pub const fn initial_values(&self) -> &FormData {
        &self.initial
    }

    #[must_use]
    pub const fn previous_values(&self) -> &PreviousValues {
        &self.previous
    }

    #[must_use]
    pub const fn slot_maps(&self) -> &SlotMaps {
        &self.slot_maps
    }

    #[must_use]
    pub const fn form(&self) -> &FormData {
        &self.form
    }

    #[must_use]
    pub fn concurrency(&self) -> Option<&ConcurrencyToken> {
        self.detail.as_ref().map(|d| &d.concurrency)
    }

    // -- editing ----------------------------------------------------------

    /// Set one form value. `key` may be a numeric id or a UUID.
    pub fn set_value(&mut self, key: &str, value: FieldValue) {
        let key = self.id_map.form_key(key.trim()).to_string();
        self.form.insert(key, value);
    }

    /// Set one form value from typed text: multi-valued properties are
    /// split with the configured delimiter and quoting rules.
    pub fn set_text(&mut self, key: &str, text: &str) {
        let form_key = self.id_map.form_key(key.trim()).to_string();
        let is_multi = self.meta.get(&form_key).is_some_and(|m| m.is_multi);
        let value = if is_multi {
            FieldValue::Multi(
                parse_input_line(text, &self.config.parsing.delimiter)
                    .into_iter()
                    .map(Scalar::Text)
                    .collect(),
            )
        } else {
            FieldValue::Single(Scalar::Text(text.to_string()))
        };
        self.form.insert(form_key, value);
    }

    /// Values of `uuid` as loaded, for importing into another document.
    /// The detail document wins over the search result.
    #[must_use]
    pub fn import_values(&self, uuid: &str, shape: ImportShape) -> Vec<Scalar> {
        let from_detail = self
            .detail
            .as_ref()
            .map(|doc| values_for_uuid_from_detail(doc, uuid, &self.id_map, shape))
            .unwrap_or_default();
        if !from_detail.is_empty() {
            return from_detail;
        }
        self.search_index
            .as_ref()
            .map(|idx| values_for_uuid_from_search(idx, uuid, &self.id_map, shape))
            .unwrap_or_default()
    }

    // -- submission -------------------------------------------------------

    /// Changed properties since load.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValueTooLong`] when a changed value exceeds
    /// the configured byte limit.
    pub fn diff(&self) -> Result<SourceProperties, EngineError> {
        collect_source_properties(
            &self.form,
            &self.previous,
            &self.meta,
            self.config.limits.max_value_bytes,
        )
    }

    #[must_use]
    pub fn validation_payload(&self) -> ValidationPayload {
        let mut req = ValidationRequest::new(&self.document_id, &self.form, &self.meta, &self.id_map);
        req.repo_id = self.repo_id.as_deref();
        req.object_definition_id = self.object_definition_id.as_deref();
        req.category_id = self.category_id.as_deref();
        req.descriptors = &self.descriptors;
        req.previous = Some(&self.previous);
        req.slot_maps = Some(&self.slot_maps);
        req.search = self.search_index.as_ref();
        req.concurrency = self.concurrency();
        req.display_value = self.display_value.as_deref();
        req.filename = self.filename.as_deref();
        build_validation_payload(&req)
    }

    /// Apply payload for a validation response; missing display value and
    /// filename are taken from the loaded sources.
    #[must_use]
    pub fn apply_payload(&self, resp: &ValidationResponse, opts: &ApplyOptions) -> ApplyPayload {
        let mut opts = opts.clone();
        if opts.display_value.is_none() {
            opts.display_value.clone_from(&self.display_value);
        }
        if opts.filename.is_none() {
            opts.filename.clone_from(&self.filename);
        }
        build_apply_payload_from_validation_response(
            resp,
            &self.id_map,
            &self.descriptors,
            &self.meta,
            self.repo_id.as_deref().unwrap_or_default(),
            &opts,
        )
    }

    #[must_use]
    pub fn update_payload(&self, resp: &ValidationResponse) -> UpdatePayload {
        let store = StoreObject::new(
            self.repo_id.as_deref(),
            &self.document_id,
            self.display_value.as_deref(),
            self.filename.as_deref(),
            self.concurrency(),
        );
        update_payload_from_validation_response(resp, Some(&store))
    }

    /// Adopt a successful validation response as the new baseline.
    ///
    /// Returned values replace form entries, the snapshot is re-taken from
    /// the form, and returned slot maps replace the captured ones, so an
    /// immediate [`Self::diff`] is empty.
    pub fn commit(&mut self, resp: &ValidationResponse) {
        let values = extract_values_from_validation_response(resp, &self.id_map, &self.descriptors);
        let updated = values.len();
        self.form.extend(values);
        self.previous =
            make_previous_values(&self.descriptors, &self.id_map, None, None, &self.form);

        for (numeric, slots) in resp.multi_values() {
            let key = self.id_map.get(numeric).unwrap_or(numeric).to_string();
            self.slot_maps.insert(key, slots);
        }
        info!(document = %self.document_id, updated, "validation response committed");
    }
}
