use proptest::prelude::*;
use serde_json::{Map, Value, json};

use propbridge_core::coerce::coerce;
use propbridge_core::config::EngineConfig;
use propbridge_core::id_map::{DuplicatePolicy, IdMap};
use propbridge_core::model::{DataType, FieldValue, FormData, PreviousValues, PropertyDescriptor, Scalar};
use propbridge_core::multivalue::parse_input_line;
use propbridge_core::submission::{MetaIndex, collect_source_properties};
use propbridge_core::{DocumentSources, EditSession, EngineError};

use generators::*;

const DATA_TYPES: [DataType; 7] = [
    DataType::String,
    DataType::Number,
    DataType::Decimal,
    DataType::Integer,
    DataType::Date,
    DataType::DateTime,
    DataType::Boolean,
];

fn on_premise_sources(singles: &[String], multis: &[Vec<String>]) -> DocumentSources {
    let mut extended = Map::new();
    let mut descriptors = Vec::new();
    for (i, value) in singles.iter().enumerate() {
        let id = (i + 1).to_string();
        extended.insert(id.clone(), Value::String(value.clone()));
        descriptors.push(json!({"id": id}));
    }
    let mut multivalue = Map::new();
    for (i, values) in multis.iter().enumerate() {
        let id = (i + 100).to_string();
        let slots: Map<String, Value> = values
            .iter()
            .enumerate()
            .map(|(slot, v)| ((slot + 1).to_string(), Value::String(v.clone())))
            .collect();
        multivalue.insert(id.clone(), Value::Object(slots));
        descriptors.push(json!({"id": id, "isMultiValue": true}));
    }
    DocumentSources {
        document_id: Some("D1".into()),
        descriptors: Some(Value::Array(descriptors)),
        detail: Some(json!({
            "extendedProperties": extended,
            "multivalueExtendedProperties": multivalue
        })),
        ..DocumentSources::default()
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn loading_then_diffing_without_edits_is_empty(
        singles in prop::collection::vec(arb_text(), 0..6),
        multis in prop::collection::vec(prop::collection::vec(arb_text(), 0..5), 0..4),
    ) {
        let mut session = EditSession::new(EngineConfig::default());
        session.load(&on_premise_sources(&singles, &multis)).expect("load");
        let diff = session.diff().expect("diff");
        prop_assert!(diff.is_empty(), "unexpected changes: {:?}", diff);
    }

    #[test]
    fn surviving_values_keep_their_slot(edit in arb_slot_edit()) {
        let (previous, keep, added) = edit;
        let slots: Map<String, Value> = previous
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        let sources = DocumentSources {
            document_id: Some("D1".into()),
            descriptors: Some(json!([{"id": "100", "isMultiValue": true}])),
            detail: Some(json!({"multivalueExtendedProperties": {"100": slots}})),
            ..DocumentSources::default()
        };
        let mut session = EditSession::new(EngineConfig::default());
        session.load(&sources).expect("load");

        let kept: Vec<&(u32, String)> = previous
            .iter()
            .zip(&keep)
            .filter_map(|(p, k)| k.then_some(p))
            .collect();
        let mut current: Vec<Scalar> = kept.iter().rev().map(|(_, v)| Scalar::from(v.as_str())).collect();
        current.extend(added.iter().map(|v| Scalar::from(v.as_str())));
        session.set_value("100", FieldValue::Multi(current));

        let payload = session.validation_payload();
        let out = &payload.multivalue_extended_properties["100"];
        for (key, value) in kept {
            prop_assert_eq!(out.get(&key.to_string()), Some(&Scalar::from(value.as_str())));
        }
        let written: Vec<String> = out.ordered_values().iter().map(|s| s.as_text().into_owned()).collect();
        prop_assert_eq!(written.len(), keep.iter().filter(|k| **k).count() + added.len());
    }

    #[test]
    fn byte_limit_guards_only_longer_values(len in 0usize..600) {
        let descriptors = [PropertyDescriptor::new("a")];
        let meta = MetaIndex::build(&descriptors, &IdMap::new());
        let mut form = FormData::new();
        form.insert("a".into(), FieldValue::from("x".repeat(len).as_str()));
        let result = collect_source_properties(&form, &PreviousValues::new(), &meta, 255);
        if len <= 255 {
            prop_assert!(result.is_ok());
        } else {
            let is_too_long = matches!(result, Err(EngineError::ValueTooLong { bytes, .. }) if bytes == len);
            prop_assert!(is_too_long);
        }
    }

    #[test]
    fn coercion_is_idempotent(raw in arb_text(), pick in 0usize..7) {
        let dt = DATA_TYPES[pick];
        let once = coerce(&Scalar::from(raw.as_str()), dt);
        let twice = coerce(&once, dt);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn id_map_is_a_bijection(pairs in arb_id_pairs()) {
        let defs: Vec<Value> = pairs
            .iter()
            .map(|(id, uuid)| json!({"id": id, "uniqueId": uuid}))
            .collect();
        let map = IdMap::from_object_definitions(&json!({"objectDefinitions": defs}), DuplicatePolicy::Error)
            .expect("no conflicts");
        prop_assert_eq!(map.len(), pairs.len());
        for (id, uuid) in &pairs {
            prop_assert_eq!(map.get(id), Some(uuid.as_str()));
            prop_assert_eq!(map.numeric_id_for(uuid), Some(id.as_str()));
        }
    }

    #[test]
    fn typed_tokens_parse_back(tokens in prop::collection::vec(arb_token(), 1..6)) {
        let line = tokens.iter().map(|(typed, _)| typed.as_str()).collect::<Vec<_>>().join(";");
        let expected: Vec<String> = tokens.into_iter().map(|(_, value)| value).collect();
        prop_assert_eq!(parse_input_line(&line, ";"), expected);
    }
}
