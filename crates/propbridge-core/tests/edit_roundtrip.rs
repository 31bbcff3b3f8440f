//! Whole-pipeline scenarios: load documents in both deployment shapes, edit,
//! diff, build the validate body, and turn a validation response into apply
//! and update bodies.

use serde_json::json;

use propbridge_core::adapter::ValidationResponse;
use propbridge_core::config::EngineConfig;
use propbridge_core::model::{FieldValue, Scalar};
use propbridge_core::submission::ApplyOptions;
use propbridge_core::{DocumentSources, EditSession, EngineError};

fn load(sources: serde_json::Value) -> EditSession {
    let sources: DocumentSources = serde_json::from_value(sources).expect("valid sources");
    let mut session = EditSession::new(EngineConfig::default());
    session.load(&sources).expect("load");
    session
}

// ---------------------------------------------------------------------------
// On-premise shape
// ---------------------------------------------------------------------------

#[test]
fn single_value_edit_yields_one_property() {
    let mut session = load(json!({
        "descriptors": [{"id": "uuid-159"}],
        "idMap": {"159": "uuid-159"},
        "detail": {"extendedProperties": {"159": "Value A"}}
    }));
    session.set_value("uuid-159", FieldValue::from("Value B"));

    let diff = session.diff().expect("diff");
    let json = serde_json::to_value(&diff).expect("serialize");
    assert_eq!(
        json,
        json!({"properties": [{"key": "uuid-159", "values": ["Value B"]}]})
    );
}

#[test]
fn numeric_descriptor_resolves_through_id_map() {
    let mut session = load(json!({
        "descriptors": [
            {"id": "159", "dataType": "STRING", "isMultiValue": false, "readOnly": false}
        ],
        "idMap": {"159": "uuid-159"},
        "detail": {"extendedProperties": {"159": "Value A"}}
    }));
    let initial = serde_json::to_value(session.form()).expect("serialize");
    assert_eq!(initial, json!({"uuid-159": "Value A"}));

    session.set_value("uuid-159", FieldValue::from("Value B"));
    let diff = serde_json::to_value(session.diff().expect("diff")).expect("serialize");
    assert_eq!(
        diff,
        json!({"properties": [{"key": "uuid-159", "values": ["Value B"]}]})
    );
}

#[test]
fn removed_middle_value_keeps_neighbouring_slots() {
    let mut session = load(json!({
        "descriptors": [{"id": "106", "isMultiValue": true}],
        "idMap": {"106": "uuid-106"},
        "detail": {
            "id": "D4",
            "multivalueExtendedProperties": {"106": {"1": "A", "2": "B", "3": "C"}}
        }
    }));
    session.set_value(
        "uuid-106",
        FieldValue::Multi(vec![Scalar::from("A"), Scalar::from("C")]),
    );

    let payload = session.validation_payload();
    let slots = serde_json::to_value(&payload.multivalue_extended_properties["106"])
        .expect("serialize");
    assert_eq!(slots, json!({"1": "A", "2": "", "3": "C"}));

    let diff = session.diff().expect("diff");
    assert_eq!(diff.get("uuid-106").expect("changed").values, vec!["A", "", "C"]);
}

#[test]
fn multivalue_edit_round_trip() {
    let mut session = load(json!({
        "repoId": "R1",
        "descriptors": [
            {"id": "uuid-106", "isMultiValue": true},
            {"id": "uuid-107", "dataType": "DATE"}
        ],
        "objectDefinitions": {"objectDefinitions": [
            {"id": "C1", "uniqueId": "cat-uuid", "propertyFields": [
                {"id": "106", "uniqueId": "uuid-106"},
                {"id": "107", "uniqueId": "uuid-107"}
            ]}
        ]},
        "categoryId": "cat-uuid",
        "detail": {
            "id": "D9",
            "extendedProperties": {"107": "04.11.2021"},
            "multivalueExtendedProperties": {"106": {"1": "Kabel", "2": "Rohr", "4": "Draht"}}
        }
    }));
    assert_eq!(session.document_id(), "D9");

    session.set_text("106", "Draht;Kabel;Stecker");
    let diff = session.diff().expect("diff");
    assert_eq!(
        diff.get("uuid-106").expect("changed").values,
        vec!["Kabel", "", "Draht", "Stecker"]
    );

    let payload = session.validation_payload();
    assert_eq!(payload.object_definition_id, "C1");
    let slots = serde_json::to_value(&payload.multivalue_extended_properties["106"])
        .expect("serialize");
    assert_eq!(slots, json!({"1": "Kabel", "2": "Stecker", "4": "Draht"}));
    assert_eq!(payload.store_object.dmsobject.href, "/dms/r/R1/o2/D9");

    let resp = ValidationResponse::from_value(&json!({
        "objectDefinitionId": "C1",
        "extendedProperties": {"107": "2021-11-04"},
        "multivalueExtendedProperties": {"106": {"1": "Kabel", "2": "Stecker", "4": "Draht"}},
        "colorCode": 2
    }))
    .expect("object");

    let apply = session.apply_payload(&resp, &ApplyOptions::default());
    let apply = serde_json::to_value(&apply).expect("serialize");
    assert_eq!(apply["sourceId"], "/dms/r/R1/source");
    assert_eq!(
        apply["sourceProperties"]["properties"],
        json!([
            {"key": "uuid-107", "values": ["2021-11-04"]},
            {"key": "uuid-106", "values": ["Kabel", "Stecker", "Draht"]}
        ])
    );

    let update = serde_json::to_value(session.update_payload(&resp)).expect("serialize");
    assert_eq!(update["systemProperties"]["property_colorcode"], "2");
    assert_eq!(update["storeObject"]["dmsObjectId"], "D9");

    session.commit(&resp);
    assert!(session.diff().expect("diff").is_empty());
}

#[test]
fn overlong_value_names_the_field() {
    let mut session = load(json!({
        "descriptors": [{"id": "uuid-1"}],
        "idMap": {"1": "uuid-1"}
    }));
    session.set_value("1", FieldValue::from("ü".repeat(128).as_str()));
    let err = session.diff().unwrap_err();
    assert_eq!(
        err,
        EngineError::ValueTooLong {
            key: "uuid-1".into(),
            bytes: 256,
            limit: 255
        }
    );
    assert!(err.to_string().contains("uuid-1"));
}

// ---------------------------------------------------------------------------
// Cloud shape
// ---------------------------------------------------------------------------

#[test]
fn cloud_detail_and_search_feed_initial_values() {
    let session = load(json!({
        "descriptors": {"_embedded": {"properties": [
            {"id": "uuid-1", "dataType": "NUMBER"},
            {"id": "uuid-2", "isMultiValue": true},
            {"id": "property_filename", "isSystemProperty": true}
        ]}},
        "search": {"items": [{
            "id": "D7",
            "sourceProperties": [
                {"key": "uuid-1", "value": "1 000"},
                {"key": "property_filename", "value": "scan.pdf"}
            ],
            "propertyIdToUUID": {
                "1": "0b7f6a2e-1c1e-4f7a-9a51-2f3d1b2c4d5e",
                "2": "4c0f8b1a-8d7e-4a47-b2a5-7e9d0c1b2a3f"
            }
        }]},
        "detail": {
            "id": "D7",
            "objectProperties": [{"id": "uuid-1", "value": "1 000"}],
            "multivalueProperties": [{"id": "uuid-2", "values": {"1": "a", "2": "b"}}]
        }
    }));

    assert_eq!(session.document_id(), "D7");
    assert_eq!(session.form()["uuid-1"], FieldValue::Single(Scalar::Number(1000.0)));
    assert_eq!(
        session.form()["uuid-2"],
        FieldValue::Multi(vec!["a".into(), "b".into()])
    );
    assert_eq!(session.form()["property_filename"], FieldValue::from("scan.pdf"));
    assert_eq!(session.slot_maps()["uuid-2"].len(), 2);
    assert!(session.diff().expect("diff").is_empty());
}

#[test]
fn host_values_win_over_documents() {
    let session = load(json!({
        "descriptors": [{"id": "uuid-5"}],
        "idMap": {"5": "uuid-5"},
        "host": {"data": {
            "docId": "https://dms.example/dms/r/R1/o2/H1?x=1",
            "dmsProperties": {"5": "from host"}
        }},
        "detail": {"extendedProperties": {"5": "from detail"}}
    }));
    assert_eq!(session.document_id(), "H1");
    assert_eq!(session.form()["uuid-5"], FieldValue::from("from host"));
}
