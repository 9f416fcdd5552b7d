use lendbase_model::{
    CoercionSettings, CustomFieldKind, FieldValue, ModelError, ValueStore, extract_custom_fields,
    reinject_custom_fields, resolve_patch_path,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn client_with_custom_fields() -> ValueStore {
    ValueStore::from_wire(json!({
        "encodedKey": "abc123",
        "firstName": "Ada",
        "customFieldValues": [
            {
                "customField": {
                    "id": "cf_risk",
                    "name": "riskRating",
                    "state": "ACTIVE",
                    "dataType": "SELECTION"
                },
                "value": "LOW"
            },
            {
                "customField": {
                    "id": "cf_score",
                    "name": "creditScore",
                    "state": "ACTIVE",
                    "dataType": "NUMBER"
                },
                "value": "720"
            }
        ]
    }))
}

fn client_with_grouped_fields() -> ValueStore {
    ValueStore::from_wire(json!({
        "encodedKey": "abc123",
        "customFieldValues": [
            {
                "customField": {
                    "id": "cf_guarantor",
                    "name": "guarantorName",
                    "state": "ACTIVE",
                    "dataType": "FREE_TEXT"
                },
                "customFieldSetGroupIndex": 0,
                "value": "Grace"
            },
            {
                "customField": {
                    "id": "cf_guarantor",
                    "name": "guarantorName",
                    "state": "ACTIVE",
                    "dataType": "FREE_TEXT"
                },
                "customFieldSetGroupIndex": 1,
                "value": "Edsger"
            }
        ]
    }))
}

// ── Extraction ──────────────────────────────────────────────────

#[test]
fn extraction_binds_both_name_and_id_keys() {
    let mut store = client_with_custom_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();

    assert_eq!(store.get("riskRating"), Some(&FieldValue::Str("LOW".into())));
    assert_eq!(store.get("cf_risk"), Some(&FieldValue::Str("LOW".into())));
    // value coerced on the way in
    assert_eq!(store.get("creditScore"), Some(&FieldValue::Int(720)));
}

#[test]
fn extraction_records_the_wire_path() {
    let mut store = client_with_custom_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();

    let wrapper = store.slot("riskRating").unwrap().as_custom().unwrap();
    assert_eq!(wrapper.path, "/customFieldValues/cf_risk");
    assert_eq!(wrapper.kind, CustomFieldKind::Standard);
}

#[test]
fn grouped_fields_get_index_suffixed_keys_and_paths() {
    let mut store = client_with_grouped_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();

    assert_eq!(store.get("guarantorName_0"), Some(&FieldValue::Str("Grace".into())));
    assert_eq!(store.get("guarantorName_1"), Some(&FieldValue::Str("Edsger".into())));
    assert!(!store.has("guarantorName"));

    let first = store.slot("cf_guarantor_0").unwrap().as_custom().unwrap();
    assert_eq!(first.path, "/customFieldValues/cf_guarantor/0");
    assert_eq!(first.kind, CustomFieldKind::Grouped);
    let second = store.slot("cf_guarantor_1").unwrap().as_custom().unwrap();
    assert_eq!(second.path, "/customFieldValues/cf_guarantor/1");
}

#[test]
fn deactivated_fields_are_dropped() {
    let mut store = ValueStore::from_wire(json!({
        "customFieldValues": [{
            "customField": {
                "id": "cf_old",
                "name": "legacyField",
                "state": "DEACTIVATED",
                "dataType": "FREE_TEXT"
            },
            "value": "stale"
        }]
    }));
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    assert!(!store.has("legacyField"));
    assert!(!store.has("cf_old"));
}

#[test]
fn linked_entity_key_is_the_value_fallback() {
    let mut store = ValueStore::from_wire(json!({
        "customFieldValues": [{
            "customField": {
                "id": "cf_branch",
                "name": "homeBranch",
                "state": "ACTIVE",
                "dataType": "LINK"
            },
            "linkedEntityKeyValue": "branch_789"
        }]
    }));
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    assert_eq!(store.get("homeBranch"), Some(&FieldValue::Str("branch_789".into())));
}

#[test]
fn missing_array_is_a_no_op() {
    let mut store = ValueStore::from_wire(json!({"firstName": "Ada"}));
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn malformed_descriptors_are_an_error() {
    let mut store = ValueStore::from_wire(json!({
        "customFieldValues": [{"value": "orphaned"}]
    }));
    let err = extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap_err();
    assert!(matches!(err, ModelError::Serialization(_)));
}

// ── Reinjection ─────────────────────────────────────────────────

#[test]
fn reinjection_copies_set_values_back_into_the_array() {
    let mut store = client_with_custom_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    store.set("riskRating", "HIGH").unwrap();

    reinject_custom_fields(&mut store).unwrap();

    let body = store.to_wire();
    let descriptors = body["customFieldValues"].as_array().unwrap();
    assert_eq!(descriptors[0]["value"], json!("HIGH"));
    // the flattened wrapper keys stay out of the wire body
    assert!(body.get("riskRating").is_none());
    assert!(body.get("cf_risk").is_none());
}

#[test]
fn reinjection_prefers_the_id_key_when_siblings_disagree() {
    let mut store = client_with_custom_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    store.set("riskRating", "MEDIUM").unwrap();
    store.set("cf_risk", "HIGH").unwrap();

    reinject_custom_fields(&mut store).unwrap();

    let body = store.to_wire();
    let descriptors = body["customFieldValues"].as_array().unwrap();
    assert_eq!(descriptors[0]["value"], json!("HIGH"));
}

#[test]
fn reinjection_targets_each_group_index_independently() {
    let mut store = client_with_grouped_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    store.set("guarantorName_1", "Barbara").unwrap();

    reinject_custom_fields(&mut store).unwrap();

    let body = store.to_wire();
    let descriptors = body["customFieldValues"].as_array().unwrap();
    assert_eq!(descriptors[0]["value"], json!("Grace"));
    assert_eq!(descriptors[1]["value"], json!("Barbara"));
}

// ── Patch path resolution ───────────────────────────────────────

#[test]
fn plain_fields_resolve_to_slash_name() {
    let store = ValueStore::from_wire(json!({"firstName": "Ada"}));
    let path = resolve_patch_path(&store, "client", "firstName", "replace").unwrap();
    assert_eq!(path, "/firstName");
}

#[test]
fn custom_fields_resolve_to_their_recorded_path() {
    let mut store = client_with_custom_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    let path = resolve_patch_path(&store, "client", "riskRating", "replace").unwrap();
    assert_eq!(path, "/customFieldValues/cf_risk");
}

#[test]
fn grouped_base_name_is_rejected() {
    let mut store = client_with_grouped_fields();
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();

    let err = resolve_patch_path(&store, "client", "guarantorName", "replace").unwrap_err();
    assert!(matches!(err, ModelError::GroupedWrite { .. }));
}

#[test]
fn unknown_fields_are_not_found() {
    let store = ValueStore::from_wire(json!({"firstName": "Ada"}));
    let err = resolve_patch_path(&store, "client", "nope", "replace").unwrap_err();
    assert!(matches!(err, ModelError::FieldNotFound { .. }));
}
