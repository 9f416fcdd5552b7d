use lendbase_model::{
    CoercionSettings, ModelError, PatchOperation, ValueStore, diff, extract_custom_fields,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn extracted(raw: serde_json::Value) -> ValueStore {
    let mut store = ValueStore::from_wire(raw);
    extract_custom_fields(&mut store, &CoercionSettings::default()).unwrap();
    store
}

// ── Full comparison ─────────────────────────────────────────────

#[test]
fn full_comparison_yields_replace_add_and_remove() {
    let original = ValueStore::from_wire(json!({"a": 1, "b": 2}));
    let current = ValueStore::from_wire(json!({"b": 3, "c": 4}));

    let ops = diff("client", &original, &current, &[], true).unwrap();

    assert_eq!(
        ops,
        vec![
            PatchOperation::Replace {
                path: "/b".into(),
                value: json!(3)
            },
            PatchOperation::Add {
                path: "/c".into(),
                value: json!(4)
            },
            PatchOperation::Remove { path: "/a".into() },
        ]
    );
}

#[test]
fn unchanged_fields_produce_no_operations() {
    let original = ValueStore::from_wire(json!({"a": 1, "b": "x"}));
    let current = original.clone();
    let ops = diff("client", &original, &current, &[], true).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn removals_require_the_flag() {
    let original = ValueStore::from_wire(json!({"a": 1, "b": 2}));
    let current = ValueStore::from_wire(json!({"b": 2}));
    let ops = diff("client", &original, &current, &[], false).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn the_raw_custom_field_array_is_never_diffed() {
    let original = extracted(json!({
        "firstName": "Ada",
        "customFieldValues": [{
            "customField": {"id": "cf_risk", "name": "riskRating", "state": "ACTIVE", "dataType": "SELECTION"},
            "value": "LOW"
        }]
    }));
    let current = ValueStore::from_wire(json!({"firstName": "Ada"}));

    let ops = diff("client", &original, &current, &[], true).unwrap();

    // the custom field itself is removed, once, at its wire path
    assert_eq!(
        ops,
        vec![PatchOperation::Remove {
            path: "/customFieldValues/cf_risk".into()
        }]
    );
}

// ── Explicit field lists ────────────────────────────────────────

#[test]
fn named_fields_replace_even_when_equal() {
    let original = ValueStore::from_wire(json!({"state": "ACTIVE"}));
    let current = original.clone();
    let ops = diff("client", &original, &current, &["state"], false).unwrap();
    assert_eq!(
        ops,
        vec![PatchOperation::Replace {
            path: "/state".into(),
            value: json!("ACTIVE")
        }]
    );
}

#[test]
fn named_field_only_in_current_is_an_add() {
    let original = ValueStore::from_wire(json!({}));
    let current = ValueStore::from_wire(json!({"notes": "new"}));
    let ops = diff("client", &original, &current, &["notes"], false).unwrap();
    assert_eq!(
        ops,
        vec![PatchOperation::Add {
            path: "/notes".into(),
            value: json!("new")
        }]
    );
}

#[test]
fn named_field_only_in_original_is_a_remove() {
    let original = ValueStore::from_wire(json!({"notes": "old"}));
    let current = ValueStore::from_wire(json!({}));
    let ops = diff("client", &original, &current, &["notes"], false).unwrap();
    assert_eq!(ops, vec![PatchOperation::Remove { path: "/notes".into() }]);
}

#[test]
fn named_field_in_neither_store_is_unknown() {
    let original = ValueStore::from_wire(json!({}));
    let current = ValueStore::from_wire(json!({}));
    let err = diff("client", &original, &current, &["ghost"], false).unwrap_err();
    assert!(matches!(err, ModelError::UnknownField { .. }));
}

// ── Custom fields ───────────────────────────────────────────────

#[test]
fn custom_field_changes_use_the_recorded_wire_path() {
    let raw = json!({
        "customFieldValues": [{
            "customField": {"id": "cf_risk", "name": "riskRating", "state": "ACTIVE", "dataType": "SELECTION"},
            "value": "LOW"
        }]
    });
    let original = extracted(raw);
    let mut current = original.clone();
    current.set("riskRating", "HIGH").unwrap();

    let ops = diff("client", &original, &current, &[], false).unwrap();

    // the name and id keys both changed but share one wire path
    assert_eq!(
        ops,
        vec![PatchOperation::Replace {
            path: "/customFieldValues/cf_risk".into(),
            value: json!("HIGH")
        }]
    );
}

#[test]
fn grouped_indexes_are_independently_patchable() {
    let raw = json!({
        "customFieldValues": [
            {
                "customField": {"id": "cf_guarantor", "name": "guarantorName", "state": "ACTIVE", "dataType": "FREE_TEXT"},
                "customFieldSetGroupIndex": 0,
                "value": "Grace"
            },
            {
                "customField": {"id": "cf_guarantor", "name": "guarantorName", "state": "ACTIVE", "dataType": "FREE_TEXT"},
                "customFieldSetGroupIndex": 1,
                "value": "Edsger"
            }
        ]
    });
    let original = extracted(raw);
    let mut current = original.clone();
    current.set("guarantorName_1", "Barbara").unwrap();

    let ops = diff("client", &original, &current, &[], false).unwrap();

    assert_eq!(
        ops,
        vec![PatchOperation::Replace {
            path: "/customFieldValues/cf_guarantor/1".into(),
            value: json!("Barbara")
        }]
    );
}

#[test]
fn naming_a_grouped_base_field_is_rejected() {
    let raw = json!({
        "customFieldValues": [{
            "customField": {"id": "cf_guarantor", "name": "guarantorName", "state": "ACTIVE", "dataType": "FREE_TEXT"},
            "customFieldSetGroupIndex": 0,
            "value": "Grace"
        }]
    });
    let original = extracted(raw);
    let current = original.clone();

    let err = diff("client", &original, &current, &["guarantorName"], false).unwrap_err();
    assert!(matches!(err, ModelError::GroupedWrite { .. }));
}

// ── Serialization ───────────────────────────────────────────────

#[test]
fn operations_serialize_with_uppercase_op_tags() {
    let ops = vec![
        PatchOperation::Replace {
            path: "/b".into(),
            value: json!(3),
        },
        PatchOperation::Remove { path: "/a".into() },
    ];
    assert_eq!(
        serde_json::to_value(&ops).unwrap(),
        json!([
            {"op": "REPLACE", "path": "/b", "value": 3},
            {"op": "REMOVE", "path": "/a"}
        ])
    );
}
