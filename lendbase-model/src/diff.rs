//! Partial-update computation.
//!
//! Compares the original snapshot (the server's last-known state) with the
//! current local state and produces the minimal operation sequence for a
//! PATCH request. Paths defer to the custom-field wrapper recorded at
//! extraction time when one exists, and to `/<field>` otherwise.

use crate::custom_fields::{CUSTOM_FIELDS_KEY, resolve_patch_path};
use crate::error::{ModelError, ModelResult};
use crate::value::ValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One partial-update instruction.
///
/// The platform's patch endpoint also accepts a `MOVE` operation; it is
/// deliberately absent here, since attribute-level comparison cannot derive
/// an unambiguous source location for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "UPPERCASE")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOperation {
    /// The wire path this operation targets.
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Remove { path } => path,
        }
    }
}

/// Computes the patch operations turning `original` into `current`.
///
/// With a non-empty `fields` list, only the named fields are compared: a
/// field present only in the current snapshot becomes an `Add`, one present
/// in both a `Replace` (emitted even when equal, since naming a field is an
/// instruction), one present only in the original a `Remove`, and one present
/// in neither is an unknown-field error.
///
/// With an empty `fields` list the snapshots are compared in full: `Add` and
/// `Replace` (only on changed values) for current keys, plus `Remove` for
/// original-only keys when `detect_removals` is set. Operation order is
/// deterministic: field-list order, then sorted key order.
pub fn diff(
    entity_type: &str,
    original: &ValueStore,
    current: &ValueStore,
    fields: &[&str],
    detect_removals: bool,
) -> ModelResult<Vec<PatchOperation>> {
    let mut operations = Vec::new();
    let mut seen_paths: BTreeSet<String> = BTreeSet::new();

    for &field in fields {
        let in_current = current.slot(field);
        let in_original = original.slot(field);
        match (in_current, in_original) {
            (None, None) => {
                return Err(ModelError::UnknownField {
                    entity: entity_type.to_string(),
                    field: field.to_string(),
                });
            }
            (Some(slot), None) => {
                let path = resolve_patch_path(current, entity_type, field, "add")?;
                if seen_paths.insert(path.clone()) {
                    operations.push(PatchOperation::Add {
                        path,
                        value: slot.value().to_wire(),
                    });
                }
            }
            (Some(slot), Some(_)) => {
                let path = resolve_patch_path(original, entity_type, field, "replace")?;
                if seen_paths.insert(path.clone()) {
                    operations.push(PatchOperation::Replace {
                        path,
                        value: slot.value().to_wire(),
                    });
                }
            }
            (None, Some(_)) => {
                let path = resolve_patch_path(original, entity_type, field, "remove")?;
                if seen_paths.insert(path.clone()) {
                    operations.push(PatchOperation::Remove { path });
                }
            }
        }
    }

    if fields.is_empty() {
        for (key, slot) in current.entries()? {
            if key == CUSTOM_FIELDS_KEY {
                continue;
            }
            match original.slot(key) {
                None => {
                    let path = resolve_patch_path(current, entity_type, key, "add")?;
                    if seen_paths.insert(path.clone()) {
                        operations.push(PatchOperation::Add {
                            path,
                            value: slot.value().to_wire(),
                        });
                    }
                }
                Some(previous) if previous.value() != slot.value() => {
                    let path = resolve_patch_path(original, entity_type, key, "replace")?;
                    if seen_paths.insert(path.clone()) {
                        operations.push(PatchOperation::Replace {
                            path,
                            value: slot.value().to_wire(),
                        });
                    }
                }
                Some(_) => {}
            }
        }
    }

    if detect_removals {
        for (key, _) in original.entries()? {
            if key == CUSTOM_FIELDS_KEY || current.has(key) || fields.contains(&key) {
                continue;
            }
            let path = resolve_patch_path(original, entity_type, key, "remove")?;
            if seen_paths.insert(path.clone()) {
                operations.push(PatchOperation::Remove { path });
            }
        }
    }

    Ok(operations)
}
