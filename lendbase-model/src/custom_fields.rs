//! Custom-field extraction and reinjection.
//!
//! Tenant-configurable custom fields arrive as a side-array of descriptors
//! under [`CUSTOM_FIELDS_KEY`] instead of plain keys. Extraction flattens the
//! array into top-level snapshot keys (both the field name and the field id)
//! holding [`CustomFieldValue`] wrappers, recording the wire path needed to
//! reference each field in a partial update. Grouped fields (fields that
//! repeat within a field-set group) are disambiguated with an `_<n>` index
//! suffix.
//!
//! The raw array stays in the snapshot: before a full-body write,
//! [`reinject_custom_fields`] copies the wrapper values back into it, and
//! [`ValueStore::to_wire`] excludes the flattened wrapper keys from the body.

use crate::coerce::{CoercionSettings, coerce_value};
use crate::error::{ModelError, ModelResult};
use crate::value::{CustomFieldKind, CustomFieldValue, FieldValue, Slot, ValueStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot key holding the raw custom-field descriptor array.
pub const CUSTOM_FIELDS_KEY: &str = "customFieldValues";

/// `customFieldSetGroupIndex` sentinel meaning "not grouped".
pub const UNGROUPED: i64 = -1;

const STATE_DEACTIVATED: &str = "DEACTIVATED";

/// Static metadata of a custom field, as delivered inside a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldMeta {
    pub id: String,
    pub name: String,
    pub state: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
}

/// One element of the custom-field wire array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldDescriptor {
    #[serde(rename = "customField")]
    pub field: CustomFieldMeta,
    #[serde(rename = "customFieldSetGroupIndex", default = "ungrouped")]
    pub group_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(
        rename = "linkedEntityKeyValue",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub linked_entity_key: Option<String>,
}

fn ungrouped() -> i64 {
    UNGROUPED
}

impl CustomFieldDescriptor {
    /// Derived snapshot keys `(name, id)`, group-suffixed when applicable.
    fn derived_keys(&self) -> (String, String) {
        if self.group_index == UNGROUPED {
            (self.field.name.clone(), self.field.id.clone())
        } else {
            (
                format!("{}_{}", self.field.name, self.group_index),
                format!("{}_{}", self.field.id, self.group_index),
            )
        }
    }

    /// Wire path for a partial update targeting this field.
    fn patch_path(&self) -> String {
        if self.group_index == UNGROUPED {
            format!("/{CUSTOM_FIELDS_KEY}/{}", self.field.id)
        } else {
            format!("/{CUSTOM_FIELDS_KEY}/{}/{}", self.field.id, self.group_index)
        }
    }
}

/// Flattens the descriptor array into top-level snapshot keys.
///
/// Deactivated descriptors are dropped. Each remaining descriptor is bound
/// under both its derived name and derived id as a [`CustomFieldValue`]
/// wrapping the coerced value, falling back to the linked-entity key when no
/// plain value is present. A missing array (or a list-shaped store) is a
/// no-op.
pub fn extract_custom_fields(
    store: &mut ValueStore,
    settings: &CoercionSettings,
) -> ModelResult<()> {
    let Some(slot) = store.slot(CUSTOM_FIELDS_KEY) else {
        return Ok(());
    };
    let raw = slot.value().to_wire();
    let descriptors: Vec<CustomFieldDescriptor> = serde_json::from_value(raw)?;

    for descriptor in descriptors {
        if descriptor.field.state == STATE_DEACTIVATED {
            continue;
        }
        let (name_key, id_key) = descriptor.derived_keys();
        let kind = if descriptor.group_index == UNGROUPED {
            CustomFieldKind::Standard
        } else {
            CustomFieldKind::Grouped
        };
        let value = match (&descriptor.value, &descriptor.linked_entity_key) {
            (Some(v), _) => {
                let raw = FieldValue::from_wire(v.clone());
                if settings.is_excluded(&descriptor.field.name)
                    || settings.is_excluded(&descriptor.field.id)
                {
                    raw
                } else {
                    coerce_value(raw, settings)
                }
            }
            (None, Some(key)) => FieldValue::Str(key.clone()),
            (None, None) => FieldValue::Null,
        };
        let wrapper = CustomFieldValue {
            value,
            path: descriptor.patch_path(),
            kind,
        };
        store.insert_custom(&id_key, wrapper.clone())?;
        if name_key != id_key {
            store.insert_custom(&name_key, wrapper)?;
        }
    }
    Ok(())
}

/// Copies current wrapper values back into the retained descriptor array so
/// a full-body write carries them in wire form.
///
/// Wrappers are matched to array elements by recorded wire path, so a value
/// written through either of the sibling keys (name or id) flows back: a
/// wrapper diverging from the delivered value is the one a caller wrote to.
/// When the two siblings disagree with each other, the id-derived key is
/// authoritative. Elements without a diverging wrapper are left as
/// delivered.
pub fn reinject_custom_fields(store: &mut ValueStore) -> ModelResult<()> {
    let ValueStore::Map(map) = store else {
        return Ok(());
    };
    let Some(Slot::Plain(FieldValue::Array(elements))) = map.get(CUSTOM_FIELDS_KEY) else {
        return Ok(());
    };

    let mut updates: Vec<(usize, FieldValue)> = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        let Some((path, id_key)) = wire_binding_of(element) else {
            continue;
        };
        let delivered = element_value_of(element);
        let mut written = match map.get(&id_key) {
            Some(Slot::Custom(wrapper))
                if wrapper.path == path && Some(&wrapper.value) != delivered =>
            {
                Some(&wrapper.value)
            }
            _ => None,
        };
        if written.is_none() {
            for slot in map.values() {
                let Slot::Custom(wrapper) = slot else {
                    continue;
                };
                if wrapper.path == path && Some(&wrapper.value) != delivered {
                    written = Some(&wrapper.value);
                    break;
                }
            }
        }
        if let Some(value) = written {
            updates.push((index, value.clone()));
        }
    }

    if let Some(Slot::Plain(FieldValue::Array(elements))) = map.get_mut(CUSTOM_FIELDS_KEY) {
        for (index, value) in updates {
            if let Some(FieldValue::Object(obj)) = elements.get_mut(index) {
                obj.insert("value".to_string(), value);
            }
        }
    }
    Ok(())
}

/// Resolves the wire path for a patch targeting `field`.
///
/// An exact key resolves to its wrapper path (custom) or `/<field>` (plain).
/// A base name that only matches group-suffixed keys is rejected: a grouped
/// field is addressed per index, never as a whole group. Anything else is a
/// field-not-found error naming the entity and field.
pub fn resolve_patch_path(
    store: &ValueStore,
    entity_type: &str,
    field: &str,
    operation: &'static str,
) -> ModelResult<String> {
    if let Some(slot) = store.slot(field) {
        return Ok(match slot {
            Slot::Custom(wrapper) => wrapper.path.clone(),
            Slot::Plain(_) => format!("/{field}"),
        });
    }
    if has_grouped_family(store, field) {
        return Err(ModelError::GroupedWrite {
            entity: entity_type.to_string(),
            field: field.to_string(),
            operation,
        });
    }
    Err(ModelError::FieldNotFound {
        entity: entity_type.to_string(),
        field: field.to_string(),
    })
}

/// True when `field` is the base name of at least one grouped wrapper key
/// (`<field>_<n>`).
fn has_grouped_family(store: &ValueStore, field: &str) -> bool {
    let ValueStore::Map(map) = store else {
        return false;
    };
    map.iter().any(|(key, slot)| {
        matches!(
            slot,
            Slot::Custom(CustomFieldValue {
                kind: CustomFieldKind::Grouped,
                ..
            })
        ) && key
            .strip_prefix(field)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|suffix| suffix.parse::<u32>().is_ok())
    })
}

/// The wire path and id-derived snapshot key an array element was extracted
/// under.
fn wire_binding_of(element: &FieldValue) -> Option<(String, String)> {
    let FieldValue::Object(obj) = element else {
        return None;
    };
    let FieldValue::Object(meta) = obj.get("customField")? else {
        return None;
    };
    let id = meta.get("id")?.as_str()?;
    let group_index = obj
        .get("customFieldSetGroupIndex")
        .and_then(FieldValue::as_i64)
        .unwrap_or(UNGROUPED);
    Some(if group_index == UNGROUPED {
        (format!("/{CUSTOM_FIELDS_KEY}/{id}"), id.to_string())
    } else {
        (
            format!("/{CUSTOM_FIELDS_KEY}/{id}/{group_index}"),
            format!("{id}_{group_index}"),
        )
    })
}

fn element_value_of(element: &FieldValue) -> Option<&FieldValue> {
    let FieldValue::Object(obj) = element else {
        return None;
    };
    obj.get("value")
}
