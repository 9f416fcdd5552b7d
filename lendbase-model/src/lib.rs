//! Entity materialization layer for the LendBase API.
//!
//! Turns raw wire JSON into typed, attribute-addressable snapshots and back:
//! - [`ValueStore`]: the snapshot container (map- or list-shaped) with
//!   transparent custom-field unwrapping
//! - [`coerce_store`] / [`CoercionSettings`]: wire-scalar conversion
//!   (integers, floats, timestamps) with per-field exclusions
//! - [`extract_custom_fields`] / [`reinject_custom_fields`]: flattening of
//!   the custom-field descriptor array into addressable keys and back
//! - [`diff`] / [`PatchOperation`]: minimal partial-update computation
//!   between an original snapshot and locally modified state
//!
//! This crate performs no I/O; the `lendbase-api` crate drives it from the
//! network side.

mod coerce;
mod custom_fields;
mod diff;
mod error;
mod value;

pub use coerce::{CoercionSettings, DEFAULT_EXCLUSIONS, DatePrecision, coerce_store, coerce_value};
pub use custom_fields::{
    CUSTOM_FIELDS_KEY, CustomFieldDescriptor, CustomFieldMeta, UNGROUPED, extract_custom_fields,
    reinject_custom_fields, resolve_patch_path,
};
pub use diff::{PatchOperation, diff};
pub use error::{ModelError, ModelResult};
pub use value::{CustomFieldKind, CustomFieldValue, FieldValue, Slot, ValueStore};
