//! Materialized entity records and their sync lifecycle.

use crate::error::ApiResult;
use crate::profile::EntityProfile;
use crate::request::DetailsLevel;
use lendbase_model::{
    CoercionSettings, FieldValue, ModelResult, Slot, ValueStore, coerce_store,
    extract_custom_fields, reinject_custom_fields,
};
use serde_json::Value;

/// Where a record sits in its sync lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Never exchanged with the server, or deleted.
    Unsynced,
    /// Materialized from a fetch at the given details level.
    Fetched(DetailsLevel),
    /// Locally mutated since the last server exchange.
    Modified,
    /// Last server exchange was a successful create.
    Created,
    /// Last server exchange was a successful full update.
    Updated,
    /// Last server exchange was a successful patch.
    Patched,
}

/// One materialized entity.
///
/// The live store is what callers read and mutate; `original` is the
/// snapshot of the last server-confirmed shape and is the baseline every
/// diff is computed against. The two are distinct containers, and the
/// snapshot is replaced wholesale on every successful fetch or write.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    profile: &'static EntityProfile,
    store: ValueStore,
    original: Option<ValueStore>,
    state: EntityState,
}

impl EntityRecord {
    /// An empty record, typically staged for `create`.
    pub fn new(profile: &'static EntityProfile) -> Self {
        Self {
            profile,
            store: ValueStore::default(),
            original: None,
            state: EntityState::Unsynced,
        }
    }

    /// Materializes a record from raw wire JSON.
    pub(crate) fn materialize(
        profile: &'static EntityProfile,
        raw: Value,
        settings: &CoercionSettings,
        state: EntityState,
    ) -> ModelResult<Self> {
        let mut record = Self::new(profile);
        record.absorb(raw, settings, state)?;
        Ok(record)
    }

    /// Replaces the live store and snapshot from a server response body.
    pub(crate) fn absorb(
        &mut self,
        raw: Value,
        settings: &CoercionSettings,
        state: EntityState,
    ) -> ModelResult<()> {
        let mut store = ValueStore::from_wire(raw);
        extract_custom_fields(&mut store, settings)?;
        coerce_store(&mut store, settings);
        self.original = Some(store.clone());
        self.store = store;
        self.state = state;
        Ok(())
    }

    /// Re-derives custom-field wrappers and coerced values over the live
    /// store in place, without touching the snapshot. Used after a failed
    /// write so the record a caller still holds stays coherent.
    pub(crate) fn rehydrate(&mut self, settings: &CoercionSettings) -> ModelResult<()> {
        extract_custom_fields(&mut self.store, settings)?;
        coerce_store(&mut self.store, settings);
        Ok(())
    }

    /// Folds per-field custom values back into the raw custom-field array.
    pub(crate) fn reinject(&mut self) -> ModelResult<()> {
        reinject_custom_fields(&mut self.store)
    }

    /// Folds per-field custom values back into the raw array and renders
    /// the store as a wire body.
    pub(crate) fn wire_body(&mut self) -> ModelResult<Value> {
        self.reinject()?;
        Ok(self.store.to_wire())
    }

    /// Replaces the snapshot with a copy of the live store.
    pub(crate) fn snapshot_current(&mut self) {
        self.original = Some(self.store.clone());
    }

    /// Merges a freshly fetched store into this record. Server fields win
    /// on key collision; fields only the caller set survive.
    pub(crate) fn merge_refreshed(
        &mut self,
        fetched: ValueStore,
        level: DetailsLevel,
    ) -> ModelResult<()> {
        self.store.merge_from(fetched)?;
        self.original = Some(self.store.clone());
        self.state = EntityState::Fetched(level);
        Ok(())
    }

    pub(crate) fn mark(&mut self, state: EntityState) {
        self.state = state;
    }

    pub(crate) fn clear_snapshot(&mut self) {
        self.original = None;
    }

    pub fn profile(&self) -> &'static EntityProfile {
        self.profile
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// The live store, read-only. Mutate through [`EntityRecord::set`] so
    /// the lifecycle state tracks the change.
    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// The last server-confirmed snapshot, if any.
    pub fn original(&self) -> Option<&ValueStore> {
        self.original.as_ref()
    }

    pub(crate) fn original_or_empty(&self) -> ValueStore {
        self.original.clone().unwrap_or_default()
    }

    /// The record's server identity, when it carries one.
    pub fn id(&self) -> Option<&str> {
        self.store.get(self.profile.identity_field)?.as_str()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.store.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.store.has(field)
    }

    /// Sets a field on the live store. A record that has been exchanged
    /// with the server moves to [`EntityState::Modified`].
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> ApiResult<()> {
        self.store.set(field, value)?;
        if self.original.is_some() {
            self.state = EntityState::Modified;
        }
        Ok(())
    }

    /// Removes a field from the live store.
    pub fn remove(&mut self, field: &str) -> ApiResult<Option<Slot>> {
        let removed = self.store.remove(field)?;
        if removed.is_some() && self.original.is_some() {
            self.state = EntityState::Modified;
        }
        Ok(removed)
    }
}

/// Two records are equal only when both carry the identity field and the
/// values match. Records without a server identity are never equal to
/// anything, themselves included.
impl PartialEq for EntityRecord {
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
