//! The entity service: materialization, synchronization and lifecycle.

use crate::entity::{EntityRecord, EntityState};
use crate::error::{ApiError, ApiResult};
use crate::paginate::{Paged, fetch_windowed};
use crate::profile::{Capability, EntityProfile};
use crate::request::{DetailsLevel, GetParams, ListParams, SearchRequest};
use crate::transport::{CallContext, Transport};
use lendbase_model::{CoercionSettings, ValueStore, coerce_store, diff, extract_custom_fields};
use serde_json::Value;
use tracing::{debug, info};

/// Service for one entity kind over one transport.
///
/// Suspension points are exactly the physical requests; everything between
/// two awaits is pure data work on the record. Write operations mutate the
/// caller's record in place and always leave it coherent: on success the
/// snapshot is replaced from the response, on failure the live store is
/// re-materialized so wrappers and coerced values stay intact.
pub struct EntityApi<T: Transport> {
    transport: T,
    profile: &'static EntityProfile,
    settings: CoercionSettings,
}

impl<T: Transport> EntityApi<T> {
    /// A service for `profile`, with the profile's coercion exclusions
    /// layered over the defaults.
    pub fn new(transport: T, profile: &'static EntityProfile) -> Self {
        let mut settings = CoercionSettings::default();
        settings
            .exclusions
            .extend(profile.coercion_exclusions.iter().map(|s| s.to_string()));
        Self {
            transport,
            profile,
            settings,
        }
    }

    /// Overrides the coercion settings wholesale.
    pub fn with_settings(mut self, settings: CoercionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn profile(&self) -> &'static EntityProfile {
        self.profile
    }

    /// An empty record staged for [`EntityApi::create`].
    pub fn blank(&self) -> EntityRecord {
        EntityRecord::new(self.profile)
    }

    /// Fetches one entity by id and materializes it.
    pub async fn get(
        &self,
        id: &str,
        params: &GetParams,
        ctx: &CallContext,
    ) -> ApiResult<EntityRecord> {
        self.profile.require(Capability::Get)?;
        let path = format!("{}/{}", self.profile.url_path, id);
        let query = vec![(
            "detailsLevel".to_string(),
            params.details_level.as_str().to_string(),
        )];
        let raw = self.transport.get(&path, &query, ctx).await?;
        let record = EntityRecord::materialize(
            self.profile,
            raw,
            &self.settings,
            EntityState::Fetched(params.details_level),
        )?;
        debug!("fetched {} {}", self.profile.entity_type, id);
        Ok(record)
    }

    /// Lists entities, walking as many pages as the parameters ask for.
    pub async fn get_all(
        &self,
        params: &ListParams,
        ctx: &CallContext,
    ) -> ApiResult<Paged<EntityRecord>> {
        self.profile.require(Capability::List)?;
        params.validate(self.profile)?;
        let base_query = params.query();

        let paged = fetch_windowed(params.offset, params.limit, ctx, |offset, window| {
            let mut query = base_query.clone();
            query.push(("offset".to_string(), offset.to_string()));
            query.push(("limit".to_string(), window.to_string()));
            async move {
                let raw = self
                    .transport
                    .get(self.profile.url_path, &query, ctx)
                    .await?;
                as_record_array(raw)
            }
        })
        .await?;

        info!(
            "listed {} {} records in {} requests",
            paged.records.len(),
            self.profile.entity_type,
            paged.requests
        );
        self.materialize_page(paged, params.details_level)
    }

    /// Runs a structured search, paginated like [`EntityApi::get_all`].
    pub async fn search(
        &self,
        request: &SearchRequest,
        params: &ListParams,
        ctx: &CallContext,
    ) -> ApiResult<Paged<EntityRecord>> {
        self.profile.require(Capability::Search)?;
        params.validate(self.profile)?;
        request.validate(self.profile)?;
        let path = format!("{}:search", self.profile.url_path);
        let body = serde_json::to_value(request)?;
        let base_query = params.query();

        let paged = fetch_windowed(params.offset, params.limit, ctx, |offset, window| {
            let mut query = base_query.clone();
            query.push(("offset".to_string(), offset.to_string()));
            query.push(("limit".to_string(), window.to_string()));
            let body = &body;
            let path = &path;
            async move {
                let raw = self.transport.post(path, &query, body, ctx).await?;
                as_record_array(raw)
            }
        })
        .await?;

        self.materialize_page(paged, params.details_level)
    }

    /// Creates the record on the server from its full body.
    pub async fn create(&self, record: &mut EntityRecord, ctx: &CallContext) -> ApiResult<()> {
        self.profile.require(Capability::Create)?;
        let body = record.wire_body()?;
        match self.transport.post(self.profile.url_path, &[], &body, ctx).await {
            Ok(raw) => {
                self.accept_write(record, raw, EntityState::Created)?;
                info!("created {} {:?}", self.profile.entity_type, record.id());
                Ok(())
            }
            Err(e) => {
                record.rehydrate(&self.settings)?;
                Err(e)
            }
        }
    }

    /// Replaces the server copy with the record's full body.
    pub async fn update(&self, record: &mut EntityRecord, ctx: &CallContext) -> ApiResult<()> {
        self.profile.require(Capability::Update)?;
        let id = self.identity_of(record)?;
        let path = format!("{}/{}", self.profile.url_path, id);
        let body = record.wire_body()?;
        match self.transport.put(&path, &body, ctx).await {
            Ok(raw) => {
                self.accept_write(record, raw, EntityState::Updated)?;
                Ok(())
            }
            Err(e) => {
                record.rehydrate(&self.settings)?;
                Err(e)
            }
        }
    }

    /// Sends the difference between the record and its snapshot as a patch.
    ///
    /// With an explicit `fields` list only those fields are diffed; with an
    /// empty list every changed field is, plus removals when
    /// `detect_removals` is set. A patch that resolves to no operations
    /// issues no request.
    pub async fn patch(
        &self,
        record: &mut EntityRecord,
        fields: &[&str],
        detect_removals: bool,
        ctx: &CallContext,
    ) -> ApiResult<()> {
        self.profile.require(Capability::Patch)?;
        let id = self.identity_of(record)?;
        record.reinject()?;
        let original = record.original_or_empty();
        let ops = diff(
            self.profile.entity_type,
            &original,
            record.store(),
            fields,
            detect_removals,
        )?;
        if ops.is_empty() {
            debug!("patch of {} {} is empty, skipping", self.profile.entity_type, id);
            record.rehydrate(&self.settings)?;
            return Ok(());
        }

        let path = format!("{}/{}", self.profile.url_path, id);
        let body = serde_json::to_value(&ops)?;
        match self.transport.patch(&path, &body, ctx).await {
            Ok(_) => {
                record.rehydrate(&self.settings)?;
                record.snapshot_current();
                record.mark(EntityState::Patched);
                info!(
                    "patched {} {} with {} operations",
                    self.profile.entity_type,
                    id,
                    ops.len()
                );
                Ok(())
            }
            Err(e) => {
                record.rehydrate(&self.settings)?;
                Err(e)
            }
        }
    }

    /// Re-fetches the record by id and merges the server copy over it.
    /// Server fields win on collision; fields only the caller set survive.
    pub async fn refresh(
        &self,
        record: &mut EntityRecord,
        params: &GetParams,
        ctx: &CallContext,
    ) -> ApiResult<()> {
        self.profile.require(Capability::Get)?;
        let id = self.identity_of(record)?;
        let path = format!("{}/{}", self.profile.url_path, id);
        let query = vec![(
            "detailsLevel".to_string(),
            params.details_level.as_str().to_string(),
        )];
        let raw = self.transport.get(&path, &query, ctx).await?;

        let mut fetched = ValueStore::from_wire(raw);
        extract_custom_fields(&mut fetched, &self.settings)?;
        coerce_store(&mut fetched, &self.settings);
        record.merge_refreshed(fetched, params.details_level)?;
        Ok(())
    }

    /// Deletes the record on the server. The local record survives but
    /// returns to [`EntityState::Unsynced`] with no snapshot.
    pub async fn delete(&self, record: &mut EntityRecord, ctx: &CallContext) -> ApiResult<()> {
        self.profile.require(Capability::Delete)?;
        let id = self.identity_of(record)?;
        let path = format!("{}/{}", self.profile.url_path, id);
        self.transport.delete(&path, ctx).await?;
        record.clear_snapshot();
        record.mark(EntityState::Unsynced);
        info!("deleted {} {}", self.profile.entity_type, id);
        Ok(())
    }

    fn identity_of(&self, record: &EntityRecord) -> ApiResult<String> {
        record.id().map(str::to_string).ok_or_else(|| {
            ApiError::Validation(format!(
                "{} record carries no {}",
                self.profile.entity_type, self.profile.identity_field
            ))
        })
    }

    /// Absorbs a write response into the record. An empty response body
    /// still confirms the write, so the live store becomes the snapshot.
    fn accept_write(
        &self,
        record: &mut EntityRecord,
        raw: Value,
        state: EntityState,
    ) -> ApiResult<()> {
        if raw.is_null() {
            record.rehydrate(&self.settings)?;
            record.snapshot_current();
            record.mark(state);
        } else {
            record.absorb(raw, &self.settings, state)?;
        }
        Ok(())
    }

    fn materialize_page(
        &self,
        paged: Paged<Value>,
        level: DetailsLevel,
    ) -> ApiResult<Paged<EntityRecord>> {
        let records = paged.try_map(|raw| {
            EntityRecord::materialize(self.profile, raw, &self.settings, EntityState::Fetched(level))
        })?;
        Ok(records)
    }
}

/// Treats a list/search response body as an array of raw records.
fn as_record_array(raw: Value) -> ApiResult<Vec<Value>> {
    match raw {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::MalformedResponse(format!(
            "expected a record array, got {other}"
        ))),
    }
}
