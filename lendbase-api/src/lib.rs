//! Remote access layer for the LendBase entity API.
//!
//! Sits on top of `lendbase-model` and handles everything that touches the
//! network:
//! - **Transport**: the [`Transport`] trait and its [`RestConnector`]
//!   implementation over `reqwest`
//! - **Retry**: bounded retry with fixed backoff for transient upstream
//!   failures ([`RetryPolicy`])
//! - **Pagination**: windowed retrieval under the server's page-size ceiling
//!   ([`fetch_windowed`], [`MAX_PAGE_SIZE`])
//! - **Requests**: parameter types with allow-list validation and the
//!   structured search criteria
//! - **Profiles**: per-entity configuration and capability dispatch
//! - **Lifecycle**: [`EntityRecord`] state tracking and the [`EntityApi`]
//!   service implementing get/list/search/create/update/patch/refresh/delete
//!
//! One request is in flight per logical operation; the only suspension
//! points are the network calls and the backoff sleep between retries.

mod api;
mod config;
mod entity;
mod error;
mod paginate;
mod profile;
mod request;
mod retry;
mod transport;

pub use api::EntityApi;
pub use config::ApiConfig;
pub use entity::{EntityRecord, EntityState};
pub use error::{ApiError, ApiResult};
pub use paginate::{MAX_PAGE_SIZE, Paged, fetch_windowed};
pub use profile::{Capability, EntityProfile, profiles};
pub use request::{
    DetailsLevel, FilterCriterion, FilterOperator, GetParams, ListParams, SearchRequest,
    SortOrder, SortingCriterion,
};
pub use retry::RetryPolicy;
pub use transport::{CallContext, RestConnector, Transport};
