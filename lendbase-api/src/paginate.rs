//! Windowed retrieval across the server's page-size ceiling.

use crate::error::{ApiError, ApiResult};
use crate::transport::CallContext;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// The server caps every physical request at this many records; anything
/// larger is silently truncated, so the engine never asks for more.
pub const MAX_PAGE_SIZE: u64 = 1_000;

/// One logical result set, with the number of physical requests it cost.
///
/// The request counter travels with the result instead of living in shared
/// state, so unrelated operations cannot observe each other.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub records: Vec<T>,
    pub requests: u32,
}

impl<T> Paged<T> {
    /// Maps every record, keeping the request count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            records: self.records.into_iter().map(f).collect(),
            requests: self.requests,
        }
    }

    /// Fallible variant of [`Paged::map`].
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Paged<U>, E> {
        Ok(Paged {
            records: self
                .records
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>, E>>()?,
            requests: self.requests,
        })
    }
}

/// Assembles an unbounded logical result set from bounded physical pages.
///
/// `fetch` receives `(offset, page_size)` and returns one raw page. A
/// `limit` of 0 means "fetch everything". Each iteration requests
/// `min(remaining, MAX_PAGE_SIZE)` records; a page shorter than requested is
/// the end-of-data signal, so a result set that is an exact multiple of the
/// ceiling costs one extra empty probe request. The offset advances by the
/// size requested (not the count returned) and pages are requested strictly
/// in offset order: the remote listing is only eventually consistent, and
/// out-of-order windows would corrupt it further.
pub async fn fetch_windowed<F, Fut>(
    offset: u64,
    limit: u64,
    ctx: &CallContext,
    mut fetch: F,
) -> ApiResult<Paged<Value>>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = ApiResult<Vec<Value>>>,
{
    let mut records = Vec::new();
    let mut requests = 0u32;
    let mut offset = offset;
    let mut remaining = (limit > 0).then_some(limit);

    loop {
        if ctx.expired() {
            return Err(ApiError::DeadlineExceeded);
        }
        let window = remaining.map_or(MAX_PAGE_SIZE, |r| r.min(MAX_PAGE_SIZE));
        let page = fetch(offset, window).await?;
        requests += 1;

        let received = page.len() as u64;
        debug!("window offset={} size={} received={}", offset, window, received);
        records.extend(page);

        if received < window {
            break;
        }
        offset += window;
        if let Some(r) = remaining.as_mut() {
            *r -= window;
            if *r == 0 {
                break;
            }
        }
    }

    Ok(Paged { records, requests })
}
