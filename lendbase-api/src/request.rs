//! Request parameter types and allow-list validation.
//!
//! Filters and sort fields are validated against the entity profile before
//! any request is issued, so a typo'd filter key fails fast instead of being
//! silently ignored by the server.

use crate::error::{ApiError, ApiResult};
use crate::profile::EntityProfile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Server-side representation depth of a fetched entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DetailsLevel {
    #[default]
    Basic,
    Full,
}

impl DetailsLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailsLevel::Basic => "BASIC",
            DetailsLevel::Full => "FULL",
        }
    }
}

/// Sort direction for list and search requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Parameters for fetching a single entity.
#[derive(Debug, Clone, Default)]
pub struct GetParams {
    pub details_level: DetailsLevel,
}

/// Parameters for `get_all` requests.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub details_level: DetailsLevel,
    /// First record to return.
    pub offset: u64,
    /// Total records wanted; 0 means everything.
    pub limit: u64,
    /// Field filters, validated against the profile's allow-list.
    pub filters: BTreeMap<String, String>,
    /// Comma-separated `field:ASC|DESC` pairs.
    pub sort_by: Option<String>,
}

impl ListParams {
    /// Validates filters and sort fields against the profile's allow-lists.
    pub(crate) fn validate(&self, profile: &EntityProfile) -> ApiResult<()> {
        for key in self.filters.keys() {
            if !profile.allowed_filters.contains(&key.as_str()) {
                return Err(ApiError::Validation(format!(
                    "filter `{key}` is not allowed for {}",
                    profile.entity_type
                )));
            }
        }
        if let Some(sort_by) = &self.sort_by {
            parse_sort_by(profile, sort_by)?;
        }
        Ok(())
    }

    /// Non-pagination query pairs for a list request.
    pub(crate) fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![(
            "detailsLevel".to_string(),
            self.details_level.as_str().to_string(),
        )];
        for (key, value) in &self.filters {
            query.push((key.clone(), value.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            query.push(("sortBy".to_string(), sort_by.clone()));
        }
        query
    }
}

/// Parses and validates a `field:ASC|DESC` list.
pub(crate) fn parse_sort_by(
    profile: &EntityProfile,
    sort_by: &str,
) -> ApiResult<Vec<(String, SortOrder)>> {
    let mut pairs = Vec::new();
    for part in sort_by.split(',') {
        let (field, direction) = part.split_once(':').ok_or_else(|| {
            ApiError::Validation(format!("sort term `{part}` is not of the form field:ASC|DESC"))
        })?;
        if !profile.allowed_sort_fields.contains(&field) {
            return Err(ApiError::Validation(format!(
                "sort field `{field}` is not allowed for {}",
                profile.entity_type
            )));
        }
        let order = match direction {
            "ASC" => SortOrder::Asc,
            "DESC" => SortOrder::Desc,
            other => {
                return Err(ApiError::Validation(format!(
                    "sort direction `{other}` is not ASC or DESC"
                )));
            }
        };
        pairs.push((field.to_string(), order));
    }
    Ok(pairs)
}

/// Comparison operator of one search filter criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Equals,
    MoreThan,
    LessThan,
    Between,
    In,
    StartsWith,
    Empty,
    NotEmpty,
}

/// One structured search filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriterion {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

impl FilterCriterion {
    fn simple(field: &str, operator: FilterOperator, value: Option<Value>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
            second_value: None,
            values: None,
        }
    }

    /// Shorthand for an EQUALS criterion.
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Self::simple(field, FilterOperator::Equals, Some(value.into()))
    }

    /// Shorthand for a BETWEEN criterion.
    pub fn between(field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            second_value: Some(high.into()),
            ..Self::simple(field, FilterOperator::Between, Some(low.into()))
        }
    }

    /// Shorthand for an IN criterion.
    pub fn one_of(field: &str, values: Vec<Value>) -> Self {
        Self {
            values: Some(values),
            ..Self::simple(field, FilterOperator::In, None)
        }
    }

    /// Shorthand for an EMPTY criterion.
    pub fn empty(field: &str) -> Self {
        Self::simple(field, FilterOperator::Empty, None)
    }
}

/// Sorting term of a search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortingCriterion {
    pub field: String,
    pub order: SortOrder,
}

/// Body of a `<entity>:search` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filter_criteria: Vec<FilterCriterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting_criteria: Option<SortingCriterion>,
}

impl SearchRequest {
    pub(crate) fn validate(&self, profile: &EntityProfile) -> ApiResult<()> {
        for criterion in &self.filter_criteria {
            if !profile.allowed_filters.contains(&criterion.field.as_str()) {
                return Err(ApiError::Validation(format!(
                    "search field `{}` is not allowed for {}",
                    criterion.field, profile.entity_type
                )));
            }
        }
        if let Some(sorting) = &self.sorting_criteria {
            if !profile.allowed_sort_fields.contains(&sorting.field.as_str()) {
                return Err(ApiError::Validation(format!(
                    "sort field `{}` is not allowed for {}",
                    sorting.field, profile.entity_type
                )));
            }
        }
        Ok(())
    }
}
