//! Pagination utilities for list endpoints.
//!
//! List endpoints use page-based pagination with 1-indexed pages:
//!
//! - `page`: Page number (1-indexed, default: 1, values below 1 are treated as 1)
//! - `per_page`: Items per page (1-100, default: 20)
//!
//! Every paginated response carries a [`PaginationMeta`] envelope with the
//! total item count and total page count alongside the items. Requesting a
//! page past the end is not an error: the item list is simply empty.
//!
//! # Example
//!
//! ```ignore
//! use tutordesk_core::pagination::{PageParams, PaginationMeta};
//!
//! async fn list_students(
//!     Query(params): Query<PageParams>,
//! ) -> Result<Json<PaginatedStudentsResponse>, AppError> {
//!     let request = params.to_request();
//!     let page = store.query_students(&query, request).await?;
//!
//!     Ok(Json(PaginatedStudentsResponse {
//!         meta: PaginationMeta::new(&request, page.total_count),
//!         data: page.items,
//!     }))
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Deserializes an optional string into an optional i64.
///
/// Handles the case where query parameters may be empty strings,
/// which should be treated as `None`.
pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Raw pagination query parameters.
///
/// Both fields are optional; use [`PageParams::to_request`] to obtain the
/// effective, clamped values.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PageParams {
    /// Page number (1-indexed, default: 1)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    /// Items per page (1-100, default: 20)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub per_page: Option<i64>,
}

impl PageParams {
    /// Whether the caller asked for pagination at all.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.page.is_some() || self.per_page.is_some()
    }

    /// Resolves the effective page request, applying defaults and clamps.
    #[must_use]
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
    }
}

/// An effective page selection handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

impl PageRequest {
    /// Creates a page request with `page >= 1` and `per_page` in `[1, 100]`.
    #[must_use]
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Number of items to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Slices an already ordered, fully materialized list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.per_page).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// One page of items plus the total number of matching items.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}

impl<T> Page<T> {
    /// Wraps a full, unpaginated result set.
    pub fn unpaginated(items: Vec<T>) -> Self {
        let total_count = items.len() as i64;
        Self { items, total_count }
    }
}

/// Pagination envelope returned alongside a page of results.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "data": [...],
///   "meta": {
///     "page": 2,
///     "per_page": 20,
///     "total_pages": 3,
///     "total_count": 57
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Items per page that was applied
    pub per_page: i64,
    /// Total number of pages (0 when there are no items)
    pub total_pages: i64,
    /// Total number of items across all pages
    pub total_count: i64,
}

impl PaginationMeta {
    #[must_use]
    pub fn new(request: &PageRequest, total_count: i64) -> Self {
        let total_count = total_count.max(0);
        let total_pages = (total_count + request.per_page - 1) / request.per_page;
        Self {
            page: request.page,
            per_page: request.per_page,
            total_pages,
            total_count,
        }
    }
}
