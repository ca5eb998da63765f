//! Pagination utilities for list endpoints.
//!
//! Every list endpoint accepts `limit` with either `offset` or `page`:
//!
//! - `limit`: items per page, clamped to 1..=100, default 10
//! - `offset`: items to skip, default 0
//! - `page`: 1-indexed page number; takes precedence over `offset`
//!
//! ```ignore
//! let limit = filters.pagination.limit();
//! let offset = filters.pagination.offset();
//! let rows = fetch(limit, offset).await?;
//! let total = count().await?;
//!
//! Ok(PaginatedStudentsResponse {
//!     data: rows,
//!     meta: filters.pagination.meta(total),
//! })
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Empty query values are treated as absent.
fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Position of a page within the full result set.
///
/// ```json
/// { "total": 100, "limit": 10, "offset": 20, "page": 3, "has_more": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub total: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Hash, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Maximum number of items to return (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0, ignored if `page` is set)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub offset: Option<i64>,
    /// Page number (1-indexed)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: Some(10),
            offset: Some(0),
            page: None,
        }
    }
}

impl PaginationParams {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        if let Some(page) = self.page {
            (page.max(1) - 1).saturating_mul(self.limit())
        } else {
            self.offset.unwrap_or(0).max(0)
        }
    }

    #[must_use]
    pub fn page(&self) -> Option<i64> {
        self.page.map(|p| p.max(1))
    }

    /// Builds the response metadata for a result set of `total` rows.
    #[must_use]
    pub fn meta(&self, total: i64) -> PaginationMeta {
        let limit = self.limit();
        let offset = self.offset();
        let page = self.page();
        PaginationMeta {
            total,
            limit,
            offset: if page.is_some() { None } else { Some(offset) },
            page,
            has_more: offset.saturating_add(limit) < total,
        }
    }

    /// SQL suffix with the clamped values inlined.
    #[must_use]
    pub fn sql_suffix(&self) -> String {
        format!(" LIMIT {} OFFSET {}", self.limit(), self.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<i64>, offset: Option<i64>, page: Option<i64>) -> PaginationParams {
        PaginationParams {
            limit,
            offset,
            page,
        }
    }

    #[test]
    fn test_defaults() {
        let p = PaginationParams::default();
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.page(), None);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(params(Some(0), None, None).limit(), 1);
        assert_eq!(params(Some(-10), None, None).limit(), 1);
        assert_eq!(params(Some(150), None, None).limit(), 100);
        assert_eq!(params(Some(100), None, None).limit(), 100);
    }

    #[test]
    fn test_negative_offset_is_zero() {
        assert_eq!(params(Some(10), Some(-5), None).offset(), 0);
    }

    #[test]
    fn test_page_takes_precedence_over_offset() {
        let p = params(Some(20), Some(5), Some(3));
        assert_eq!(p.offset(), 40);
        assert_eq!(p.page(), Some(3));
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let p = params(Some(10), None, Some(0));
        assert_eq!(p.offset(), 0);
        assert_eq!(p.page(), Some(1));
    }

    #[test]
    fn test_huge_page_saturates() {
        let p = params(Some(100), None, Some(i64::MAX));
        assert_eq!(p.offset(), i64::MAX);
        assert_eq!(p.sql_suffix(), format!(" LIMIT 100 OFFSET {}", i64::MAX));
        assert!(!p.meta(5).has_more);
    }

    #[test]
    fn test_meta_offset_mode() {
        let meta = params(Some(10), Some(20), None).meta(35);
        assert_eq!(
            meta,
            PaginationMeta {
                total: 35,
                limit: 10,
                offset: Some(20),
                page: None,
                has_more: true,
            }
        );
        assert!(!params(Some(10), Some(30), None).meta(35).has_more);
    }

    #[test]
    fn test_meta_page_mode_hides_offset() {
        let meta = params(Some(10), None, Some(2)).meta(15);
        assert_eq!(meta.offset, None);
        assert_eq!(meta.page, Some(2));
        assert!(!meta.has_more);

        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("offset"));
    }

    #[test]
    fn test_sql_suffix() {
        assert_eq!(
            params(Some(25), None, Some(3)).sql_suffix(),
            " LIMIT 25 OFFSET 50"
        );
    }

    #[test]
    fn test_deserialize_empty_strings() {
        let p: PaginationParams = serde_json::from_str(r#"{"limit":"","offset":""}"#).unwrap();
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 0);

        let p: PaginationParams = serde_json::from_str(r#"{"limit":"30"}"#).unwrap();
        assert_eq!(p.limit(), 30);
    }
}
